use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::Room;
use crate::platform::UserId;
use crate::security::ct_eq;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Owner {0} already has a room")]
pub struct RoomAlreadyExists(pub UserId);

enum Slot {
    /// Creation in progress; blocks a second creation for the same owner
    Provisioning,
    Live(Arc<Room>),
}

/// Owner -> active room. One entry per owner at most.
///
/// Each operation runs inside a single shard lock of the map, which is the
/// critical section that keeps two creations for one owner from both
/// succeeding.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<UserId, Slot>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// True for live rooms and for creations still in progress.
    pub fn contains(&self, owner: UserId) -> bool {
        self.rooms.contains_key(&owner)
    }

    pub fn get(&self, owner: UserId) -> Option<Arc<Room>> {
        self.rooms.get(&owner).and_then(|slot| match slot.value() {
            Slot::Live(room) => Some(room.clone()),
            Slot::Provisioning => None,
        })
    }

    pub fn insert(&self, owner: UserId, room: Arc<Room>) -> Result<(), RoomAlreadyExists> {
        match self.rooms.entry(owner) {
            Entry::Occupied(_) => Err(RoomAlreadyExists(owner)),
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Live(room));
                Ok(())
            }
        }
    }

    /// Claim `owner` for a creation in progress.
    pub fn reserve(&self, owner: UserId) -> Result<Reservation<'_>, RoomAlreadyExists> {
        match self.rooms.entry(owner) {
            Entry::Occupied(_) => Err(RoomAlreadyExists(owner)),
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Provisioning);
                Ok(Reservation {
                    registry: self,
                    owner,
                    committed: false,
                })
            }
        }
    }

    /// Remove the live room of `owner`. Returns `None` when there was none.
    pub fn remove(&self, owner: UserId) -> Option<Arc<Room>> {
        self.rooms
            .remove_if(&owner, |_, slot| matches!(slot, Slot::Live(_)))
            .and_then(|(_, slot)| match slot {
                Slot::Live(room) => Some(room),
                Slot::Provisioning => None,
            })
    }

    /// Remove `room` only if it is still the one registered for its owner.
    pub(crate) fn deregister(&self, room: &Room) -> Option<Arc<Room>> {
        self.rooms
            .remove_if(&room.owner(), |_, slot| is_same(slot, room))
            .and_then(|(_, slot)| match slot {
                Slot::Live(room) => Some(room),
                Slot::Provisioning => None,
            })
    }

    pub(crate) fn is_registered(&self, room: &Room) -> bool {
        self.rooms
            .get(&room.owner())
            .map(|slot| is_same(slot.value(), room))
            .unwrap_or(false)
    }

    /// Resolve the room a paired client belongs to.
    pub fn find_by_secret(&self, secret: &str) -> Option<Arc<Room>> {
        self.rooms()
            .into_iter()
            .find(|room| ct_eq(room.secret_plain(), secret))
    }

    /// Snapshot of all live rooms
    pub fn rooms(&self) -> Vec<Arc<Room>> {
        self.rooms
            .iter()
            .filter_map(|slot| match slot.value() {
                Slot::Live(room) => Some(room.clone()),
                Slot::Provisioning => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rooms
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Live(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_same(slot: &Slot, room: &Room) -> bool {
    match slot {
        Slot::Live(live) => std::ptr::eq(Arc::as_ptr(live), room),
        Slot::Provisioning => false,
    }
}

/// Registry claim held while a room is being provisioned.
///
/// Dropping it without `commit` releases the owner again.
pub struct Reservation<'a> {
    registry: &'a RoomRegistry,
    owner: UserId,
    committed: bool,
}

impl Reservation<'_> {
    pub fn commit(mut self, room: Arc<Room>) {
        self.registry.rooms.insert(self.owner, Slot::Live(room));
        self.committed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.registry
                .rooms
                .remove_if(&self.owner, |_, slot| matches!(slot, Slot::Provisioning));
        }
    }
}
