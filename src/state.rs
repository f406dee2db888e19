use std::sync::Arc;

use crate::platform::VoicePlatform;
use crate::room::{CreateRoomError, Owner, Room, RoomRegistry, RoomSettings};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<RoomSettings>,
    pub registry: Arc<RoomRegistry>,
    pub platform: Arc<dyn VoicePlatform>,
}

impl AppState {
    pub fn new(settings: RoomSettings, platform: Arc<dyn VoicePlatform>) -> Self {
        Self {
            settings: Arc::new(settings),
            registry: Arc::new(RoomRegistry::new()),
            platform,
        }
    }

    /// Entry point for the command front-end.
    pub async fn create_room(&self, owner: Owner) -> Result<Arc<Room>, CreateRoomError> {
        Room::create(
            owner,
            self.settings.clone(),
            self.platform.clone(),
            &self.registry,
        )
        .await
    }

    /// Close every live room, e.g. on shutdown.
    pub async fn close_all(&self) -> usize {
        let mut closed = 0;
        for room in self.registry.rooms() {
            if room.close().await.was_closed() {
                closed += 1;
            }
        }
        closed
    }
}
