pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod janitor;
pub mod models;
pub mod platform;
pub mod room;
pub mod security;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use room::{CreateRoomError, Owner, Room, RoomRegistry, RoomSettings};
pub use state::AppState;
