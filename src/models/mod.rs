pub mod room;

pub use room::{
    CloseResponse,
    LockResponse,
    MuteFailure,
    RefreshResponse,
    RoomStatus,
    SetCodeRequest,
    SetCodeResponse,
    SetMuteRequest,
};
