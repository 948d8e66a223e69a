//! Chat room and message entities.

pub mod message;
pub mod room;

pub use message::{ChatMessage, MessageCategory, NewChatMessage};
pub use room::{ChatRoom, RoomMember};
