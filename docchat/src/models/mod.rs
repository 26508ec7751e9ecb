//! Data models for docchat.

pub mod message;
pub mod session;
pub mod upload;

pub use message::{Message, MessageRole};
pub use session::Session;
pub use upload::UploadState;
