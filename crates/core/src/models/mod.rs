pub mod dispatch;
pub mod message;

pub use dispatch::*;
pub use message::*;
