pub mod kubernetes;
pub mod message_queue;
pub mod observability;

pub use kubernetes::*;
pub use message_queue::*;
pub use observability::*;
