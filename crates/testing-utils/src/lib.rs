//! # Adaptation Testing Utils
//!
//! 工作区共享的测试工具：各个trait接口的内存实现，以及消息和配置的构造器。
//!
//! ```toml
//! [dev-dependencies]
//! adaptation-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
