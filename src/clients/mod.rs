//! Provider capabilities the reconcilers call against, their AWS SDK bindings, an offline
//! stand-in and mocks.

pub mod ecs_client;
pub mod error;
pub mod lambda_client;
pub mod mock;
pub mod offline;

pub use ecs_client::*;
pub use error::*;
pub use lambda_client::*;
pub use offline::Offline;
