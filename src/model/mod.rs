//! Pure data structures: resource schemas, kind-discriminated envelopes and documents.

pub mod document;
pub mod ecs;
pub mod lambda;
pub mod resource;

pub use document::*;
pub use ecs::*;
pub use lambda::*;
pub use resource::*;
