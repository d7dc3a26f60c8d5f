//! Data Transfer Objects for REST request/response serialization.
//!
//! Query structs are typed; handlers extract them as
//! `Result<Query<T>, QueryRejection>` so a malformed value becomes a
//! structured 400 rather than axum's plain-text rejection.

pub mod common_dto;
pub mod events_dto;
pub mod metrics_dto;

pub use common_dto::*;
pub use events_dto::*;
pub use metrics_dto::*;
