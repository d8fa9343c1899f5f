//! Data models for the bookmark backend.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless interoperability.

mod backup;
mod bookmark;
mod category;
mod dataset;
mod transfer;

pub use backup::*;
pub use bookmark::*;
pub use category::*;
pub use dataset::*;
pub use transfer::*;
