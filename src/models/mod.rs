//! Data models

pub mod prediction;
pub mod response;

pub use prediction::*;
pub use response::*;
