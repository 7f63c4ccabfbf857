//! Request gates

pub mod readiness;
pub mod upload;
