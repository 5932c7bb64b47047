//! Core types and errors for isalens-correlation

pub mod errors;
pub mod types;

pub use errors::*;
pub use types::*;
