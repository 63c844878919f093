//! Core types and constants for the crack location system

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
