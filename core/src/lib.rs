//! TICKSCAN Core Library
//!
//! Core types, traits, and abstractions for scanning sparse tick bitmaps.
//! This crate provides the foundation for all other TICKSCAN components.

pub mod types;
pub mod traits;
pub mod error;
pub mod config;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use config::*;
