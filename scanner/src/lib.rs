//! TICKSCAN Tick Scanner
//!
//! Walks a tick bitmap from a start tick in one direction, collecting up to
//! `max_steps` records without ever reporting a tick on or past the domain
//! bounds.

pub mod request;
pub mod scanner;

pub use request::*;
pub use scanner::*;
