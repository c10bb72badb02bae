//! # API Module
//!
//! Aggregates all Rhai API sub-modules and provides a single registration point.
//!
//! ## Sub-modules
//! - **object**: Object properties, flags and navigation
//! - **timeline**: Playhead control
//! - **lifecycle**: Clone, delete, reset and utilities

pub mod lifecycle;
pub mod object;
pub mod timeline;

use rhai::Engine;

/// Register all API functions with the Rhai engine.
pub fn register_all(engine: &mut Engine) {
    object::register(engine);
    timeline::register(engine);
    lifecycle::register(engine);
}
