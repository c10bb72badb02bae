//! # Reel Engine
//!
//! Facade over [`reel_core`], the timeline playback and object-lifecycle engine.
//! Hosts depend on this crate and implement the collaborator traits in
//! [`host`](reel_core::host) to put a project on screen.

pub use reel_core::*;

use anyhow::Result;

/// Loads a project document from `path`, falling back to `projects/`.
pub fn read_project(path: &str) -> Result<String> {
    FsProjectSource.load_document(path)
}
