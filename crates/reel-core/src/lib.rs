//! # Reel Core
//!
//! `reel-core` is the timeline playback and object-lifecycle engine of an interactive 2D
//! animation player.
//!
//! It advances a tree of nested, independently-timed symbols one tick at a time, applies
//! interpolated motion ([keyframe](https://crates.io/crates/keyframe) easing), fires
//! per-object hooks written in [Rhai](https://rhai.rs/), and lets scripts clone, delete
//! and reset objects against a frozen copy of the project as it was loaded.
//!
//! ## Core Features
//!
//! *   **Nested Timelines**: Every symbol owns frames and a playhead running at its own rate.
//! *   **Tweens**: Pure sampling between authored keys, recomputed every tick.
//! *   **Hooks**: `onLoad`, `onUpdate` and `onClick`, with faults contained per object.
//! *   **Lifecycle**: Clones, soft deletion and reset-to-initial without reloading.
//! *   **Frame Cache**: Write-through snapshots for scrubbing between frames.
//! *   **Host Agnostic**: Rendering, input and audio are traits supplied by the host.
//!
//! ## Usage
//!
//! The entry point is the [`Player`], driven with a [`HostSurface`] of collaborators.
//!
//! ```rust,no_run
//! use reel_core::{HostSurface, Player, PlayerConfig, SystemClock};
//! # fn surface() -> HostSurface { unimplemented!() }
//!
//! let document = std::fs::read_to_string("demos/bounce.json").unwrap();
//! let mut player = Player::new(PlayerConfig::from_env());
//! player.run_project(&document, surface()).unwrap();
//! player.run(&mut SystemClock::default(), Some(120)).unwrap();
//! player.stop_running_project();
//! ```

/// Shared identity and geometry types.
pub mod types;

pub mod errors;

/// Objects: shapes, symbols and their state partitions.
pub mod object;

/// Frames, playhead stepping and the frame snapshot cache.
pub mod timeline;

/// Interpolation between authored keys.
pub mod tween;

/// The stage arena holding every object of a project.
pub mod scene;

/// The JSON project format.
pub mod document;

pub mod project;

/// Clone, soft-delete and reset-to-initial.
pub mod lifecycle;

/// Rhai scripting API bindings.
pub mod scripting;

/// Per-tick systems.
pub mod systems;

pub mod session;

/// Collaborator interfaces implemented by the host.
pub mod host;

pub mod config;

/// Scheduling loop and run lifecycle.
pub mod player;

pub use config::PlayerConfig;
pub use document::{parse_document, FsProjectSource, ProjectDocument, ProjectSource};
pub use errors::{EngineError, ScriptFault};
pub use host::{AudioPlayer, HostEnvironment, HostSurface, InputCollector, Renderer};
pub use lifecycle::{Baseline, ResetOutcome};
pub use object::{ScriptEvent, StageObject};
pub use player::{FrameClock, Player, RunSummary, StopHandle, SystemClock, TickMode};
pub use project::{load_project_pair, Project, ProjectSettings};
pub use scene::Stage;
pub use session::Session;
pub use systems::{FiredHook, TickInput, TickReport};
pub use types::{NodeId, ObjectId, Point, Rect, Size, Transform};
