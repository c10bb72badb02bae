//! # Host Collaborators
//!
//! Interfaces the player drives but does not implement: drawing, input devices and
//! audio output.

use crate::project::ProjectSettings;
use crate::scene::Stage;
use crate::types::{NodeId, Point};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Draws the active objects of a tick.
pub trait Renderer {
    fn setup(&mut self, settings: &ProjectSettings) -> Result<()>;

    /// Called once per tick with the active objects in draw order.
    fn render(&mut self, stage: &Stage, active: &[NodeId]);

    /// Rebuilds host-side resources for one object, or for everything with `None`.
    fn refresh(&mut self, object: Option<NodeId>);

    fn enter_fullscreen(&mut self);

    fn cleanup(&mut self);
}

/// Pointer state and clicks in stage coordinates.
pub trait InputCollector {
    fn setup(&mut self) -> Result<()>;

    /// Called after each tick has been rendered.
    fn update(&mut self);

    fn cleanup(&mut self);

    fn pointer(&self) -> Point;

    /// Clicks since the previous tick. Draining.
    fn take_clicks(&mut self) -> Vec<Point>;
}

pub trait AudioPlayer {
    fn setup(&mut self) -> Result<()>;
    fn cleanup(&mut self);
}

/// The kind of device the player runs on.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostEnvironment {
    #[default]
    Desktop,
    Mobile,
    Tablet,
}

impl HostEnvironment {
    /// Audio is not started on handheld devices.
    pub fn supports_audio(&self) -> bool {
        matches!(self, HostEnvironment::Desktop)
    }
}

impl fmt::Display for HostEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostEnvironment::Desktop => write!(f, "desktop"),
            HostEnvironment::Mobile => write!(f, "mobile"),
            HostEnvironment::Tablet => write!(f, "tablet"),
        }
    }
}

impl FromStr for HostEnvironment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(HostEnvironment::Desktop),
            "mobile" => Ok(HostEnvironment::Mobile),
            "tablet" => Ok(HostEnvironment::Tablet),
            other => Err(format!("unknown host environment '{}'", other)),
        }
    }
}

/// Everything a host hands to `Player::run_project`.
pub struct HostSurface {
    pub renderer: Box<dyn Renderer>,
    pub input: Box<dyn InputCollector>,
    pub audio: Box<dyn AudioPlayer>,
    pub environment: HostEnvironment,
}

impl HostSurface {
    pub fn new(
        renderer: impl Renderer + 'static,
        input: impl InputCollector + 'static,
        audio: impl AudioPlayer + 'static,
    ) -> Self {
        Self {
            renderer: Box::new(renderer),
            input: Box::new(input),
            audio: Box::new(audio),
            environment: HostEnvironment::default(),
        }
    }

    pub fn with_environment(mut self, environment: HostEnvironment) -> Self {
        self.environment = environment;
        self
    }
}
