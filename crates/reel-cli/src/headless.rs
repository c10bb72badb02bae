//! Host collaborators for running a project without a window.
//!
//! The renderer only logs what it would draw, and input comes from clicks
//! scheduled on the command line.

use reel_core::{AudioPlayer, InputCollector, NodeId, Point, ProjectSettings, Renderer, Stage};
use std::collections::BTreeMap;
use tracing::{debug, info, trace};

#[derive(Default)]
pub struct LogRenderer {
    frames: u64,
}

impl Renderer for LogRenderer {
    fn setup(&mut self, settings: &ProjectSettings) -> anyhow::Result<()> {
        info!(
            width = settings.width,
            height = settings.height,
            fit_screen = settings.fit_screen,
            "headless canvas ready"
        );
        Ok(())
    }

    fn render(&mut self, stage: &Stage, active: &[NodeId]) {
        self.frames += 1;
        debug!(frame = self.frames, objects = active.len(), "render");
        for &node in active {
            if let Some(obj) = stage.get(node) {
                let t = obj.state.transform;
                trace!(
                    node,
                    name = obj.name().unwrap_or(""),
                    x = t.x,
                    y = t.y,
                    rotation = t.rotation,
                    alpha = t.alpha,
                    "draw"
                );
            }
        }
    }

    fn refresh(&mut self, object: Option<NodeId>) {
        match object {
            Some(node) => debug!(node, "refresh object"),
            None => debug!("refresh all"),
        }
    }

    fn enter_fullscreen(&mut self) {
        info!("fullscreen requested");
    }

    fn cleanup(&mut self) {
        info!(frames = self.frames, "renderer closed");
    }
}

/// Replays clicks at fixed ticks. The pointer rests on the last click.
pub struct ScriptedInput {
    tick: u64,
    pointer: Point,
    clicks: BTreeMap<u64, Vec<Point>>,
}

impl ScriptedInput {
    pub fn new(pointer: Point, clicks: impl IntoIterator<Item = (u64, Point)>) -> Self {
        let mut by_tick: BTreeMap<u64, Vec<Point>> = BTreeMap::new();
        for (tick, point) in clicks {
            by_tick.entry(tick).or_default().push(point);
        }
        Self {
            tick: 0,
            pointer,
            clicks: by_tick,
        }
    }
}

impl InputCollector for ScriptedInput {
    fn setup(&mut self) -> anyhow::Result<()> {
        debug!(scheduled = self.clicks.len(), "scripted input ready");
        Ok(())
    }

    fn update(&mut self) {
        self.tick += 1;
    }

    fn cleanup(&mut self) {
        if !self.clicks.is_empty() {
            debug!(unused = self.clicks.len(), "clicks scheduled past the last tick");
        }
    }

    fn pointer(&self) -> Point {
        self.pointer
    }

    fn take_clicks(&mut self) -> Vec<Point> {
        let clicks = self.clicks.remove(&(self.tick + 1)).unwrap_or_default();
        if let Some(&last) = clicks.last() {
            self.pointer = last;
            info!(tick = self.tick + 1, x = last.x, y = last.y, "click");
        }
        clicks
    }
}

pub struct SilentAudio;

impl AudioPlayer for SilentAudio {
    fn setup(&mut self) -> anyhow::Result<()> {
        debug!("audio muted in headless mode");
        Ok(())
    }

    fn cleanup(&mut self) {}
}
