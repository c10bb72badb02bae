//! # Player Driver
//!
//! Owns the scheduling loop of a run and wires each tick to the host collaborators.
//!
//! ## Lifecycle
//! 1. `run_project`: parse, then set up input, audio (desktop only) and the renderer.
//!    Any fatal failure cleans up what was already set up and leaves the player idle.
//! 2. `tick` / `run`: gather input, walk the tree, hand new clones and the active
//!    list to the renderer, then let the input collector advance.
//! 3. `stop_running_project`: tears everything down. Idempotent.

use crate::config::PlayerConfig;
use crate::errors::{EngineError, ScriptFault};
use crate::host::HostSurface;
use crate::session::Session;
use crate::systems::walker::{TickInput, TickReport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// What a call to [`Player::run`] did.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub ticks: u64,
    /// Script faults of every tick, in order.
    pub faults: Vec<ScriptFault>,
}

/// How ticks are scheduled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickMode {
    /// Sleep for the interval after each tick.
    RateLimited(Duration),
    /// Tick once per display frame.
    Uncapped,
}

impl TickMode {
    pub fn for_rate(frame_rate: f32, uncapped_threshold_fps: f32) -> Self {
        if frame_rate >= uncapped_threshold_fps {
            TickMode::Uncapped
        } else {
            TickMode::RateLimited(Duration::from_secs_f64(1.0 / frame_rate.max(f32::EPSILON) as f64))
        }
    }
}

/// Time source for the run loop.
pub trait FrameClock {
    fn sleep(&mut self, interval: Duration);

    /// Blocks until the display is ready for the next frame.
    fn wait_for_display_frame(&mut self);
}

/// Wall-clock implementation pacing display frames at a fixed refresh rate.
pub struct SystemClock {
    display_interval: Duration,
    last_frame: Option<Instant>,
}

impl SystemClock {
    pub fn new(display_hz: f64) -> Self {
        Self {
            display_interval: Duration::from_secs_f64(1.0 / display_hz.max(1.0)),
            last_frame: None,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl FrameClock for SystemClock {
    fn sleep(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }

    fn wait_for_display_frame(&mut self) {
        if let Some(last) = self.last_frame {
            let elapsed = last.elapsed();
            if elapsed < self.display_interval {
                std::thread::sleep(self.display_interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());
    }
}

/// Requests a stop at the next tick boundary, from any thread.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Run {
    session: Session,
    surface: HostSurface,
    mode: TickMode,
    audio_active: bool,
}

pub struct Player {
    config: PlayerConfig,
    run: Option<Run>,
    stop: StopHandle,
}

impl Player {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            run: None,
            stop: StopHandle::default(),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.run.as_ref().map(|r| &r.session)
    }

    pub fn tick_mode(&self) -> Option<TickMode> {
        self.run.as_ref().map(|r| r.mode)
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Loads `document` and starts it on `surface`.
    ///
    /// A malformed document leaves any running project untouched. Otherwise the
    /// running project is stopped first, and on a later error nothing keeps running
    /// and every collaborator that was set up has been cleaned up again.
    ///
    /// Audio is skipped when either the surface or [`PlayerConfig::host`] names a
    /// host without audio.
    #[instrument(level = "info", skip(self, document, surface), fields(environment = %surface.environment))]
    pub fn run_project(&mut self, document: &str, mut surface: HostSurface) -> Result<(), EngineError> {
        let session = Session::load(document, &self.config)?;
        let settings = session.project().settings.clone();

        self.stop_running_project();

        surface
            .input
            .setup()
            .map_err(|e| EngineError::Anyhow(e.context("input collector setup failed")))?;

        let environment = if surface.environment.supports_audio() {
            self.config.host
        } else {
            surface.environment
        };
        let audio_active = if environment.supports_audio() {
            match surface.audio.setup() {
                Ok(()) => true,
                Err(e) => {
                    warn!("audio unavailable, continuing without sound: {}", e);
                    false
                }
            }
        } else {
            debug!(%environment, "audio skipped on this host");
            false
        };

        if let Err(e) = surface.renderer.setup(&settings) {
            error!("renderer setup failed: {}", e);
            surface.input.cleanup();
            if audio_active {
                surface.audio.cleanup();
            }
            return Err(EngineError::RendererUnavailable(e.to_string()));
        }
        surface.renderer.refresh(None);

        let mode = TickMode::for_rate(settings.frame_rate, self.config.uncapped_threshold_fps);
        info!(name = %settings.name, ?mode, "project running");
        self.stop.clear();
        self.run = Some(Run {
            session,
            surface,
            mode,
            audio_active,
        });
        Ok(())
    }

    /// Tears down the collaborators and drops the live project. Returns whether a
    /// project was running.
    pub fn stop_running_project(&mut self) -> bool {
        let Some(mut run) = self.run.take() else {
            return false;
        };
        run.surface.input.cleanup();
        if run.audio_active {
            run.surface.audio.cleanup();
        }
        run.surface.renderer.cleanup();
        info!(ticks = run.session.ticks(), "project stopped");
        true
    }

    pub fn enter_fullscreen(&mut self) -> Result<(), EngineError> {
        let run = self.run.as_mut().ok_or(EngineError::NotRunning)?;
        run.surface.renderer.enter_fullscreen();
        Ok(())
    }

    /// Runs exactly one tick.
    pub fn tick(&mut self) -> Result<TickReport, EngineError> {
        let run = self.run.as_mut().ok_or(EngineError::NotRunning)?;
        let input = TickInput {
            pointer: run.surface.input.pointer(),
            clicks: run.surface.input.take_clicks(),
        };
        let report = run.session.tick(&input);
        {
            let mut project = run.session.project();
            for node in project.stage.take_pending_refresh() {
                run.surface.renderer.refresh(Some(node));
            }
            let active = project.stage.active_objects();
            run.surface.renderer.render(&project.stage, &active);
        }
        run.surface.input.update();
        Ok(report)
    }

    /// Ticks until stopped, or until `limit` ticks have run.
    ///
    /// A stop requested through a `StopHandle` is honoured at the next tick boundary
    /// and tears the run down.
    pub fn run(&mut self, clock: &mut dyn FrameClock, limit: Option<u64>) -> Result<RunSummary, EngineError> {
        let mode = self.tick_mode().ok_or(EngineError::NotRunning)?;
        let mut summary = RunSummary::default();
        while self.is_running() && limit.map_or(true, |l| summary.ticks < l) {
            if self.stop.is_requested() {
                self.stop_running_project();
                break;
            }
            let report = match mode {
                TickMode::RateLimited(interval) => {
                    let report = self.tick()?;
                    clock.sleep(interval);
                    report
                }
                TickMode::Uncapped => {
                    clock.wait_for_display_frame();
                    self.tick()?
                }
            };
            summary.faults.extend(report.faults);
            summary.ticks += 1;
        }
        Ok(summary)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop_running_project();
    }
}
