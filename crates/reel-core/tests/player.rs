//! Player Driver Tests
//!
//! Tests for the run lifecycle against mock host collaborators.

use reel_core::config::ENV_HOST;
use reel_core::{
    AudioPlayer, EngineError, FrameClock, HostEnvironment, HostSurface, InputCollector, NodeId,
    Player, PlayerConfig, Point, ProjectSettings, Renderer, Stage, TickMode,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Log = Arc<Mutex<Vec<String>>>;

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

// ============================================================================
// Mock Collaborators
// ============================================================================

#[derive(Default)]
struct MockRenderer {
    log: Log,
    fail_setup: bool,
    /// Names of the objects handed over on each render call.
    frames: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Renderer for MockRenderer {
    fn setup(&mut self, settings: &ProjectSettings) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(format!("renderer.setup {}", settings.frame_rate));
        if self.fail_setup {
            anyhow::bail!("no graphics device");
        }
        Ok(())
    }

    fn render(&mut self, stage: &Stage, active: &[NodeId]) {
        let names = active
            .iter()
            .filter_map(|&n| stage.get(n))
            .filter_map(|o| o.name().map(str::to_string))
            .collect();
        self.frames.lock().unwrap().push(names);
    }

    fn refresh(&mut self, object: Option<NodeId>) {
        self.log.lock().unwrap().push(match object {
            Some(node) => format!("renderer.refresh {node}"),
            None => "renderer.refresh all".to_string(),
        });
    }

    fn enter_fullscreen(&mut self) {
        self.log.lock().unwrap().push("renderer.fullscreen".into());
    }

    fn cleanup(&mut self) {
        self.log.lock().unwrap().push("renderer.cleanup".into());
    }
}

#[derive(Default)]
struct MockInput {
    log: Log,
    pointer: Point,
    clicks: Arc<Mutex<Vec<Point>>>,
}

impl InputCollector for MockInput {
    fn setup(&mut self) -> anyhow::Result<()> {
        self.log.lock().unwrap().push("input.setup".into());
        Ok(())
    }

    fn update(&mut self) {}

    fn cleanup(&mut self) {
        self.log.lock().unwrap().push("input.cleanup".into());
    }

    fn pointer(&self) -> Point {
        self.pointer
    }

    fn take_clicks(&mut self) -> Vec<Point> {
        std::mem::take(&mut *self.clicks.lock().unwrap())
    }
}

#[derive(Default)]
struct MockAudio {
    log: Log,
}

impl AudioPlayer for MockAudio {
    fn setup(&mut self) -> anyhow::Result<()> {
        self.log.lock().unwrap().push("audio.setup".into());
        Ok(())
    }

    fn cleanup(&mut self) {
        self.log.lock().unwrap().push("audio.cleanup".into());
    }
}

#[derive(Default)]
struct ManualClock {
    sleeps: Vec<Duration>,
    display_waits: usize,
}

impl FrameClock for ManualClock {
    fn sleep(&mut self, interval: Duration) {
        self.sleeps.push(interval);
    }

    fn wait_for_display_frame(&mut self) {
        self.display_waits += 1;
    }
}

struct Harness {
    log: Log,
    frames: Arc<Mutex<Vec<Vec<String>>>>,
    clicks: Arc<Mutex<Vec<Point>>>,
}

fn surface(fail_renderer: bool) -> (HostSurface, Harness) {
    let log = Log::default();
    let frames = Arc::new(Mutex::new(Vec::new()));
    let clicks = Arc::new(Mutex::new(Vec::new()));
    let renderer = MockRenderer {
        log: log.clone(),
        fail_setup: fail_renderer,
        frames: frames.clone(),
    };
    let input = MockInput {
        log: log.clone(),
        pointer: Point::default(),
        clicks: clicks.clone(),
    };
    let audio = MockAudio { log: log.clone() };
    (
        HostSurface::new(renderer, input, audio),
        Harness { log, frames, clicks },
    )
}

const SIMPLE: &str = r#"{ "frameRate": 12, "root": { "kind": "symbol", "frames": [ { "objects": [
    { "kind": "shape", "name": "kept", "size": { "width": 10, "height": 10 } },
    { "kind": "shape", "name": "gone", "deleted": true }
] } ] } }"#;

// ============================================================================
// Run Lifecycle
// ============================================================================

/// Test collaborator setup order.
///
/// Validates:
/// - Input, then audio, then the renderer are set up
/// - The renderer gets a full refresh once set up
#[test]
fn run_project_sets_up_collaborators_in_order() {
    let (surface, h) = surface(false);
    let mut player = Player::new(PlayerConfig::default());
    player.run_project(SIMPLE, surface).unwrap();

    assert!(player.is_running());
    assert_eq!(
        entries(&h.log),
        ["input.setup", "audio.setup", "renderer.setup 12", "renderer.refresh all"]
    );
    assert_eq!(
        player.tick_mode(),
        Some(TickMode::RateLimited(Duration::from_secs_f64(1.0 / 12.0)))
    );
}

/// Test handheld hosts.
///
/// Validates:
/// - Audio is neither set up nor cleaned up on mobile
#[test]
fn mobile_hosts_skip_audio() {
    let (surface, h) = surface(false);
    let mut player = Player::new(PlayerConfig::default());
    player
        .run_project(SIMPLE, surface.with_environment(HostEnvironment::Mobile))
        .unwrap();
    player.stop_running_project();
    assert!(!entries(&h.log).iter().any(|e| e.starts_with("audio")));
}

/// Test a handheld host named only in the configuration.
///
/// Validates:
/// - A mobile `host` in the player config skips audio on a default surface
#[test]
fn configured_mobile_host_skips_audio() {
    let (surface, h) = surface(false);
    let config = PlayerConfig::default().overlay(|key| (key == ENV_HOST).then(|| "mobile".to_string()));
    assert_eq!(config.host, HostEnvironment::Mobile);
    let mut player = Player::new(config);
    player.run_project(SIMPLE, surface).unwrap();
    player.stop_running_project();
    let log = entries(&h.log);
    assert!(log.contains(&"renderer.cleanup".to_string()));
    assert!(!log.iter().any(|e| e.starts_with("audio")));
}

/// Test a failing renderer.
///
/// Validates:
/// - run_project reports RendererUnavailable
/// - Input and audio are cleaned up again
/// - The player is left idle
#[test]
fn renderer_failure_cleans_up_and_leaves_player_idle() {
    let (surface, h) = surface(true);
    let mut player = Player::new(PlayerConfig::default());
    let err = player.run_project(SIMPLE, surface).unwrap_err();

    assert!(matches!(err, EngineError::RendererUnavailable(ref m) if m.contains("no graphics device")));
    assert!(!player.is_running());
    let log = entries(&h.log);
    assert!(log.contains(&"input.cleanup".to_string()));
    assert!(log.contains(&"audio.cleanup".to_string()));
    assert!(matches!(player.tick(), Err(EngineError::NotRunning)));
}

/// Test a malformed document.
///
/// Validates:
/// - Parsing fails before any collaborator is touched
#[test]
fn malformed_document_touches_no_collaborator() {
    let (surface, h) = surface(false);
    let mut player = Player::new(PlayerConfig::default());
    let err = player.run_project("{ not json", surface).unwrap_err();
    assert!(matches!(err, EngineError::Json(_) | EngineError::MalformedProject(_)));
    assert!(entries(&h.log).is_empty());
    assert!(!player.is_running());
}

/// Test stopping.
///
/// Validates:
/// - Every collaborator is cleaned up once
/// - A second stop is a no-op
#[test]
fn stop_is_idempotent() {
    let (surface, h) = surface(false);
    let mut player = Player::new(PlayerConfig::default());
    player.run_project(SIMPLE, surface).unwrap();

    assert!(player.stop_running_project());
    assert!(!player.stop_running_project());
    let cleanups = entries(&h.log)
        .into_iter()
        .filter(|e| e.ends_with("cleanup"))
        .count();
    assert_eq!(cleanups, 3);
}

/// Test running a second project.
///
/// Validates:
/// - A malformed replacement leaves the running project alone
/// - Starting a new project stops the previous one first
#[test]
fn run_project_replaces_a_running_project() {
    let (first, h1) = surface(false);
    let (broken, h_broken) = surface(false);
    let (second, _h2) = surface(false);
    let mut player = Player::new(PlayerConfig::default());
    player.run_project(SIMPLE, first).unwrap();

    assert!(player.run_project("{ not json", broken).is_err());
    assert!(player.is_running());
    assert!(entries(&h_broken.log).is_empty());
    assert!(!entries(&h1.log).iter().any(|e| e.ends_with("cleanup")));
    player.tick().unwrap();

    player.run_project(SIMPLE, second).unwrap();
    assert!(entries(&h1.log).contains(&"renderer.cleanup".to_string()));
    assert!(player.is_running());
}

// ============================================================================
// Ticking
// ============================================================================

/// Test what the renderer receives.
///
/// Validates:
/// - Deleted objects are never handed to the renderer
/// - Clones made outside a tick are refreshed on the next tick
#[test]
fn renderer_sees_active_objects_and_new_clones() {
    let (surface, h) = surface(false);
    let mut player = Player::new(PlayerConfig::default());
    player.run_project(SIMPLE, surface).unwrap();

    player.tick().unwrap();
    assert_eq!(h.frames.lock().unwrap().last().unwrap(), &vec!["kept".to_string()]);

    let session = player.session().unwrap();
    let kept = session.find("kept").unwrap();
    let clone = session.clone_object(kept).unwrap();
    player.tick().unwrap();
    assert!(entries(&h.log).contains(&format!("renderer.refresh {clone}")));
    assert_eq!(h.frames.lock().unwrap().last().unwrap().len(), 2);
}

/// Test input delivery.
///
/// Validates:
/// - Clicks queued by the input collector reach onClick hooks
/// - Clicks are drained once consumed
#[test]
fn clicks_reach_hooks_through_the_input_collector() {
    let json = r#"{ "root": { "kind": "symbol", "frames": [ { "objects": [
        { "kind": "shape", "name": "button", "size": { "width": 10, "height": 10 },
          "scripts": { "onClick": "obj.x += 1.0;" } }
    ] } ] } }"#;
    let (surface, h) = surface(false);
    let mut player = Player::new(PlayerConfig::default());
    player.run_project(json, surface).unwrap();

    h.clicks.lock().unwrap().push(Point::new(5.0, 5.0));
    let report = player.tick().unwrap();
    assert_eq!(report.count(reel_core::ScriptEvent::Click), 1);
    let report = player.tick().unwrap();
    assert_eq!(report.count(reel_core::ScriptEvent::Click), 0);
}

/// Test the rate-limited loop.
///
/// Validates:
/// - run ticks up to the limit, sleeping the frame interval after each tick
#[test]
fn rate_limited_run_sleeps_between_ticks() {
    let (surface, h) = surface(false);
    let mut player = Player::new(PlayerConfig::default());
    player.run_project(SIMPLE, surface).unwrap();

    let mut clock = ManualClock::default();
    assert_eq!(player.run(&mut clock, Some(4)).unwrap().ticks, 4);
    assert_eq!(clock.sleeps.len(), 4);
    assert_eq!(clock.display_waits, 0);
    assert_eq!(h.frames.lock().unwrap().len(), 4);
}

/// Test fault collection across a run.
///
/// Validates:
/// - run returns the script faults of every tick it ran
#[test]
fn run_collects_script_faults() {
    let json = r#"{ "frameRate": 12, "root": { "kind": "symbol", "frames": [ { "objects": [
        { "kind": "shape", "name": "broken", "scripts": { "onUpdate": "throw \"nope\";" } }
    ] } ] } }"#;
    let (surface, _h) = surface(false);
    let mut player = Player::new(PlayerConfig::default());
    player.run_project(json, surface).unwrap();

    let summary = player.run(&mut ManualClock::default(), Some(3)).unwrap();
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.faults.len(), 3);
    assert!(summary.faults.iter().all(|f| f.message.contains("nope")));
}

/// Test the display-synchronized loop.
///
/// Validates:
/// - Projects at or above the threshold wait for the display instead of sleeping
#[test]
fn fast_projects_run_uncapped() {
    let json = r#"{ "frameRate": 60, "root": { "kind": "symbol", "frames": [ {} ] } }"#;
    let (surface, _h) = surface(false);
    let mut player = Player::new(PlayerConfig::default());
    player.run_project(json, surface).unwrap();
    assert_eq!(player.tick_mode(), Some(TickMode::Uncapped));

    let mut clock = ManualClock::default();
    player.run(&mut clock, Some(3)).unwrap();
    assert_eq!(clock.display_waits, 3);
    assert!(clock.sleeps.is_empty());
}

/// Test stopping from a handle.
///
/// Validates:
/// - A requested stop ends the loop at the next tick boundary and tears down
#[test]
fn stop_handle_ends_the_loop() {
    let (surface, h) = surface(false);
    let mut player = Player::new(PlayerConfig::default());
    player.run_project(SIMPLE, surface).unwrap();

    player.stop_handle().request_stop();
    let summary = player.run(&mut ManualClock::default(), None).unwrap();
    assert_eq!(summary.ticks, 0);
    assert!(!player.is_running());
    assert!(entries(&h.log).contains(&"renderer.cleanup".to_string()));
}

/// Test fullscreen.
///
/// Validates:
/// - enter_fullscreen is forwarded to the renderer while running
#[test]
fn fullscreen_is_forwarded() {
    let (surface, h) = surface(false);
    let mut player = Player::new(PlayerConfig::default());
    player.run_project(SIMPLE, surface).unwrap();
    player.enter_fullscreen().unwrap();
    assert!(entries(&h.log).contains(&"renderer.fullscreen".to_string()));
}

/// Test dropping a running player.
///
/// Validates:
/// - Collaborators are cleaned up when the player goes away
#[test]
fn dropping_the_player_stops_the_run() {
    let (surface, h) = surface(false);
    {
        let mut player = Player::new(PlayerConfig::default());
        player.run_project(SIMPLE, surface).unwrap();
    }
    assert!(entries(&h.log).contains(&"input.cleanup".to_string()));
}
