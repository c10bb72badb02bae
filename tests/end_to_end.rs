//! End-to-End Tests
//!
//! Plays the bundled button demo through the facade crate: spawning clones
//! from a click, then resetting the whole stage from another.

use reel_engine::{read_project, PlayerConfig, Point, Session, TickInput};
use std::path::PathBuf;

fn demo(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name);
    read_project(&path.to_string_lossy()).expect("demo exists")
}

fn click(at: Point) -> TickInput {
    TickInput {
        pointer: at,
        clicks: vec![at],
    }
}

fn counter_text(s: &Session) -> String {
    let node = s.find("counter").unwrap();
    s.project().stage.get(node).unwrap().state.text.clone().unwrap_or_default()
}

fn clone_count(s: &Session) -> usize {
    let project = s.project();
    project.stage.iter().filter(|(_, o)| o.is_clone()).count()
}

/// Test the spawn and reset buttons.
///
/// Validates:
/// - Each spawn click clones the star and bumps the counter
/// - Clones fly on their own once spawned
/// - The reset click restores the counter and discards every clone
#[test]
fn spawn_then_reset_round_trip() {
    let mut s = Session::load(&demo("buttons.json"), &PlayerConfig::default()).unwrap();
    let spawn = Point::new(70.0, 280.0);
    let reset = Point::new(410.0, 280.0);

    s.tick(&TickInput::default());
    for _ in 0..2 {
        let report = s.tick(&click(spawn));
        assert!(report.faults.is_empty(), "{:?}", report.faults);
    }
    assert_eq!(counter_text(&s), "2");
    assert_eq!(clone_count(&s), 2);

    s.tick(&TickInput::default());
    {
        let project = s.project();
        let flying = project
            .stage
            .iter()
            .filter(|(_, o)| o.is_clone())
            .all(|(_, o)| o.state.transform.y < 280.0);
        assert!(flying);
    }

    let report = s.tick(&click(reset));
    assert!(report.faults.is_empty(), "{:?}", report.faults);
    assert_eq!(counter_text(&s), "0");
    assert_eq!(clone_count(&s), 0);
}

/// Test a document round trip through the live tree.
///
/// Validates:
/// - A loaded project exports to JSON that loads again with the same objects
#[test]
fn exported_project_reloads() {
    let s = Session::load(&demo("nested.json"), &PlayerConfig::default()).unwrap();
    let json = s.project().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["name"], "nested");

    let again = Session::load(&json, &PlayerConfig::default()).unwrap();
    assert_eq!(again.project().stage.len(), s.project().stage.len());
    assert!(again.find("wheel").is_some());
}
