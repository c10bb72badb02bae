//! Playback Tests
//!
//! Tests for the update walker: playhead stepping, nested clocks, tweens and
//! evaluation order.

use reel_core::{PlayerConfig, ScriptEvent, Session, TickInput};

fn session(json: &str) -> Session {
    Session::load(json, &PlayerConfig::default()).expect("project should load")
}

fn playhead(session: &Session, name: &str) -> u32 {
    let node = session.find(name).expect("object exists");
    session
        .project()
        .stage
        .get(node)
        .unwrap()
        .as_symbol()
        .unwrap()
        .playhead
}

const THREE_FRAMES: &str = r#"{
    "frameRate": 12,
    "root": { "kind": "symbol", "name": "root", "frames": [ { "objects": [
        { "kind": "symbol", "name": "clip", "frames": [ {}, {}, {} ] }
    ] } ] }
}"#;

/// Test the wrap-around scenario.
///
/// Validates:
/// - A 3-frame symbol on frame 3 advances to frame 1
/// - The move raises the one-tick frame flags
#[test]
fn three_frame_symbol_wraps_to_start() {
    let mut s = session(THREE_FRAMES);
    let input = TickInput::default();
    s.tick(&input);

    let clip = s.find("clip").unwrap();
    {
        let mut project = s.project();
        let symbol = project.stage.get_mut(clip).unwrap().as_symbol_mut().unwrap();
        symbol.playhead = 3;
        symbol.last_seen_playhead = Some(3);
    }
    s.tick(&input);
    assert_eq!(playhead(&s, "clip"), 1);

    let project = s.project();
    let flags = project.stage.get(clip).unwrap().flags;
    assert!(flags.just_entered_frame);
    assert!(flags.on_new_frame);
}

/// Test the looping invariant.
///
/// Validates:
/// - Advancing `frame_count` times returns the playhead to where it started
/// - Frame flags are cleared on a tick where the playhead did not move
#[test]
fn advancing_frame_count_times_returns_to_start() {
    let mut s = session(THREE_FRAMES);
    let input = TickInput::default();
    s.tick(&input);
    s.tick(&input);
    let start = playhead(&s, "clip");
    for _ in 0..3 {
        s.tick(&input);
    }
    assert_eq!(playhead(&s, "clip"), start);

    let clip = s.find("clip").unwrap();
    s.project()
        .stage
        .get_mut(clip)
        .unwrap()
        .flags
        .is_playing = false;
    s.tick(&input);
    let project = s.project();
    assert!(!project.stage.get(clip).unwrap().flags.just_entered_frame);
}

/// Test independent nested clocks.
///
/// Validates:
/// - A stopped parent does not stop its playing child
/// - A child with a rate override advances at its own pace
#[test]
fn nested_symbols_keep_their_own_playheads() {
    let json = r#"{
        "frameRate": 12,
        "root": { "kind": "symbol", "name": "root", "frames": [ { "objects": [
            { "kind": "symbol", "name": "parent", "isPlaying": false, "frames": [
                { "objects": [
                    { "kind": "symbol", "name": "fast", "frames": [ {}, {}, {}, {} ] },
                    { "kind": "symbol", "name": "slow", "frameRate": 6, "frames": [ {}, {}, {}, {} ] }
                ] },
                {}
            ] }
        ] } ] }
    }"#;
    let mut s = session(json);
    let input = TickInput::default();
    for _ in 0..5 {
        s.tick(&input);
    }
    assert_eq!(playhead(&s, "parent"), 1);
    assert_eq!(playhead(&s, "fast"), 1); // 1 -> 2 -> 3 -> 4 -> wrap
    assert_eq!(playhead(&s, "slow"), 3);
}

/// Test non-looping symbols.
///
/// Validates:
/// - The playhead clamps at the last frame
/// - The symbol stops playing there
#[test]
fn non_looping_symbol_clamps_and_stops() {
    let json = r#"{ "root": { "kind": "symbol", "frames": [ { "objects": [
        { "kind": "symbol", "name": "once", "looping": false, "frames": [ { "length": 2 }, {} ] }
    ] } ] } }"#;
    let mut s = session(json);
    for _ in 0..6 {
        s.tick(&TickInput::default());
    }
    assert_eq!(playhead(&s, "once"), 3);
    let once = s.find("once").unwrap();
    assert!(!s.project().stage.get(once).unwrap().flags.is_playing);
}

/// Test tween application.
///
/// Validates:
/// - Tweened children follow the frame-local position
/// - Values are recomputed, not accumulated, across loops
#[test]
fn tweens_drive_children_from_authored_keys() {
    let json = r#"{ "frameRate": 12, "root": { "kind": "symbol", "frames": [ {
        "length": 5,
        "objects": [ { "kind": "shape", "name": "mover", "uuid": "6f1c2c1e-0000-4000-8000-000000000001" } ],
        "tweens": [ { "target": "6f1c2c1e-0000-4000-8000-000000000001", "keys": [
            { "position": 0, "values": { "x": 0 } },
            { "position": 4, "values": { "x": 100 } }
        ] } ]
    } ] } }"#;
    let mut s = session(json);
    let mover = s.find("mover").unwrap();
    let x = |s: &Session| s.project().stage.get(mover).unwrap().state.transform.x;

    let mut seen = Vec::new();
    for _ in 0..6 {
        s.tick(&TickInput::default());
        seen.push(x(&s));
    }
    assert_eq!(seen, vec![0.0, 25.0, 50.0, 75.0, 100.0, 0.0]);
}

/// Test evaluation order.
///
/// Validates:
/// - A parent's hooks run before its children's
/// - Siblings run in authored order
#[test]
fn parents_before_children_and_siblings_in_order() {
    let json = r#"{ "root": { "kind": "symbol", "frames": [ { "objects": [
        { "kind": "symbol", "name": "outer", "scripts": { "onUpdate": "1;" }, "frames": [ { "objects": [
            { "kind": "shape", "name": "first", "scripts": { "onUpdate": "2;" } },
            { "kind": "shape", "name": "second", "scripts": { "onUpdate": "3;" } }
        ] } ] },
        { "kind": "shape", "name": "last", "scripts": { "onUpdate": "4;" } }
    ] } ] } }"#;
    let mut s = session(json);
    let report = s.tick(&TickInput::default());
    let order: Vec<_> = report
        .fired
        .iter()
        .filter(|h| h.event == ScriptEvent::Update)
        .map(|h| h.node)
        .collect();
    let expected: Vec<_> = ["outer", "first", "second", "last"]
        .iter()
        .map(|n| s.find(n).unwrap())
        .collect();
    assert_eq!(order, expected);
}

/// Test frame-scoped children.
///
/// Validates:
/// - Only objects of the current frame are active
/// - Positions without a frame render as an empty stage
#[test]
fn active_objects_follow_the_current_frame() {
    let json = r#"{ "root": { "kind": "symbol", "frames": [
        { "objects": [ { "kind": "shape", "name": "a" } ] },
        { "objects": [ { "kind": "shape", "name": "b" } ] }
    ] } }"#;
    let mut s = session(json);
    let (a, b) = (s.find("a").unwrap(), s.find("b").unwrap());

    s.tick(&TickInput::default());
    assert_eq!(s.active_objects(), vec![a]);
    s.tick(&TickInput::default());
    assert_eq!(s.active_objects(), vec![b]);

    let root = s.root();
    s.project().stage.get_mut(root).unwrap().as_symbol_mut().unwrap().playhead = 9;
    assert!(s.active_objects().is_empty());
}
