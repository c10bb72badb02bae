//! Lifecycle Tests
//!
//! Tests for clone, soft-delete and reset-to-initial through a session.

use reel_core::{PlayerConfig, ResetOutcome, Session, TickInput};

const DOC: &str = r#"{
    "root": { "kind": "symbol", "name": "root", "frames": [ { "objects": [
        { "kind": "shape", "name": "box", "transform": { "x": 0, "y": 0 }, "size": { "width": 10, "height": 10 } },
        { "kind": "symbol", "name": "group", "frames": [ { "objects": [
            { "kind": "symbol", "name": "inner", "frames": [ { "objects": [
                { "kind": "shape", "name": "leaf" }
            ] } ] }
        ] } ] }
    ] } ] }
}"#;

fn session() -> Session {
    Session::load(DOC, &PlayerConfig::default()).expect("project should load")
}

/// Test the reset scenario.
///
/// Validates:
/// - {x:5, y:5} resets to the baseline {x:0, y:0}
/// - A second reset reports no changes
#[test]
fn reset_restores_baseline_and_is_idempotent() {
    let s = session();
    let b = s.find("box").unwrap();
    {
        let mut project = s.project();
        let t = &mut project.stage.get_mut(b).unwrap().state.transform;
        t.x = 5.0;
        t.y = 5.0;
    }

    let first = s.reset_object(b).unwrap();
    assert_eq!(first.changed(), ["transform"]);
    {
        let project = s.project();
        let t = project.stage.get(b).unwrap().state.transform;
        assert_eq!((t.x, t.y), (0.0, 0.0));
    }

    assert_eq!(s.reset_object(b).unwrap(), ResetOutcome::Reset { changed: vec![] });
}

/// Test that reset restarts runtime state.
///
/// Validates:
/// - Flags return to the fresh-start state
/// - Playheads of reset symbols return to frame 1
#[test]
fn reset_forces_fresh_start_flags() {
    let mut s = session();
    for _ in 0..3 {
        s.tick(&TickInput::default());
    }
    let group = s.find("group").unwrap();
    {
        let mut project = s.project();
        let obj = project.stage.get_mut(group).unwrap();
        obj.flags.is_playing = false;
        obj.flags.hovered_over = true;
        obj.flags.on_load_script_ran = true;
    }

    s.reset_object(group).unwrap();
    let project = s.project();
    let obj = project.stage.get(group).unwrap();
    assert!(obj.flags.is_playing);
    assert!(!obj.flags.hovered_over);
    assert!(obj.flags.just_entered_frame);
    assert!(obj.flags.on_new_frame);
    assert!(!obj.flags.on_load_script_ran);
    assert_eq!(obj.as_symbol().unwrap().playhead, 1);
}

/// Test clones.
///
/// Validates:
/// - A clone reports `is_clone`
/// - The clone has a fresh id but the same universal id
/// - Reset on a clone detaches and discards it
#[test]
fn clones_are_marked_and_never_reset_in_place() {
    let s = session();
    let b = s.find("box").unwrap();
    let c = s.clone_object(b).unwrap();
    {
        let project = s.project();
        let (orig, copy) = (project.stage.get(b).unwrap(), project.stage.get(c).unwrap());
        assert!(copy.is_clone());
        assert!(!orig.is_clone());
        assert_eq!(copy.uid, orig.uid);
        assert_ne!(copy.id, orig.id);
        assert_eq!(copy.parent(), orig.parent());
    }
    assert!(s.active_objects().contains(&c));

    assert_eq!(s.reset_object(c).unwrap(), ResetOutcome::Discarded);
    assert!(s.project().stage.get(c).is_none());
    assert!(!s.active_objects().contains(&c));
}

/// Test cloning a subtree.
///
/// Validates:
/// - Descendants are copied and marked as clones
/// - The source subtree is left untouched
#[test]
fn cloning_a_symbol_copies_its_subtree() {
    let s = session();
    let group = s.find("group").unwrap();
    let copy = s.clone_object(group).unwrap();
    let project = s.project();
    let copied_inner = project.stage.all_children(copy)[0];
    let copied_leaf = project.stage.all_children(copied_inner)[0];
    assert!(project.stage.get(copied_leaf).unwrap().is_clone());
    assert_eq!(project.stage.get(copied_leaf).unwrap().name(), Some("leaf"));
    assert_eq!(project.stage.all_children(group).len(), 1);
}

/// Test soft deletion at depth.
///
/// Validates:
/// - A deleted symbol and everything below it leave the active subtree
/// - The deleted object stays reachable through navigation
/// - Its transform is not moved anywhere
#[test]
fn deleted_objects_leave_active_subtree_but_stay_reachable() {
    let s = session();
    let (group, inner, leaf) = (
        s.find("group").unwrap(),
        s.find("inner").unwrap(),
        s.find("leaf").unwrap(),
    );
    assert!(s.active_objects().contains(&leaf));

    assert!(s.delete_object(inner).unwrap());
    let active = s.active_objects();
    assert!(active.contains(&group));
    assert!(!active.contains(&inner));
    assert!(!active.contains(&leaf));

    let project = s.project();
    assert_eq!(project.stage.child_by_name(group, "inner"), Some(inner));
    assert_eq!(project.stage.get(leaf).unwrap().parent(), Some(inner));
    assert_eq!(project.stage.get(inner).unwrap().state.transform.x, 0.0);
    assert!(!project.stage.is_active(leaf));
}

/// Test restarting a whole project.
///
/// Validates:
/// - Deleted objects come back
/// - Clones anywhere in the tree are discarded
#[test]
fn restart_returns_the_whole_tree_to_its_initial_state() {
    let s = session();
    let (b, leaf) = (s.find("box").unwrap(), s.find("leaf").unwrap());
    let clone = s.clone_object(leaf).unwrap();
    s.delete_object(b).unwrap();

    s.restart().unwrap();
    let active = s.active_objects();
    assert!(active.contains(&b));
    assert!(!active.contains(&clone));
    assert!(s.project().stage.get(clone).is_none());
}
