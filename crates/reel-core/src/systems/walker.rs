//! # Update Walker
//!
//! One tick of playback over the active subtree.
//!
//! ## Responsibilities
//! - **Playheads**: Advances every playing symbol on its own clock.
//! - **Frame flags**: Raises `just_entered_frame` / `on_new_frame` for the tick a playhead moved.
//! - **Tweens**: Applies the tween engine to tweened children of the current frame.
//! - **Pointer**: Refreshes `hovered_over` and hit-tests clicks.
//! - **Hooks**: Fires `onLoad`, `onUpdate`, `onClick` in that order.
//!
//! ## Ordering
//! Parents are fully processed (advance, tweens, hooks) before their children, and
//! siblings are visited in authored order. The project lock is never held while a
//! hook runs: scripts take it themselves through their handles.

use crate::errors::ScriptFault;
use crate::lifecycle::Baseline;
use crate::object::{ObjectKind, ScriptEvent, StageObject};
use crate::project::Project;
use crate::scene::Stage;
use crate::scripting::types::lock_project;
use crate::scripting::{HookContext, ObjectHandle, ScriptHost};
use crate::timeline::Step;
use crate::tween::{compute_tweens, TweenValues};
use crate::types::{NodeId, ObjectId, Point};
use rhai::AST;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument, warn};

/// Deepest nesting the walker descends into.
pub const MAX_WALK_DEPTH: usize = 100;

/// Input state gathered from the host for one tick.
#[derive(Clone, Debug, Default)]
pub struct TickInput {
    /// Pointer position in stage coordinates.
    pub pointer: Point,
    /// Clicks reported since the previous tick.
    pub clicks: Vec<Point>,
}

/// A hook that was invoked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FiredHook {
    pub node: NodeId,
    pub object: ObjectId,
    pub event: ScriptEvent,
}

/// What happened during one tick.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    pub fired: Vec<FiredHook>,
    pub faults: Vec<ScriptFault>,
}

impl TickReport {
    pub fn count(&self, event: ScriptEvent) -> usize {
        self.fired.iter().filter(|h| h.event == event).count()
    }

    pub fn has_fired(&self, node: NodeId, event: ScriptEvent) -> bool {
        self.fired.iter().any(|h| h.node == node && h.event == event)
    }
}

struct PendingHook {
    event: ScriptEvent,
    body: String,
    ast: Option<Arc<AST>>,
}

/// Runs one tick over the whole tree.
#[instrument(level = "debug", skip(live, baseline, scripts, input), fields(tick = tick))]
pub fn walk(
    live: &Arc<Mutex<Project>>,
    baseline: &Arc<Baseline>,
    scripts: &ScriptHost,
    tick: u64,
    input: &TickInput,
) -> TickReport {
    let (root, root_id) = {
        let project = lock_project(live);
        let root = project.stage.root();
        match project.stage.get(root) {
            Some(obj) => (root, obj.id),
            None => return TickReport { tick, ..TickReport::default() },
        }
    };
    let mut walker = Walker {
        live,
        baseline,
        scripts,
        tick,
        input,
        root: ObjectHandle {
            live: live.clone(),
            baseline: baseline.clone(),
            node: root,
            id: root_id,
        },
        report: TickReport {
            tick,
            ..TickReport::default()
        },
    };
    walker.visit(root, root_id, 0);
    walker.report
}

struct Walker<'a> {
    live: &'a Arc<Mutex<Project>>,
    baseline: &'a Arc<Baseline>,
    scripts: &'a ScriptHost,
    tick: u64,
    input: &'a TickInput,
    root: ObjectHandle,
    report: TickReport,
}

impl Walker<'_> {
    fn visit(&mut self, node: NodeId, expected: ObjectId, depth: usize) {
        if depth > MAX_WALK_DEPTH {
            warn!(node, "update walk exceeded {} levels, subtree skipped", MAX_WALK_DEPTH);
            return;
        }

        let hooks = {
            let mut project = lock_project(self.live);
            let project_rate = project.settings.frame_rate;
            let stage = &mut project.stage;
            if !is_current(stage, node, expected) {
                return;
            }
            if let Some(obj) = stage.get_mut(node) {
                advance_symbol(node, obj, project_rate);
            }
            apply_tweens(stage, node);
            let clicked = update_pointer_state(stage, node, self.input);
            match stage.get_mut(node) {
                Some(obj) => collect_hooks(obj, clicked),
                None => return,
            }
        };

        self.fire_hooks(node, expected, hooks);

        let children: Vec<(NodeId, ObjectId)> = {
            let project = lock_project(self.live);
            if !is_current(&project.stage, node, expected) {
                return;
            }
            project
                .stage
                .active_children(node)
                .into_iter()
                .filter_map(|c| project.stage.get(c).map(|o| (c, o.id)))
                .collect()
        };
        for (child, id) in children {
            self.visit(child, id, depth + 1);
        }
    }

    fn fire_hooks(&mut self, node: NodeId, expected: ObjectId, hooks: Vec<PendingHook>) {
        if hooks.is_empty() {
            return;
        }
        let ctx = HookContext {
            obj: ObjectHandle {
                live: self.live.clone(),
                baseline: self.baseline.clone(),
                node,
                id: expected,
            },
            root: self.root.clone(),
            pointer: self.input.pointer,
            tick: self.tick,
        };

        for hook in hooks {
            // an earlier hook may have deleted or discarded the object
            if !is_current(&lock_project(self.live).stage, node, expected) {
                break;
            }
            let ast = match hook.ast {
                Some(ast) => ast,
                None => match self.scripts.compile(&hook.body) {
                    Ok(ast) => {
                        let ast = Arc::new(ast);
                        let mut project = lock_project(self.live);
                        if let Some(obj) = project.stage.get_mut(node) {
                            obj.derived.script_cache.insert(hook.event, ast.clone());
                        }
                        ast
                    }
                    Err(message) => {
                        self.fault(node, expected, hook.event, format!("compile error: {message}"));
                        break;
                    }
                },
            };

            self.report.fired.push(FiredHook {
                node,
                object: expected,
                event: hook.event,
            });
            if let Err(message) = self.scripts.run(&ast, &ctx) {
                self.fault(node, expected, hook.event, message);
                break;
            }
        }
    }

    fn fault(&mut self, node: NodeId, object: ObjectId, event: ScriptEvent, message: String) {
        let fault = ScriptFault {
            object,
            node,
            event,
            message,
        };
        warn!(tick = self.tick, "{}", fault);
        self.report.faults.push(fault);
    }
}

fn is_current(stage: &Stage, node: NodeId, expected: ObjectId) -> bool {
    stage
        .get(node)
        .is_some_and(|o| o.id == expected && !o.is_deleted())
}

/// Clears last tick's frame flags, moves the playhead and raises the flags again if
/// the playhead now sits on a different position than last tick.
fn advance_symbol(node: NodeId, obj: &mut StageObject, project_rate: f32) {
    let looping = obj.state.looping;
    let rate = obj.state.frame_rate;
    let flags = &mut obj.flags;
    flags.just_entered_frame = false;
    flags.on_new_frame = false;

    let ObjectKind::Symbol(symbol) = &mut obj.kind else {
        return;
    };

    if symbol.hold_playhead {
        symbol.hold_playhead = false;
    } else if flags.is_playing {
        let steps = match rate {
            Some(rate) if project_rate > 0.0 => {
                let per_tick = rate / project_rate;
                if per_tick.is_finite() {
                    symbol.rate_accumulator += per_tick;
                    let whole = symbol.rate_accumulator.floor();
                    symbol.rate_accumulator -= whole;
                    whole as u64
                } else {
                    u64::MAX
                }
            }
            _ => 1,
        };
        match symbol.timeline.advance(symbol.playhead, steps, looping) {
            Step::Moved(position) => symbol.playhead = position,
            Step::Wrapped => symbol.playhead = 1,
            Step::Ended(last) => {
                symbol.playhead = last;
                flags.is_playing = false;
                debug!(node, playhead = last, "non-looping symbol reached its end");
            }
        }
    }

    if symbol.last_seen_playhead != Some(symbol.playhead) {
        flags.just_entered_frame = true;
        flags.on_new_frame = true;
        debug!(node, playhead = symbol.playhead, "entered frame");
    }
    symbol.last_seen_playhead = Some(symbol.playhead);
}

/// Writes tweened transforms into the children of the current frame of `node`.
fn apply_tweens(stage: &mut Stage, node: NodeId) {
    let updates: Vec<(NodeId, TweenValues)> = {
        let Some(symbol) = stage.get(node).and_then(|o| o.as_symbol().ok()) else {
            return;
        };
        let (Some(frame), Some(local)) = (
            symbol.timeline.frame_at(symbol.playhead),
            symbol.timeline.local_position(symbol.playhead),
        ) else {
            return;
        };
        compute_tweens(frame, local)
            .into_iter()
            .filter_map(|(uid, values)| {
                frame
                    .objects
                    .iter()
                    .copied()
                    .find(|&c| stage.get(c).is_some_and(|o| o.uid == uid && !o.is_clone()))
                    .map(|c| (c, values))
            })
            .collect()
    };
    for (child, values) in updates {
        if let Some(obj) = stage.get_mut(child) {
            values.apply_to(&mut obj.state.transform);
        }
    }
}

/// Refreshes `hovered_over` and reports whether any click of this tick hit `node`.
fn update_pointer_state(stage: &mut Stage, node: NodeId, input: &TickInput) -> bool {
    let hovered = stage.hit_test(node, input.pointer);
    let clicked = input.clicks.iter().any(|&p| stage.hit_test(node, p));
    if let Some(obj) = stage.get_mut(node) {
        obj.flags.hovered_over = hovered;
    }
    clicked
}

/// Picks the hooks due this tick, in firing order. `onLoad` is marked as ran as
/// soon as it is scheduled, so a fault does not make it fire again.
fn collect_hooks(obj: &mut StageObject, clicked: bool) -> Vec<PendingHook> {
    let mut hooks = Vec::new();
    for event in ScriptEvent::ORDER {
        let due = match event {
            ScriptEvent::Load => {
                let due = !obj.flags.on_load_script_ran;
                obj.flags.on_load_script_ran = true;
                due
            }
            ScriptEvent::Update => true,
            ScriptEvent::Click => clicked,
        };
        if !due {
            continue;
        }
        if let Some(body) = obj.scripts.get(event) {
            hooks.push(PendingHook {
                event,
                body: body.to_string(),
                ast: obj.derived.script_cache.get(&event).cloned(),
            });
        }
    }
    hooks
}
