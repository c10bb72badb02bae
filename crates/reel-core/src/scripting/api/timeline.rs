//! # Timeline API
//!
//! Playhead control on symbol handles. Calling these on a shape raises a script
//! error.
//!
//! ## Responsibilities
//! - **Play state**: `play`, `stop`
//! - **Jumps**: `goto_and_play`, `goto_and_stop`, `next_frame`, `prev_frame`
//! - **Queries**: `playhead`, `frame_count`

use crate::errors::EngineError;
use crate::scene::Stage;
use crate::types::NodeId;
use rhai::Engine;
use tracing::debug;

use super::super::types::ObjectHandle;

fn set_playing(stage: &mut Stage, node: NodeId, playing: bool) -> Result<(), EngineError> {
    let obj = stage.object_mut(node)?;
    obj.as_symbol()?;
    obj.flags.is_playing = playing;
    Ok(())
}

/// Moves the playhead and holds it for the next tick. `play` optionally changes
/// the play state as well.
fn goto(stage: &mut Stage, node: NodeId, frame: i64, play: Option<bool>) -> Result<(), EngineError> {
    let obj = stage.object_mut(node)?;
    let symbol = obj.as_symbol_mut()?;
    symbol.jump_to(frame.clamp(1, u32::MAX as i64) as u32);
    let landed = symbol.playhead;
    if let Some(play) = play {
        obj.flags.is_playing = play;
    }
    debug!(node, frame = landed, "playhead jump");
    Ok(())
}

/// Steps one frame forward or back, wrapping when the symbol loops.
fn step(stage: &mut Stage, node: NodeId, forward: bool) -> Result<(), EngineError> {
    let obj = stage.object(node)?;
    let looping = obj.state.looping;
    let symbol = obj.as_symbol()?;
    let last = symbol.frame_count().max(1);
    let target = match (forward, symbol.playhead) {
        (true, p) if p >= last => {
            if looping {
                1
            } else {
                last
            }
        }
        (true, p) => p + 1,
        (false, p) if p <= 1 => {
            if looping {
                last
            } else {
                1
            }
        }
        (false, p) => p - 1,
    };
    goto(stage, node, target as i64, None)
}

/// Register timeline-related Rhai functions.
pub fn register(engine: &mut Engine) {
    engine.register_fn("play", |h: &mut ObjectHandle| {
        h.with_stage(|stage, node| set_playing(stage, node, true))
    });
    engine.register_fn("stop", |h: &mut ObjectHandle| {
        h.with_stage(|stage, node| set_playing(stage, node, false))
    });

    engine.register_fn("goto_and_play", |h: &mut ObjectHandle, frame: i64| {
        h.with_stage(|stage, node| goto(stage, node, frame, Some(true)))
    });
    engine.register_fn("goto_and_stop", |h: &mut ObjectHandle, frame: i64| {
        h.with_stage(|stage, node| goto(stage, node, frame, Some(false)))
    });
    engine.register_fn("next_frame", |h: &mut ObjectHandle| {
        h.with_stage(|stage, node| step(stage, node, true))
    });
    engine.register_fn("prev_frame", |h: &mut ObjectHandle| {
        h.with_stage(|stage, node| step(stage, node, false))
    });

    engine.register_get("playhead", |h: &mut ObjectHandle| {
        h.with_stage(|stage, node| Ok(stage.object(node)?.as_symbol()?.playhead as i64))
    });
    engine.register_fn("frame_count", |h: &mut ObjectHandle| {
        h.with_stage(|stage, node| Ok(stage.object(node)?.as_symbol()?.frame_count() as i64))
    });
}
