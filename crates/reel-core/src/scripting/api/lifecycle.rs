//! # Lifecycle API
//!
//! Clone, delete and reset for Rhai scripts, plus small utilities.
//!
//! ## Responsibilities
//! - **Clone**: `clone_object`
//! - **Delete**: `delete_object`, `obj.delete()`
//! - **Reset**: `reset_object`, `obj.reset()`
//! - **Randomness**: `rand_float`

use crate::lifecycle;
use rhai::{Engine, EvalAltResult};

use super::super::types::ObjectHandle;

fn clone_handle(h: &mut ObjectHandle) -> Result<ObjectHandle, Box<EvalAltResult>> {
    let copy = h.with_stage(lifecycle::clone_object)?;
    h.sibling(copy)
        .ok_or_else(|| format!("clone of node {} vanished", h.node).into())
}

fn delete(h: &mut ObjectHandle) -> Result<bool, Box<EvalAltResult>> {
    h.with_stage(lifecycle::soft_delete)
}

fn reset(h: &mut ObjectHandle) -> Result<(), Box<EvalAltResult>> {
    let baseline = h.baseline.clone();
    h.with_stage(|stage, node| lifecycle::reset_object(stage, &baseline, node))?;
    Ok(())
}

/// Uniform random number in `min..max`, or `min` for an empty range.
fn rand_float(min: f64, max: f64) -> Result<f64, Box<EvalAltResult>> {
    use rand::Rng;
    if !min.is_finite() || !max.is_finite() || !(max - min).is_finite() {
        return Err(format!("rand_float range {min}..{max} is not finite").into());
    }
    if min < max {
        Ok(rand::thread_rng().gen_range(min..max))
    } else {
        Ok(min)
    }
}

/// Register lifecycle-related Rhai functions.
pub fn register(engine: &mut Engine) {
    // Randomness
    engine.register_fn("rand_float", rand_float);

    engine.register_fn("clone_object", clone_handle);

    engine.register_fn("delete_object", delete);
    engine.register_fn("delete", delete);

    engine.register_fn("reset_object", reset);
    engine.register_fn("reset", reset);
}
