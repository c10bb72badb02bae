//! # Object API
//!
//! Property access on `Object` handles.
//!
//! ## Responsibilities
//! - **Transform**: `x`, `y`, `scale_x`, `scale_y`, `rotation`, `alpha`, flips
//! - **Content**: `width`, `height`, `name`, `text`
//! - **Flags**: read-only runtime flags (`is_playing`, `hovered_over`, ...)
//! - **Navigation**: `parent()`, `child(name)`, `children()`

use rhai::{Array, Dynamic, Engine};

use super::super::types::ObjectHandle;

/// Registers a float property with both float and integer setters, so scripts may
/// write `obj.x = 5` as well as `obj.x = 5.0`.
macro_rules! float_property {
    ($engine:expr, $name:literal, |$o:ident| $field:expr) => {
        $engine.register_get($name, |h: &mut ObjectHandle| h.read(|$o| $field as f64));
        $engine.register_set($name, |h: &mut ObjectHandle, v: f64| {
            h.write(|$o| $field = v as f32)
        });
        $engine.register_set($name, |h: &mut ObjectHandle, v: i64| {
            h.write(|$o| $field = v as f32)
        });
    };
}

macro_rules! flag_getter {
    ($engine:expr, $name:literal, |$o:ident| $field:expr) => {
        $engine.register_get($name, |h: &mut ObjectHandle| h.read(|$o| $field));
    };
}

/// Register object property Rhai functions.
pub fn register(engine: &mut Engine) {
    engine.register_type_with_name::<ObjectHandle>("Object");

    // ========== TRANSFORM ==========
    float_property!(engine, "x", |o| o.state.transform.x);
    float_property!(engine, "y", |o| o.state.transform.y);
    float_property!(engine, "scale_x", |o| o.state.transform.scale_x);
    float_property!(engine, "scale_y", |o| o.state.transform.scale_y);
    float_property!(engine, "rotation", |o| o.state.transform.rotation);
    float_property!(engine, "alpha", |o| o.state.transform.alpha);
    float_property!(engine, "width", |o| o.state.size.width);
    float_property!(engine, "height", |o| o.state.size.height);

    engine.register_get_set(
        "flip_x",
        |h: &mut ObjectHandle| h.read(|o| o.state.transform.flip_x),
        |h: &mut ObjectHandle, v: bool| h.write(|o| o.state.transform.flip_x = v),
    );
    engine.register_get_set(
        "flip_y",
        |h: &mut ObjectHandle| h.read(|o| o.state.transform.flip_y),
        |h: &mut ObjectHandle, v: bool| h.write(|o| o.state.transform.flip_y = v),
    );

    // ========== CONTENT ==========
    engine.register_get_set(
        "name",
        |h: &mut ObjectHandle| h.read(|o| o.name().unwrap_or_default().to_string()),
        |h: &mut ObjectHandle, v: String| h.write(|o| o.state.name = Some(v)),
    );
    engine.register_get_set(
        "text",
        |h: &mut ObjectHandle| h.read(|o| o.state.text.clone().unwrap_or_default()),
        |h: &mut ObjectHandle, v: String| h.write(|o| o.state.text = Some(v)),
    );

    // ========== IDENTITY & FLAGS ==========
    engine.register_get("id", |h: &mut ObjectHandle| h.id.0 as i64);
    engine.register_get("uuid", |h: &mut ObjectHandle| h.read(|o| o.uid.to_string()));
    flag_getter!(engine, "is_playing", |o| o.flags.is_playing);
    flag_getter!(engine, "just_entered_frame", |o| o.flags.just_entered_frame);
    flag_getter!(engine, "on_new_frame", |o| o.flags.on_new_frame);
    flag_getter!(engine, "on_load_script_ran", |o| o.flags.on_load_script_ran);
    flag_getter!(engine, "hovered_over", |o| o.flags.hovered_over);
    flag_getter!(engine, "deleted", |o| o.state.deleted);
    engine.register_fn("is_clone", |h: &mut ObjectHandle| h.read(|o| o.is_clone()));

    // ========== NAVIGATION ==========
    engine.register_fn("parent", |h: &mut ObjectHandle| {
        let parent = h.read(|o| o.parent())?;
        Ok::<_, Box<rhai::EvalAltResult>>(
            parent
                .and_then(|p| h.sibling(p))
                .map(Dynamic::from)
                .unwrap_or(Dynamic::UNIT),
        )
    });

    engine.register_fn("child", |h: &mut ObjectHandle, name: &str| {
        let found = h.with_stage(|stage, node| Ok(stage.child_by_name(node, name)))?;
        Ok::<_, Box<rhai::EvalAltResult>>(
            found
                .and_then(|c| h.sibling(c))
                .map(Dynamic::from)
                .unwrap_or(Dynamic::UNIT),
        )
    });

    engine.register_fn("children", |h: &mut ObjectHandle| {
        let ids = h.with_stage(|stage, node| Ok(stage.active_children(node)))?;
        Ok::<_, Box<rhai::EvalAltResult>>(
            ids.into_iter()
                .filter_map(|c| h.sibling(c))
                .map(Dynamic::from)
                .collect::<Array>(),
        )
    });

    engine.register_fn("to_string", |h: &mut ObjectHandle| {
        h.read(|o| format!("Object({} {})", o.name().unwrap_or("<unnamed>"), o.id))
            .unwrap_or_else(|_| format!("Object(<gone> node {})", h.node))
    });
}
