//! # Scripting Module
//!
//! Rhai scripting API bindings for object hooks.
//!
//! ## Responsibilities
//! - **Engine Setup**: Registers all types and functions with Rhai.
//! - **Compilation**: Hook bodies are compiled once and cached on the object.
//! - **Execution**: Runs a hook with `obj`, `root`, `pointer_x`, `pointer_y` and `tick` in scope.
//!
//! ## Pattern
//! All bindings follow: `engine.register_fn("name", |obj, ...| { ... })`
//!
//! ## Module Structure
//! - `types`: Handle types (ObjectHandle)
//! - `api/`: Sub-modules for object properties, timeline control and lifecycle

mod api;
pub mod types;

pub use types::ObjectHandle;

use crate::types::Point;
use rhai::{Engine, Scope, AST};
use tracing::{debug, info};

/// Registers the object API into the provided Rhai `Engine`.
pub fn register_rhai_api(engine: &mut Engine) {
    api::register_all(engine);
}

/// Everything a hook sees while it runs.
pub struct HookContext {
    pub obj: ObjectHandle,
    pub root: ObjectHandle,
    pub pointer: Point,
    pub tick: u64,
}

/// Owns the script engine shared by every hook of a run.
pub struct ScriptHost {
    engine: Engine,
}

impl ScriptHost {
    /// `max_operations` bounds a single hook invocation; running past it is a fault.
    pub fn new(max_operations: u64) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(max_operations);
        engine.set_max_expr_depths(64, 32);
        engine.on_print(|text| info!(target: "script", "{}", text));
        engine.on_debug(|text, source, pos| {
            debug!(target: "script", source = source.unwrap_or(""), %pos, "{}", text)
        });
        register_rhai_api(&mut engine);
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn compile(&self, body: &str) -> Result<AST, String> {
        self.engine.compile(body).map_err(|e| e.to_string())
    }

    pub fn run(&self, ast: &AST, ctx: &HookContext) -> Result<(), String> {
        let mut scope = Scope::new();
        scope.push("obj", ctx.obj.clone());
        scope.push("root", ctx.root.clone());
        scope.push_constant("pointer_x", ctx.pointer.x as f64);
        scope.push_constant("pointer_y", ctx.pointer.y as f64);
        scope.push_constant("tick", ctx.tick as i64);
        self.engine
            .run_ast_with_scope(&mut scope, ast)
            .map_err(|e| e.to_string())
    }
}
