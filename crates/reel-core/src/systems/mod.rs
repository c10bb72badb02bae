pub mod walker;

pub use walker::{FiredHook, TickInput, TickReport};
