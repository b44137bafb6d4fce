//! The introspection type model consumed by the layout, ownership and
//! marshaling modules. Immutable data, loaded from JSONL model files or
//! built directly.

pub mod callable;
pub mod field;
pub mod registered;
pub mod types;
