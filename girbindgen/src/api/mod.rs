pub mod context;
pub mod source;
pub mod target;
