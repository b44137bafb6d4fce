//! The analyses behind generated bindings: struct layout, ownership
//! transfer, marshaling plans and destructor/copy resolution.

pub mod layout;
pub mod marshal;
pub mod ownership;
pub mod resolve;
