//! # girbindgen
//!
//! The analysis core of a GObject-Introspection binding generator: native
//! memory layouts, ownership transfer classification and marshaling plans,
//! computed from introspection data before a single line of binding code
//! is emitted.
//!
//! ## Problem
//!
//! A binding generator that wraps a GObject C library has to answer three
//! questions for every type and callable it wraps, and the introspection
//! data answers none of them directly:
//!
//! - At which byte offset does each struct field live on the target
//!   platform, once C padding, bitfield packing and the platform-dependent
//!   width of `long` are accounted for?
//! - Who frees a value after it crosses the boundary: does the wrapper
//!   retain it, take ownership and run a destructor, or copy it first?
//! - How does each parameter and return value convert between its native
//!   representation and the wrapped one, including NULL handling, hidden
//!   parameters and container element transfer?
//!
//! Answering these ad hoc inside an emitter couples the hard semantics to
//! one output language and makes them untestable.
//!
//! ## Solution
//!
//! `girbindgen` separates the analyses from emission. A [`Source`] loads
//! namespace model files into a [`NamespaceContext`]; the [`layout`],
//! [`ownership`], [`marshal`] and [`resolve`] modules then compute plain,
//! serializable results an emitter for any language can consume:
//!
//! - [`layout::compute_layouts`] turns a field container into byte-exact
//!   entries, split into a 32/64-bit pair when `long` is involved.
//! - [`ownership::classify`] maps one use-site of a value to exactly one
//!   lifetime action.
//! - [`marshal::plan_callable`] plans a whole callable: per-parameter
//!   conversion recipes, hidden parameter roles and null checks.
//! - [`resolve::free_function`] and [`resolve::copy_function`] find the
//!   destructor and copy operation a type's lifetime management uses.
//!
//! ## Usage example
//!
//! ```
//! use girbindgen::layout::compute_layouts;
//! use girbindgen::model::{
//!     AnyType, ContainerKind, FieldContainer, Member, Record, RegisteredType,
//! };
//! use girbindgen::{NamespaceContext, Target};
//!
//! let rectangle = Record {
//!     name: "Rectangle".to_owned(),
//!     fields: FieldContainer::new(
//!         ContainerKind::Struct,
//!         Some("GdkRectangle"),
//!         vec![
//!             Member::field("x", AnyType::named("gint")),
//!             Member::field("y", AnyType::named("gint")),
//!             Member::field("width", AnyType::named("gint")),
//!             Member::field("height", AnyType::named("gint")),
//!         ],
//!     ),
//!     get_type: None,
//!     pointer: false,
//!     foreign: false,
//!     copy_function: None,
//!     free_function: None,
//!     methods: Vec::new(),
//! };
//!
//! let ctx = NamespaceContext::builder()
//!     .target(Target::parse("x86_64-unknown-linux-gnu").unwrap())
//!     .register("Gdk", RegisteredType::Record(rectangle))
//!     .build();
//!
//! let res = ctx.resolver("Gdk");
//! let Some(RegisteredType::Record(rec)) = res.lookup("Rectangle") else {
//!     unreachable!()
//! };
//! let layouts = compute_layouts(&rec.fields, &res).unwrap();
//! let layout = layouts.for_target(ctx.target());
//! assert_eq!((layout.size, layout.alignment), (16, 4));
//! assert_eq!(layout.offset_of("width"), Some(8));
//! ```
//!
//! The same context then feeds ownership classification and marshaling;
//! see [`ownership::classify`] and [`marshal::plan_callable`].

pub(crate) mod api;
pub(crate) mod codegen;
pub(crate) mod error;
pub(crate) mod gir;
pub(crate) mod utils;

pub use crate::api::context::{Builder, Namespace, NamespaceContext, Resolver};
pub use crate::api::source::{ModelRecord, Source};
pub use crate::api::target::Target;
pub use crate::error::Error;

/// The introspection type model: namespaces register these, the analyses
/// read them.
pub mod model {
    pub use crate::gir::callable::{
        scope_class, Callable, CallableKind, Direction, Parameter, Property, ReturnValue,
        ScopeClass, TransferOwnership,
    };
    pub use crate::gir::field::{ContainerKind, Field, FieldContainer, Member};
    pub use crate::gir::registered::{
        Alias, Bitfield, Boxed, Callback, Class, EnumMember, Enumeration, Interface, Record,
        RegisteredType, Union,
    };
    pub use crate::gir::types::{AnyType, ArrayType, Primitive, TypeRef};
}

/// Native memory layout computation for structs, unions and bitfields.
pub mod layout {
    pub use crate::codegen::layout::{
        compute_layout, compute_layouts, contains_long, has_opaque_members, GroupLayout,
        LayoutEntry, LayoutKind, Layouts,
    };
}

/// Ownership transfer classification: who frees what, decided statically.
pub mod ownership {
    pub use crate::codegen::ownership::{
        classify, Caveat, LifetimeAction, OwnershipDecision, Role, ValueUse,
    };
}

/// Marshaling plans: type classification, conversion recipes and whole
/// callable planning.
pub mod marshal {
    pub use crate::codegen::marshal::{
        classify_type, needs_null_check, plan, plan_callable, CallablePlan, HiddenRole,
        LengthSource, MarshalPlan, NativeValue, ParamPlan, Recipe, TypeClass, ValueDirection,
        WrappedValue,
    };
}

/// Destructor and copy-function resolution for aggregate types.
pub mod resolve {
    pub use crate::codegen::resolve::{copy_function, free_function, CopyRef, DestructorRef};
}

#[doc(hidden)]
pub use crate::utils::jsonl::{read_model_file, write_model_file};
