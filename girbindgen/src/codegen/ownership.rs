//! Ownership classification: who frees a value that crossed the boundary.
//!
//! Every use-site of a value (a parameter, return value, field or
//! property, with its transfer annotation and direction) maps to exactly
//! one lifetime action. The rules run in priority order and the first
//! match wins; classification is total and the same inputs always give
//! the same decision.

use serde::{Deserialize, Serialize};

use crate::api::context::Resolver;
use crate::codegen::layout;
use crate::codegen::resolve::{self, CopyRef, DestructorRef};
use crate::gir::callable::{Callable, Direction, Parameter, Property, TransferOwnership};
use crate::gir::field::FieldContainer;
use crate::gir::registered::RegisteredType;
use crate::gir::types::{AnyType, TypeRef};

/// Where a value appears in the surface being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parameter,
    InstanceParameter,
    Return,
    Field,
    Property,
}

/// One use-site of a value, as handed to [`classify`].
#[derive(Debug, Clone, Copy)]
pub struct ValueUse<'a> {
    pub role: Role,
    pub direction: Direction,
    pub transfer: TransferOwnership,
    pub ty: &'a AnyType,
    pub nullable: bool,
    pub caller_allocates: bool,
    /// Name of the enclosing callable when classifying its return value;
    /// suppresses the retain inside `ref`/`ref_sink` and the copy inside
    /// the type's own copy method.
    pub callable: Option<&'a str>,
}

impl<'a> ValueUse<'a> {
    pub fn parameter(param: &'a Parameter) -> Self {
        Self {
            role: if param.instance {
                Role::InstanceParameter
            } else {
                Role::Parameter
            },
            direction: param.direction,
            transfer: param.transfer,
            ty: &param.ty,
            nullable: param.nullable,
            caller_allocates: param.caller_allocates,
            callable: None,
        }
    }

    pub fn return_of(callable: &'a Callable) -> Self {
        Self {
            role: Role::Return,
            direction: Direction::In,
            transfer: callable.return_value.transfer,
            ty: &callable.return_value.ty,
            nullable: callable.return_value.nullable,
            caller_allocates: false,
            callable: Some(&callable.name),
        }
    }

    /// A struct field read; field values are always borrowed.
    pub fn field(ty: &'a AnyType) -> Self {
        Self {
            role: Role::Field,
            direction: Direction::In,
            transfer: TransferOwnership::None,
            ty,
            nullable: true,
            caller_allocates: false,
            callable: None,
        }
    }

    pub fn property(property: &'a Property) -> Self {
        Self {
            role: Role::Property,
            direction: Direction::In,
            transfer: property.transfer,
            ty: &property.ty,
            nullable: true,
            caller_allocates: false,
            callable: None,
        }
    }

    /// The wrapper receives this value from native code.
    fn is_output(&self) -> bool {
        match self.role {
            Role::Return | Role::Field | Role::Property => true,
            Role::Parameter | Role::InstanceParameter => self.direction == Direction::Out,
        }
    }

    /// The wrapper hands this value to native code.
    fn is_input_parameter(&self) -> bool {
        matches!(self.role, Role::Parameter | Role::InstanceParameter)
            && self.direction != Direction::Out
    }
}

/// What the generated wrapper does about a value's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifetimeAction {
    /// No cleanup beyond the call-scoped scratch arena.
    Nothing,
    /// Take one extra reference before handing the value over or keeping
    /// a borrowed one. `sink` marks floating-reference classes whose
    /// retain must also sink the floating reference.
    Retain { sink: bool },
    /// Own the value and run the destructor exactly once on disposal.
    /// `None` means ownership is taken but no destructor is known.
    TakeOwnership(Option<DestructorRef>),
    /// Duplicate a borrowed value through a native copy function.
    CopyWithFunction(CopyRef),
    /// Duplicate a borrowed value by allocating and copying this many
    /// bytes of its known layout.
    CopyBytes(u32),
}

/// A documented limitation attached to a decision, never a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Caveat {
    /// A borrowed aggregate has no copy mechanism; the value is used
    /// uncopied and may dangle if the producer frees its copy.
    UnresolvableCopy { type_name: String },
}

/// The classifier's verdict for one use-site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipDecision {
    pub action: LifetimeAction,
    /// Transfer tag propagated to element marshaling for list and map
    /// shapes; container transfer moves the structure only, so it inverts
    /// to `None` for the elements.
    pub element_transfer: Option<TransferOwnership>,
    pub caveat: Option<Caveat>,
}

impl OwnershipDecision {
    fn nothing() -> Self {
        Self::of(LifetimeAction::Nothing)
    }

    fn of(action: LifetimeAction) -> Self {
        Self {
            action,
            element_transfer: None,
            caveat: None,
        }
    }
}

/// List and hash-table shapes marshaled through native cursor structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContainerShape {
    List,
    SList,
    Map,
}

/// Recognize the GLib container records by C type or qualified name.
pub(crate) fn container_shape(tref: &TypeRef, res: &Resolver) -> Option<ContainerShape> {
    if let Some(c_type) = tref.c_type.as_deref() {
        match c_type.trim_end_matches('*') {
            "GList" => return Some(ContainerShape::List),
            "GSList" => return Some(ContainerShape::SList),
            "GHashTable" => return Some(ContainerShape::Map),
            _ => {}
        }
    }
    let (ns, bare) = match tref.name.split_once('.') {
        Some((ns, bare)) => (ns, bare),
        None => (res.namespace(), tref.name.as_str()),
    };
    if ns != "GLib" {
        return None;
    }
    match bare {
        "List" => Some(ContainerShape::List),
        "SList" => Some(ContainerShape::SList),
        "HashTable" => Some(ContainerShape::Map),
        _ => None,
    }
}

/// The records that carry raw byte payloads and go through dedicated
/// byte-buffer recipes instead of take-ownership.
fn is_byte_payload(ty: &RegisteredType) -> bool {
    matches!(ty.c_type(), Some("GBytes") | Some("GString"))
}

pub(crate) fn element_transfer(transfer: TransferOwnership) -> TransferOwnership {
    match transfer {
        TransferOwnership::Full => TransferOwnership::Full,
        TransferOwnership::Container | TransferOwnership::None => TransferOwnership::None,
    }
}

/// Classify one use-site. Total; never fails.
pub fn classify<'a>(use_site: &ValueUse<'a>, res: &Resolver<'a>) -> OwnershipDecision {
    let chased = res.chase(use_site.ty);
    let tref = chased.as_type();
    let registered = tref.and_then(|t| res.target_of(t));

    // Out and inout parameters backed by caller scratch memory need no
    // lifetime management of their own.
    if matches!(use_site.role, Role::Parameter | Role::InstanceParameter)
        && use_site.direction != Direction::In
    {
        if use_site.caller_allocates {
            return OwnershipDecision::nothing();
        }
        let scratch = tref.map(|t| t.primitive().is_some()).unwrap_or(false)
            || matches!(
                registered,
                Some(RegisteredType::Enumeration(_)) | Some(RegisteredType::Bitfield(_))
            );
        if scratch {
            return OwnershipDecision::nothing();
        }
    }

    let refcounted = registered.map(RegisteredType::is_refcounted).unwrap_or(false);
    // Floating-reference classes retain sink-style. The base classes that
    // define floating semantics are exempt; a plain ref suffices there.
    let sink = matches!(
        registered,
        Some(RegisteredType::Class(c)) if c.ref_sink
            && !matches!(c.c_type.as_deref(), Some("GObject") | Some("GInitiallyUnowned"))
    );

    // A borrowed refcounted value must be retained or the wrapper would
    // eventually drop a reference it never owned. The type's own ref
    // functions are exempt; their whole point is creating the reference.
    if refcounted
        && use_site.transfer == TransferOwnership::None
        && use_site.is_output()
        && !matches!(use_site.callable, Some("ref") | Some("ref_sink"))
    {
        return OwnershipDecision::of(LifetimeAction::Retain { sink });
    }

    if refcounted && use_site.transfer != TransferOwnership::None {
        // The callee consumes one reference of an input argument; the
        // caller's wrapper keeps its own alive by taking another first.
        if use_site.is_input_parameter() {
            return OwnershipDecision::of(LifetimeAction::Retain { sink });
        }
        // A handed-over reference is owned as-is; disposal drops it.
        if use_site.is_output() {
            return OwnershipDecision::of(LifetimeAction::TakeOwnership(Some(
                DestructorRef::Unref,
            )));
        }
    }

    if let Some(ty) = registered {
        let shaped = tref.and_then(|t| container_shape(t, res)).is_some();
        let managed_elsewhere = resolve::is_externally_managed(ty) || is_byte_payload(ty);
        if ty.is_aggregate() && !shaped && !managed_elsewhere {
            if use_site.transfer != TransferOwnership::None {
                return OwnershipDecision::of(LifetimeAction::TakeOwnership(
                    resolve::free_function(ty),
                ));
            }
            if use_site.is_output() {
                return classify_borrowed_aggregate(use_site, ty, res);
            }
        }
    }

    if let Some(tref) = tref {
        if container_shape(tref, res).is_some() {
            return OwnershipDecision {
                action: LifetimeAction::Nothing,
                element_transfer: Some(element_transfer(use_site.transfer)),
                caveat: None,
            };
        }
    }

    OwnershipDecision::nothing()
}

/// A borrowed aggregate coming back from native code: duplicate it so the
/// wrapper outlives the producer's copy. Copy function first, then a raw
/// byte copy of the known layout, else leave it uncopied and say so.
fn classify_borrowed_aggregate(
    use_site: &ValueUse,
    ty: &RegisteredType,
    res: &Resolver,
) -> OwnershipDecision {
    let copy = resolve::copy_function(ty).filter(|c| match c {
        CopyRef::Method { name } => use_site.callable != Some(name.as_str()),
        _ => true,
    });
    if let Some(copy) = copy {
        return OwnershipDecision::of(LifetimeAction::CopyWithFunction(copy));
    }
    if let Some(fields) = fields_of(ty) {
        if let Ok(layout) = layout::compute_layout(fields, res, res.long_as_int()) {
            return OwnershipDecision::of(LifetimeAction::CopyBytes(layout.size));
        }
    }
    OwnershipDecision {
        action: LifetimeAction::Nothing,
        element_transfer: None,
        caveat: Some(Caveat::UnresolvableCopy {
            type_name: ty.name().to_owned(),
        }),
    }
}

fn fields_of(ty: &RegisteredType) -> Option<&FieldContainer> {
    match ty {
        RegisteredType::Record(rec) => Some(&rec.fields),
        RegisteredType::Union(u) => Some(&u.fields),
        _ => None,
    }
}
