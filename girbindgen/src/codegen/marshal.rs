//! Marshaling plans: how one value crosses the native boundary.
//!
//! A value's declared type classifies into one of nine shapes; the shape
//! plus the ownership decision yields a conversion recipe. Recipes are
//! executable against an abstract value pair ([`NativeValue`] /
//! [`WrappedValue`]) so null handling, enum domain checks and round-trip
//! behavior are testable without emitting any code.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::api::context::Resolver;
use crate::codegen::ownership::{
    self, classify, container_shape, ContainerShape, LifetimeAction, OwnershipDecision, Role,
    ValueUse,
};
use crate::error::Error;
use crate::gir::callable::{
    scope_class, Callable, Direction, Parameter, ScopeClass, TransferOwnership,
};
use crate::gir::registered::{EnumMember, RegisteredType};
use crate::gir::types::{AnyType, Primitive, TypeRef};

/// Which way a conversion runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueDirection {
    NativeToWrapped,
    WrappedToNative,
}

/// Where an array's element count comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthSource {
    /// A sibling parameter at this index.
    Param(usize),
    /// Declared fixed size.
    Fixed(u32),
    /// The `len` field of the growable GLib array records.
    GrowableLenField,
    /// Unknown; treated as null-terminated.
    NullTerminated,
}

/// The shape a declared type marshals as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeClass {
    Primitive(Primitive),
    StringUtf8,
    /// An address carried through untouched: untyped pointers, callback
    /// references, unknown type names.
    OpaqueAddress,
    WrappedAggregate {
        type_name: String,
        refcounted: bool,
    },
    EnumLike {
        type_name: String,
    },
    BitflagSet {
        type_name: String,
    },
    ListLike {
        element: Box<TypeClass>,
    },
    MapLike {
        key: Box<TypeClass>,
        value: Box<TypeClass>,
    },
    ArrayOf {
        element: Box<TypeClass>,
        length: LengthSource,
    },
}

/// Classify a declared type into its marshaling shape.
///
/// Aliases are chased first. Nested container shapes (arrays of arrays,
/// lists of lists) have no derivable recipe and fail with
/// [`Error::UnsupportedElementType`]; callers skip that member and keep
/// the rest of the type.
pub fn classify_type<'a>(any: &'a AnyType, res: &Resolver<'a>) -> Result<TypeClass, Error> {
    let chased = res.chase(any);
    match chased {
        AnyType::Array(array) => {
            let element = classify_element(&array.element, res)?;
            let length = if let Some(count) = array.fixed_size {
                LengthSource::Fixed(count)
            } else if array.is_growable() {
                LengthSource::GrowableLenField
            } else if let Some(index) = array.length_index {
                LengthSource::Param(index)
            } else {
                LengthSource::NullTerminated
            };
            Ok(TypeClass::ArrayOf {
                element: Box::new(element),
                length,
            })
        }
        AnyType::Type(tref) => classify_tref(tref, res),
    }
}

fn classify_tref<'a>(tref: &'a TypeRef, res: &Resolver<'a>) -> Result<TypeClass, Error> {
    if let Some(p) = tref.primitive() {
        // A starred primitive reference is an out-style slot; the value
        // that marshals is the pointee. The untyped pointer kinds stay
        // plain addresses.
        return Ok(if p.is_pointer() {
            TypeClass::OpaqueAddress
        } else {
            TypeClass::Primitive(p)
        });
    }
    if tref.is_string() {
        return Ok(TypeClass::StringUtf8);
    }
    match container_shape(tref, res) {
        Some(ContainerShape::List) | Some(ContainerShape::SList) => {
            let element = match tref.element_arg() {
                Some(arg) => classify_element(arg, res)?,
                None => TypeClass::OpaqueAddress,
            };
            return Ok(TypeClass::ListLike {
                element: Box::new(element),
            });
        }
        Some(ContainerShape::Map) => {
            let mut args = tref.type_args.iter();
            let key = match args.next() {
                Some(arg) => classify_element(arg, res)?,
                None => TypeClass::OpaqueAddress,
            };
            let value = match args.next() {
                Some(arg) => classify_element(arg, res)?,
                None => TypeClass::OpaqueAddress,
            };
            return Ok(TypeClass::MapLike {
                key: Box::new(key),
                value: Box::new(value),
            });
        }
        None => {}
    }
    match res.target_of(tref) {
        Some(RegisteredType::Enumeration(_)) => Ok(TypeClass::EnumLike {
            type_name: tref.name.clone(),
        }),
        Some(RegisteredType::Bitfield(_)) => Ok(TypeClass::BitflagSet {
            type_name: tref.name.clone(),
        }),
        Some(RegisteredType::Callback(_)) => Ok(TypeClass::OpaqueAddress),
        Some(RegisteredType::Alias(_)) => {
            // Only a cyclic alias chain survives the chase.
            Err(Error::UnsupportedElementType(tref.name.clone()))
        }
        Some(ty) => Ok(TypeClass::WrappedAggregate {
            type_name: tref.name.clone(),
            refcounted: ty.is_refcounted(),
        }),
        None => Ok(TypeClass::OpaqueAddress),
    }
}

/// Element types must classify to something a per-element recipe exists
/// for; nested container shapes do not.
fn classify_element<'a>(any: &'a AnyType, res: &Resolver<'a>) -> Result<TypeClass, Error> {
    match classify_type(any, res)? {
        TypeClass::ArrayOf { .. } | TypeClass::ListLike { .. } | TypeClass::MapLike { .. } => {
            Err(Error::UnsupportedElementType(describe(any)))
        }
        element => Ok(element),
    }
}

fn describe(any: &AnyType) -> String {
    match any {
        AnyType::Type(t) => t.name.clone(),
        AnyType::Array(a) => format!("array of {}", describe(&a.element)),
    }
}

/// One deterministic conversion, executable in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recipe {
    /// Raw scalar of the given byte width. `bool_canonical` folds any
    /// non-zero native value to true and writes back exactly 0 or 1.
    Scalar { width: u32, bool_canonical: bool },
    /// NUL-terminated byte buffer; transfer decides who frees which copy.
    String {
        transfer: TransferOwnership,
        nullable: bool,
    },
    /// The raw byte payload behind a `GBytes` record.
    Bytes { nullable: bool },
    /// Ordinal lookup against the declared members.
    Enum {
        name: String,
        members: BTreeMap<String, i64>,
    },
    /// OR-combination of member bit patterns.
    Flags {
        name: String,
        members: BTreeMap<String, i64>,
    },
    /// Wrap or unwrap an address of a registered type.
    Aggregate { type_name: String, nullable: bool },
    /// Linked-list cursor walk, one element recipe per node.
    List {
        element: Box<Recipe>,
        element_transfer: TransferOwnership,
    },
    /// Hash-table cursor walk over key/value pairs.
    Map {
        key: Box<Recipe>,
        value: Box<Recipe>,
        element_transfer: TransferOwnership,
    },
    /// Contiguous buffer with an external length source.
    Array {
        element: Box<Recipe>,
        length: LengthSource,
    },
    /// Address carried through untouched.
    Opaque,
    /// Hidden parameter; the emitter drops it from the wrapped signature
    /// and synthesizes the native value itself.
    Skipped,
}

/// The full marshaling verdict for one value in one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarshalPlan {
    pub class: TypeClass,
    pub direction: ValueDirection,
    pub ownership: OwnershipDecision,
    pub recipe: Recipe,
    /// Callback lifetime tag, set when the planned value is a callback.
    pub scope: Option<ScopeClass>,
}

impl MarshalPlan {
    pub fn to_wrapped(&self, native: &NativeValue) -> Result<WrappedValue, Error> {
        self.recipe.to_wrapped(native)
    }

    pub fn to_native(&self, wrapped: &WrappedValue) -> Result<NativeValue, Error> {
        self.recipe.to_native(wrapped)
    }
}

/// Plan the conversion of one use-site in one direction.
pub fn plan<'a>(
    use_site: &ValueUse<'a>,
    direction: ValueDirection,
    res: &Resolver<'a>,
) -> Result<MarshalPlan, Error> {
    let class = classify_type(use_site.ty, res)?;
    let ownership = classify(use_site, res);
    let recipe = recipe_for(
        &class,
        use_site.transfer,
        use_site.nullable,
        res.long_as_int(),
        res,
    )?;
    Ok(MarshalPlan {
        class,
        direction,
        ownership,
        recipe,
        scope: None,
    })
}

fn recipe_for(
    class: &TypeClass,
    transfer: TransferOwnership,
    nullable: bool,
    long_as_int: bool,
    res: &Resolver,
) -> Result<Recipe, Error> {
    Ok(match class {
        TypeClass::Primitive(p) => Recipe::Scalar {
            width: p.size(long_as_int),
            bool_canonical: *p == Primitive::Bool,
        },
        TypeClass::StringUtf8 => Recipe::String { transfer, nullable },
        TypeClass::OpaqueAddress => Recipe::Opaque,
        TypeClass::EnumLike { type_name } => Recipe::Enum {
            name: type_name.clone(),
            members: declared_members(res, type_name)?,
        },
        TypeClass::BitflagSet { type_name } => Recipe::Flags {
            name: type_name.clone(),
            members: declared_members(res, type_name)?,
        },
        // The byte-payload records go through buffer recipes, never an
        // aggregate wrap; their ownership side already leaves them alone.
        TypeClass::WrappedAggregate { type_name, .. } => {
            match res.lookup(type_name).and_then(RegisteredType::c_type) {
                Some("GBytes") => Recipe::Bytes { nullable },
                Some("GString") => Recipe::String { transfer, nullable },
                _ => Recipe::Aggregate {
                    type_name: type_name.clone(),
                    nullable,
                },
            }
        }
        TypeClass::ListLike { element } => {
            let inner = ownership::element_transfer(transfer);
            Recipe::List {
                element: Box::new(recipe_for(element, inner, false, long_as_int, res)?),
                element_transfer: inner,
            }
        }
        TypeClass::MapLike { key, value } => {
            let inner = ownership::element_transfer(transfer);
            Recipe::Map {
                key: Box::new(recipe_for(key, inner, false, long_as_int, res)?),
                value: Box::new(recipe_for(value, inner, false, long_as_int, res)?),
                element_transfer: inner,
            }
        }
        TypeClass::ArrayOf { element, length } => Recipe::Array {
            element: Box::new(recipe_for(
                element,
                ownership::element_transfer(transfer),
                false,
                long_as_int,
                res,
            )?),
            length: *length,
        },
    })
}

fn declared_members(res: &Resolver, name: &str) -> Result<BTreeMap<String, i64>, Error> {
    let members: &[EnumMember] = match res.lookup(name) {
        Some(RegisteredType::Enumeration(e)) => &e.members,
        Some(RegisteredType::Bitfield(b)) => &b.members,
        _ => return Err(Error::UnsupportedElementType(name.to_owned())),
    };
    Ok(members
        .iter()
        .map(|m| (m.name.clone(), m.value))
        .collect())
}

/// A value as native code sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeValue {
    Scalar(i64),
    Float(f64),
    /// A raw address; 0 is NULL.
    Address(u64),
    /// The byte buffer behind a string address.
    Utf8(String),
    /// The elements behind a list/array cursor.
    Seq(Vec<NativeValue>),
    /// The entries behind a hash-table cursor.
    Pairs(Vec<(NativeValue, NativeValue)>),
}

/// A value as the generated wrapper surface sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrappedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// An enum member by name.
    Enum(String),
    /// A deduplicated, unordered flag set.
    Flags(BTreeSet<String>),
    /// A wrapped instance of a registered type.
    Object { type_name: String, address: u64 },
    /// The typed null sentinel.
    Absent,
    /// An opaque address surfaced as-is.
    Address(u64),
    Items(Vec<WrappedValue>),
    Pairs(Vec<(WrappedValue, WrappedValue)>),
}

fn shape(expected: &str) -> Error {
    Error::ValueShape {
        expected: expected.to_owned(),
    }
}

impl Recipe {
    /// Run the conversion native → wrapped.
    pub fn to_wrapped(&self, native: &NativeValue) -> Result<WrappedValue, Error> {
        match self {
            Recipe::Scalar { bool_canonical, .. } => match native {
                NativeValue::Scalar(i) if *bool_canonical => Ok(WrappedValue::Bool(*i != 0)),
                NativeValue::Scalar(i) => Ok(WrappedValue::Int(*i)),
                NativeValue::Float(f) => Ok(WrappedValue::Float(*f)),
                _ => Err(shape("scalar")),
            },
            Recipe::String { nullable, .. } => match native {
                NativeValue::Utf8(s) => Ok(WrappedValue::Str(s.clone())),
                NativeValue::Address(0) if *nullable => Ok(WrappedValue::Absent),
                NativeValue::Address(0) => Err(Error::UnexpectedNull("string".to_owned())),
                _ => Err(shape("string buffer")),
            },
            Recipe::Bytes { nullable } => match native {
                NativeValue::Address(0) if *nullable => Ok(WrappedValue::Absent),
                NativeValue::Address(0) => Err(Error::UnexpectedNull("byte payload".to_owned())),
                NativeValue::Seq(bytes) => bytes
                    .iter()
                    .map(|b| match b {
                        NativeValue::Scalar(i) => Ok(WrappedValue::Int(*i)),
                        _ => Err(shape("byte")),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(WrappedValue::Items),
                _ => Err(shape("byte buffer")),
            },
            Recipe::Enum { name, members } => match native {
                NativeValue::Scalar(i) => members
                    .iter()
                    .find(|(_, value)| **value == *i)
                    .map(|(member, _)| WrappedValue::Enum(member.clone()))
                    .ok_or_else(|| Error::UnknownEnumValue {
                        enum_name: name.clone(),
                        value: *i,
                    }),
                _ => Err(shape("enum ordinal")),
            },
            Recipe::Flags { name, members } => match native {
                NativeValue::Scalar(i) => {
                    let mut set = BTreeSet::new();
                    let mut covered = 0i64;
                    for (member, bits) in members {
                        if *bits != 0 && (*i & *bits) == *bits {
                            set.insert(member.clone());
                            covered |= *bits;
                        }
                    }
                    let residual = *i & !covered;
                    if residual != 0 {
                        return Err(Error::UnknownEnumValue {
                            enum_name: name.clone(),
                            value: residual,
                        });
                    }
                    Ok(WrappedValue::Flags(set))
                }
                _ => Err(shape("flag bits")),
            },
            Recipe::Aggregate {
                type_name,
                nullable,
            } => match native {
                NativeValue::Address(0) if *nullable => Ok(WrappedValue::Absent),
                NativeValue::Address(0) => Err(Error::UnexpectedNull(type_name.clone())),
                NativeValue::Address(address) => Ok(WrappedValue::Object {
                    type_name: type_name.clone(),
                    address: *address,
                }),
                _ => Err(shape("address")),
            },
            Recipe::List { element, .. } => match native {
                // A NULL list head is the empty list.
                NativeValue::Address(0) => Ok(WrappedValue::Items(Vec::new())),
                NativeValue::Seq(items) => items
                    .iter()
                    .map(|item| element.to_wrapped(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(WrappedValue::Items),
                _ => Err(shape("list cursor")),
            },
            Recipe::Map { key, value, .. } => match native {
                NativeValue::Address(0) => Ok(WrappedValue::Pairs(Vec::new())),
                NativeValue::Pairs(pairs) => pairs
                    .iter()
                    .map(|(k, v)| Ok((key.to_wrapped(k)?, value.to_wrapped(v)?)))
                    .collect::<Result<Vec<_>, Error>>()
                    .map(WrappedValue::Pairs),
                _ => Err(shape("hash-table cursor")),
            },
            Recipe::Array { element, .. } => match native {
                // A null buffer is absent; an empty buffer is a real,
                // zero-length array.
                NativeValue::Address(0) => Ok(WrappedValue::Absent),
                NativeValue::Seq(items) => items
                    .iter()
                    .map(|item| element.to_wrapped(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(WrappedValue::Items),
                _ => Err(shape("array buffer")),
            },
            Recipe::Opaque => match native {
                NativeValue::Address(address) => Ok(WrappedValue::Address(*address)),
                _ => Err(shape("address")),
            },
            Recipe::Skipped => Err(shape("marshalable value, found skipped slot")),
        }
    }

    /// Run the conversion wrapped → native.
    pub fn to_native(&self, wrapped: &WrappedValue) -> Result<NativeValue, Error> {
        match self {
            Recipe::Scalar { bool_canonical, .. } => match wrapped {
                WrappedValue::Bool(b) if *bool_canonical => {
                    Ok(NativeValue::Scalar(i64::from(*b)))
                }
                WrappedValue::Int(i) if !*bool_canonical => Ok(NativeValue::Scalar(*i)),
                WrappedValue::Float(f) => Ok(NativeValue::Float(*f)),
                _ => Err(shape("scalar")),
            },
            Recipe::String { nullable, .. } => match wrapped {
                WrappedValue::Str(s) => Ok(NativeValue::Utf8(s.clone())),
                WrappedValue::Absent if *nullable => Ok(NativeValue::Address(0)),
                WrappedValue::Absent => Err(Error::UnexpectedNull("string".to_owned())),
                _ => Err(shape("string")),
            },
            Recipe::Bytes { nullable } => match wrapped {
                WrappedValue::Items(bytes) => bytes
                    .iter()
                    .map(|b| match b {
                        WrappedValue::Int(i) => Ok(NativeValue::Scalar(*i)),
                        _ => Err(shape("byte")),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(NativeValue::Seq),
                WrappedValue::Absent if *nullable => Ok(NativeValue::Address(0)),
                WrappedValue::Absent => Err(Error::UnexpectedNull("byte payload".to_owned())),
                _ => Err(shape("byte items")),
            },
            Recipe::Enum { name, members } => match wrapped {
                WrappedValue::Enum(member) => members
                    .get(member)
                    .map(|value| NativeValue::Scalar(*value))
                    .ok_or_else(|| Error::UnknownEnumMember {
                        enum_name: name.clone(),
                        member: member.clone(),
                    }),
                _ => Err(shape("enum member")),
            },
            Recipe::Flags { name, members } => match wrapped {
                WrappedValue::Flags(set) => {
                    let mut bits = 0i64;
                    for member in set {
                        bits |= members.get(member).ok_or_else(|| Error::UnknownEnumMember {
                            enum_name: name.clone(),
                            member: member.clone(),
                        })?;
                    }
                    Ok(NativeValue::Scalar(bits))
                }
                _ => Err(shape("flag set")),
            },
            Recipe::Aggregate {
                type_name,
                nullable,
            } => match wrapped {
                WrappedValue::Object { address, .. } => Ok(NativeValue::Address(*address)),
                WrappedValue::Absent if *nullable => Ok(NativeValue::Address(0)),
                WrappedValue::Absent => Err(Error::UnexpectedNull(type_name.clone())),
                _ => Err(shape("wrapped object")),
            },
            Recipe::List { element, .. } => match wrapped {
                // The empty list crosses as NULL.
                WrappedValue::Items(items) if items.is_empty() => Ok(NativeValue::Address(0)),
                WrappedValue::Items(items) => items
                    .iter()
                    .map(|item| element.to_native(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(NativeValue::Seq),
                WrappedValue::Absent => Ok(NativeValue::Address(0)),
                _ => Err(shape("list items")),
            },
            Recipe::Map { key, value, .. } => match wrapped {
                WrappedValue::Pairs(pairs) if pairs.is_empty() => Ok(NativeValue::Address(0)),
                WrappedValue::Pairs(pairs) => pairs
                    .iter()
                    .map(|(k, v)| Ok((key.to_native(k)?, value.to_native(v)?)))
                    .collect::<Result<Vec<_>, Error>>()
                    .map(NativeValue::Pairs),
                WrappedValue::Absent => Ok(NativeValue::Address(0)),
                _ => Err(shape("map pairs")),
            },
            Recipe::Array { element, .. } => match wrapped {
                // Zero-length stays a real empty buffer, never NULL.
                WrappedValue::Items(items) => items
                    .iter()
                    .map(|item| element.to_native(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(NativeValue::Seq),
                WrappedValue::Absent => Ok(NativeValue::Address(0)),
                _ => Err(shape("array items")),
            },
            Recipe::Opaque => match wrapped {
                WrappedValue::Address(address) => Ok(NativeValue::Address(*address)),
                WrappedValue::Absent => Ok(NativeValue::Address(0)),
                _ => Err(shape("address")),
            },
            Recipe::Skipped => Err(shape("marshalable value, found skipped slot")),
        }
    }
}

/// Why a parameter is dropped from the wrapped signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HiddenRole {
    /// The trailing `GError**` of a throwing callable.
    ErrorParam,
    /// Closure data routed alongside a callback.
    UserData,
    /// The destroy notifier of a notified-scope callback.
    DestroyNotify,
    /// An element count read from the paired array value.
    ArrayLength,
    Varargs,
}

/// The plans for one parameter. Inout parameters carry one plan per
/// direction; hidden parameters carry a skipped placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamPlan {
    pub name: String,
    pub hidden: Option<HiddenRole>,
    /// Whether the wrapper must reject a null argument before the call.
    pub null_check: bool,
    pub into_native: Option<MarshalPlan>,
    pub into_wrapped: Option<MarshalPlan>,
}

/// Everything the emitter needs to wrap one callable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallablePlan {
    pub name: String,
    pub parameters: Vec<ParamPlan>,
    /// `None` for void returns.
    pub return_plan: Option<MarshalPlan>,
}

/// Plan a whole callable: every visible parameter in the direction(s) it
/// flows, hidden parameters marked and skipped, and the return value.
pub fn plan_callable<'a>(
    callable: &'a Callable,
    res: &Resolver<'a>,
) -> Result<CallablePlan, Error> {
    let mut parameters = Vec::with_capacity(callable.parameters.len());
    for (index, param) in callable.parameters.iter().enumerate() {
        if let Some(role) = hidden_role(callable, index, param) {
            parameters.push(ParamPlan {
                name: param.name.clone(),
                hidden: Some(role),
                null_check: false,
                into_native: Some(skipped_plan(ValueDirection::WrappedToNative)),
                into_wrapped: None,
            });
            continue;
        }
        let site = ValueUse::parameter(param);
        let scope = callback_scope(param, callable, res);
        let with_scope = |mut plan: MarshalPlan| {
            plan.scope = scope;
            plan
        };
        let into_native = match param.direction {
            Direction::In | Direction::InOut => {
                Some(with_scope(plan(&site, ValueDirection::WrappedToNative, res)?))
            }
            Direction::Out => None,
        };
        let into_wrapped = match param.direction {
            Direction::Out | Direction::InOut => {
                Some(with_scope(plan(&site, ValueDirection::NativeToWrapped, res)?))
            }
            Direction::In => None,
        };
        parameters.push(ParamPlan {
            name: param.name.clone(),
            hidden: None,
            null_check: needs_null_check(&site, res),
            into_native,
            into_wrapped,
        });
    }
    let return_plan = if callable.return_value.is_void() {
        None
    } else {
        Some(plan(
            &ValueUse::return_of(callable),
            ValueDirection::NativeToWrapped,
            res,
        )?)
    };
    Ok(CallablePlan {
        name: callable.name.clone(),
        parameters,
        return_plan,
    })
}

fn hidden_role(callable: &Callable, index: usize, param: &Parameter) -> Option<HiddenRole> {
    if param.varargs {
        return Some(HiddenRole::Varargs);
    }
    if param.is_error() {
        return Some(HiddenRole::ErrorParam);
    }
    if callable.is_user_data(index) {
        return Some(HiddenRole::UserData);
    }
    if callable.is_destroy_for(index) || param.is_destroy_notify() {
        return Some(HiddenRole::DestroyNotify);
    }
    if callable.is_array_length(index) {
        return Some(HiddenRole::ArrayLength);
    }
    None
}

fn skipped_plan(direction: ValueDirection) -> MarshalPlan {
    MarshalPlan {
        class: TypeClass::OpaqueAddress,
        direction,
        ownership: OwnershipDecision {
            action: LifetimeAction::Nothing,
            element_transfer: None,
            caveat: None,
        },
        recipe: Recipe::Skipped,
        scope: None,
    }
}

fn callback_scope<'a>(
    param: &'a Parameter,
    callable: &Callable,
    res: &Resolver<'a>,
) -> Option<ScopeClass> {
    let is_callback = param.scope.is_some()
        || matches!(
            res.chase(&param.ty)
                .as_type()
                .and_then(|t| res.target_of(t)),
            Some(RegisteredType::Callback(_))
        );
    is_callback.then(|| scope_class(param, callable.kind))
}

/// Whether the wrapper must reject null before handing a value to native
/// code. Only inbound parameters check; instance slots, nullable slots,
/// plain scalars and enums never do, and a null list is just empty.
pub fn needs_null_check<'a>(use_site: &ValueUse<'a>, res: &Resolver<'a>) -> bool {
    if use_site.role != Role::Parameter
        || use_site.direction == Direction::Out
        || use_site.nullable
    {
        return false;
    }
    match res.chase(use_site.ty) {
        AnyType::Array(_) => true,
        AnyType::Type(tref) => {
            if container_shape(tref, res).is_some() {
                return false;
            }
            if tref.pointer_depth() == 0 {
                if let Some(p) = tref.primitive() {
                    return p.is_pointer();
                }
            }
            match res.target_of(tref) {
                Some(RegisteredType::Enumeration(_)) | Some(RegisteredType::Bitfield(_)) => false,
                Some(_) => true,
                None => tref.pointer_depth() > 0 || tref.is_string(),
            }
        }
    }
}
