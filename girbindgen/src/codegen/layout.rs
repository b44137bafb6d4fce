//! Native memory layout computation for field containers.
//!
//! Walks a container's members in declaration order, inserting padding so
//! every field lands on its natural boundary (capped at 8), packing
//! bitfield runs into backing-width units, splicing nested anonymous
//! groups in place, and rounding struct sizes up to the container
//! alignment. Containers holding a C `long` anywhere get two layouts, one
//! per long model, selected at marshal time by a platform check.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::api::context::Resolver;
use crate::api::target::Target;
use crate::error::Error;
use crate::gir::field::{ContainerKind, Field, FieldContainer, Member};
use crate::gir::registered::RegisteredType;
use crate::gir::types::AnyType;

/// Width of one native address. Pointer-shaped fields, callback slots and
/// unknown-size arrays all occupy exactly this.
const ADDRESS_WIDTH: u32 = 8;

/// One computed entry of a group layout. Offsets are implicit: each entry
/// starts where the previous one ended (at 0 for every union arm).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    /// Field name; `None` for padding, bitfield units and anonymous groups.
    pub name: Option<String>,
    pub kind: LayoutKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// A scalar or address slot of the given byte width.
    Scalar { width: u32 },
    /// One packed run of bitfield members, occupying its backing width.
    Bitfield { width: u32 },
    /// Synthetic alignment padding.
    Padding { width: u32 },
    /// A fixed-size array of `count` elements.
    Sequence { count: u32, element: Box<LayoutKind> },
    /// A nested struct or union laid out in place.
    Group(GroupLayout),
}

impl LayoutKind {
    pub fn width(&self) -> u32 {
        match self {
            LayoutKind::Scalar { width }
            | LayoutKind::Bitfield { width }
            | LayoutKind::Padding { width } => *width,
            LayoutKind::Sequence { count, element } => count * element.width(),
            LayoutKind::Group(group) => group.size,
        }
    }

    pub fn is_padding(&self) -> bool {
        matches!(self, LayoutKind::Padding { .. })
    }
}

/// The computed layout of one field container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLayout {
    pub kind: ContainerKind,
    /// The container's C type name, when declared.
    pub name: Option<String>,
    pub entries: Vec<LayoutEntry>,
    pub size: u32,
    pub alignment: u32,
}

impl GroupLayout {
    pub fn is_union(&self) -> bool {
        self.kind == ContainerKind::Union
    }

    /// Byte offset of a named top-level field. Every union arm is at 0.
    pub fn offset_of(&self, field: &str) -> Option<u32> {
        let mut offset = 0u32;
        for entry in &self.entries {
            if entry.name.as_deref() == Some(field) {
                return Some(if self.is_union() { 0 } else { offset });
            }
            offset += entry.kind.width();
        }
        None
    }
}

/// A container's layout across long models: a single fixed layout, or the
/// pair a platform check selects from at marshal time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layouts {
    Fixed(GroupLayout),
    LongDependent {
        long32: GroupLayout,
        long64: GroupLayout,
    },
}

impl Layouts {
    pub fn is_long_dependent(&self) -> bool {
        matches!(self, Layouts::LongDependent { .. })
    }

    pub fn for_long_model(&self, long_as_int: bool) -> &GroupLayout {
        match self {
            Layouts::Fixed(layout) => layout,
            Layouts::LongDependent { long32, long64 } => {
                if long_as_int {
                    long32
                } else {
                    long64
                }
            }
        }
    }

    pub fn for_target(&self, target: &Target) -> &GroupLayout {
        self.for_long_model(target.long_as_int())
    }
}

/// Compute the layout (or pair of layouts) for a container.
///
/// Produces [`Layouts::LongDependent`] exactly when a platform-dependent
/// `long` occurs anywhere in the recursively walked member tree.
pub fn compute_layouts(container: &FieldContainer, res: &Resolver) -> Result<Layouts, Error> {
    if contains_long(container, res) {
        Ok(Layouts::LongDependent {
            long32: compute_layout(container, res, true)?,
            long64: compute_layout(container, res, false)?,
        })
    } else {
        Ok(Layouts::Fixed(compute_layout(container, res, false)?))
    }
}

/// Compute a single layout under the given long model.
///
/// Fails with [`Error::OpaqueLayout`] when the container is opaque or any
/// embedded (non-pointer) member has no known layout; callers fall back
/// to an address-only representation.
pub fn compute_layout(
    container: &FieldContainer,
    res: &Resolver,
    long_as_int: bool,
) -> Result<GroupLayout, Error> {
    if container.is_opaque() || has_opaque_members(container, res) {
        return Err(Error::OpaqueLayout(display_name(container)));
    }

    let is_union = container.kind == ContainerKind::Union;
    let mut entries: Vec<LayoutEntry> = Vec::new();
    let mut size: u32 = 0;
    let mut alignment: u32 = 1;

    let items = container.members.iter().peekable().batching(|it| {
        let member = it.next()?;
        let item = match member {
            Member::Group(group) => Ok(RunItem::Group(group)),
            Member::Field(field) if !field.is_bitfield() => Ok(RunItem::Plain(field)),
            Member::Field(first) => {
                // A maximal run of consecutive bitfield members, split
                // into backing-width units. A unit closes when the next
                // member's bits would overflow it; the overflowing member
                // opens the next unit with its own backing width.
                let mut unit_backing = match field_layout(first, res, long_as_int) {
                    Ok(kind) => kind.width(),
                    Err(e) => return Some(Err(e)),
                };
                let mut unit_bits = first.bits.max(0) as u32;
                let mut units = Vec::new();
                loop {
                    let (bits, backing) = match it.peek() {
                        Some(Member::Field(next)) if next.is_bitfield() => {
                            match field_layout(next, res, long_as_int) {
                                Ok(kind) => (next.bits.max(0) as u32, kind.width()),
                                Err(e) => return Some(Err(e)),
                            }
                        }
                        _ => break,
                    };
                    it.next();
                    if unit_bits + bits > unit_backing * 8 {
                        units.push(unit_backing);
                        unit_backing = backing;
                        unit_bits = bits;
                    } else {
                        unit_bits += bits;
                    }
                }
                units.push(unit_backing);
                Ok(RunItem::BitfieldUnits(units))
            }
        };
        Some(item)
    });

    for item in items {
        match item? {
            RunItem::Plain(field) => {
                let kind = field_layout(field, res, long_as_int)?;
                let s = kind.width();
                if !is_union && s > 0 && size % s % 8 > 0 {
                    let pad = (s - size % s) % 8;
                    if pad > 0 {
                        entries.push(LayoutEntry {
                            name: None,
                            kind: LayoutKind::Padding { width: pad },
                        });
                        size += pad;
                    }
                }
                alignment = alignment.max(s.min(8));
                entries.push(LayoutEntry {
                    name: field.name.clone(),
                    kind,
                });
                size = if is_union { size.max(s) } else { size + s };
            }
            RunItem::BitfieldUnits(units) => {
                for unit in units {
                    alignment = alignment.max(unit.min(8));
                    entries.push(LayoutEntry {
                        name: None,
                        kind: LayoutKind::Bitfield { width: unit },
                    });
                    size = if is_union { size.max(unit) } else { size + unit };
                }
            }
            RunItem::Group(group) => {
                let nested = compute_layout(group, res, long_as_int)?;
                let s = nested.size;
                // The arms of an anonymous group align the outer container
                // too, or its trailing padding would under-round.
                alignment = alignment.max(nested.alignment);
                entries.push(LayoutEntry {
                    name: None,
                    kind: LayoutKind::Group(nested),
                });
                size = if is_union { size.max(s) } else { size + s };
            }
        }
    }

    // Trailing padding so arrays of the struct stay aligned; union size
    // is exactly the widest arm.
    if !is_union && size % alignment > 0 {
        let pad = alignment - size % alignment;
        entries.push(LayoutEntry {
            name: None,
            kind: LayoutKind::Padding { width: pad },
        });
        size += pad;
    }

    Ok(GroupLayout {
        kind: container.kind,
        name: container.c_type.clone(),
        entries,
        size,
        alignment,
    })
}

enum RunItem<'a> {
    Plain(&'a Field),
    Group(&'a FieldContainer),
    BitfieldUnits(Vec<u32>),
}

/// True when a platform-dependent `long` occurs anywhere in the member
/// tree, following embedded aggregates but not callback signatures.
pub fn contains_long(container: &FieldContainer, res: &Resolver) -> bool {
    let mut visited = Vec::new();
    container_contains_long(container, res, &mut visited)
}

fn container_contains_long<'a>(
    container: &'a FieldContainer,
    res: &Resolver<'a>,
    visited: &mut Vec<&'a str>,
) -> bool {
    container.members.iter().any(|member| match member {
        Member::Group(group) => container_contains_long(group, res, visited),
        Member::Field(field) => match &field.ty {
            None => false,
            Some(any) => any_contains_long(any, res, visited),
        },
    })
}

fn any_contains_long<'a>(
    any: &'a AnyType,
    res: &Resolver<'a>,
    visited: &mut Vec<&'a str>,
) -> bool {
    match any {
        AnyType::Array(array) => any_contains_long(&array.element, res, visited),
        AnyType::Type(tref) => {
            if tref.pointer_depth() > 0 {
                return false;
            }
            if let Some(p) = tref.primitive() {
                return p.is_long();
            }
            if visited.iter().any(|v| *v == tref.name) {
                return false;
            }
            visited.push(&tref.name);
            match res.target_of(tref) {
                Some(RegisteredType::Alias(alias)) => {
                    any_contains_long(&alias.target, res, visited)
                }
                Some(RegisteredType::Record(record)) => {
                    container_contains_long(&record.fields, res, visited)
                }
                Some(RegisteredType::Union(union)) => {
                    container_contains_long(&union.fields, res, visited)
                }
                _ => false,
            }
        }
    }
}

/// True when some non-pointer member's layout is unknown: an embedded
/// opaque record, an embedded class instance, or a cyclic embedding.
pub fn has_opaque_members(container: &FieldContainer, res: &Resolver) -> bool {
    let mut visited = Vec::new();
    container_has_opaque(container, res, &mut visited)
}

fn container_has_opaque<'a>(
    container: &'a FieldContainer,
    res: &Resolver<'a>,
    visited: &mut Vec<&'a str>,
) -> bool {
    container.members.iter().any(|member| match member {
        Member::Group(group) => container_has_opaque(group, res, visited),
        Member::Field(field) => match &field.ty {
            None => false,
            Some(any) => any_is_opaque_member(any, res, visited),
        },
    })
}

fn any_is_opaque_member<'a>(
    any: &'a AnyType,
    res: &Resolver<'a>,
    visited: &mut Vec<&'a str>,
) -> bool {
    match any {
        AnyType::Array(array) => match array.fixed_size {
            Some(_) => any_is_opaque_member(&array.element, res, visited),
            None => false,
        },
        AnyType::Type(tref) => {
            if tref.pointer_depth() > 0 || tref.primitive().is_some() || tref.is_string() {
                return false;
            }
            if visited.iter().any(|v| *v == tref.name) {
                // A type embedding itself by value cannot be laid out.
                return true;
            }
            visited.push(&tref.name);
            match res.target_of(tref) {
                None => false,
                Some(RegisteredType::Alias(alias)) => {
                    any_is_opaque_member(&alias.target, res, visited)
                }
                Some(RegisteredType::Record(record)) => {
                    record.is_opaque() || container_has_opaque(&record.fields, res, visited)
                }
                Some(RegisteredType::Union(union)) => {
                    union.is_opaque() || container_has_opaque(&union.fields, res, visited)
                }
                Some(RegisteredType::Enumeration(_))
                | Some(RegisteredType::Bitfield(_))
                | Some(RegisteredType::Callback(_)) => false,
                // Class instances and boxed values have no computable
                // layout here; embedding one by value is opaque.
                Some(RegisteredType::Class(_))
                | Some(RegisteredType::Interface(_))
                | Some(RegisteredType::Boxed(_)) => true,
            }
        }
    }
}

fn field_layout<'a>(
    field: &'a Field,
    res: &Resolver<'a>,
    long_as_int: bool,
) -> Result<LayoutKind, Error> {
    match &field.ty {
        // Inline callback declarations occupy one address.
        None => Ok(LayoutKind::Scalar {
            width: ADDRESS_WIDTH,
        }),
        Some(any) => any_layout(any, res, long_as_int),
    }
}

fn any_layout<'a>(
    any: &'a AnyType,
    res: &Resolver<'a>,
    long_as_int: bool,
) -> Result<LayoutKind, Error> {
    let any = res.chase(any);
    match any {
        AnyType::Array(array) => match array.fixed_size {
            Some(count) => Ok(LayoutKind::Sequence {
                count,
                element: Box::new(any_layout(&array.element, res, long_as_int)?),
            }),
            None => Ok(LayoutKind::Scalar {
                width: ADDRESS_WIDTH,
            }),
        },
        AnyType::Type(tref) => {
            if tref.pointer_depth() > 0 {
                return Ok(LayoutKind::Scalar {
                    width: ADDRESS_WIDTH,
                });
            }
            if let Some(p) = tref.primitive() {
                return Ok(LayoutKind::Scalar {
                    width: p.size(long_as_int),
                });
            }
            if tref.is_string() {
                return Ok(LayoutKind::Scalar {
                    width: ADDRESS_WIDTH,
                });
            }
            match res.target_of(tref) {
                // Unknown names degrade to an address slot.
                None => Ok(LayoutKind::Scalar {
                    width: ADDRESS_WIDTH,
                }),
                Some(RegisteredType::Enumeration(_)) | Some(RegisteredType::Bitfield(_)) => {
                    Ok(LayoutKind::Scalar { width: 4 })
                }
                Some(RegisteredType::Callback(_)) => Ok(LayoutKind::Scalar {
                    width: ADDRESS_WIDTH,
                }),
                Some(RegisteredType::Record(record)) => Ok(LayoutKind::Group(compute_layout(
                    &record.fields,
                    res,
                    long_as_int,
                )?)),
                Some(RegisteredType::Union(union)) => Ok(LayoutKind::Group(compute_layout(
                    &union.fields,
                    res,
                    long_as_int,
                )?)),
                Some(other) => Err(Error::OpaqueLayout(other.name().to_owned())),
            }
        }
    }
}

fn display_name(container: &FieldContainer) -> String {
    container
        .c_type
        .clone()
        .unwrap_or_else(|| "<anonymous>".to_owned())
}
