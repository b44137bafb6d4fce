//! Field containers: the struct/union shapes whose native layout is
//! computed by the layout module.

use serde::{Deserialize, Serialize};

use crate::gir::types::AnyType;

/// Whether a container lays out as a struct, a union, or a type-class
/// record (the per-class metadata struct of a registered class).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    #[default]
    Struct,
    Union,
    TypeClass,
}

/// An ordered sequence of members sharing one native allocation.
///
/// `opaque` marks containers whose real layout is unknown (forward
/// declarations, foreign types). A container with no members at all is
/// opaque by definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldContainer {
    #[serde(default)]
    pub kind: ContainerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_type: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub opaque: bool,
}

impl FieldContainer {
    pub fn new(kind: ContainerKind, c_type: Option<&str>, members: Vec<Member>) -> Self {
        Self {
            kind,
            c_type: c_type.map(str::to_owned),
            members,
            opaque: false,
        }
    }

    pub fn is_union(&self) -> bool {
        self.kind == ContainerKind::Union
    }

    /// Opaque containers never produce a layout.
    pub fn is_opaque(&self) -> bool {
        self.opaque || self.members.is_empty()
    }
}

/// One member of a container: a named field or a nested anonymous group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Member {
    Field(Field),
    Group(FieldContainer),
}

impl Member {
    pub fn field(name: &str, ty: AnyType) -> Self {
        Member::Field(Field {
            name: Some(name.to_owned()),
            ty: Some(ty),
            bits: -1,
        })
    }

    pub fn bitfield(name: &str, ty: AnyType, bits: i32) -> Self {
        Member::Field(Field {
            name: Some(name.to_owned()),
            ty: Some(ty),
            bits,
        })
    }
}

/// A single declared field.
///
/// `ty` is absent for fields declared as inline callback signatures; those
/// occupy one address. `bits` is `-1` for ordinary fields and the declared
/// bit width for packed bitfield members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<AnyType>,
    #[serde(default = "no_bits")]
    pub bits: i32,
}

fn no_bits() -> i32 {
    -1
}

impl Field {
    pub fn is_bitfield(&self) -> bool {
        self.bits >= 0
    }

    /// Fields without a declared type are inline callback declarations.
    pub fn is_callback(&self) -> bool {
        self.ty.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_default_to_not_a_bitfield() {
        let json = r#"{"name":"refcount","ty":{"type":{"name":"gint","c_type":"int"}}}"#;
        let f: Field = serde_json::from_str(json).unwrap();
        assert_eq!(f.bits, -1);
        assert!(!f.is_bitfield());
        assert!(!f.is_callback());
    }

    #[test]
    fn empty_containers_are_opaque() {
        let c = FieldContainer::default();
        assert!(c.is_opaque());
        let c = FieldContainer::new(
            ContainerKind::Struct,
            Some("GOpaque"),
            vec![Member::field("x", AnyType::named("gint"))],
        );
        assert!(!c.is_opaque());
    }
}
