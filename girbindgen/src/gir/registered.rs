//! Registered types: everything a namespace can declare by name.

use serde::{Deserialize, Serialize};

use crate::gir::callable::Callable;
use crate::gir::field::FieldContainer;
use crate::gir::types::AnyType;

/// A named type registered in a namespace.
///
/// Closed set: every downstream rule table matches exhaustively on this,
/// so adding a kind is a compile-checked exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RegisteredType {
    Class(Class),
    Interface(Interface),
    Record(Record),
    Union(Union),
    Boxed(Boxed),
    Alias(Alias),
    Enumeration(Enumeration),
    Bitfield(Bitfield),
    Callback(Callback),
}

impl RegisteredType {
    pub fn name(&self) -> &str {
        match self {
            RegisteredType::Class(t) => &t.name,
            RegisteredType::Interface(t) => &t.name,
            RegisteredType::Record(t) => &t.name,
            RegisteredType::Union(t) => &t.name,
            RegisteredType::Boxed(t) => &t.name,
            RegisteredType::Alias(t) => &t.name,
            RegisteredType::Enumeration(t) => &t.name,
            RegisteredType::Bitfield(t) => &t.name,
            RegisteredType::Callback(t) => &t.name,
        }
    }

    pub fn c_type(&self) -> Option<&str> {
        match self {
            RegisteredType::Class(t) => t.c_type.as_deref(),
            RegisteredType::Interface(t) => t.c_type.as_deref(),
            RegisteredType::Record(t) => t.fields.c_type.as_deref(),
            RegisteredType::Union(t) => t.fields.c_type.as_deref(),
            RegisteredType::Boxed(t) => t.c_type.as_deref(),
            RegisteredType::Alias(t) => t.c_type.as_deref(),
            RegisteredType::Enumeration(t) => t.c_type.as_deref(),
            RegisteredType::Bitfield(t) => t.c_type.as_deref(),
            RegisteredType::Callback(t) => t.c_type.as_deref(),
        }
    }

    /// The GType registration function, for types that have one.
    pub fn get_type(&self) -> Option<&str> {
        match self {
            RegisteredType::Class(t) => t.get_type.as_deref(),
            RegisteredType::Interface(t) => t.get_type.as_deref(),
            RegisteredType::Record(t) => t.get_type.as_deref(),
            RegisteredType::Union(t) => t.get_type.as_deref(),
            RegisteredType::Boxed(t) => Some(&t.get_type),
            _ => None,
        }
    }

    /// True for types whose lifetime is controlled by reference counting.
    pub fn is_refcounted(&self) -> bool {
        match self {
            RegisteredType::Class(t) => t.refcounted,
            RegisteredType::Interface(_) => true,
            _ => false,
        }
    }

    /// Plain value aggregates: freed by a destructor call, not a refcount.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            RegisteredType::Record(_) | RegisteredType::Union(_) | RegisteredType::Boxed(_)
        )
    }
}

/// An object class.
///
/// Instance layouts come from the runtime type system, not from the
/// layout module, so classes carry no field container here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Has an increment-reference operation.
    #[serde(default)]
    pub refcounted: bool,
    /// Supports floating references sunk on first retain.
    #[serde(default)]
    pub ref_sink: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_type: Option<String>,
}

/// A struct record.
///
/// `pointer` marks disguised records that only ever appear behind a
/// pointer; `foreign` marks records owned by an external library whose
/// lifetime this generator must not manage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    #[serde(default)]
    pub fields: FieldContainer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_type: Option<String>,
    #[serde(default)]
    pub pointer: bool,
    #[serde(default)]
    pub foreign: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_function: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<Callable>,
}

impl Record {
    /// No computable layout: explicit opaque flag, no members, or a
    /// pointer-only disguise.
    pub fn is_opaque(&self) -> bool {
        self.pointer || self.fields.is_opaque()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Union {
    pub name: String,
    #[serde(default)]
    pub fields: FieldContainer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_function: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<Callable>,
}

impl Union {
    pub fn is_opaque(&self) -> bool {
        self.fields.is_opaque()
    }
}

/// A boxed value type registered only by its runtime type tag. Always
/// opaque; copied and freed through the generic boxed machinery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boxed {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_type: Option<String>,
    pub get_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_function: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_type: Option<String>,
    pub target: AnyType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumeration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_type: Option<String>,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitfield {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_type: Option<String>,
    pub members: Vec<EnumMember>,
}

/// A named callback signature. Crosses the boundary as a function
/// pointer; the signature itself is not needed by the analyses here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callback {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_types_round_trip_as_tagged_json() {
        let ty = RegisteredType::Enumeration(Enumeration {
            name: "Orientation".to_owned(),
            c_type: Some("GtkOrientation".to_owned()),
            get_type: None,
            members: vec![
                EnumMember {
                    name: "horizontal".to_owned(),
                    value: 0,
                    c_identifier: None,
                },
                EnumMember {
                    name: "vertical".to_owned(),
                    value: 1,
                    c_identifier: None,
                },
            ],
        });
        let json = serde_json::to_string(&ty).unwrap();
        assert!(json.contains(r#""kind":"enumeration""#));
        let back: RegisteredType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
        assert_eq!(back.name(), "Orientation");
        assert_eq!(back.c_type(), Some("GtkOrientation"));
    }

    #[test]
    fn pointer_records_have_no_layout() {
        let rec = Record {
            name: "MainContext".to_owned(),
            fields: FieldContainer::default(),
            get_type: None,
            pointer: true,
            foreign: false,
            copy_function: None,
            free_function: None,
            methods: Vec::new(),
        };
        assert!(rec.is_opaque());
        assert!(RegisteredType::Record(rec).is_aggregate());
    }
}
