//! Declared-type nodes of the introspection model: scalar kinds, named type
//! references and array shapes.

use serde::{Deserialize, Serialize};

/// Scalar kinds with a fixed native representation.
///
/// `Long`/`ULong` are the platform-dependent C `long`: 4 bytes where the
/// target follows LLP64 or has 32-bit pointers, 8 bytes elsewhere. Every
/// width query therefore takes a `long_as_int` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Unichar,
    Float,
    Double,
    Long,
    ULong,
    Size,
    SSize,
    Pointer,
    GType,
}

impl Primitive {
    /// Map a GIR type name ("gboolean", "guint32", ...) to its scalar kind.
    pub fn from_gir_name(name: &str) -> Option<Primitive> {
        Some(match name {
            "gboolean" => Primitive::Bool,
            "gchar" | "gint8" => Primitive::Int8,
            "guchar" | "guint8" => Primitive::UInt8,
            "gshort" | "gint16" => Primitive::Int16,
            "gushort" | "guint16" => Primitive::UInt16,
            "gint" | "gint32" => Primitive::Int32,
            "guint" | "guint32" => Primitive::UInt32,
            "gint64" | "goffset" => Primitive::Int64,
            "guint64" => Primitive::UInt64,
            "gunichar" => Primitive::Unichar,
            "gfloat" => Primitive::Float,
            "gdouble" => Primitive::Double,
            "glong" => Primitive::Long,
            "gulong" => Primitive::ULong,
            "gsize" | "guintptr" => Primitive::Size,
            "gssize" | "gintptr" => Primitive::SSize,
            "gpointer" | "gconstpointer" => Primitive::Pointer,
            "GType" => Primitive::GType,
            _ => return None,
        })
    }

    /// Byte width of the scalar in native memory.
    pub fn size(self, long_as_int: bool) -> u32 {
        match self {
            Primitive::Int8 | Primitive::UInt8 => 1,
            Primitive::Int16 | Primitive::UInt16 => 2,
            Primitive::Bool
            | Primitive::Int32
            | Primitive::UInt32
            | Primitive::Unichar
            | Primitive::Float => 4,
            Primitive::Long | Primitive::ULong => {
                if long_as_int {
                    4
                } else {
                    8
                }
            }
            Primitive::Int64
            | Primitive::UInt64
            | Primitive::Double
            | Primitive::Size
            | Primitive::SSize
            | Primitive::Pointer
            | Primitive::GType => 8,
        }
    }

    /// True for the platform-dependent C `long` kinds.
    pub fn is_long(self) -> bool {
        matches!(self, Primitive::Long | Primitive::ULong)
    }

    /// True when values of this kind cross the boundary as addresses.
    pub fn is_pointer(self) -> bool {
        matches!(self, Primitive::Pointer)
    }
}

/// A reference to a type by name, as written in the introspection data.
///
/// `name` is either local to the declaring namespace ("Widget") or
/// qualified ("GLib.Variant"). The C type, when present, carries the
/// pointer depth ("GList*", "char**").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_type: Option<String>,
    /// Element type arguments for list/map shaped references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_args: Vec<AnyType>,
}

impl TypeRef {
    pub fn new(name: impl Into<String>, c_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            c_type: c_type.map(str::to_owned),
            type_args: Vec::new(),
        }
    }

    /// Number of trailing `*` in the declared C type.
    pub fn pointer_depth(&self) -> u32 {
        match &self.c_type {
            Some(c) => c.chars().rev().take_while(|ch| *ch == '*').count() as u32,
            None => 0,
        }
    }

    /// True when the value is address-shaped: a starred C type or one of
    /// the untyped pointer kinds.
    pub fn is_pointer(&self) -> bool {
        self.pointer_depth() > 0 || matches!(self.primitive(), Some(p) if p.is_pointer())
    }

    /// Scalar kind of this reference, if it names one.
    pub fn primitive(&self) -> Option<Primitive> {
        Primitive::from_gir_name(&self.name)
    }

    /// NUL-terminated string types.
    pub fn is_string(&self) -> bool {
        self.name == "utf8" || self.name == "filename"
    }

    /// The `none` pseudo-type used for void returns.
    pub fn is_void(&self) -> bool {
        self.name == "none" && self.pointer_depth() == 0
    }

    /// First element type argument, for list-shaped references.
    pub fn element_arg(&self) -> Option<&AnyType> {
        self.type_args.first()
    }
}

/// Either a plain type reference or an array shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnyType {
    Type(TypeRef),
    Array(ArrayType),
}

impl AnyType {
    pub fn as_type(&self) -> Option<&TypeRef> {
        match self {
            AnyType::Type(t) => Some(t),
            AnyType::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            AnyType::Array(a) => Some(a),
            AnyType::Type(_) => None,
        }
    }

    /// Shorthand for a named reference without a C type.
    pub fn named(name: impl Into<String>) -> Self {
        AnyType::Type(TypeRef::new(name, None))
    }
}

/// An array-shaped declared type.
///
/// Plain C arrays leave `name` empty; the growable GLib containers
/// ("GLib.Array", "GLib.PtrArray", "GLib.ByteArray") keep their element
/// count in a `len` field of the container struct instead of a sibling
/// parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_type: Option<String>,
    pub element: Box<AnyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_size: Option<u32>,
    #[serde(default)]
    pub zero_terminated: bool,
    /// Index of the sibling parameter holding the element count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_index: Option<usize>,
}

impl ArrayType {
    pub fn of(element: AnyType) -> Self {
        Self {
            name: None,
            c_type: None,
            element: Box::new(element),
            fixed_size: None,
            zero_terminated: false,
            length_index: None,
        }
    }

    /// True for the GLib container records whose length lives in their
    /// own `len` field.
    pub fn is_growable(&self) -> bool {
        matches!(
            self.name.as_deref(),
            Some("GLib.Array") | Some("GLib.PtrArray") | Some("GLib.ByteArray")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gir_names_map_to_scalar_kinds() {
        assert_eq!(Primitive::from_gir_name("gboolean"), Some(Primitive::Bool));
        assert_eq!(Primitive::from_gir_name("guint16"), Some(Primitive::UInt16));
        assert_eq!(Primitive::from_gir_name("glong"), Some(Primitive::Long));
        assert_eq!(
            Primitive::from_gir_name("gconstpointer"),
            Some(Primitive::Pointer)
        );
        assert_eq!(Primitive::from_gir_name("utf8"), None);
    }

    #[test]
    fn width_table_follows_the_long_model() {
        assert_eq!(Primitive::Int8.size(false), 1);
        assert_eq!(Primitive::Int16.size(false), 2);
        assert_eq!(Primitive::Bool.size(false), 4);
        assert_eq!(Primitive::Float.size(false), 4);
        assert_eq!(Primitive::Double.size(false), 8);
        assert_eq!(Primitive::Pointer.size(false), 8);
        assert_eq!(Primitive::Long.size(false), 8);
        assert_eq!(Primitive::Long.size(true), 4);
        assert_eq!(Primitive::ULong.size(true), 4);
    }

    #[test]
    fn pointer_depth_counts_trailing_stars() {
        assert_eq!(TypeRef::new("utf8", Some("char*")).pointer_depth(), 1);
        assert_eq!(TypeRef::new("utf8", Some("char**")).pointer_depth(), 2);
        assert_eq!(TypeRef::new("gint", Some("int")).pointer_depth(), 0);
        assert!(TypeRef::new("gpointer", Some("gpointer")).is_pointer());
    }
}
