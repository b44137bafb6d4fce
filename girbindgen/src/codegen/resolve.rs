//! Destructor and copy-function lookup for registered types.
//!
//! Both searches return `Option`: an empty result is the valid answer "no
//! such function is known", which the ownership classifier degrades from,
//! never an error.

use serde::{Deserialize, Serialize};

use crate::gir::callable::{Callable, CallableKind};
use crate::gir::registered::RegisteredType;

/// Type-metadata records whose lifetime the runtime manages. They never
/// resolve to a destructor or copy function.
const METADATA_C_TYPES: [&str; 3] = ["GTypeInstance", "GTypeClass", "GTypeInterface"];

/// How generated code releases a native value it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestructorRef {
    /// A free-standing function named by an explicit annotation.
    Function { c_identifier: String },
    /// An instance method of the owning type.
    Method { name: String },
    /// The generic boxed free routine, keyed by the type's GType getter.
    BoxedFree { get_type: String },
    /// Drop one reference. Produced for refcounted take-ownership, not by
    /// the search in this module.
    Unref,
}

/// How generated code duplicates a borrowed native value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyRef {
    /// A free-standing function named by an explicit annotation.
    Function { c_identifier: String },
    /// An instance method of the owning type.
    Method { name: String },
    /// The generic boxed copy routine, keyed by the type's GType getter.
    BoxedCopy { get_type: String },
    /// Deep copy through the generic value machinery. `GValue` only.
    ValueCopy,
}

/// Find the destructor for values of `ty`.
///
/// Search order: explicit free-function annotation, then an instance
/// method literally named `free` or `unref` taking nothing and returning
/// nothing, then the generic boxed free for GType-registered aggregates.
pub fn free_function(ty: &RegisteredType) -> Option<DestructorRef> {
    if is_externally_managed(ty) {
        return None;
    }
    let (annotated, methods, get_type) = match ty {
        RegisteredType::Record(rec) => (&rec.free_function, rec.methods.as_slice(), &rec.get_type),
        RegisteredType::Union(u) => (&u.free_function, u.methods.as_slice(), &u.get_type),
        RegisteredType::Boxed(boxed) => {
            return match &boxed.free_function {
                Some(c_identifier) => Some(DestructorRef::Function {
                    c_identifier: c_identifier.clone(),
                }),
                None => Some(DestructorRef::BoxedFree {
                    get_type: boxed.get_type.clone(),
                }),
            };
        }
        _ => return None,
    };
    if let Some(c_identifier) = annotated {
        return Some(DestructorRef::Function {
            c_identifier: c_identifier.clone(),
        });
    }
    methods
        .iter()
        .find(|m| (m.name == "free" || m.name == "unref") && is_destructor_shaped(m))
        .map(|m| DestructorRef::Method {
            name: m.name.clone(),
        })
        .or_else(|| {
            get_type.clone().map(|get_type| DestructorRef::BoxedFree { get_type })
        })
}

/// Find the copy function for values of `ty`.
///
/// Search order: explicit copy-function annotation, the `GValue` value
/// copy, the generic boxed copy for GType-registered aggregates, then an
/// instance method literally named `copy` or `ref` taking nothing and
/// returning a new value.
pub fn copy_function(ty: &RegisteredType) -> Option<CopyRef> {
    if is_externally_managed(ty) {
        return None;
    }
    let (annotated, methods, get_type) = match ty {
        RegisteredType::Record(rec) => (&rec.copy_function, rec.methods.as_slice(), &rec.get_type),
        RegisteredType::Union(u) => (&u.copy_function, u.methods.as_slice(), &u.get_type),
        RegisteredType::Boxed(boxed) => {
            return match &boxed.copy_function {
                Some(c_identifier) => Some(CopyRef::Function {
                    c_identifier: c_identifier.clone(),
                }),
                None => Some(CopyRef::BoxedCopy {
                    get_type: boxed.get_type.clone(),
                }),
            };
        }
        _ => return None,
    };
    if let Some(c_identifier) = annotated {
        return Some(CopyRef::Function {
            c_identifier: c_identifier.clone(),
        });
    }
    if ty.c_type() == Some("GValue") {
        return Some(CopyRef::ValueCopy);
    }
    if let Some(get_type) = get_type {
        return Some(CopyRef::BoxedCopy {
            get_type: get_type.clone(),
        });
    }
    methods
        .iter()
        .find(|m| (m.name == "copy" || m.name == "ref") && is_copy_shaped(m))
        .map(|m| CopyRef::Method {
            name: m.name.clone(),
        })
}

/// Types whose lifetime is managed outside the generated bindings: the
/// runtime's own metadata records and foreign library structs.
pub(crate) fn is_externally_managed(ty: &RegisteredType) -> bool {
    if matches!(ty.c_type(), Some(c) if METADATA_C_TYPES.contains(&c)) {
        return true;
    }
    matches!(ty, RegisteredType::Record(rec) if rec.foreign)
}

fn is_destructor_shaped(m: &Callable) -> bool {
    m.kind == CallableKind::Method
        && !m.throws
        && m.non_instance_parameters().count() == 0
        && m.return_value.is_void()
}

fn is_copy_shaped(m: &Callable) -> bool {
    m.kind == CallableKind::Method
        && !m.throws
        && m.non_instance_parameters().count() == 0
        && !m.return_value.is_void()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gir::callable::{Parameter, ReturnValue, TransferOwnership};
    use crate::gir::field::{ContainerKind, FieldContainer, Member};
    use crate::gir::registered::{Boxed, Enumeration, Record};
    use crate::gir::types::{AnyType, TypeRef};

    fn record(name: &str, c_type: &str) -> Record {
        Record {
            name: name.to_owned(),
            fields: FieldContainer::new(
                ContainerKind::Struct,
                Some(c_type),
                vec![Member::field("dummy", AnyType::named("gint"))],
            ),
            get_type: None,
            pointer: false,
            foreign: false,
            copy_function: None,
            free_function: None,
            methods: Vec::new(),
        }
    }

    fn instance_method(name: &str) -> Callable {
        let mut m = Callable::new(name, CallableKind::Method);
        let mut this = Parameter::new("self", AnyType::named("Path"));
        this.instance = true;
        m.parameters.push(this);
        m
    }

    fn returning(mut m: Callable, ty: &str) -> Callable {
        m.return_value = ReturnValue {
            ty: AnyType::Type(TypeRef::new(ty, None)),
            transfer: TransferOwnership::Full,
            nullable: false,
        };
        m
    }

    #[test]
    fn explicit_annotations_win() {
        let mut rec = record("TreePath", "GtkTreePath");
        rec.free_function = Some("gtk_tree_path_free".to_owned());
        rec.copy_function = Some("gtk_tree_path_copy".to_owned());
        rec.methods.push(instance_method("free"));
        let ty = RegisteredType::Record(rec);

        assert_eq!(
            free_function(&ty),
            Some(DestructorRef::Function {
                c_identifier: "gtk_tree_path_free".to_owned()
            })
        );
        assert_eq!(
            copy_function(&ty),
            Some(CopyRef::Function {
                c_identifier: "gtk_tree_path_copy".to_owned()
            })
        );
    }

    #[test]
    fn free_and_unref_methods_must_take_and_return_nothing() {
        let mut rec = record("Variant", "GVariant");
        rec.methods.push(instance_method("unref"));
        assert_eq!(
            free_function(&RegisteredType::Record(rec.clone())),
            Some(DestructorRef::Method {
                name: "unref".to_owned()
            })
        );

        // An extra argument disqualifies the method.
        let mut wrong = instance_method("free");
        wrong
            .parameters
            .push(Parameter::new("deep", AnyType::named("gboolean")));
        rec.methods = vec![wrong];
        assert_eq!(free_function(&RegisteredType::Record(rec.clone())), None);

        // So does a non-void return.
        rec.methods = vec![returning(instance_method("free"), "gboolean")];
        assert_eq!(free_function(&RegisteredType::Record(rec)), None);
    }

    #[test]
    fn gtype_registered_records_fall_back_to_boxed_free() {
        let mut rec = record("Rectangle", "GdkRectangle");
        rec.get_type = Some("gdk_rectangle_get_type".to_owned());
        let ty = RegisteredType::Record(rec);

        assert_eq!(
            free_function(&ty),
            Some(DestructorRef::BoxedFree {
                get_type: "gdk_rectangle_get_type".to_owned()
            })
        );
        assert_eq!(
            copy_function(&ty),
            Some(CopyRef::BoxedCopy {
                get_type: "gdk_rectangle_get_type".to_owned()
            })
        );
    }

    #[test]
    fn copy_and_ref_methods_must_return_a_value() {
        let mut rec = record("Matrix", "CairoMatrix");
        rec.methods.push(returning(instance_method("copy"), "Matrix"));
        assert_eq!(
            copy_function(&RegisteredType::Record(rec.clone())),
            Some(CopyRef::Method {
                name: "copy".to_owned()
            })
        );

        rec.methods = vec![instance_method("copy")];
        assert_eq!(copy_function(&RegisteredType::Record(rec)), None);
    }

    #[test]
    fn gvalue_copies_through_the_value_machinery() {
        let ty = RegisteredType::Record(record("Value", "GValue"));
        assert_eq!(copy_function(&ty), Some(CopyRef::ValueCopy));
    }

    #[test]
    fn boxed_types_use_their_type_tag() {
        let boxed = RegisteredType::Boxed(Boxed {
            name: "Pixbuf".to_owned(),
            c_type: None,
            get_type: "gdk_pixbuf_get_type".to_owned(),
            copy_function: None,
            free_function: Some("gdk_pixbuf_free".to_owned()),
        });
        assert_eq!(
            free_function(&boxed),
            Some(DestructorRef::Function {
                c_identifier: "gdk_pixbuf_free".to_owned()
            })
        );
        assert_eq!(
            copy_function(&boxed),
            Some(CopyRef::BoxedCopy {
                get_type: "gdk_pixbuf_get_type".to_owned()
            })
        );
    }

    #[test]
    fn excluded_types_never_resolve() {
        let mut foreign = record("Surface", "cairo_surface_t");
        foreign.foreign = true;
        foreign.free_function = Some("cairo_surface_destroy".to_owned());
        assert_eq!(free_function(&RegisteredType::Record(foreign)), None);

        let mut meta = record("TypeInstance", "GTypeInstance");
        meta.methods.push(instance_method("free"));
        let meta = RegisteredType::Record(meta);
        assert_eq!(free_function(&meta), None);
        assert_eq!(copy_function(&meta), None);

        let enumeration = RegisteredType::Enumeration(Enumeration {
            name: "Orientation".to_owned(),
            c_type: None,
            get_type: None,
            members: Vec::new(),
        });
        assert_eq!(free_function(&enumeration), None);
    }
}
