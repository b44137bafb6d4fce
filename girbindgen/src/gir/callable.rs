//! Callables and their value slots: parameters, return values, properties,
//! transfer and direction annotations, callback scopes.

use serde::{Deserialize, Serialize};

use crate::gir::types::AnyType;

/// Who owns a value after it crosses the boundary.
///
/// `None`: the producing side keeps ownership and the consumer must not
/// free. `Full`: ownership moves with the value. `Container`: only the
/// container structure moves; the elements stay owned where they were.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferOwnership {
    #[default]
    None,
    Container,
    Full,
}

/// Data flow direction of a parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    In,
    Out,
    InOut,
}

/// How long a callback passed across the boundary stays alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeClass {
    /// Valid for the duration of one call.
    Call,
    /// Tied to the lifetime of the receiving instance.
    Bound,
    /// Released when the paired destroy-notify fires.
    Notified,
    /// Released when the async completion callback fires.
    Async,
    /// Never released.
    Forever,
}

/// What kind of callable a parameter list belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallableKind {
    #[default]
    Function,
    Constructor,
    Method,
    VirtualMethod,
    Signal,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: AnyType,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub transfer: TransferOwnership,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub caller_allocates: bool,
    #[serde(default)]
    pub instance: bool,
    #[serde(default)]
    pub varargs: bool,
    /// Declared callback scope, when the parameter is a callback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeClass>,
    /// Index of the sibling parameter carrying the callback's user data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closure: Option<usize>,
    /// Index of the sibling destroy-notify parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroy: Option<usize>,
}

impl Parameter {
    pub fn new(name: &str, ty: AnyType) -> Self {
        Self {
            name: name.to_owned(),
            ty,
            direction: Direction::In,
            transfer: TransferOwnership::None,
            nullable: false,
            caller_allocates: false,
            instance: false,
            varargs: false,
            scope: None,
            closure: None,
            destroy: None,
        }
    }

    /// The trailing `GError**` slot of a throwing callable.
    pub fn is_error(&self) -> bool {
        matches!(
            self.ty.as_type().and_then(|t| t.c_type.as_deref()),
            Some("GError**")
        )
    }

    /// A `GDestroyNotify` slot paired with a notified-scope callback.
    pub fn is_destroy_notify(&self) -> bool {
        match self.ty.as_type() {
            Some(t) => {
                t.c_type.as_deref() == Some("GDestroyNotify")
                    || t.name == "GLib.DestroyNotify"
            }
            None => false,
        }
    }
}

/// The returned value of a callable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnValue {
    pub ty: AnyType,
    #[serde(default)]
    pub transfer: TransferOwnership,
    #[serde(default)]
    pub nullable: bool,
}

impl ReturnValue {
    pub fn void() -> Self {
        Self {
            ty: AnyType::named("none"),
            transfer: TransferOwnership::None,
            nullable: false,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.ty.as_type(), Some(t) if t.is_void())
    }
}

impl Default for ReturnValue {
    fn default() -> Self {
        Self::void()
    }
}

/// A function, method, constructor, virtual method or signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_identifier: Option<String>,
    #[serde(default)]
    pub kind: CallableKind,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub return_value: ReturnValue,
    #[serde(default)]
    pub throws: bool,
}

impl Callable {
    pub fn new(name: &str, kind: CallableKind) -> Self {
        Self {
            name: name.to_owned(),
            c_identifier: None,
            kind,
            parameters: Vec::new(),
            return_value: ReturnValue::void(),
            throws: false,
        }
    }

    /// Parameters other than the instance slot.
    pub fn non_instance_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| !p.instance)
    }

    /// True when some callback parameter routes its user data through the
    /// parameter at `index`.
    pub fn is_user_data(&self, index: usize) -> bool {
        self.parameters.iter().any(|p| p.closure == Some(index))
    }

    /// True when some callback parameter routes its destroy notifier
    /// through the parameter at `index`.
    pub fn is_destroy_for(&self, index: usize) -> bool {
        self.parameters.iter().any(|p| p.destroy == Some(index))
    }

    /// True when an array parameter or the array return value reads its
    /// element count from the parameter at `index`.
    pub fn is_array_length(&self, index: usize) -> bool {
        let in_params = self
            .parameters
            .iter()
            .filter_map(|p| p.ty.as_array())
            .any(|a| a.length_index == Some(index));
        let in_return = self
            .return_value
            .ty
            .as_array()
            .map(|a| a.length_index == Some(index))
            .unwrap_or(false);
        in_params || in_return
    }
}

/// A declared object property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub ty: AnyType,
    #[serde(default)]
    pub transfer: TransferOwnership,
}

/// Resolve the effective scope of a callback parameter.
///
/// The declared scope defaults to `Bound`. `Bound` inside a free function
/// or constructor has no instance to bind to and promotes to `Forever`;
/// `Notified` without a destroy-notify sibling can never be released and
/// promotes to `Forever` as well.
pub fn scope_class(param: &Parameter, host: CallableKind) -> ScopeClass {
    match param.scope.unwrap_or(ScopeClass::Bound) {
        ScopeClass::Bound
            if matches!(host, CallableKind::Function | CallableKind::Constructor) =>
        {
            ScopeClass::Forever
        }
        ScopeClass::Notified if param.destroy.is_none() => ScopeClass::Forever,
        declared => declared,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gir::types::{ArrayType, TypeRef};

    #[test]
    fn bound_scope_promotes_outside_methods() {
        let cb = Parameter::new("callback", AnyType::named("Gio.AsyncReadyCallback"));
        assert_eq!(scope_class(&cb, CallableKind::Function), ScopeClass::Forever);
        assert_eq!(
            scope_class(&cb, CallableKind::Constructor),
            ScopeClass::Forever
        );
        assert_eq!(scope_class(&cb, CallableKind::Method), ScopeClass::Bound);
    }

    #[test]
    fn notified_without_destroy_never_releases() {
        let mut cb = Parameter::new("callback", AnyType::named("GLib.SourceFunc"));
        cb.scope = Some(ScopeClass::Notified);
        assert_eq!(scope_class(&cb, CallableKind::Method), ScopeClass::Forever);
        cb.destroy = Some(2);
        assert_eq!(scope_class(&cb, CallableKind::Method), ScopeClass::Notified);
    }

    #[test]
    fn hidden_slots_are_found_by_sibling_links() {
        let mut func = Callable::new("spawn", CallableKind::Function);
        let mut cb = Parameter::new("func", AnyType::named("GLib.SourceFunc"));
        cb.closure = Some(1);
        cb.destroy = Some(2);
        func.parameters.push(cb);
        func.parameters
            .push(Parameter::new("data", AnyType::named("gpointer")));
        func.parameters.push(Parameter::new(
            "notify",
            AnyType::Type(TypeRef::new("GLib.DestroyNotify", Some("GDestroyNotify"))),
        ));
        assert!(func.is_user_data(1));
        assert!(func.is_destroy_for(2));
        assert!(func.parameters[2].is_destroy_notify());
        assert!(!func.is_user_data(0));
    }

    #[test]
    fn array_length_links_cover_params_and_return() {
        let mut func = Callable::new("get_items", CallableKind::Function);
        let mut arr = ArrayType::of(AnyType::named("utf8"));
        arr.length_index = Some(0);
        func.parameters
            .push(Parameter::new("n_items", AnyType::named("gsize")));
        func.return_value = ReturnValue {
            ty: AnyType::Array(arr),
            transfer: TransferOwnership::Full,
            nullable: false,
        };
        assert!(func.is_array_length(0));
        assert!(!func.is_array_length(1));
    }
}
