use std::collections::BTreeMap;

use roxygen::roxygen;

use crate::api::target::Target;
use crate::gir::registered::RegisteredType;
use crate::gir::types::{AnyType, TypeRef};

/// The set of registered types belonging to one introspection namespace.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    name: String,
    types: BTreeMap<String, RegisteredType>,
}

impl Namespace {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredType> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &RegisteredType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Every namespace known to one generator run, plus the target the
/// generated bindings are computed for.
///
/// All lookups during layout, ownership and marshaling analysis go
/// through this value; it is built once at startup and passed by
/// reference, never hidden in a global.
///
/// # Example
///
/// ```
/// use girbindgen::{NamespaceContext, Target};
/// use girbindgen::model::{EnumMember, Enumeration, RegisteredType};
///
/// let ctx = NamespaceContext::builder()
///     .target(Target::parse("x86_64-unknown-linux-gnu").unwrap())
///     .register(
///         "Gtk",
///         RegisteredType::Enumeration(Enumeration {
///             name: "Orientation".to_owned(),
///             c_type: Some("GtkOrientation".to_owned()),
///             get_type: None,
///             members: vec![EnumMember {
///                 name: "horizontal".to_owned(),
///                 value: 0,
///                 c_identifier: None,
///             }],
///         }),
///     )
///     .build();
///
/// assert!(ctx.resolver("Gtk").lookup("Orientation").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct NamespaceContext {
    namespaces: BTreeMap<String, Namespace>,
    target: Target,
}

impl NamespaceContext {
    pub fn builder() -> Builder {
        Builder::new()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    /// A lookup handle that resolves bare type names against `namespace`
    /// and qualified "Ns.Name" references across all namespaces.
    pub fn resolver<'a>(&'a self, namespace: &'a str) -> Resolver<'a> {
        Resolver {
            ctx: self,
            namespace,
        }
    }
}

/// Builder for a [`NamespaceContext`].
pub struct Builder {
    namespaces: BTreeMap<String, Namespace>,
    target: Option<Target>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            namespaces: BTreeMap::new(),
            target: None,
        }
    }

    /// Set the target the layouts are computed for. Defaults to the host.
    #[roxygen]
    pub fn target(
        mut self,
        /// Target triple of the platform the bindings will run on
        target: Target,
    ) -> Self {
        self.target = Some(target);
        self
    }

    /// Register one type under the given namespace. Registering the same
    /// type name twice keeps the later registration.
    #[roxygen]
    pub fn register(
        mut self,
        /// Namespace the type belongs to, e.g. "GLib"
        namespace: impl Into<String>,
        /// The registered type definition
        ty: RegisteredType,
    ) -> Self {
        let namespace = namespace.into();
        let ns = self
            .namespaces
            .entry(namespace.clone())
            .or_insert_with(|| Namespace {
                name: namespace,
                types: BTreeMap::new(),
            });
        ns.types.insert(ty.name().to_owned(), ty);
        self
    }

    pub fn build(self) -> NamespaceContext {
        NamespaceContext {
            namespaces: self.namespaces,
            target: self.target.unwrap_or_else(Target::host),
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`NamespaceContext`] view bound to one current namespace.
///
/// Bare names resolve inside the current namespace; "Ns.Name" references
/// resolve against the named one.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    ctx: &'a NamespaceContext,
    namespace: &'a str,
}

impl<'a> Resolver<'a> {
    pub fn lookup(&self, name: &str) -> Option<&'a RegisteredType> {
        match name.split_once('.') {
            Some((ns, bare)) => self.ctx.namespaces.get(ns)?.types.get(bare),
            None => self.ctx.namespaces.get(self.namespace)?.types.get(name),
        }
    }

    /// The registered type a reference points at, if any.
    pub fn target_of(&self, tref: &TypeRef) -> Option<&'a RegisteredType> {
        self.lookup(&tref.name)
    }

    /// Follow alias chains to the first non-alias type. Cyclic chains
    /// stop at the last step already seen.
    pub fn chase<'t>(&self, ty: &'t AnyType) -> &'t AnyType
    where
        'a: 't,
    {
        let mut seen: Vec<&str> = Vec::new();
        let mut current = ty;
        loop {
            let Some(tref) = current.as_type() else {
                return current;
            };
            if seen.iter().any(|s| *s == tref.name) {
                return current;
            }
            match self.lookup(&tref.name) {
                Some(RegisteredType::Alias(a)) => {
                    seen.push(&tref.name);
                    current = &a.target;
                }
                _ => return current,
            }
        }
    }

    pub fn namespace(&self) -> &str {
        self.namespace
    }

    pub fn target(&self) -> &'a Target {
        self.ctx.target()
    }

    pub fn long_as_int(&self) -> bool {
        self.ctx.target().long_as_int()
    }
}
