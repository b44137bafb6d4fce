use thiserror::Error;

/// Errors produced by layout computation, marshaling and model loading.
///
/// Absence of a destructor or copy function is not an error: the resolver
/// returns `None` for those and callers treat it as a valid answer.
#[derive(Debug, Error)]
pub enum Error {
    /// A memory layout was requested for a type whose native layout is
    /// unknown. Callers recover by falling back to an address-only
    /// representation.
    #[error("cannot compute a memory layout for opaque type `{0}`")]
    OpaqueLayout(String),

    /// A raw integer read from native memory does not match any declared
    /// member of the enumeration. Never silently defaulted.
    #[error("value {value} does not match any member of enum `{enum_name}`")]
    UnknownEnumValue { enum_name: String, value: i64 },

    /// A wrapped enum or flag member name is not declared by the type.
    #[error("`{member}` is not a member of `{enum_name}`")]
    UnknownEnumMember { enum_name: String, member: String },

    /// NULL crossed the boundary in a slot that is not annotated nullable.
    #[error("unexpected NULL value for non-nullable type `{0}`")]
    UnexpectedNull(String),

    /// A list, map or array element type has no derivable marshaling
    /// recipe. Fails generation for that member only.
    #[error("unsupported element type `{0}`")]
    UnsupportedElementType(String),

    /// A runtime value does not have the shape its marshal plan requires.
    #[error("value shape mismatch: expected {expected}")]
    ValueShape { expected: String },

    /// A JSONL model file contains a line that does not parse as a record.
    #[error("{path}:{line}: malformed model record: {message}")]
    ModelFormat {
        path: String,
        line: usize,
        message: String,
    },

    /// Reading a model file failed at the filesystem level.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
