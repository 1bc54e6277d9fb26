//! Error types for the Retenet engine.
//!
//! Uses `thiserror` for ergonomic error definition. Errors carry a
//! categorized [`ErrorKind`] plus optional free-form context naming the
//! session, rule, or operation that produced them.

use thiserror::Error;

use crate::value::Type;

/// Result alias used throughout Retenet.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Retenet operations.
#[derive(Debug, Error)]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<String>,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({ctx})")?;
        }
        Ok(())
    }
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: Type, actual: Type) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates an unknown tuple type error.
    #[must_use]
    pub fn unknown_tuple_type(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownTupleType(name.into()))
    }

    /// Creates an unknown property error.
    #[must_use]
    pub fn unknown_property(tuple_type: impl Into<String>, property: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownProperty {
            tuple_type: tuple_type.into(),
            property: property.into(),
        })
    }

    /// Creates a duplicate assert error.
    #[must_use]
    pub fn duplicate_assert(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateAssert(key.into()))
    }

    /// Creates a handle-not-found error.
    #[must_use]
    pub fn handle_not_found(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::HandleNotFound(key.into()))
    }

    /// Creates an internal invariant-violation error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A tuple descriptor with this name was already registered.
    #[error("duplicate tuple type: {0}")]
    DuplicateTupleType(String),

    /// A descriptor declared the same property name twice.
    #[error("duplicate property: {property} on tuple type {tuple_type}")]
    DuplicateProperty {
        /// The tuple type being registered.
        tuple_type: String,
        /// The repeated property name.
        property: String,
    },

    /// A descriptor declared no properties.
    #[error("tuple type {0} declares no properties")]
    EmptyDescriptor(String),

    /// The descriptor document could not be parsed.
    #[error("malformed tuple descriptor: {0}")]
    DescriptorParse(String),

    /// No descriptor is registered under this name.
    #[error("unknown tuple type: {0}")]
    UnknownTupleType(String),

    /// The tuple type has no such property.
    #[error("unknown property: {property} on tuple type {tuple_type}")]
    UnknownProperty {
        /// The tuple type that was accessed.
        tuple_type: String,
        /// The property name that was not found.
        property: String,
    },

    /// A value did not match the declared property type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: Type,
        /// The actual type encountered.
        actual: Type,
    },

    /// A property was read before any value was set.
    #[error("property not set: {property} on tuple type {tuple_type}")]
    PropertyUnset {
        /// The tuple type that was accessed.
        tuple_type: String,
        /// The property that has no value.
        property: String,
    },

    /// A key property was mutated after construction.
    #[error("key property is immutable: {property} on tuple type {tuple_type}")]
    KeyPropertyImmutable {
        /// The tuple type that was accessed.
        tuple_type: String,
        /// The key property that was written.
        property: String,
    },

    /// Wrong number of key values passed to the tuple constructor.
    #[error("key arity mismatch on tuple type {tuple_type}: expected {expected}, got {actual}")]
    KeyArityMismatch {
        /// The tuple type being constructed.
        tuple_type: String,
        /// Number of declared key properties.
        expected: usize,
        /// Number of key values supplied.
        actual: usize,
    },

    /// A tuple with this key already has a live handle in the network.
    #[error("duplicate assert: a live handle exists for key {0}")]
    DuplicateAssert(String),

    /// No live handle exists for this tuple key.
    #[error("no handle for key {0}")]
    HandleNotFound(String),

    /// A rule with this name is already registered.
    #[error("duplicate rule: {0}")]
    DuplicateRule(String),

    /// No rule is registered under this name.
    #[error("no such rule: {0}")]
    NoSuchRule(String),

    /// A rule failed structural validation.
    #[error("invalid rule {rule}: {reason}")]
    InvalidRule {
        /// The rule that failed validation.
        rule: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The session has not been started.
    #[error("rule session {0} is not started")]
    NotStarted(String),

    /// The session has been unregistered.
    #[error("rule session {0} is closed")]
    SessionClosed(String),

    /// Internal error (engine invariant violation).
    #[error("internal error: {0}")]
    Internal(String),
}
