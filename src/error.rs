//! Error types for the composition engine.

use std::fmt;
use std::sync::Arc;

/// Service composition errors
///
/// Represents the error conditions that can occur during service definition,
/// construction, or resolution in service-loom.
///
/// All variants are cheaply cloneable: a failed asynchronous resolution is
/// memoized as a shared future, and every consumer awaiting it receives its
/// own copy of the failure.
///
/// # Examples
///
/// ```rust
/// use service_loom::LoomError;
///
/// let circular = LoomError::Circular {
///     service: "a".to_string(),
///     chain: vec!["a".into(), "c".into(), "b".into(), "a".into()],
/// };
/// assert_eq!(
///     circular.to_string(),
///     "Circular dependency error with a at a => c => b => a"
/// );
/// ```
#[derive(Debug, Clone)]
pub enum LoomError {
    /// A definition attempted to use the reserved `"$"` name
    ReservedName(String),
    /// A definition reused an already-registered name
    DuplicateService(String),
    /// A service's resolution re-entered itself (includes the loading chain)
    ///
    /// The chain is grown by prepending each entered name, so it reads from
    /// the re-entered service back to the resolution root.
    Circular {
        /// The service whose resolution was re-entered
        service: String,
        /// The loading chain at the point of detection
        chain: Vec<String>,
    },
    /// A dependency name had neither a registry entry nor a context value
    Unresolved {
        /// The missing dependency name
        dependency: String,
        /// Context keys known at the point of failure
        known: Vec<String>,
        /// The loading chain at the point of failure
        chain: Vec<String>,
    },
    /// An accessor was requested for a name with no registered service
    UnknownService(String),
    /// A setter was invoked for a name outside the builder's remaining set
    UnknownSetter(String),
    /// A positional argument or resolved value had an unexpected type
    TypeMismatch(&'static str),
    /// A synchronous read was attempted on a still-pending value
    NotSettled(String),
    /// A provider failed; the original error is carried unchanged
    Provider(Arc<dyn std::error::Error + Send + Sync>),
}

impl LoomError {
    /// Wraps an arbitrary provider error for propagation through resolution.
    pub fn provider<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        LoomError::Provider(Arc::new(err))
    }

    /// Wraps a plain message as a provider error.
    pub fn provider_msg(msg: impl Into<String>) -> Self {
        LoomError::Provider(Arc::new(ProviderMessage(msg.into())))
    }
}

/// String-only provider failure used by [`LoomError::provider_msg`].
#[derive(Debug)]
struct ProviderMessage(String);

impl fmt::Display for ProviderMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ProviderMessage {}

impl fmt::Display for LoomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoomError::ReservedName(name) => {
                write!(f, "{} is a reserved internal dependency for factory functions", name)
            }
            LoomError::DuplicateService(name) => write!(f, "Already have {} registered", name),
            LoomError::Circular { service, chain } => {
                write!(
                    f,
                    "Circular dependency error with {} at {}",
                    service,
                    chain.join(" => ")
                )
            }
            LoomError::Unresolved {
                dependency,
                known,
                chain,
            } => {
                write!(
                    f,
                    "Failed to resolve {} from [{}] at {}",
                    dependency,
                    known.join(", "),
                    chain.join(" => ")
                )
            }
            LoomError::UnknownService(name) => write!(f, "Service not found: {}", name),
            LoomError::UnknownSetter(name) => {
                write!(f, "No setter for {}: not an unsupplied dependency", name)
            }
            LoomError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            LoomError::NotSettled(name) if name.is_empty() => {
                write!(f, "Value is still pending; settle it first")
            }
            LoomError::NotSettled(name) => {
                write!(f, "Value for {} is still pending; settle it first", name)
            }
            LoomError::Provider(err) => write!(f, "Provider error: {}", err),
        }
    }
}

impl std::error::Error for LoomError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoomError::Provider(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Result type for composition operations
///
/// A convenience alias for `Result<T, LoomError>` used throughout
/// service-loom.
///
/// # Examples
///
/// ```rust
/// use service_loom::{LoomError, LoomResult};
///
/// fn missing() -> LoomResult<()> {
///     Err(LoomError::UnknownService("meal".to_string()))
/// }
///
/// assert_eq!(missing().unwrap_err().to_string(), "Service not found: meal");
/// ```
pub type LoomResult<T> = Result<T, LoomError>;
