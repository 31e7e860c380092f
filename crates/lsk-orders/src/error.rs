//! Domain error taxonomy shared by the order, payment, and dispute engines.
//!
//! Validation / authorization / conflict errors return synchronously to the
//! caller with no retry. External-dependency failures either degrade (the
//! payment fallback page) or propagate as [`MarketError::External`]. Lock
//! wait exhaustion surfaces as a retryable conflict, never as a silent
//! unsynchronized pass-through.

use lsk_directory::DirectoryError;
use lsk_lock::LockError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// Bad input shape or values.
    Validation(String),
    /// Unknown duration unit or non-positive duration.
    InvalidDuration(String),
    /// Entity lookup failed; the payload names the entity kind.
    NotFound(&'static str),
    /// No identity in the request context.
    Unauthorized,
    /// Identity present but lacks the required ownership or role.
    Forbidden(&'static str),
    /// The resource is not `listed`.
    ResourceUnavailable,
    /// Requester owns the resource.
    SelfLeaseForbidden,
    /// An open order for this (resource, tenant) pair already exists.
    DuplicateOrder,
    /// An unresolved appeal for this order already exists.
    DuplicateAppeal,
    /// The entity is not in a source state the operation accepts.
    WrongState {
        operation: &'static str,
        actual: String,
    },
    /// The create lock could not be won within the wait window. Retryable.
    LockTimeout,
    /// Webhook signature verification failed.
    SignatureInvalid,
    /// A consumed collaborator (gateway, lock backend, directory, store)
    /// failed and no degrade path applied.
    External(String),
}

impl std::fmt::Display for MarketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketError::Validation(msg) => write!(f, "validation failed: {msg}"),
            MarketError::InvalidDuration(msg) => write!(f, "invalid lease duration: {msg}"),
            MarketError::NotFound(what) => write!(f, "{what} not found"),
            MarketError::Unauthorized => write!(f, "no identity in request context"),
            MarketError::Forbidden(why) => write!(f, "forbidden: {why}"),
            MarketError::ResourceUnavailable => write!(f, "resource is not listed for lease"),
            MarketError::SelfLeaseForbidden => write!(f, "cannot lease your own resource"),
            MarketError::DuplicateOrder => {
                write!(f, "an open order already exists for this resource")
            }
            MarketError::DuplicateAppeal => {
                write!(f, "an unresolved appeal already exists for this order")
            }
            MarketError::WrongState { operation, actual } => {
                write!(f, "{operation} rejected: order state is {actual}")
            }
            MarketError::LockTimeout => write!(f, "booking lock busy; retry shortly"),
            MarketError::SignatureInvalid => write!(f, "callback signature verification failed"),
            MarketError::External(msg) => write!(f, "external dependency failed: {msg}"),
        }
    }
}

impl std::error::Error for MarketError {}

impl From<LockError> for MarketError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::Timeout { .. } => MarketError::LockTimeout,
            LockError::Unavailable(msg) => MarketError::External(msg),
        }
    }
}

impl From<DirectoryError> for MarketError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::NotFound(_) => MarketError::NotFound("resource"),
            DirectoryError::Invalid(msg) => MarketError::External(msg),
            DirectoryError::Unavailable(msg) => MarketError::External(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_timeout_maps_to_retryable_conflict() {
        let e: MarketError = LockError::Timeout {
            key: "order:create:1:2".to_string(),
        }
        .into();
        assert_eq!(e, MarketError::LockTimeout);
    }

    #[test]
    fn lock_backend_failure_is_external_not_silent() {
        let e: MarketError = LockError::Unavailable("connection refused".to_string()).into();
        assert!(matches!(e, MarketError::External(_)));
    }
}
