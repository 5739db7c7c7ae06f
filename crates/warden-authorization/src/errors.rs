//! Error types for the authorization engine.

use thiserror::Error;

/// Errors raised by the verification engine.
///
/// The taxonomy is deliberate: configuration mistakes (`NoPolicy`,
/// `UnknownDomain`, `UnknownPolicy`) are fatal and never retried, lock and
/// ownership violations are always surfaced, and `PermissionDenied` is only
/// raised on the screaming verification path. The quiet path converts any
/// dispatch failure into a deny decision instead.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// A domain was asked to verify an event with no policy bound.
    #[error("cannot verify the event `{event}` in domain `{domain}`: no policy is set")]
    NoPolicy {
        /// Name of the domain that has no policy.
        domain: String,
        /// Name of the event that was being verified.
        event: String,
    },

    /// The screaming verification path reports a denial as a hard failure.
    #[error("the permission to execute the event `{event}` has not been granted")]
    PermissionDenied {
        /// Name of the denied event.
        event: String,
    },

    /// An event argument was read that was never declared.
    #[error("the event `{event}` has no `{parameter}` parameter")]
    NoSuchParameter {
        /// Name of the event.
        event: String,
        /// Name of the missing parameter.
        parameter: String,
    },

    /// A structural mutation was attempted while the manager is locked.
    #[error("cannot {operation}: the policy manager is locked")]
    Locked {
        /// The operation that was refused.
        operation: &'static str,
    },

    /// No domain is registered under this name.
    #[error("the domain `{0}` does not exist")]
    UnknownDomain(String),

    /// No policy is registered under this name.
    #[error("the policy `{0}` does not exist")]
    UnknownPolicy(String),

    /// A domain with this name is already registered.
    #[error("the domain `{0}` is already registered")]
    DuplicateDomain(String),

    /// A policy with this name is already registered.
    #[error("the policy `{0}` is already registered")]
    DuplicatePolicy(String),

    /// A caller presented a domain that this manager did not create.
    #[error("attempting to use a hostile domain in the system")]
    HostileDomain,

    /// A policy handler or `initialize` hook failed.
    #[error("policy error: {0}")]
    Policy(String),
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, AuthorizationError>;
