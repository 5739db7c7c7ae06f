//! Credential verification.

use crate::result::AuthResult;

/// A set of credentials that can be verified against some identity source.
///
/// Verification itself never errors: outcomes, including infrastructure
/// problems like an unreachable backend, are reported through the
/// [`ResultCode`](crate::ResultCode) of the returned result.
pub trait Credentials {
    /// The identity type produced on success.
    type Identity;

    /// Verify the credentials and report the outcome.
    fn authenticate(&self) -> AuthResult<Self::Identity>;
}
