//! Authentication result codes and the result value.

use serde::{Deserialize, Serialize};

/// Outcome code of an authentication attempt.
///
/// The numeric values are a stable contract: any positive code is a success,
/// zero and below are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ResultCode {
    /// General, unspecified failure.
    Failure = 0,
    /// No identity matched the supplied credentials.
    FailureIdentityNotFound = -1,
    /// More than one identity matched the supplied credentials.
    FailureIdentityAmbiguous = -2,
    /// The identity exists but the credential is wrong.
    FailureCredentialInvalid = -3,
    /// The credential backend could not be reached.
    FailureCommunication = -4,
    /// A failure that fits no other category.
    FailureUncategorized = -5,
    /// Authentication succeeded.
    Success = 1,
}

impl ResultCode {
    /// The numeric value of the code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Whether the code denotes a successful authentication.
    pub fn is_valid(self) -> bool {
        self.code() > 0
    }
}

/// The result of an authentication attempt: a code plus the identity to
/// store when the attempt succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult<I> {
    code: ResultCode,
    identity: Option<I>,
}

impl<I> AuthResult<I> {
    /// Create a result from a code and an optional identity.
    pub fn new(code: ResultCode, identity: Option<I>) -> Self {
        Self { code, identity }
    }

    /// A successful result carrying the authenticated identity.
    pub fn success(identity: I) -> Self {
        Self::new(ResultCode::Success, Some(identity))
    }

    /// A failed result with the given code and no identity.
    pub fn failure(code: ResultCode) -> Self {
        Self::new(code, None)
    }

    /// Whether the attempt succeeded.
    pub fn is_valid(&self) -> bool {
        self.code.is_valid()
    }

    /// The result code.
    pub fn code(&self) -> ResultCode {
        self.code
    }

    /// The identity to store, when present.
    pub fn identity(&self) -> Option<&I> {
        self.identity.as_ref()
    }

    /// Consume the result, yielding the identity.
    pub fn into_identity(self) -> Option<I> {
        self.identity
    }
}
