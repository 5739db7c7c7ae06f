//! Security domains: named boundaries that verify events against one policy.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{AuthorizationError, Result};
use crate::event::{Decision, Event};
use crate::policy::Policy;

/// A named security boundary owning at most one policy at a time.
///
/// Domains are created only by a [`PolicyManager`](crate::PolicyManager),
/// which stamps each one with its own opaque token. The token is what lets
/// the manager recognize its domains later; a look-alike constructed
/// elsewhere can never carry it.
pub struct Domain {
    name: String,
    owner: Uuid,
    policy: RwLock<Option<Arc<dyn Policy>>>,
}

impl Domain {
    pub(crate) fn new(name: String, owner: Uuid) -> Self {
        Self {
            name,
            owner,
            policy: RwLock::new(None),
        }
    }

    pub(crate) fn owner_token(&self) -> Uuid {
        self.owner
    }

    pub(crate) fn set_policy(&self, policy: Arc<dyn Policy>) {
        *self.policy.write() = Some(policy);
    }

    /// The domain name, unique within its manager.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The currently bound policy, shared by reference.
    pub fn policy(&self) -> Option<Arc<dyn Policy>> {
        self.policy.read().clone()
    }

    /// Name of the currently bound policy.
    pub fn policy_name(&self) -> Option<String> {
        self.policy.read().as_ref().map(|p| p.name().to_owned())
    }

    /// Whether a policy is bound.
    pub fn has_policy(&self) -> bool {
        self.policy.read().is_some()
    }

    /// Verify an event, screaming on denial.
    ///
    /// A missing policy is a fatal configuration error, never a silent deny.
    /// An already-decided event skips policy dispatch entirely, so verifying
    /// the same event twice does not re-invoke the policy. A `Deny` outcome
    /// is raised as [`AuthorizationError::PermissionDenied`]; call sites that
    /// must abort on denial use this variant.
    pub fn verify_scream<'s>(&self, mut event: Event<'s>) -> Result<Event<'s>> {
        let policy = self.require_policy(&event)?;
        if event.decision().is_none() {
            policy.process_event(&mut event)?;
        }
        if event.decision() == Some(Decision::Deny) {
            debug!(domain = %self.name, event = event.name(), "permission denied");
            return Err(AuthorizationError::PermissionDenied {
                event: event.name().to_owned(),
            });
        }
        Ok(event)
    }

    /// Verify an event, folding failures into a deny decision.
    ///
    /// Identical dispatch to [`Domain::verify_scream`], but any failure
    /// raised during policy processing is interpreted as a denial on the
    /// event and the event is always returned. Callers branch on
    /// [`Event::decision`] instead of unwinding; the trade-off is that a
    /// misconfigured policy is indistinguishable from a denial by rule. A
    /// missing policy still fails: that is a configuration error of the
    /// domain itself, not of its policy.
    pub fn verify<'s>(&self, mut event: Event<'s>) -> Result<Event<'s>> {
        let policy = self.require_policy(&event)?;
        if event.decision().is_none() {
            if let Err(error) = policy.process_event(&mut event) {
                warn!(
                    domain = %self.name,
                    event = event.name(),
                    %error,
                    "policy dispatch failed, interpreting as denial"
                );
                event.set_allowed(false);
            }
        }
        Ok(event)
    }

    fn require_policy(&self, event: &Event<'_>) -> Result<Arc<dyn Policy>> {
        self.policy
            .read()
            .clone()
            .ok_or_else(|| AuthorizationError::NoPolicy {
                domain: self.name.clone(),
                event: event.name().to_owned(),
            })
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("name", &self.name)
            .field("policy", &self.policy_name())
            .finish_non_exhaustive()
    }
}
