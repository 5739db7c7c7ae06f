//! The policy manager: root factory and gatekeeper for domains and policies.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::Domain;
use crate::errors::{AuthorizationError, Result};
use crate::event::Event;
use crate::policy::{Policy, PolicyArgs};

/// Deferred policy constructor. It receives the registered policy name and is
/// invoked at most once, on first use of the policy.
pub type PolicyConstructor = Box<dyn Fn(&str) -> Box<dyn Policy> + Send + Sync>;

/// Registry entry: a policy is registered deferred and upgraded to a live
/// instance on first resolution.
enum PolicyEntry {
    Deferred(PolicyConstructor),
    Live(Arc<dyn Policy>),
}

#[derive(Default)]
struct ManagerState {
    domains: HashMap<String, Arc<Domain>>,
    policies: HashMap<String, PolicyEntry>,
    internal_domain: Option<Arc<Domain>>,
    policy_args: PolicyArgs,
    locked: bool,
}

/// The root authority over domains and policies.
///
/// The manager creates domains, binds policies to them (instantiating policy
/// objects lazily, one live instance per registered name), and enforces a
/// lock/unlock protocol gating structural mutation of the domain/policy
/// graph. While locked, only code holding a domain recognized as the
/// manager's designated internal domain can unlock it again.
///
/// Every created domain is stamped with the manager's instance-unique key, so
/// [`PolicyManager::verify_domain`] recognizes exactly the domains this
/// manager created — a domain from another manager, or one forged elsewhere,
/// is rejected. The key is an opaque local token, not a security-grade
/// secret.
///
/// All mutable state sits behind a single mutex, and the mutex is never held
/// across policy dispatch, so policy handlers are free to call back into the
/// manager.
pub struct PolicyManager {
    key: Uuid,
    state: Mutex<ManagerState>,
}

impl PolicyManager {
    /// Create an unlocked manager with a fresh ownership key.
    pub fn new() -> Self {
        Self {
            key: Uuid::new_v4(),
            state: Mutex::new(ManagerState::default()),
        }
    }

    /// Set the arguments injected into every lazily-created policy.
    pub fn set_policy_arguments(&self, args: PolicyArgs) {
        self.state.lock().policy_args = args;
    }

    /// Check that a domain really belongs to this manager. This is an
    /// ownership-token comparison, not a name check: it holds exactly for
    /// domains returned by this instance's [`PolicyManager::create_domain`].
    pub fn verify_domain(&self, domain: &Domain) -> bool {
        domain.owner_token() == self.key
    }

    /// Register a policy under a short name. The policy is constructed
    /// lazily, on first use; the constructor receives the registered name.
    pub fn add_policy<F>(&self, name: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn(&str) -> Box<dyn Policy> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut state = self.state.lock();
        if state.policies.contains_key(&name) {
            return Err(AuthorizationError::DuplicatePolicy(name));
        }
        state
            .policies
            .insert(name, PolicyEntry::Deferred(Box::new(constructor)));
        Ok(())
    }

    /// Whether a policy is registered under this name.
    pub fn has_policy(&self, name: &str) -> bool {
        self.state.lock().policies.contains_key(name)
    }

    /// Create a security domain with the given name and optional initial
    /// policy. Fails while the manager is locked, and on a duplicate name.
    /// Both the caller and the manager hold a reference to the new domain.
    pub fn create_domain(
        &self,
        name: impl Into<String>,
        initial_policy: Option<&str>,
    ) -> Result<Arc<Domain>> {
        let name = name.into();
        let mut state = self.state.lock();
        if state.locked {
            return Err(AuthorizationError::Locked {
                operation: "create a domain",
            });
        }
        if state.domains.contains_key(&name) {
            return Err(AuthorizationError::DuplicateDomain(name));
        }

        // Resolve the initial policy before registering anything, so an
        // unknown policy name leaves no half-created domain behind.
        let policy = match initial_policy {
            Some(policy_name) => Some(Self::resolve_policy(&mut state, policy_name)?),
            None => None,
        };

        let domain = Arc::new(Domain::new(name.clone(), self.key));
        if let Some(policy) = policy {
            domain.set_policy(policy);
        }
        state.domains.insert(name, Arc::clone(&domain));
        Ok(domain)
    }

    /// Whether a domain is registered under this name.
    pub fn has_domain(&self, name: &str) -> bool {
        self.state.lock().domains.contains_key(name)
    }

    /// Bind a registered policy to a registered domain. Fails while locked.
    pub fn set_domain_policy(&self, domain_name: &str, policy_name: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.locked {
            return Err(AuthorizationError::Locked {
                operation: "set the domain policy",
            });
        }
        let policy = Self::resolve_policy(&mut state, policy_name)?;
        let domain = state
            .domains
            .get(domain_name)
            .ok_or_else(|| AuthorizationError::UnknownDomain(domain_name.to_owned()))?;
        domain.set_policy(policy);
        Ok(())
    }

    /// Name of the policy bound to a domain, if any.
    pub fn domain_policy(&self, domain_name: &str) -> Result<Option<String>> {
        let state = self.state.lock();
        let domain = state
            .domains
            .get(domain_name)
            .ok_or_else(|| AuthorizationError::UnknownDomain(domain_name.to_owned()))?;
        Ok(domain.policy_name())
    }

    /// Designate the domain whose policy authorizes manager-related events
    /// while the manager is locked. Fails while locked.
    pub fn set_internal_domain(&self, domain_name: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.locked {
            return Err(AuthorizationError::Locked {
                operation: "set the internal domain",
            });
        }
        let domain = state
            .domains
            .get(domain_name)
            .ok_or_else(|| AuthorizationError::UnknownDomain(domain_name.to_owned()))?
            .clone();
        state.internal_domain = Some(domain);
        Ok(())
    }

    /// Name of the internal domain, if one is designated.
    pub fn internal_domain_name(&self) -> Option<String> {
        self.state
            .lock()
            .internal_domain
            .as_ref()
            .map(|domain| domain.name().to_owned())
    }

    /// Lock the manager, freezing structural mutation. Always succeeds.
    pub fn lock(&self) {
        self.state.lock().locked = true;
        debug!("policy manager locked");
    }

    /// Unlock the manager.
    ///
    /// With no internal domain designated, the manager unlocks
    /// unconditionally. Otherwise the caller must present a domain created by
    /// this manager — anything else is a hostile domain and fails hard — and
    /// the internal domain's policy must explicitly allow the synthetic event
    /// `policyManager.unlock`, which carries the presented domain's name as
    /// the `domainName` argument. Default-deny applies: a policy with no
    /// handler for the event keeps the manager locked.
    pub fn unlock(&self, presented: &Domain) -> Result<()> {
        let internal = self.state.lock().internal_domain.clone();
        if let Some(internal) = internal {
            if !self.verify_domain(presented) {
                warn!(
                    domain = presented.name(),
                    "unlock attempted with a hostile domain"
                );
                return Err(AuthorizationError::HostileDomain);
            }
            let mut event = Event::new(self, "policyManager.unlock");
            event.set_arg("domainName", Value::from(presented.name()));
            internal.verify_scream(event)?;
        }
        // Nobody screamed, so the manager opens up again.
        self.state.lock().locked = false;
        debug!("policy manager unlocked");
        Ok(())
    }

    /// Fetch a registered domain by name.
    ///
    /// Gated the same way as [`PolicyManager::unlock`] whenever an internal
    /// domain is designated: the presented domain must pass
    /// [`PolicyManager::verify_domain`], and the internal domain's policy
    /// must allow the synthetic event `policyManager.getDomain`, which
    /// carries the presented domain's name (`domainName`) and the requested
    /// name (`requestedDomain`).
    pub fn get_domain(&self, presented: &Domain, domain_name: &str) -> Result<Arc<Domain>> {
        let internal = self.state.lock().internal_domain.clone();
        if let Some(internal) = internal {
            if !self.verify_domain(presented) {
                warn!(
                    domain = presented.name(),
                    requested = domain_name,
                    "domain lookup attempted with a hostile domain"
                );
                return Err(AuthorizationError::HostileDomain);
            }
            let mut event = Event::new(self, "policyManager.getDomain");
            event.set_arg("domainName", Value::from(presented.name()));
            event.set_arg("requestedDomain", Value::from(domain_name));
            internal.verify_scream(event)?;
        }
        self.state
            .lock()
            .domains
            .get(domain_name)
            .cloned()
            .ok_or_else(|| AuthorizationError::UnknownDomain(domain_name.to_owned()))
    }

    /// Lazy policy resolution: upgrade a deferred entry to a live instance,
    /// memoizing it so later lookups return the identical instance.
    fn resolve_policy(state: &mut ManagerState, name: &str) -> Result<Arc<dyn Policy>> {
        let constructed = match state.policies.get(name) {
            None => return Err(AuthorizationError::UnknownPolicy(name.to_owned())),
            Some(PolicyEntry::Live(policy)) => return Ok(Arc::clone(policy)),
            Some(PolicyEntry::Deferred(constructor)) => {
                debug!(policy = name, "instantiating policy");
                let mut policy = constructor(name);
                // The initialize hook runs exactly once, before the instance
                // is shared.
                policy.initialize(&state.policy_args)?;
                policy
            }
        };
        let policy: Arc<dyn Policy> = Arc::from(constructed);
        state
            .policies
            .insert(name.to_owned(), PolicyEntry::Live(Arc::clone(&policy)));
        Ok(policy)
    }
}

impl Default for PolicyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PolicyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PolicyManager")
            .field("domains", &state.domains.len())
            .field("policies", &state.policies.len())
            .field("locked", &state.locked)
            .field("internal_domain", &state.internal_domain.as_ref().map(|d| d.name().to_owned()))
            .finish_non_exhaustive()
    }
}
