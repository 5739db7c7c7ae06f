//! Security policies and event dispatch.
//!
//! A policy routes named events to handler functions through an explicit
//! registration table. Handlers are registered under an identifier derived
//! from the event name by [`handler_name`]; the naming convention is the
//! contract, so policy authors add permission rules by registering new
//! handlers rather than editing a central match.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::errors::Result;
use crate::event::Event;

/// Construction arguments injected into every lazily-created policy.
pub type PolicyArgs = IndexMap<String, Value>;

/// A handler invoked for one event kind. The handler is responsible for
/// calling [`Event::set_allowed`] on the event it receives.
pub type EventHandler<P> = fn(&P, &mut Event<'_>) -> Result<()>;

/// Derive the handler identifier for an event name.
///
/// Each `.` followed by a word character (`[a-zA-Z0-9_]`) is collapsed by
/// removing the dot and upper-casing that character, then the literal suffix
/// `Event` is appended: `"policyManager.unlock"` becomes
/// `policyManagerUnlockEvent`, `"a.b.c"` becomes `aBCEvent`. A dot that is
/// not followed by a word character stays literal, so `"a..b"` becomes
/// `a.BEvent`.
pub fn handler_name(event_name: &str) -> String {
    let mut ident = String::with_capacity(event_name.len() + 5);
    let mut chars = event_name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '.' {
            match chars.peek() {
                Some(&next) if next.is_ascii_alphanumeric() || next == '_' => {
                    chars.next();
                    ident.push(next.to_ascii_uppercase());
                }
                _ => ident.push('.'),
            }
        } else {
            ident.push(c);
        }
    }
    ident.push_str("Event");
    ident
}

/// The registration table mapping handler identifiers to handlers, built once
/// per policy type.
pub struct EventRules<P> {
    handlers: HashMap<&'static str, EventHandler<P>>,
}

impl<P> EventRules<P> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its identifier, e.g.
    /// `"policyManagerUnlockEvent"` for the event `"policyManager.unlock"`.
    /// Registering the same identifier twice keeps the latest handler.
    #[must_use]
    pub fn on(mut self, ident: &'static str, handler: EventHandler<P>) -> Self {
        self.handlers.insert(ident, handler);
        self
    }

    /// Invoke the handler registered under `ident`, if any.
    pub fn dispatch(&self, policy: &P, ident: &str, event: &mut Event<'_>) -> Option<Result<()>> {
        self.handlers.get(ident).map(|handler| handler(policy, event))
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the table has no handlers at all.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<P> Default for EventRules<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// A named rule set that decides events.
///
/// Implementors supply [`Policy::dispatch`], usually by delegating to an
/// [`EventRules`] table held in the policy. The provided
/// [`Policy::process_event`] performs the name transform and enforces
/// default-deny for unrecognized events.
pub trait Policy: Send + Sync {
    /// The policy name, assigned by the manager at construction.
    fn name(&self) -> &str;

    /// Hook invoked exactly once, right after lazy construction, with the
    /// manager's configured policy arguments.
    fn initialize(&mut self, args: &PolicyArgs) -> Result<()> {
        let _ = args;
        Ok(())
    }

    /// Invoke the handler registered for `ident`, returning `None` when the
    /// policy has no handler with that identifier.
    fn dispatch(&self, ident: &str, event: &mut Event<'_>) -> Option<Result<()>>;

    /// Decide an event. Unrecognized events are denied: if no handler matches
    /// the identifier derived from the event name, the event is refused here
    /// rather than left undecided.
    fn process_event(&self, event: &mut Event<'_>) -> Result<()> {
        let ident = handler_name(event.name());
        match self.dispatch(&ident, event) {
            Some(result) => result,
            None => {
                trace!(
                    policy = self.name(),
                    event = event.name(),
                    "no handler registered, denying"
                );
                event.set_allowed(false);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Decision;
    use proptest::prelude::*;

    struct CancelPolicy {
        name: String,
        rules: EventRules<Self>,
    }

    impl CancelPolicy {
        fn new() -> Self {
            Self {
                name: "cancel".to_string(),
                rules: EventRules::new()
                    .on("orderCancelEvent", Self::cancel)
                    .on("orderRefundEvent", Self::refund),
            }
        }

        fn cancel(&self, event: &mut Event<'_>) -> Result<()> {
            event.set_allowed(true);
            Ok(())
        }

        fn refund(&self, event: &mut Event<'_>) -> Result<()> {
            event.set_allowed(false);
            Ok(())
        }
    }

    impl Policy for CancelPolicy {
        fn name(&self) -> &str {
            &self.name
        }

        fn dispatch(&self, ident: &str, event: &mut Event<'_>) -> Option<Result<()>> {
            self.rules.dispatch(self, ident, event)
        }
    }

    #[test]
    fn test_handler_name_single_segment() {
        assert_eq!(handler_name("unlock"), "unlockEvent");
    }

    #[test]
    fn test_handler_name_two_segments() {
        assert_eq!(handler_name("policyManager.unlock"), "policyManagerUnlockEvent");
    }

    #[test]
    fn test_handler_name_multi_segment() {
        assert_eq!(handler_name("a.b.c"), "aBCEvent");
    }

    #[test]
    fn test_handler_name_consecutive_dots() {
        // The first dot is not followed by a word character and stays literal.
        assert_eq!(handler_name("a..b"), "a.BEvent");
    }

    #[test]
    fn test_handler_name_trailing_dot() {
        assert_eq!(handler_name("a.b."), "aB.Event");
    }

    #[test]
    fn test_handler_name_digit_and_underscore() {
        assert_eq!(handler_name("a.1b"), "a1bEvent");
        assert_eq!(handler_name("a._b"), "a_bEvent");
    }

    #[test]
    fn test_registered_handler_is_invoked() {
        let policy = CancelPolicy::new();
        let mut event = Event::new(&(), "order.cancel");
        policy.process_event(&mut event).unwrap();
        assert_eq!(event.decision(), Some(Decision::Allow));
    }

    #[test]
    fn test_unrecognized_event_is_denied() {
        let policy = CancelPolicy::new();
        let mut event = Event::new(&(), "order.delete");
        policy.process_event(&mut event).unwrap();
        assert_eq!(event.decision(), Some(Decision::Deny));
    }

    #[test]
    fn test_explicit_deny_handler() {
        let policy = CancelPolicy::new();
        let mut event = Event::new(&(), "order.refund");
        policy.process_event(&mut event).unwrap();
        assert_eq!(event.decision(), Some(Decision::Deny));
    }

    proptest! {
        // For well-formed dotted names the transform removes every dot,
        // upper-cases each segment head after the first, and appends the
        // suffix, so the length shrinks by the dot count and grows by five.
        #[test]
        fn prop_dotted_names_collapse(name in "[a-z][a-z0-9]{0,5}(\\.[a-z][a-z0-9]{0,5}){0,4}") {
            let ident = handler_name(&name);
            let dots = name.matches('.').count();
            prop_assert!(ident.ends_with("Event"));
            prop_assert!(!ident.contains('.'));
            prop_assert_eq!(ident.chars().count(), name.chars().count() - dots + 5);
        }

        // The transform never panics, whatever the input looks like.
        #[test]
        fn prop_transform_total(name in "[ -~]{0,24}") {
            let ident = handler_name(&name);
            prop_assert!(ident.ends_with("Event"));
        }
    }
}
