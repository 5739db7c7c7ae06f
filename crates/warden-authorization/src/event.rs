//! Security events and their verification state.

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AuthorizationError, Result};

/// Terminal outcome of event verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// The event is permitted.
    Allow,
    /// The event is refused.
    Deny,
}

/// An attempted action to be checked against a domain's policy.
///
/// The subject is an opaque borrow of whatever triggered the check; the event
/// never retains it beyond its own lifetime. Arguments are an ordered map of
/// arbitrary values. The decision starts out undecided and can be written at
/// most once — later writes are silently ignored, so the first handler to
/// decide wins.
pub struct Event<'s> {
    subject: &'s (dyn Any + Send + Sync),
    name: String,
    args: IndexMap<String, Value>,
    decision: Option<Decision>,
}

impl<'s> Event<'s> {
    /// Create an event with no arguments and an undecided outcome.
    pub fn new(subject: &'s (dyn Any + Send + Sync), name: impl Into<String>) -> Self {
        Self {
            subject,
            name: name.into(),
            args: IndexMap::new(),
            decision: None,
        }
    }

    /// Create an event carrying the given arguments.
    pub fn with_args(
        subject: &'s (dyn Any + Send + Sync),
        name: impl Into<String>,
        args: IndexMap<String, Value>,
    ) -> Self {
        Self {
            subject,
            name: name.into(),
            args,
            decision: None,
        }
    }

    /// The subject that attempts to launch the event.
    pub fn subject(&self) -> &'s (dyn Any + Send + Sync) {
        self.subject
    }

    /// The dot-segmented event name, e.g. `"policyManager.unlock"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record the verification outcome. The decision is write-once: once the
    /// event is decided, further calls are ignored rather than rejected.
    pub fn set_allowed(&mut self, result: bool) {
        if self.decision.is_none() {
            self.decision = Some(if result { Decision::Allow } else { Decision::Deny });
        }
    }

    /// The tri-state outcome: `None` while undecided, so callers can tell
    /// "not yet decided" apart from an explicit deny.
    pub fn decision(&self) -> Option<Decision> {
        self.decision
    }

    /// Look up an argument. Reading an undeclared argument is a programming
    /// error and is reported immediately.
    pub fn arg(&self, name: &str) -> Result<&Value> {
        self.args
            .get(name)
            .ok_or_else(|| AuthorizationError::NoSuchParameter {
                event: self.name.clone(),
                parameter: name.to_owned(),
            })
    }

    /// Set or replace an argument.
    pub fn set_arg(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.args.insert(name.into(), value.into());
    }

    /// Remove an argument, returning its previous value if it existed.
    pub fn remove_arg(&mut self, name: &str) -> Option<Value> {
        self.args.shift_remove(name)
    }

    /// Whether an argument with this name exists.
    pub fn has_arg(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    /// All arguments, in insertion order.
    pub fn args(&self) -> &IndexMap<String, Value> {
        &self.args
    }
}

impl fmt::Debug for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("decision", &self.decision)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn test_decision_starts_undecided() {
        let event = Event::new(&(), "order.cancel");
        assert_eq!(event.decision(), None);
    }

    #[test]
    fn test_decision_is_write_once() {
        let mut event = Event::new(&(), "order.cancel");
        event.set_allowed(true);
        assert_eq!(event.decision(), Some(Decision::Allow));

        // A later deny must not overturn the first decision.
        event.set_allowed(false);
        assert_eq!(event.decision(), Some(Decision::Allow));
    }

    #[test]
    fn test_deny_sticks_as_well() {
        let mut event = Event::new(&(), "order.cancel");
        event.set_allowed(false);
        event.set_allowed(true);
        assert_eq!(event.decision(), Some(Decision::Deny));
    }

    #[test]
    fn test_argument_round_trip() {
        let mut event = Event::new(&(), "order.cancel");
        event.set_arg("orderId", 42);
        assert!(event.has_arg("orderId"));
        assert_eq!(event.arg("orderId").unwrap(), &Value::from(42));

        assert_eq!(event.remove_arg("orderId"), Some(Value::from(42)));
        assert!(!event.has_arg("orderId"));
    }

    #[test]
    fn test_missing_argument_is_an_error() {
        let event = Event::new(&(), "order.cancel");
        assert_matches!(
            event.arg("orderId"),
            Err(AuthorizationError::NoSuchParameter { ref event, ref parameter })
                if event.as_str() == "order.cancel" && parameter.as_str() == "orderId"
        );
    }

    #[test]
    fn test_subject_can_be_downcast() {
        struct Caller {
            id: u32,
        }
        let caller = Caller { id: 7 };
        let event = Event::new(&caller, "order.cancel");
        let recovered = event.subject().downcast_ref::<Caller>().unwrap();
        assert_eq!(recovered.id, 7);
    }

    #[test]
    fn test_args_preserve_insertion_order() {
        let mut event = Event::new(&(), "order.cancel");
        event.set_arg("zeta", 1);
        event.set_arg("alpha", 2);
        let keys: Vec<_> = event.args().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta".to_string(), "alpha".to_string()]);
    }

    proptest! {
        // Whatever sequence of writes follows, the first decision stands.
        #[test]
        fn prop_first_decision_wins(first in any::<bool>(), rest in proptest::collection::vec(any::<bool>(), 0..8)) {
            let mut event = Event::new(&(), "any.event");
            event.set_allowed(first);
            let expected = event.decision();
            for value in rest {
                event.set_allowed(value);
            }
            prop_assert_eq!(event.decision(), expected);
        }
    }
}
