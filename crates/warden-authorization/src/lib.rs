//! Warden Authorization
//!
//! An in-process authorization engine: events (attempted actions carrying a
//! subject and arguments) are verified within named security domains
//! according to pluggable policies.
//!
//! The moving parts, leaf first:
//! - [`Event`]: an immutable-once-decided value recording subject, name,
//!   arguments, and a tri-state decision.
//! - [`Policy`]: a named rule set routing event names to handlers through an
//!   [`EventRules`] table; unrecognized events are denied.
//! - [`Domain`]: a named boundary owning one policy at a time, with screaming
//!   ([`Domain::verify_scream`]) and quiet ([`Domain::verify`]) verification.
//! - [`PolicyManager`]: the root factory and gatekeeper — it creates domains,
//!   lazily instantiates policies, and gates structural mutation behind a
//!   lock/unlock protocol authorized by a designated internal domain.
//!
//! The engine is synchronous call/return with no suspension points. Each
//! manager keeps its mutable state behind a single mutex, so it can be shared
//! across threads, but no operation blocks on anything besides that mutex.

pub mod domain;
pub mod errors;
pub mod event;
pub mod manager;
pub mod policy;

pub use domain::Domain;
pub use errors::{AuthorizationError, Result};
pub use event::{Decision, Event};
pub use manager::{PolicyConstructor, PolicyManager};
pub use policy::{handler_name, EventHandler, EventRules, Policy, PolicyArgs};
