//! Multi-strategy UI control location.
//!
//! Platform markup drifts between releases and A/B variants. Instead of
//! scattering selector strings through the automation logic, every control
//! the engine touches has a declarative [`LocatorSpec`]: an ordered list of
//! candidate strategies, most specific first, each bounded by its own
//! timeout. The cascade evaluates them uniformly and yields typed outcomes.

pub mod cascade;
pub mod errors;
pub mod roles;
pub mod spec;

pub use cascade::{probe_present, probe_unique, LocatorCascade};
pub use errors::LocatorError;
pub use roles::{spec_for, UiRole};
pub use spec::{LocatorCandidate, LocatorSpec, Strategy};
