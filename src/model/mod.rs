//! Record model for attack-surface observations.
//!
//! A collector produces [`Observation`]s, each wrapping one [`ObservationData`]
//! variant. Every variant has a stable cross-run identity (its natural key)
//! and a row key (content hash) used to detect "no change" without walking
//! fields.
//!
//! Fields are exposed through an explicit list of `(name, FieldValue)` pairs
//! per kind, so comparison and rule evaluation never inspect types at
//! runtime:
//!
//! ```ignore
//! let obs = Observation::new("run-1", ObservationData::Port(port));
//! for (name, value) in obs.data.fields() {
//!     println!("{name} = {value:?}");
//! }
//! ```

mod kinds;
mod observation;
mod run;
mod severity;
mod value;

pub use kinds::*;
pub use observation::{Observation, ObservationData, ResultType};
pub use run::{Platform, Run, RunType};
pub use severity::Severity;
pub use value::{field, unordered_eq, FieldValue, ToFieldValue};
