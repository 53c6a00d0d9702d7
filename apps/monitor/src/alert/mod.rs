// [apps/monitor/src/alert/mod.rs]
//! Alert Evaluator subsystem: escalation-ladder arithmetic
//! (`ladder`), the pure per-target decision (`decision`), message
//! rendering (`templates`), channel fan-out (`notifier`) and the
//! periodic ticker that ties them together (`evaluator`).

pub mod decision;
pub mod evaluator;
pub mod ladder;
pub mod notifier;
pub mod templates;

pub use evaluator::AlertEvaluator;
pub use ladder::AlertDefaults;
pub use notifier::Notifier;
