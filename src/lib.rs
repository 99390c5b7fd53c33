//! Scenario-driven HTTP load runner.
//!
//! A scenario is a small JSON document: a list of static variables plus an
//! ordered `cycle` of HTTP steps. The engine runs that cycle repeatedly
//! across `parallel` concurrent workers and `loops` repetitions, letting
//! later steps reference the parsed JSON body or status code of any earlier
//! step in the same cycle.

pub mod client;
pub mod condition;
pub mod cycle;
pub mod errors;
pub mod jsonpath;
pub mod logwriter;
pub mod metrics;
pub mod orchestrator;
pub mod scenario;
pub mod template;
pub mod types;
