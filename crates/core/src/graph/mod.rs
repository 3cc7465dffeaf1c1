//! Canonical symbol graph: construction, reachability and unresolved-reference detection.

pub mod builder;
pub mod reachability;
pub mod unresolved;

pub use builder::build_graph;
pub use reachability::{ReachabilityPolicy, reachable, seeds};
pub use unresolved::unresolved_references;
