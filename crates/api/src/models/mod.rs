pub mod diagnostic;
pub mod engine;
pub mod exec;
pub mod graph;
pub mod language;
pub mod usage;

pub use diagnostic::*;
pub use engine::*;
pub use exec::*;
pub use graph::*;
pub use language::*;
pub use usage::*;
