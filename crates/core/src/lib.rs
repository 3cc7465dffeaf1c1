pub mod artifact;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod graph;
pub mod logging;
pub mod render;
pub mod resolver;
pub mod tokenizer;

pub use engine::{SurfaceEngine, SurfaceEngineBuilder};
pub use error::{Result, SurfaceError};
