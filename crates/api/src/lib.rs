pub mod error;
pub mod models;

// Re-export commonly used types
pub use error::{Result, SurfaceError};
pub use models::*;
