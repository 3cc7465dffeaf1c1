pub use surface_api::error::{Result, SurfaceError, stderr_excerpt};
