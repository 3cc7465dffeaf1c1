use schemars::schema_for;
use surface_api::{ApiSurface, AvailabilityResult, UsageReport};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let schemas = serde_json::json!({
        "ApiSurface": schema_for!(ApiSurface),
        "AvailabilityResult": schema_for!(AvailabilityResult),
        "UsageReport": schema_for!(UsageReport),
    });
    crate::print_json(&schemas, true)
}
