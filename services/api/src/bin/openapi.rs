//! services/api/src/bin/openapi.rs
//!
//! Writes the Analista+ REST and SSE contract as OpenAPI JSON, for the browser
//! client's generated types. The output path is the first argument, defaulting
//! to `openapi.json`.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let document = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&output, document)?;
    println!("Wrote the Analista+ API description to {}", output);
    Ok(())
}
