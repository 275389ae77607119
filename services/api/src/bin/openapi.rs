//! services/api/src/bin/openapi.rs
//!
//! Dumps the OpenAPI 3.0 document for the mining rewards API to
//! `openapi.json`, for frontend codegen and contract checks.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

const OUTPUT_PATH: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let document = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(OUTPUT_PATH, document)?;
    println!("Wrote OpenAPI document to {}", OUTPUT_PATH);
    Ok(())
}
