//! `stepwise catalog`: list the endpoints the engine can call.

use std::path::Path;
use stepwise_agent::load_catalog;
use super::{load_config, CommandResult};

pub fn run(config_path: Option<&Path>) -> CommandResult {
    let config = load_config(config_path)?;
    let catalog = load_catalog(&config)?;

    if catalog.is_empty() {
        println!("No OpenAPI documents loaded.");
        println!("Set [api].openapi_spec_dir in the config or OPENAPI_SPEC_DIR.");
        return Ok(());
    }

    println!("{} document(s) loaded\n", catalog.len());
    for endpoint in catalog.endpoints() {
        match endpoint.summary {
            Some(summary) => println!("  {:<7} {}  {summary}", endpoint.method, endpoint.path),
            None => println!("  {:<7} {}", endpoint.method, endpoint.path),
        }
    }
    Ok(())
}
