pub mod ask;
pub mod catalog;
pub mod execute;
pub mod init;

use std::path::Path;
use stepwise_config::AppConfig;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub(crate) fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load_with(path).map_err(|e| format!("Failed to load config: {e}").into())
}
