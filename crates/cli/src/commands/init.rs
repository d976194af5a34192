//! `stepwise init`: write the default configuration.

use std::path::Path;
use stepwise_config::AppConfig;
use super::CommandResult;

pub fn run(config_path: Option<&Path>) -> CommandResult {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    if write_default(&path)? {
        println!("Created {}", path.display());
        println!("Add your API keys and [api].access_token, then run: stepwise ask \"...\"");
    } else {
        println!("Config already exists at: {}", path.display());
        println!("Edit it manually or delete it and re-run init.");
    }
    Ok(())
}

/// Write the default config unless `path` exists. Returns whether it wrote.
fn write_default(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
