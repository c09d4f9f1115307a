//! `minebrain init` — Write a default config file.

use minebrain_config::AppConfig;
use std::path::PathBuf;

pub async fn run(explicit: Option<PathBuf>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = super::config_file(explicit);

    if config_path.exists() && !force {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or re-run with --force to overwrite.");
        return Ok(());
    }

    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&config_path, AppConfig::default_toml())?;

    println!("Created {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set [server] host/port/username and [inference] endpoint");
    println!("  2. Start the game bridge for your server");
    println!("  3. Run: minebrain run   (or `minebrain offline` to try it without a server)");
    Ok(())
}
