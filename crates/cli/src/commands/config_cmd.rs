//! `minebrain config` — Configuration inspection commands.

use std::path::PathBuf;

pub async fn validate(explicit: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    let config = match super::load_config(explicit) {
        Ok(config) => config,
        Err(e) => {
            println!("  Config error: {e}");
            return Err(e);
        }
    };
    println!("  Config parsed successfully");

    let mut warnings = Vec::new();
    if config.inference.model.is_none() {
        warnings.push("No inference.model set; the endpoint's default model will be used");
    }
    if config.inference.api_key.is_none() && config.inference.endpoint.starts_with("https://") {
        warnings.push("Remote endpoint without an API key (set MINEBRAIN_API_KEY)");
    }
    if config.admin && config.chat.operators.is_empty() {
        warnings.push("Admin visibility with no operator allowlist: anyone can read the player roster");
    }
    if config.context.max_entries == 0 {
        warnings.push("context.max_entries = 0 keeps the whole conversation; prompts grow without bound");
    }

    if warnings.is_empty() {
        println!("  All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("  warning: {w}");
        }
    }

    println!();
    println!("  Server:    {}:{} as {} ({})", config.server.host, config.server.port, config.server.username, config.server.auth);
    println!("  Bridge:    {}", config.bridge.address);
    println!("  Endpoint:  {}", config.inference.endpoint);
    println!("  Prefix:    {}", config.chat.prefix);
    println!("  Admin:     {}", config.admin);
    println!("  Disabled:  {:?}", config.actions.disabled);
    Ok(())
}

pub async fn show(explicit: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(explicit)?;
    if config.inference.api_key.is_some() {
        config.inference.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(explicit: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", super::config_file(explicit).display());
    Ok(())
}
