//! `config` commands

use std::path::Path;

use gamescout_client::config::CONFIG_PATH;
use gamescout_client::Config;

use crate::output::{self, CliResult};

pub fn init(force: bool) -> CliResult {
    if Path::new(CONFIG_PATH).exists() && !force {
        return Err(format!("{} already exists; pass --force to overwrite", CONFIG_PATH).into());
    }
    Config::default().save_to(CONFIG_PATH)?;
    println!("Wrote {}", CONFIG_PATH);
    Ok(())
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else {
        format!("{}...", secret.chars().take(4).collect::<String>())
    }
}

pub fn show(config: &Config) -> CliResult {
    let mut masked = config.clone();
    masked.catalog.api_key = mask(&config.catalog.api_key);
    masked.firebase.api_key = mask(&config.firebase.api_key);
    output::print_json(&masked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_hides_all_but_prefix() {
        assert_eq!(mask("abcdef123456"), "abcd...");
        assert_eq!(mask(""), "(not set)");
    }
}
