use clap::Subcommand;
use pillarstreak_core::{Config, StrategyRegistry};

use super::CliResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one setting
    Get {
        /// Dotted key (e.g. "rotation.strategy", "calendar.utc_offset_minutes")
        key: String,
    },
    /// Change one setting and save the config file
    Set {
        /// Dotted key (e.g. "history.retention_days", "rotation.seed")
        key: String,
        /// New value; "none" clears "rotation.seed"
        value: String,
    },
    /// Print every setting as `key = value`
    List {
        /// Print the nested JSON document instead
        #[arg(long)]
        json: bool,
    },
    /// Show the rotation strategies "rotation.strategy" accepts
    Strategies,
    /// Overwrite the config file with defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key).ok_or_else(|| unknown_key(&config, &key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            // Echo what was stored, so "007" comes back as 7.
            let stored = config.get(&key).unwrap_or(value);
            println!("{key} = {stored}");
        }
        ConfigAction::List { json } => {
            let config = Config::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                for (key, value) in dotted_entries(&config)? {
                    println!("{key} = {value}");
                }
            }
        }
        ConfigAction::Strategies => {
            let config = Config::load()?;
            for name in StrategyRegistry::builtin().names() {
                let marker = if name == config.rotation.strategy { "*" } else { " " };
                println!("{marker} {name}");
            }
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

/// Leaf settings of `config` keyed by their dotted path, in key order.
fn dotted_entries(config: &Config) -> Result<Vec<(String, String)>, serde_json::Error> {
    fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
        match value {
            serde_json::Value::Object(map) => {
                for (part, child) in map {
                    let key = if prefix.is_empty() {
                        part.clone()
                    } else {
                        format!("{prefix}.{part}")
                    };
                    walk(&key, child, out);
                }
            }
            serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
            other => out.push((prefix.to_string(), other.to_string())),
        }
    }

    let mut out = Vec::new();
    walk("", &serde_json::to_value(config)?, &mut out);
    out.sort();
    Ok(out)
}

fn unknown_key(config: &Config, key: &str) -> Box<dyn std::error::Error> {
    let known: Vec<String> = dotted_entries(config)
        .map(|entries| entries.into_iter().map(|(k, _)| k).collect())
        .unwrap_or_default();
    format!("unknown key: {key} (known keys: {})", known.join(", ")).into()
}
