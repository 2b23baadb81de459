use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const QUIP_DIR: &str = ".quip";
const DATA_DIR_ENV: &str = "QUIP_HOME";
const DEFAULT_HISTORY_LIMIT: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub history_limit: usize,
    pub prefetch_wallpapers: bool,
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            history_limit: DEFAULT_HISTORY_LIMIT,
            prefetch_wallpapers: true,
            data_dir: get_quip_dir(),
        }
    }
}

pub fn get_quip_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(QUIP_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_quip_dir().join("config.toml")
}

pub fn ensure_quip_dir() -> Result<PathBuf> {
    let quip_dir = get_quip_dir();

    if !quip_dir.exists() {
        std::fs::create_dir_all(&quip_dir).with_context(|| {
            format!(
                "Failed to create data directory at {}",
                quip_dir.display()
            )
        })?;
    }

    Ok(quip_dir)
}

pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!("Config file not found. Run 'quip onboard' to set up your configuration.")
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config.data_dir = get_quip_dir();

    // A zero limit would drop every exchange as soon as it is pushed.
    if config.history_limit == 0 {
        config.history_limit = 1;
    }

    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_quip_dir()?;

    let config_path = get_config_path();
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}
