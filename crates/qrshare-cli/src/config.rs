use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use qrshare_core::{ClientOptions, FileTokenStore};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCANNER_COMMAND: &str = "zbarcam --raw --nodisplay --quiet";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ProfileConfig {
    pub server: Option<String>,
    pub format: Option<String>,
    pub attach_auth_on_generate: Option<bool>,
    pub scanner_command: Option<String>,
}

impl ProfileConfig {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            attach_auth_on_generate: self
                .attach_auth_on_generate
                .unwrap_or(ClientOptions::default().attach_auth_on_generate),
        }
    }

    pub fn scanner_command(&self) -> &str {
        self.scanner_command
            .as_deref()
            .unwrap_or(DEFAULT_SCANNER_COMMAND)
    }

    /// Apply a `config set` key. Unknown keys and bad values are errors.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server" => self.server = Some(value.to_string()),
            "format" => self.format = Some(value.to_string()),
            "attach_auth_on_generate" => {
                let flag = value
                    .parse::<bool>()
                    .with_context(|| format!("attach_auth_on_generate expects true or false, got {value}"))?;
                self.attach_auth_on_generate = Some(flag);
            }
            "scanner_command" => self.scanner_command = Some(value.to_string()),
            other => anyhow::bail!(
                "Unknown config key: {other}. Valid keys: server, format, attach_auth_on_generate, scanner_command"
            ),
        }
        Ok(())
    }
}

pub type ConfigFile = HashMap<String, ProfileConfig>;

fn config_dir() -> Result<PathBuf> {
    let dir = qrshare_core::token::config_dir()?;
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn load_all() -> Result<ConfigFile> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(ConfigFile::new());
    }
    let content = fs::read_to_string(&path)?;
    let cfg: ConfigFile =
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(cfg)
}

pub fn load_profile(profile: &str) -> Result<ProfileConfig> {
    let mut all = load_all()?;
    Ok(all.remove(profile).unwrap_or_default())
}

pub fn save_profile(profile: &str, config: &ProfileConfig) -> Result<()> {
    let mut all = load_all()?;
    all.insert(profile.to_string(), config.clone());
    let content = toml::to_string_pretty(&all)?;
    fs::write(config_path()?, content)?;
    Ok(())
}

pub fn resolve_server(cli_server: &Option<String>, profile: &str) -> Result<String> {
    // 1. --server flag / QRSHARE_URL env
    if let Some(s) = cli_server {
        return Ok(s.clone());
    }
    // 2. config.toml profile
    let cfg = load_profile(profile)?;
    if let Some(s) = cfg.server {
        return Ok(s);
    }
    // 3. Stored credentials for this profile
    if let Some(creds) = FileTokenStore::for_profile(profile)?.load() {
        return Ok(creds.server);
    }
    anyhow::bail!(
        "No server URL configured. Use --server, set QRSHARE_URL env var, or run: qrshare login --server <url> --token <token>"
    )
}
