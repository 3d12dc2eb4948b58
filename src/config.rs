use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub source: SourceConfig,
    pub lawyer: LawyerConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    /// Bound on individual store operations, in seconds.
    #[serde(default = "default_db_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_db_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Days before today the default search window starts.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_source_timeout_secs(),
            page_size: default_page_size(),
            lookback_days: default_lookback_days(),
        }
    }
}

fn default_base_url() -> String {
    "https://comunicaapi.pje.jus.br/api/v1/comunicacao".to_string()
}
fn default_source_timeout_secs() -> u64 {
    30
}
fn default_page_size() -> u32 {
    100
}
fn default_lookback_days() -> i64 {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct LawyerConfig {
    /// The tracked lawyer's full name, used in queries and text heuristics.
    pub name: String,
    /// Bar registrations queried each cycle, in order.
    pub registrations: Vec<RegistrationConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistrationConfig {
    pub number: String,
    pub state: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Local wall-clock trigger time, `HH:MM`.
    #[serde(default = "default_schedule_time")]
    pub time: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            time: default_schedule_time(),
        }
    }
}

fn default_schedule_time() -> String {
    "06:00".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    if config.source.page_size == 0 {
        anyhow::bail!("source.page_size must be >= 1");
    }

    if config.source.lookback_days < 1 {
        anyhow::bail!("source.lookback_days must be >= 1");
    }

    if config.lawyer.name.trim().is_empty() {
        anyhow::bail!("lawyer.name must not be empty");
    }

    if config.lawyer.registrations.is_empty() {
        anyhow::bail!("lawyer.registrations must contain at least one entry");
    }

    if chrono::NaiveTime::parse_from_str(&config.scheduler.time, "%H:%M").is_err() {
        anyhow::bail!(
            "scheduler.time must be HH:MM, got '{}'",
            config.scheduler.time
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const VALID: &str = r#"
[db]
path = "data/djen.sqlite"

[lawyer]
name = "Eduardo Koetz"
registrations = [
    { number = "73409", state = "RS" },
    { number = "42934", state = "SC" },
]

[server]
bind = "127.0.0.1:8000"
"#;

    #[test]
    fn loads_valid_config_with_defaults() {
        let file = write_config(VALID);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.source.page_size, 100);
        assert_eq!(config.source.lookback_days, 1);
        assert_eq!(config.scheduler.time, "06:00");
        assert!(!config.scheduler.enabled);
        assert_eq!(config.lawyer.registrations.len(), 2);
    }

    #[test]
    fn rejects_missing_registrations() {
        let file = write_config(
            r#"
[db]
path = "data/djen.sqlite"

[lawyer]
name = "Eduardo Koetz"
registrations = []

[server]
bind = "127.0.0.1:8000"
"#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_bad_schedule_time() {
        let file = write_config(&format!("{}\n[scheduler]\nenabled = true\ntime = \"6am\"\n", VALID));
        assert!(load_config(file.path()).is_err());
    }
}
