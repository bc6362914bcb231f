//! Configuration for the creature index.
//!
//! Values are layered with [`figment`], later layers winning:
//!
//! 1. built-in defaults,
//! 2. `config.toml`, `config.yaml` or `config.json` in the platform config
//!    directory (or a single explicitly given file),
//! 3. `BESTIARY_`-prefixed environment variables, with `__` separating
//!    sections (`BESTIARY_QUERY__MAX_LIMIT=500`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const ENV_PREFIX: &str = "BESTIARY_";
const CONFIG_FILES: [&str; 3] = ["config.toml", "config.yaml", "config.json"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub query: QueryConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Snapshot location, relative to the storage root.
    pub snapshot_path: PathBuf,
    /// A build running longer than this is abandoned.
    pub build_deadline_secs: u64,
    /// Maximum description length in characters.
    pub description_length: usize,
}
impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("indexes/creatures.json"),
            build_deadline_secs: 300,
            description_length: 200,
        }
    }
}
impl IndexConfig {
    pub fn build_deadline(&self) -> Duration {
        Duration::from_secs(self.build_deadline_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Results returned when a query doesn't ask for a limit.
    pub default_limit: usize,
    /// Upper bound on any requested limit.
    pub max_limit: usize,
    /// How many packs a result summary lists by name.
    pub sample_packs: usize,
}
impl Default for QueryConfig {
    fn default() -> Self {
        Self { default_limit: 250, max_limit: 1000, sample_packs: 5 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Deployment-scoped storage directory. Defaults to the platform data
    /// directory.
    pub root: Option<PathBuf>,
}
impl StorageConfig {
    pub fn root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        Ok(project_dirs().ok_or_raise(|| ErrorKind::NoDirectory("data"))?.data_dir().to_path_buf())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "bestiary")
}

impl Config {
    /// Load from the platform config directory and the environment.
    pub fn load() -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dirs) = project_dirs() {
            for name in CONFIG_FILES {
                let path = dirs.config_dir().join(name);
                if path.is_file() {
                    debug!(path = %path.display(), "loading configuration file");
                    figment = merge_file(figment, &path)?;
                }
            }
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load from one explicit file and the environment. The file must exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            exn::bail!(ErrorKind::Invalid(format!("configuration file not found: {}", path.display())));
        }
        let figment = merge_file(Figment::from(Serialized::defaults(Config::default())), path)?;
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate from an arbitrary provider stack.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.max_limit == 0 {
            exn::bail!(ErrorKind::Invalid("query.max_limit must be positive".to_string()));
        }
        if self.query.default_limit > self.query.max_limit {
            exn::bail!(ErrorKind::Invalid(format!(
                "query.default_limit ({}) exceeds query.max_limit ({})",
                self.query.default_limit, self.query.max_limit
            )));
        }
        if self.index.build_deadline_secs == 0 {
            exn::bail!(ErrorKind::Invalid("index.build_deadline_secs must be positive".to_string()));
        }
        if self.index.snapshot_path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("index.snapshot_path must not be empty".to_string()));
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    Ok(match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::Invalid(format!("unsupported configuration format: {}", path.display()))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.query.default_limit, 250);
        assert_eq!(config.query.max_limit, 1000);
        assert_eq!(config.query.sample_packs, 5);
        assert_eq!(config.index.description_length, 200);
        assert_eq!(config.index.build_deadline(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case(".toml", "[query]\ndefault_limit = 20\n\n[index]\nsnapshot_path = \"cache/npcs.json\"\n")]
    #[case(".yaml", "query:\n  default_limit: 20\nindex:\n  snapshot_path: cache/npcs.json\n")]
    #[case(".json", r#"{"query": {"default_limit": 20}, "index": {"snapshot_path": "cache/npcs.json"}}"#)]
    fn test_load_from_file(#[case] suffix: &str, #[case] contents: &str) {
        let file = write_config(suffix, contents);
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.query.default_limit, 20);
        assert_eq!(config.query.max_limit, 1000);
        assert_eq!(config.index.snapshot_path, PathBuf::from("cache/npcs.json"));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load_from("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let file = write_config(".ini", "[query]");
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_wrong_type() {
        let file = write_config(".toml", "[query]\nmax_limit = \"lots\"\n");
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[rstest]
    #[case("query.max_limit", 0)]
    #[case("query.default_limit", 5000)]
    #[case("index.build_deadline_secs", 0)]
    fn test_validation(#[case] key: &str, #[case] value: u64) {
        let figment = Figment::from(Serialized::defaults(Config::default())).merge(Serialized::default(key, value));
        let err = Config::from_figment(figment).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_explicit_storage_root() {
        let storage = StorageConfig { root: Some(PathBuf::from("/srv/bestiary")) };
        assert_eq!(storage.root().unwrap(), PathBuf::from("/srv/bestiary"));
    }
}
