use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::roster::ResolvePolicy;

pub const DEFAULT_CONFIG_FILE: &str = "course-groups.yaml";
pub const ENV_PREFIX: &str = "COURSE_GROUPS_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Root of the course REST API, `/api` included.
    pub api_base_url: String,
    /// JSON file holding the `userData` and `courseId` entries.
    pub session_path: PathBuf,
    pub request_timeout_secs: u64,
    pub resolve_policy: ResolvePolicy,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            session_path: PathBuf::from("session.json"),
            request_timeout_secs: 10,
            resolve_policy: ResolvePolicy::BestEffort,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl AppConfig {
    /// defaults → YAML file (if present) → `COURSE_GROUPS_*` environment.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        if config_path.is_some() && !path.exists() {
            anyhow::bail!("config file {} does not exist", path.display());
        }

        Self::figment(path)
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
