use serde::{Deserialize, Serialize};
use std::path::Path;

use portico_core::directory::{OrgRecord, StaticDirectory};
use portico_core::tenant::OrgId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Global debug flag; individual requests may still opt in with
    /// `?_debug=1`.
    #[serde(default)]
    pub debug: bool,

    /// Hosting sub-directory prefix stripped from incoming paths,
    /// e.g. "/portal" when the platform is mounted below the web root.
    #[serde(default)]
    pub mount_prefix: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Seed data for the in-process organization directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub orgs: Vec<OrgSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgSeed {
    pub id: i64,
    pub slug: String,
    pub name: String,

    #[serde(default = "default_true")]
    pub active: bool,

    /// Module keys enabled for this organization.
    #[serde(default)]
    pub modules: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            mount_prefix: String::new(),
            logging: LoggingConfig::default(),
            directory: DirectoryConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("PORTICO_HOST") {
            self.host = val;
        }

        if let Ok(val) = std::env::var("PORTICO_PORT")
            && let Ok(port) = val.parse::<u16>()
        {
            self.port = port;
        }

        if let Ok(val) = std::env::var("PORTICO_DEBUG")
            && let Ok(debug) = val.parse::<bool>()
        {
            self.debug = debug;
        }

        if let Ok(val) = std::env::var("PORTICO_MOUNT_PREFIX") {
            self.mount_prefix = val;
        }

        if let Ok(val) = std::env::var("PORTICO_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Build the in-process directory from the seed data.
    pub fn build_directory(&self) -> StaticDirectory {
        let mut directory = StaticDirectory::new();
        for seed in &self.directory.orgs {
            let org_id = OrgId::new(seed.id);
            directory = directory.with_org(OrgRecord {
                id: org_id,
                slug: seed.slug.clone(),
                name: seed.name.clone(),
                active: seed.active,
            });
            for key in &seed.modules {
                directory = directory.enable_module(org_id, key.clone());
            }
        }
        directory
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
