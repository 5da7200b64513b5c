use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::checkout::{DEFAULT_PHONE_PATTERN, HttpGateway, PhoneRule};
use crate::error::{CheckoutError, ConfigError, StorageError};
use crate::storage::{CartStorage, DEFAULT_SLOT, FileStorage, MemoryStorage, SqliteStorage};
use crate::util::{env_optional, parse_u64};

pub const DEFAULT_WORKSPACE: &str = "./.drift";
pub const DEFAULT_CHECKOUT_URL: &str = "http://localhost:3000/api/checkout";
pub const DEFAULT_CHECKOUT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CURRENCY: &str = "E";
pub const DEFAULT_LOG: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    File,
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sqlite => "sqlite",
            Self::File => "file",
            Self::Memory => "memory",
        })
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "file" | "json" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid {
                name: "storage".to_string(),
                reason: format!("unknown backend `{other}` (sqlite, file, memory)"),
            }),
        }
    }
}

/// `<workspace>/config.json`. Every field is optional; unset fields fall
/// through to the environment and then to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageBackend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

pub fn config_file_path(workspace: &Path) -> PathBuf {
    workspace.join("config.json")
}

/// A missing or unreadable file is the same as an empty one.
pub fn load_file_config(path: &Path) -> FileConfig {
    match std::fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "ignoring unparseable config file");
            FileConfig::default()
        }),
        Err(_) => FileConfig::default(),
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub workspace: PathBuf,
    pub storage: StorageBackend,
    pub cart_slot: String,
    pub catalog: PathBuf,
    pub orders: PathBuf,
    pub checkout_url: String,
    pub checkout_timeout_ms: u64,
    pub phone_pattern: String,
    pub currency: String,
    pub log: String,
}

/// Values given on the command line. They win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub workspace: Option<PathBuf>,
    pub storage: Option<StorageBackend>,
}

impl AppConfig {
    /// Resolve the workspace first, then layer its config file, the
    /// environment and `overrides`.
    pub fn load(
        overrides: &Overrides,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let workspace = overrides
            .workspace
            .clone()
            .or_else(|| env_optional(lookup, "DRIFT_WORKSPACE").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKSPACE));
        let file = load_file_config(&config_file_path(&workspace));
        let mut config = Self::resolve(workspace, file, lookup)?;
        if let Some(storage) = overrides.storage {
            config.storage = storage;
        }
        Ok(config)
    }

    pub fn resolve(
        workspace: PathBuf,
        file: FileConfig,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = |name: &str| env_optional(lookup, name);

        let storage = match env("DRIFT_STORAGE") {
            Some(value) => value.parse()?,
            None => file.storage.unwrap_or_default(),
        };
        let cart_slot = env("DRIFT_CART_SLOT")
            .or(file.cart_slot)
            .unwrap_or_else(|| DEFAULT_SLOT.to_string());
        let catalog = env("DRIFT_CATALOG")
            .map(PathBuf::from)
            .or(file.catalog)
            .unwrap_or_else(|| workspace.join("catalog.json"));
        let orders = env("DRIFT_ORDERS")
            .map(PathBuf::from)
            .or(file.orders)
            .unwrap_or_else(|| workspace.join("orders.json"));
        let checkout_url = env("DRIFT_CHECKOUT_URL")
            .or(file.checkout_url)
            .unwrap_or_else(|| DEFAULT_CHECKOUT_URL.to_string());
        let checkout_timeout_ms = match env("DRIFT_CHECKOUT_TIMEOUT_MS") {
            Some(value) => parse_u64("DRIFT_CHECKOUT_TIMEOUT_MS", &value).map_err(|reason| {
                ConfigError::Invalid {
                    name: "checkout_timeout_ms".to_string(),
                    reason,
                }
            })?,
            None => file.checkout_timeout_ms.unwrap_or(DEFAULT_CHECKOUT_TIMEOUT_MS),
        };
        let phone_pattern = env("DRIFT_PHONE_PATTERN")
            .or(file.phone_pattern)
            .unwrap_or_else(|| DEFAULT_PHONE_PATTERN.to_string());
        let currency = env("DRIFT_CURRENCY")
            .or(file.currency)
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let log = env("DRIFT_LOG")
            .or(file.log)
            .unwrap_or_else(|| DEFAULT_LOG.to_string());

        let config = Self {
            workspace,
            storage,
            cart_slot,
            catalog,
            orders,
            checkout_url,
            checkout_timeout_ms,
            phone_pattern,
            currency,
            log,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.checkout_url).map_err(|source| ConfigError::Url {
            url: self.checkout_url.clone(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                name: "checkout_url".to_string(),
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }
        if self.checkout_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "checkout_timeout_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.cart_slot.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "cart_slot".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        self.phone_rule().map(|_| ())
    }

    pub fn checkout_timeout(&self) -> Duration {
        Duration::from_millis(self.checkout_timeout_ms)
    }

    pub fn phone_rule(&self) -> Result<PhoneRule, ConfigError> {
        PhoneRule::new(&self.phone_pattern)
    }

    pub fn gateway(&self) -> Result<HttpGateway, CheckoutError> {
        HttpGateway::new(&self.checkout_url, self.checkout_timeout())
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.workspace.join("cart.sqlite")
    }

    /// The cart slot for the configured backend.
    pub fn open_storage(&self) -> Result<Box<dyn CartStorage>, StorageError> {
        Ok(match self.storage {
            StorageBackend::Sqlite => Box::new(SqliteStorage::open_or_create(
                &self.sqlite_path(),
                &self.cart_slot,
            )?),
            StorageBackend::File => Box::new(FileStorage::in_dir(&self.workspace, &self.cart_slot)),
            StorageBackend::Memory => {
                warn!("memory storage selected; the cart will not outlive this process");
                Box::new(MemoryStorage::default())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> Box<dyn Fn(&str) -> Option<String>> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Box::new(move |name: &str| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config =
            AppConfig::resolve(PathBuf::from("ws"), FileConfig::default(), &lookup_from(&[]))
                .unwrap();
        assert_eq!(config.storage, StorageBackend::Sqlite);
        assert_eq!(config.cart_slot, "shopping-cart");
        assert_eq!(config.catalog, PathBuf::from("ws").join("catalog.json"));
        assert_eq!(config.orders, PathBuf::from("ws").join("orders.json"));
        assert_eq!(config.checkout_url, DEFAULT_CHECKOUT_URL);
        assert_eq!(config.checkout_timeout(), Duration::from_secs(30));
        assert_eq!(config.currency, "E");
        assert_eq!(config.log, "info");
    }

    #[test]
    fn environment_wins_over_file() {
        let file = FileConfig {
            storage: Some(StorageBackend::File),
            currency: Some("R".into()),
            checkout_timeout_ms: Some(5_000),
            ..Default::default()
        };
        let lookup = lookup_from(&[
            ("DRIFT_STORAGE", "memory"),
            ("DRIFT_CHECKOUT_TIMEOUT_MS", "1500"),
            ("DRIFT_CURRENCY", " "),
        ]);
        let config = AppConfig::resolve(PathBuf::from("ws"), file, &lookup).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.checkout_timeout_ms, 1500);
        assert_eq!(config.currency, "R");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_url = lookup_from(&[("DRIFT_CHECKOUT_URL", "not a url")]);
        assert!(matches!(
            AppConfig::resolve(PathBuf::from("ws"), FileConfig::default(), &bad_url),
            Err(ConfigError::Url { .. })
        ));
        let bad_scheme = lookup_from(&[("DRIFT_CHECKOUT_URL", "ftp://example.com/orders")]);
        assert!(AppConfig::resolve(PathBuf::from("ws"), FileConfig::default(), &bad_scheme).is_err());
        let bad_timeout = lookup_from(&[("DRIFT_CHECKOUT_TIMEOUT_MS", "soon")]);
        assert!(matches!(
            AppConfig::resolve(PathBuf::from("ws"), FileConfig::default(), &bad_timeout),
            Err(ConfigError::Invalid { .. })
        ));
        let bad_backend = lookup_from(&[("DRIFT_STORAGE", "redis")]);
        assert!(AppConfig::resolve(PathBuf::from("ws"), FileConfig::default(), &bad_backend).is_err());
        let bad_pattern = lookup_from(&[("DRIFT_PHONE_PATTERN", "(")]);
        assert!(AppConfig::resolve(PathBuf::from("ws"), FileConfig::default(), &bad_pattern).is_err());
    }

    #[test]
    fn workspace_file_and_flags_layer() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileConfig {
            storage: Some(StorageBackend::File),
            cart_slot: Some("kiosk".into()),
            ..Default::default()
        };
        std::fs::write(
            config_file_path(dir.path()),
            serde_json::to_string(&file).unwrap(),
        )
        .unwrap();
        assert_eq!(load_file_config(&config_file_path(dir.path())), file);

        let lookup = lookup_from(&[("DRIFT_WORKSPACE", "/nowhere")]);
        let overrides = Overrides {
            workspace: Some(dir.path().to_path_buf()),
            storage: None,
        };
        let config = AppConfig::load(&overrides, &lookup).unwrap();
        assert_eq!(config.workspace, dir.path());
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.cart_slot, "kiosk");

        let overrides = Overrides {
            storage: Some(StorageBackend::Sqlite),
            ..overrides
        };
        let config = AppConfig::load(&overrides, &lookup).unwrap();
        assert_eq!(config.storage, StorageBackend::Sqlite);
    }

    #[test]
    fn garbage_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_file_config(&path), FileConfig::default());
    }

    #[test]
    fn storage_factory_opens_each_backend() {
        let dir = tempfile::tempdir().unwrap();
        for backend in [StorageBackend::Sqlite, StorageBackend::File, StorageBackend::Memory] {
            let mut config =
                AppConfig::resolve(dir.path().to_path_buf(), FileConfig::default(), &lookup_from(&[]))
                    .unwrap();
            config.storage = backend;
            let storage = config.open_storage().unwrap();
            storage.save("[]").unwrap();
            assert_eq!(storage.load().unwrap().as_deref(), Some("[]"));
            assert_eq!(backend.to_string().parse::<StorageBackend>().unwrap(), backend);
        }
    }
}
