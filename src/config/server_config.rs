use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use serde_json::{Map, Number, Value};
use snafu::prelude::*;
use tracing::debug;

use crate::hashing::{HashAlgorithm, UnknownHashAlgorithmError};

pub const CONFIG_FILE_NAME: &str = "config.yml";

const RESOURCE_DIR_KEY: &str = "resource-dir";
const PERFORMANCE_MODE_KEY: &str = "performance-mode";
const HASH_ALGORITHM_KEY: &str = "hash-algorithm";
const SNAPSHOT_FILE_KEY: &str = "snapshot-file";
const RESTAMP_MODIFIED_KEY: &str = "restamp-modified";

/// Keys consumed by the server itself. They never reach the index document.
const RESERVED_KEYS: [&str; 6] = [
    PERFORMANCE_MODE_KEY,
    "address",
    "host",
    "port",
    "jks-certificate-file",
    "jks-certificate-pass",
];

const DEFAULT_RESOURCE_DIR: &str = "res";
const DEFAULT_SNAPSHOT_FILE: &str = ".treesnap/snapshot.bin.zst";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub resource_dir: String,
    pub performance_mode: bool,
    pub hash_algorithm: HashAlgorithm,
    pub snapshot_file: PathBuf,
    pub restamp_modified: bool,
    /// Every non-reserved top-level key, converted to JSON.
    pub extra: Map<String, Value>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            resource_dir: DEFAULT_RESOURCE_DIR.to_string(),
            performance_mode: false,
            hash_algorithm: HashAlgorithm::default(),
            snapshot_file: PathBuf::from(DEFAULT_SNAPSHOT_FILE),
            restamp_modified: true,
            extra: Map::new(),
        }
    }
}

impl ServerConfig {
    pub fn default_path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    /// Reads the config file. A missing file yields the defaults.
    pub async fn read(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading config file: {}", path.display());
        let bytes = match compio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).context(ReadSnafu {
                    file_path: path.to_path_buf(),
                });
            }
        };
        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.to_path_buf(),
        })?;
        contents.as_str().try_into()
    }

    /// The JSON object clients fetch to locate the resource directory. An
    /// `update` key in the config takes precedence over `resource-dir`.
    pub fn index_document(&self) -> Map<String, Value> {
        let mut document = self.extra.clone();
        document
            .entry("update")
            .or_insert_with(|| Value::String(self.resource_dir.clone()));
        document
    }

    fn parse_string(
        top_level: &LinkedHashMap<Yaml, Yaml>,
        key: &'static str,
    ) -> Result<Option<String>, ConfigError> {
        match top_level.get(&Yaml::Value(Scalar::String(Cow::Borrowed(key)))) {
            None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
            Some(Yaml::Value(Scalar::String(value))) => Ok(Some(value.to_string())),
            Some(_) => InvalidValueSnafu {
                key,
                expected: "a string",
            }
            .fail(),
        }
    }

    fn parse_bool(
        top_level: &LinkedHashMap<Yaml, Yaml>,
        key: &'static str,
    ) -> Result<Option<bool>, ConfigError> {
        match top_level.get(&Yaml::Value(Scalar::String(Cow::Borrowed(key)))) {
            None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
            Some(Yaml::Value(Scalar::Boolean(value))) => Ok(Some(*value)),
            Some(_) => InvalidValueSnafu {
                key,
                expected: "true or false",
            }
            .fail(),
        }
    }
}

impl TryFrom<&str> for ServerConfig {
    type Error = ConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        };
        if matches!(document, Yaml::Value(Scalar::Null)) {
            return Ok(Self::default());
        }
        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;

        let mut config = Self::default();
        if let Some(resource_dir) = Self::parse_string(top_level, RESOURCE_DIR_KEY)? {
            config.resource_dir = resource_dir;
        }
        if let Some(performance_mode) = Self::parse_bool(top_level, PERFORMANCE_MODE_KEY)? {
            config.performance_mode = performance_mode;
        }
        if let Some(algorithm) = Self::parse_string(top_level, HASH_ALGORITHM_KEY)? {
            config.hash_algorithm = algorithm.parse().context(HashAlgorithmSnafu)?;
        }
        if let Some(snapshot_file) = Self::parse_string(top_level, SNAPSHOT_FILE_KEY)? {
            config.snapshot_file = PathBuf::from(snapshot_file);
        }
        if let Some(restamp) = Self::parse_bool(top_level, RESTAMP_MODIFIED_KEY)? {
            config.restamp_modified = restamp;
        }

        for (key, value) in top_level {
            let Some(key) = scalar_key(key) else {
                debug!("Skipping config entry with non-scalar key: {:?}", key);
                continue;
            };
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            config.extra.insert(key, yaml_to_json(value));
        }

        Ok(config)
    }
}

fn scalar_key(key: &Yaml) -> Option<String> {
    match key {
        Yaml::Value(Scalar::String(value)) => Some(value.to_string()),
        Yaml::Value(Scalar::Integer(value)) => Some(value.to_string()),
        Yaml::Value(Scalar::Boolean(value)) => Some(value.to_string()),
        _ => None,
    }
}

fn yaml_to_json(value: &Yaml) -> Value {
    match value {
        Yaml::Value(Scalar::Null) => Value::Null,
        Yaml::Value(Scalar::Boolean(value)) => Value::Bool(*value),
        Yaml::Value(Scalar::Integer(value)) => Value::Number((*value).into()),
        Yaml::Value(Scalar::FloatingPoint(value)) => Number::from_f64(value.into_inner())
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Yaml::Value(Scalar::String(value)) => Value::String(value.to_string()),
        Yaml::Sequence(items) => Value::Array(items.iter().map(yaml_to_json).collect()),
        Yaml::Mapping(entries) => Value::Object(
            entries
                .iter()
                .filter_map(|(key, value)| Some((scalar_key(key)?, yaml_to_json(value))))
                .collect(),
        ),
        _ => Value::Null,
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path.display()))]
    ReadError {
        file_path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Config file {} is not valid UTF-8", file_path.display()))]
    EncodingError {
        file_path: PathBuf,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Config key '{key}' should be {expected}"))]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
    },
    #[snafu(display("Invalid hash-algorithm in config"))]
    HashAlgorithmError { source: UnknownHashAlgorithmError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[compio::test]
    async fn config_defaults_when_file_is_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let config = ServerConfig::read(&ServerConfig::default_path(temp_dir.path()))
            .await
            .expect("missing config is not an error");

        assert_eq!(config, ServerConfig::default());
    }

    #[compio::test]
    async fn config_reads_file_from_disk() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = ServerConfig::default_path(temp_dir.path());
        std::fs::write(&path, "resource-dir: assets\nperformance-mode: true\n")
            .expect("Failed to write config");

        let config = ServerConfig::read(&path).await.expect("config should load");

        assert_eq!(config.resource_dir, "assets");
        assert!(config.performance_mode);
    }

    #[compio::test]
    async fn config_parses_all_known_keys() {
        let contents = r#"
resource-dir: files
performance-mode: true
hash-algorithm: metro64
snapshot-file: cache/tree.bin.zst
restamp-modified: false
"#;
        let config: ServerConfig = contents.try_into().expect("config should parse");

        assert_eq!(config.resource_dir, "files");
        assert!(config.performance_mode);
        assert_eq!(config.hash_algorithm, HashAlgorithm::Metro64);
        assert_eq!(config.snapshot_file, PathBuf::from("cache/tree.bin.zst"));
        assert!(!config.restamp_modified);
    }

    #[compio::test]
    async fn config_treats_empty_file_as_defaults() {
        let config: ServerConfig = "".try_into().expect("empty config should parse");
        assert_eq!(config, ServerConfig::default());
    }

    #[compio::test]
    async fn config_returns_error_on_invalid_yaml() {
        let result: Result<ServerConfig, _> = "invalid: yaml: content: [unclosed".try_into();
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[compio::test]
    async fn config_returns_error_when_top_level_is_not_map() {
        let result: Result<ServerConfig, _> = "- item1\n- item2".try_into();
        assert!(matches!(result, Err(ConfigError::TopLevelNotMap)));
    }

    #[compio::test]
    async fn config_rejects_wrongly_typed_values() {
        let result: Result<ServerConfig, _> = "performance-mode: sometimes".try_into();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                key: PERFORMANCE_MODE_KEY,
                ..
            })
        ));
    }

    #[compio::test]
    async fn config_rejects_unknown_hash_algorithm() {
        let result: Result<ServerConfig, _> = "hash-algorithm: md5".try_into();
        assert!(matches!(result, Err(ConfigError::HashAlgorithmError { .. })));
    }

    #[compio::test]
    async fn index_document_omits_server_keys() {
        let contents = r#"
host: 0.0.0.0
port: 8080
performance-mode: true
jks-certificate-file: server.jks
jks-certificate-pass: secret
resource-dir: assets
game-version: 1.12.2
mirrors:
  - https://a.example
  - https://b.example
retries: 3
ratio: 0.5
"#;
        let config: ServerConfig = contents.try_into().expect("config should parse");

        assert!(config.performance_mode);
        assert_eq!(
            Value::Object(config.index_document()),
            json!({
                "resource-dir": "assets",
                "game-version": "1.12.2",
                "mirrors": ["https://a.example", "https://b.example"],
                "retries": 3,
                "ratio": 0.5,
                "update": "assets",
            })
        );
    }

    #[compio::test]
    async fn index_document_keeps_configured_update() {
        let config: ServerConfig = "performance-mode: true\nupdate: custom"
            .try_into()
            .expect("config should parse");

        assert_eq!(
            Value::Object(config.index_document()),
            json!({ "update": "custom" })
        );
    }
}
