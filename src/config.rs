use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::core::search::SynthesisConfig;
use crate::ingestion::DEFAULT_CHUNK_SIZE;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub opensearch: OpenSearchConfig,
    pub search: SynthesisConfig,
    pub ingestion: IngestionConfig,
    pub logging: LoggingConfig,
}

/// Connection to the corpus index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSearchConfig {
    pub host: String,
    pub port: u16,
    pub index: String,
    pub use_ssl: bool,
    pub verify_certs: bool,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

/// OCR import settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Bucket holding OCR output; its mirror lives at `{mirror_dir}/{ocr_bucket}`.
    pub ocr_bucket: String,
    /// Linked data prefix; `{prefix}{i_id}.ttl` describes a volume.
    pub metadata_base_url: String,
    pub metadata_timeout_secs: u64,
    /// Local copy of the buckets, used instead of S3.
    pub mirror_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Write JSON logs, rotated daily, to this directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9200,
            index: "bec".to_string(),
            use_ssl: false,
            verify_certs: true,
            user: None,
            password: None,
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            ocr_bucket: "bec.bdrc.io".to_string(),
            metadata_base_url: "https://purl.bdrc.io/resource/".to_string(),
            metadata_timeout_secs: 10,
            mirror_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl OpenSearchConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/tibetan-corpus/config.toml` and
    /// the environment. Returns `Default` if the result is unusable.
    pub fn load() -> Self {
        Self::load_or_default(&Self::config_path())
    }

    /// Like [`AppConfig::load`] with an explicit config file.
    pub fn load_or_default(path: &Path) -> Self {
        let (config, error) = Self::resolve(path);
        if let Some(e) = error {
            log::warn!("Invalid config ({}): {e}; using defaults", path.display());
        }
        config
    }

    /// The configuration for `path`, or defaults plus the reason they were
    /// used. Lets the caller report the error once logging is up.
    pub fn resolve(path: &Path) -> (Self, Option<figment::Error>) {
        match Self::load_from(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Defaults, then `path` if it exists, then the environment.
    pub fn load_from(path: &Path) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    /// Environment variables, highest precedence first:
    /// - `TIBETAN_CORPUS_<SECTION>__<KEY>` for any setting
    /// - `OPENSEARCH_HOST`, `OPENSEARCH_PORT`, ... for the index connection
    /// - `S3_OCR_BUCKET` for the OCR bucket
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::raw().only(&["S3_OCR_BUCKET"]).map(|_| "ingestion.ocr_bucket".into()))
            .merge(Env::prefixed("OPENSEARCH_").map(|key| format!("opensearch.{key}").into()))
            .merge(Env::prefixed("TIBETAN_CORPUS_").split("__"))
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("tibetan-corpus").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
