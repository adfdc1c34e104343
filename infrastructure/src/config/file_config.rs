//! File configuration schema (`polyask.toml`)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HTTP server settings (`[server]` section)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    /// Socket address the gateway listens on
    pub bind: String,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7860".to_string(),
        }
    }
}

/// History store settings (`[history]` section)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHistoryConfig {
    /// SQLite database path
    pub db_path: PathBuf,
}

impl Default for FileHistoryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/polyask.db"),
        }
    }
}

/// Dispatch tunables (`[dispatch]` section)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDispatchConfig {
    /// Per-provider deadline in seconds
    pub provider_timeout_secs: u64,
    /// Suffix appended to fanout queries; empty disables prompt shaping
    pub reply_brief_suffix: Option<String>,
}

impl Default for FileDispatchConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: 60,
            reply_brief_suffix: None,
        }
    }
}

/// Spark credentials and model parameters (`[providers.spark]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSparkConfig {
    pub app_id: String,
    pub api_key: String,
    pub api_secret: String,
    /// WebSocket endpoint
    pub ws_url: String,
    /// Model domain value for the requested endpoint version
    pub domain: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl FileSparkConfig {
    /// All three credential parts must be present for the provider to be
    /// registered
    pub fn is_configured(&self) -> bool {
        !self.app_id.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

impl Default for FileSparkConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            ws_url: "wss://spark-api.xf-yun.com/v4.0/chat".to_string(),
            domain: "4.0Ultra".to_string(),
            temperature: 0.5,
            max_tokens: 4096,
        }
    }
}

/// Credentials for one bearer-token backend (`[providers.qianfan]`,
/// `[providers.doubao]`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBearerConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
}

impl FileBearerConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_url.is_empty() && !self.model.is_empty()
    }
}

/// Per-provider credential sets (`[providers]` section)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    pub spark: FileSparkConfig,
    pub qianfan: FileBearerConfig,
    pub doubao: FileBearerConfig,
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: FileServerConfig,
    pub history: FileHistoryConfig,
    pub dispatch: FileDispatchConfig,
    pub providers: FileProvidersConfig,
}
