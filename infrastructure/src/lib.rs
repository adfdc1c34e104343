//! Infrastructure layer for polyask
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the three provider clients, the SQLite history and
//! account store, and configuration file loading.

pub mod config;
pub mod history;
pub mod providers;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileBearerConfig, FileConfig, FileDispatchConfig, FileHistoryConfig,
    FileProvidersConfig, FileServerConfig, FileSparkConfig,
};
pub use history::SqliteHistoryStore;
pub use providers::{
    build_providers,
    openai_compat::{OpenAiCompatClient, OpenAiCompatConfig},
    spark::{SignError, SparkClient, SparkConfig, signed_ws_url},
    RegistryError,
};
