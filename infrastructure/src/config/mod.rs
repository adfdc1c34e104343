//! Configuration loading

mod file_config;
mod loader;

pub use file_config::{
    FileBearerConfig, FileConfig, FileDispatchConfig, FileHistoryConfig, FileProvidersConfig,
    FileServerConfig, FileSparkConfig,
};
pub use loader::ConfigLoader;
