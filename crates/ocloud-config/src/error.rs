use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Config file not found. Looked for:\n\
        - ./ocloud.yaml, ./.ocloud.yaml\n\
        - ~/.config/ocloud/config.yaml\n\
        Set OCLOUD_CONFIG_PATH to point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("OCLOUD_CONFIG_PATH points at a missing file: {}", .0.display())]
    ConfigPathMissing(PathBuf),

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
