pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{
    ApiSettings, EnrichmentSettings, PolicySetting, RateSettings, RetrySettings, Settings,
};

use std::path::PathBuf;

/// ocloud の設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 OCLOUD_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: ocloud.yaml, .ocloud.yaml
/// 3. ~/.config/ocloud/config.yaml (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Some(config_path) = std::env::var("OCLOUD_CONFIG_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
    {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::ConfigPathMissing(path));
    }

    // 2. カレントディレクトリで検索
    let current_dir = std::env::current_dir()?;
    for filename in ["ocloud.yaml", ".ocloud.yaml"] {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. グローバル設定ファイル
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("ocloud").join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}
