use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// ocloud の設定全体
///
/// すべてのセクションは省略可能で、省略時はデフォルト値になる。
///
/// ```yaml
/// compartment_id: ocid1.compartment.oc1..example
/// workers: 12
/// rate:
///   per_sec: 10
///   burst: 5
/// retry:
///   max_attempts: 5
///   initial_backoff_ms: 1000
///   max_backoff_ms: 32000
/// enrichment:
///   policy: best-effort
///   deep: false
///   cache_failures: true
/// api:
///   region: us-ashburn-1
///   timeout_secs: 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub compartment_id: Option<String>,
    pub workers: usize,
    pub rate: RateSettings,
    pub retry: RetrySettings,
    pub enrichment: EnrichmentSettings,
    pub api: ApiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            compartment_id: None,
            workers: 12,
            rate: RateSettings::default(),
            retry: RetrySettings::default(),
            enrichment: EnrichmentSettings::default(),
            api: ApiSettings::default(),
        }
    }
}

/// 外向き API 呼び出しのレート制限
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateSettings {
    /// 毎秒のトークン数。0 で無制限
    pub per_sec: u32,
    pub burst: u32,
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            per_sec: 10,
            burst: 5,
        }
    }
}

impl RateSettings {
    pub fn is_unlimited(&self) -> bool {
        self.per_sec == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 32_000,
        }
    }
}

impl RetrySettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// 付帯情報の取得に失敗したときの扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicySetting {
    /// 失敗した項目は生の ID のまま残す
    #[default]
    BestEffort,
    /// 最初の失敗で処理全体を失敗させる
    Strict,
}

impl FromStr for PolicySetting {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" | "besteffort" => Ok(PolicySetting::BestEffort),
            "strict" => Ok(PolicySetting::Strict),
            other => Err(ConfigError::Invalid(format!(
                "unknown enrichment policy '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentSettings {
    pub policy: PolicySetting,

    /// 健全なバックエンドセットも個別にヘルスを問い合わせる
    pub deep: bool,
    pub cache_failures: bool,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            policy: PolicySetting::BestEffort,
            deep: false,
            cache_failures: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub region: Option<String>,

    /// 全サービス共通の接続先（テストやプロキシ用）
    pub endpoint: Option<String>,
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            auth_token: None,
            timeout_secs: 30,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// 設定ファイルを探して読み込み、環境変数で上書きする
    ///
    /// 設定ファイルが見つからない場合はデフォルト値から始める。
    pub fn load() -> Result<Self> {
        let settings = match crate::find_config_file() {
            Ok(path) => Self::from_file(&path)?,
            Err(ConfigError::ConfigFileNotFound) => Self::default(),
            Err(e) => return Err(e),
        };
        let settings = settings.with_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `OCLOUD_*` 環境変数を適用する
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(value) = env_string("OCLOUD_COMPARTMENT_ID") {
            self.compartment_id = Some(value);
        }
        if let Some(value) = env_string("OCLOUD_REGION") {
            self.api.region = Some(value);
        }
        if let Some(value) = env_string("OCLOUD_ENDPOINT") {
            self.api.endpoint = Some(value);
        }
        if let Some(value) = env_string("OCLOUD_AUTH_TOKEN") {
            self.api.auth_token = Some(value);
        }
        if let Some(value) = env_parse("OCLOUD_WORKERS")? {
            self.workers = value;
        }
        if let Some(value) = env_parse("OCLOUD_RATE_PER_SEC")? {
            self.rate.per_sec = value;
        }
        if let Some(value) = env_parse("OCLOUD_RATE_BURST")? {
            self.rate.burst = value;
        }
        if let Some(value) = env_string("OCLOUD_ENRICHMENT_POLICY") {
            self.enrichment.policy = value.parse()?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid(
                "workers must be greater than zero".to_string(),
            ));
        }
        if !self.rate.is_unlimited() && self.rate.burst == 0 {
            return Err(ConfigError::Invalid(
                "rate.burst must be greater than zero".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.max_backoff_ms < self.retry.initial_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.max_backoff_ms ({}) is below retry.initial_backoff_ms ({})",
                self.retry.max_backoff_ms, self.retry.initial_backoff_ms
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "api.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_string(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(var: &str) -> Result<Option<T>> {
    match env_string(var) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value,
            }),
        None => Ok(None),
    }
}
