use anyhow::Context;
use ocloud_cloud::{
    Adapter, AdapterConfig, CloudClients, EnrichmentOptions, EnrichmentPolicy,
    LoadBalancerService, RateGate, RetryPolicy,
};
use ocloud_cloud_oci::{OciClient, OciConfig};
use ocloud_config::{PolicySetting, Settings};
use std::sync::Arc;

/// 設定ファイルと環境変数から設定を読み込む
pub fn load_settings() -> anyhow::Result<Settings> {
    Settings::load().context("Failed to load configuration")
}

/// 設定からエンジンのチューニング値を組み立てる
pub fn adapter_config(settings: &Settings, deep: bool) -> anyhow::Result<AdapterConfig> {
    let gate = if settings.rate.is_unlimited() {
        RateGate::unlimited()
    } else {
        RateGate::new(settings.rate.per_sec, settings.rate.burst)
            .context("Invalid rate settings")?
    };
    let retry = RetryPolicy::new(
        settings.retry.max_attempts,
        settings.retry.initial_backoff(),
        settings.retry.max_backoff(),
    );
    let policy = match settings.enrichment.policy {
        PolicySetting::BestEffort => EnrichmentPolicy::BestEffort,
        PolicySetting::Strict => EnrichmentPolicy::Strict,
    };

    Ok(AdapterConfig {
        workers: settings.workers,
        gate,
        retry,
        enrichment: EnrichmentOptions {
            policy,
            deep: deep || settings.enrichment.deep,
            cache_failures: settings.enrichment.cache_failures,
        },
    })
}

fn oci_config(settings: &Settings) -> OciConfig {
    let mut config = OciConfig::new(settings.api.region.clone().unwrap_or_default())
        .with_timeout(settings.api.timeout());
    if let Some(endpoint) = &settings.api.endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    if let Some(token) = &settings.api.auth_token {
        config = config.with_auth_token(token.clone());
    }
    config
}

/// コンパートメント単位のサービスを構築する
pub fn build_service(settings: &Settings, deep: bool) -> anyhow::Result<LoadBalancerService> {
    let compartment_id = settings.compartment_id.clone().context(
        "Compartment ID is required: pass --compartment, set OCLOUD_COMPARTMENT_ID, \
         or add compartment_id to the config file",
    )?;

    let client = OciClient::new(oci_config(settings))
        .context("Failed to create API client (is OCLOUD_REGION set?)")?;
    let adapter = Adapter::new(
        CloudClients::from_shared(Arc::new(client)),
        adapter_config(settings, deep)?,
    );
    tracing::debug!(
        compartment_id = %compartment_id,
        workers = settings.workers,
        "service ready"
    );
    Ok(LoadBalancerService::new(adapter, compartment_id))
}
