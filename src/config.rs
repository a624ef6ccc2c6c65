use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub recognition: RecognitionSettings,
    pub billing: BillingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Defaults applied to a recognition stream when the client's `start`
/// message omits them.
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionSettings {
    pub language_code: String,
    pub encoding: String,
    pub sample_rate_hertz: u32,
    /// Whether interim (non-final) results are relayed to clients.
    /// A client may override this per stream in its `start` config.
    pub relay_interim_results: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Price of one billing quantum in USD.
    pub rate_per_quantum_usd: f64,

    /// Billing quantum in seconds; audio duration is rounded up to the
    /// next full quantum before pricing.
    pub quantum_seconds: f64,

    /// Heuristic used to estimate audio duration from chunk byte length
    /// without decoding. Must match the compressed encoding in use;
    /// 1500 bytes/s approximates WEBM_OPUS speech.
    pub estimated_bytes_per_second: f64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            language_code: "en-US".to_string(),
            encoding: "WEBM_OPUS".to_string(),
            sample_rate_hertz: 48000,
            relay_interim_results: false,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            rate_per_quantum_usd: 0.006, // standard model, per 15 seconds
            quantum_seconds: 15.0,
            estimated_bytes_per_second: 1500.0,
        }
    }
}
