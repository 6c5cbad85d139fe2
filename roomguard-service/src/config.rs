//! Service configuration
//!
//! Every setting has a command-line flag and an environment variable, the
//! flag winning. [`Config::settings`] turns the flat argument list into the
//! typed configuration of each component and validates all of them before
//! anything connects.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use roomguard_connectors::{DeliveryConfig, MqttConfig};
use roomguard_core::constants::fusion::{WEIGHT_DURATION, WEIGHT_ENVIRONMENTAL, WEIGHT_ROOM};
use roomguard_core::constants::time::{
    DELIVERY_MAX_RETRIES, DELIVERY_RETRY_INTERVAL_SECS, INCIDENT_WINDOW_SECS, RETENTION_MARGIN_SECS,
};
use roomguard_core::constants::{
    DEFAULT_DETECTION_THRESHOLD, FLUCTUATION_WINDOW_SECS, HUMIDITY_FLUCTUATION_PCT,
    TEMP_FLUCTUATION_C,
};
use roomguard_core::{FusionConfig, FusionWeights, StoreConfig, TrendConfig};

/// RoomGuard backend service
#[derive(Debug, Clone, Parser)]
#[command(name = "roomguard")]
#[command(about = "RoomGuard - room sensor fusion and alerting service", long_about = None)]
#[command(version)]
pub struct Config {
    /// MQTT broker host
    #[arg(long, env = "MQTT_BROKER_HOST", default_value = "localhost")]
    pub broker_host: String,

    /// MQTT broker port
    #[arg(long, env = "MQTT_BROKER_PORT", default_value_t = 1883)]
    pub broker_port: u16,

    /// MQTT client identifier
    #[arg(long, env = "MQTT_CLIENT_ID", default_value = "raspberry_pi_backend")]
    pub client_id: String,

    /// MQTT username, empty to connect anonymously
    #[arg(long, env = "MQTT_USERNAME", default_value = "admin")]
    pub username: String,

    /// MQTT password
    #[arg(long, env = "MQTT_PASSWORD", default_value = "admin_password", hide_env_values = true)]
    pub password: String,

    /// MQTT keep-alive in seconds
    #[arg(long, env = "MQTT_KEEP_ALIVE_SECS", default_value_t = 60)]
    pub keep_alive_secs: u64,

    /// Retries of an unacknowledged message before it is reported failed
    #[arg(long, env = "DELIVERY_MAX_RETRIES", default_value_t = DELIVERY_MAX_RETRIES)]
    pub max_retries: u32,

    /// Retry cycle period and per-message backoff in seconds
    #[arg(long, env = "DELIVERY_RETRY_INTERVAL_SECS", default_value_t = DELIVERY_RETRY_INTERVAL_SECS)]
    pub retry_interval_secs: u64,

    /// Temperature range within the window that counts as rapid fluctuation (°C)
    #[arg(long, env = "TEMP_FLUCTUATION_THRESHOLD", default_value_t = TEMP_FLUCTUATION_C)]
    pub temp_fluctuation_threshold: f64,

    /// Humidity range within the window that counts as rapid fluctuation (%)
    #[arg(long, env = "HUMIDITY_FLUCTUATION_THRESHOLD", default_value_t = HUMIDITY_FLUCTUATION_PCT)]
    pub humidity_fluctuation_threshold: f64,

    /// Fluctuation window in seconds
    #[arg(long, env = "TREND_WINDOW_SECS", default_value_t = FLUCTUATION_WINDOW_SECS)]
    pub trend_window_secs: i64,

    /// Fusion weight of room verification
    #[arg(long, env = "FUSION_WEIGHT_ROOM", default_value_t = WEIGHT_ROOM)]
    pub fusion_weight_room: f64,

    /// Fusion weight of motion absence duration
    #[arg(long, env = "FUSION_WEIGHT_DURATION", default_value_t = WEIGHT_DURATION)]
    pub fusion_weight_duration: f64,

    /// Fusion weight of environmental change
    #[arg(long, env = "FUSION_WEIGHT_ENVIRONMENTAL", default_value_t = WEIGHT_ENVIRONMENTAL)]
    pub fusion_weight_environmental: f64,

    /// Fusion weight of the wearable detector, 0 for room sensors only
    #[arg(long, env = "FUSION_WEIGHT_WEARABLE", default_value_t = 0.0)]
    pub fusion_weight_wearable: f64,

    /// Severity at which an incident is detected
    #[arg(long, env = "FUSION_DETECTION_THRESHOLD", default_value_t = DEFAULT_DETECTION_THRESHOLD)]
    pub fusion_detection_threshold: f64,

    /// Seconds of history scored per incident
    #[arg(long, env = "INCIDENT_WINDOW_SECS", default_value_t = INCIDENT_WINDOW_SECS)]
    pub incident_window_secs: i64,

    /// Directory of anomaly model artifacts
    #[arg(long, env = "ANOMALY_MODEL_DIR")]
    pub anomaly_model_dir: Option<PathBuf>,

    /// Reading retention in seconds (default: trend window plus margin)
    #[arg(long, env = "STORE_RETENTION_SECS")]
    pub store_retention_secs: Option<i64>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Validated per-component configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub mqtt: MqttConfig,
    pub delivery: DeliveryConfig,
    pub fusion: FusionConfig,
    pub trend: TrendConfig,
    pub store: StoreConfig,
    pub incident_window_secs: i64,
    pub model_dir: Option<PathBuf>,
}

impl Config {
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mqtt = MqttConfig::new(&self.broker_host, self.broker_port)
            .with_client_id(&self.client_id)
            .with_credentials(&self.username, &self.password)
            .with_keep_alive(self.keep_alive_secs);
        mqtt.validate().context("invalid MQTT configuration")?;

        let delivery = DeliveryConfig::default()
            .with_max_retries(self.max_retries)
            .with_retry_interval(self.retry_interval_secs);
        delivery.validate().context("invalid delivery configuration")?;

        let weights = FusionWeights {
            room: self.fusion_weight_room,
            duration: self.fusion_weight_duration,
            environmental: self.fusion_weight_environmental,
            wearable: self.fusion_weight_wearable,
        };
        let fusion = FusionConfig::default()
            .with_weights(weights)
            .with_detection_threshold(self.fusion_detection_threshold);
        fusion.validate().context("invalid fusion configuration")?;

        let trend = TrendConfig::default()
            .with_temperature_fluctuation(self.temp_fluctuation_threshold)
            .with_humidity_fluctuation(self.humidity_fluctuation_threshold)
            .with_fluctuation_window(self.trend_window_secs);
        trend.validate().context("invalid trend configuration")?;

        if self.incident_window_secs <= 0 {
            bail!("incident window must be positive, got {}", self.incident_window_secs);
        }

        let needed = trend.longest_window_secs().max(self.incident_window_secs);
        let retention = self
            .store_retention_secs
            .unwrap_or(needed + RETENTION_MARGIN_SECS);
        if retention < needed {
            bail!("store retention of {retention}s is shorter than the {needed}s windows read from it");
        }

        Ok(Settings {
            mqtt,
            delivery,
            fusion,
            trend,
            store: StoreConfig::default().with_retention(retention),
            incident_window_secs: self.incident_window_secs,
            model_dir: self.anomaly_model_dir.clone(),
        })
    }
}
