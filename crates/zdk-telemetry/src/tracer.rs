//! Tracer setup and management

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Global tracer provider holder
static TRACER_PROVIDER: OnceLock<Arc<TracerProvider>> = OnceLock::new();

/// Settings for the process-wide subscriber
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Tracer name reported to OpenTelemetry; defaults to the system name
    pub service_name: Option<String>,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
    /// `EnvFilter` directive; falls back to `RUST_LOG`, then `info`
    pub filter: Option<String>,
}

/// Initialize structured logging with OpenTelemetry support.
///
/// Installs a `tracing` subscriber made of an env filter, a fmt layer
/// (plain or JSON) and an OpenTelemetry layer. Returns `false` when a global
/// subscriber was already installed, in which case nothing changes.
///
/// # Example
///
/// ```rust,no_run
/// use zdk_telemetry::{TelemetryConfig, init_telemetry};
///
/// init_telemetry(&TelemetryConfig::default());
/// ```
pub fn init_telemetry(config: &TelemetryConfig) -> bool {
    if TRACER_PROVIDER.get().is_some() {
        return false;
    }

    let tracer_provider = TracerProvider::builder().build();
    let service_name = config
        .service_name
        .clone()
        .unwrap_or_else(|| crate::attributes::SYSTEM_NAME.to_string());
    let tracer = tracer_provider.tracer(service_name);

    let filter = config
        .filter
        .as_deref()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let json_layer = config
        .json_logs
        .then(|| tracing_subscriber::fmt::layer().json().with_target(true));
    let plain_layer = (!config.json_logs).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_line_number(true)
    });

    let installed = tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(json_layer)
        .with(plain_layer)
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        let _ = TRACER_PROVIDER.set(Arc::new(tracer_provider));
    }
    installed
}

/// Get the global tracer provider if initialized
pub fn tracer_provider() -> Option<Arc<TracerProvider>> {
    TRACER_PROVIDER.get().cloned()
}
