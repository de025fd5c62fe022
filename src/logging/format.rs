//! Log setup and NDJSON score lines.

use serde::Serialize;
use std::io::Write;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// One scored row as written by the CLI.
#[derive(Serialize)]
pub struct ScoreLine<'a> {
    pub ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<&'a str>,
    pub churn_probability: f64,
    pub risk_tier: &'a str,
}

pub struct StructuredLogger;

impl StructuredLogger {
    /// Install the global subscriber on stderr; `RUST_LOG` overrides `default_level`.
    /// Returns false if a subscriber was already installed.
    pub fn init(json: bool, default_level: &str) -> bool {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
        let text_layer = (!json).then(|| fmt::layer().with_writer(std::io::stderr));
        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .with(text_layer)
            .try_init()
            .is_ok()
    }

    /// Write `event` as one JSON line.
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) -> std::io::Result<()> {
        let line = serde_json::to_string(event)?;
        writeln!(w, "{}", line)
    }
}
