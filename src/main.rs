//! # tracelink
//!
//! Binary that wires the store and both listeners together.

#![deny(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::ExposeSecret;
use tracelink_core::{Credentials, Settings};
use tracelink_server::QrCodeRenderer;
use tracelink_store::EventStore;
use tracelink_telemetry::{init_telemetry, LogFormat, TelemetryConfig};

/// Session-correlation event store with capture and operator listeners.
#[derive(Parser, Debug)]
#[command(name = "tracelink", about = "Session-correlation event store")]
struct Cli {
    /// Capture listener host.
    #[arg(long)]
    capture_host: Option<String>,

    /// Capture listener port (0 for auto-assign).
    #[arg(long)]
    capture_port: Option<u16>,

    /// Operator listener host.
    #[arg(long)]
    operator_host: Option<String>,

    /// Operator listener port (0 for auto-assign).
    #[arg(long)]
    operator_port: Option<u16>,

    /// Root for the event log, rendered codes and static assets.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// External base URL for issued links.
    #[arg(long)]
    public_url: Option<String>,

    /// `pretty` or `json`.
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,
}

impl Cli {
    /// Flags win over environment values.
    fn apply(self, settings: &mut Settings) {
        if let Some(host) = self.capture_host {
            settings.capture.host = host;
        }
        if let Some(port) = self.capture_port {
            settings.capture.port = port;
        }
        if let Some(host) = self.operator_host {
            settings.operator.host = host;
        }
        if let Some(port) = self.operator_port {
            settings.operator.port = port;
        }
        if let Some(dir) = self.data_dir {
            settings.data_dir = dir;
        }
        if let Some(url) = self.public_url {
            settings.set_public_base_url(&url);
        }
    }
}

/// Show a generated password once, on the terminal rather than the log stream.
fn announce_generated_password(out: &mut impl Write, credentials: &Credentials) -> io::Result<()> {
    writeln!(
        out,
        "operator credentials for this run: {} / {}",
        credentials.username(),
        credentials.password().expose_secret()
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_telemetry(&TelemetryConfig {
        format: cli.log_format,
        ..TelemetryConfig::default()
    })?;

    let mut settings = Settings::from_env();
    cli.apply(&mut settings);
    settings.validate().context("invalid configuration")?;

    let (credentials, generated) = Credentials::from_settings(&settings);
    if generated {
        tracing::warn!(
            username = credentials.username(),
            "no operator password configured, generated one for this run (printed to stderr)"
        );
        announce_generated_password(&mut std::io::stderr(), &credentials)
            .context("failed to print generated password")?;
    }

    let db_path = settings.events_db_path();
    let store = EventStore::open(&db_path)
        .with_context(|| format!("failed to open event store at {}", db_path.display()))?;

    for dir in [settings.codes_dir(), settings.static_dir()] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }

    let handle = tracelink_server::start(
        &settings,
        store,
        credentials,
        Arc::new(QrCodeRenderer::default()),
    )
    .await
    .context("failed to start listeners")?;

    tracing::info!(
        capture = %handle.capture_addr,
        operator = %handle.operator_addr,
        "tracelink ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    if !handle.shutdown().await {
        tracing::warn!("listeners did not stop cleanly");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "tracelink",
            "--capture-port",
            "8080",
            "--operator-host",
            "0.0.0.0",
            "--public-url",
            "https://links.example.com/",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.log_format, LogFormat::Json);

        let mut settings = Settings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.capture.port, 8080);
        assert_eq!(settings.capture.host, "127.0.0.1");
        assert_eq!(settings.operator.host, "0.0.0.0");
        assert_eq!(
            settings.public_base_url.as_deref(),
            Some("https://links.example.com")
        );
    }

    #[test]
    fn no_flags_keep_defaults() {
        let cli = Cli::parse_from(["tracelink"]);
        let mut settings = Settings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.operator.port, 5001);
        assert_eq!(settings.data_dir, PathBuf::from("."));
    }

    #[test]
    fn generated_password_goes_to_the_given_writer() {
        let credentials = Credentials::new("admin", secrecy::SecretString::from("Xy12"));
        let mut out = Vec::new();
        announce_generated_password(&mut out, &credentials).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "operator credentials for this run: admin / Xy12\n"
        );
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(Cli::try_parse_from(["tracelink", "--log-format", "xml"]).is_err());
    }
}
