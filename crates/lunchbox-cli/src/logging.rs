//! Logging initialization for the `lunchbox` binary.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `LunchboxConfig`. `RUST_LOG` takes precedence over `general.log_level`.
//! Until that section has been read, a scoped bootstrap subscriber covers
//! config loading so its own warnings are not lost.

use std::path::Path;

use anyhow::Result;
use lunchbox_core::ConfigError;
use lunchbox_core::config::{GeneralConfig, LunchboxConfig};
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const BOOTSTRAP_LEVEL: &str = "info";

/// Load the config with a temporary stderr subscriber installed.
pub fn load_config(path: &Path) -> Result<LunchboxConfig, ConfigError> {
    load_config_with(path, std::io::stderr)
}

fn load_config_with<W>(path: &Path, writer: W) -> Result<LunchboxConfig, ConfigError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing::subscriber::with_default(bootstrap_subscriber(writer), || {
        LunchboxConfig::load(path)
    })
}

/// Plain-text subscriber used before `general.log_level` is known.
fn bootstrap_subscriber<W>(writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_LEVEL));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .finish()
}

/// Initialize the global tracing subscriber. Logs go to stderr so stdout
/// stays pure JSON output.
///
/// * `"pretty"` - human-readable multi-line output
/// * `"json"` - one JSON object per line
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize JSON tracing subscriber: {e}"))?,
        "pretty" => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize pretty tracing subscriber: {e}"))?,
        other => anyhow::bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Collects formatted log lines in memory.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn config_loading_logs_are_visible() {
        let dir = tempfile::tempdir().unwrap();
        let captured = Captured::default();

        let config = load_config_with(&dir.path().join("missing.toml"), captured.clone()).unwrap();
        assert_eq!(config.general, GeneralConfig::default());
        assert!(captured.contents().contains("config file not found"));
    }

    #[test]
    fn ignored_override_warning_is_visible() {
        let captured = Captured::default();
        tracing::subscriber::with_default(bootstrap_subscriber(captured.clone()), || {
            let mut config = LunchboxConfig::default();
            config.apply_overrides(|key: &str| {
                (key == "LUNCHBOX_STORE_BACKEND").then(|| "mongo".to_string())
            });
        });
        let logs = captured.contents();
        assert!(logs.contains("WARN"));
        assert!(logs.contains("ignoring unknown LUNCHBOX_STORE_BACKEND"));
    }
}
