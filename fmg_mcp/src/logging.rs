//! Logging initialization.
//!
//! The server talks MCP over stdout, so logs must never touch it: they go
//! either to stderr (with ANSI colors, for debugging under an inspector)
//! or to a daily rolling file in the user cache directory. Verbosity comes
//! from `RUST_LOG` when set, otherwise from the configured level with the
//! workspace crates raised to `debug`.

use anyhow::Result;
use directories::ProjectDirs;
use std::{io::stderr, path::Path, sync::Once};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

/// Verbose stderr logging for tests.
pub fn init_test_logging() {
    init_logging("trace", false).expect("failed to initialize test logging");
}

/// Initialize the global subscriber once; later calls are no-ops.
pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<()> {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{log_level},fmg_mcp=debug,fmg_api=debug"))
        });

        if log_to_file && let Some(proj_dirs) = ProjectDirs::from("com", "FmgMcp", "fmg_mcp") {
            let log_dir = proj_dirs.cache_dir();

            // tracing-appender 0.2.4+ panics on permission errors, so probe
            // writability first and keep a catch_unwind around the appender.
            let file_appender_result = if test_write_permission(log_dir) {
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    tracing_appender::rolling::daily(log_dir, "fmg_mcp.log")
                }))
            } else {
                Err(Box::new("cannot write to log directory") as Box<dyn std::any::Any + Send>)
            };

            if let Ok(file_appender) = file_appender_result {
                let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(non_blocking).with_ansi(false))
                    .init();
                // Leaked so logs keep flushing until process exit.
                Box::leak(Box::new(_guard));
                return;
            }
        }

        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer().with_writer(stderr).with_ansi(true))
            .init();
    });

    Ok(())
}

/// Create the directory if needed and verify a file can be written there.
fn test_write_permission(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }

    let test_file = dir.join(".fmg_log_test");
    match std::fs::write(&test_file, "test") {
        Ok(()) => {
            let _ = std::fs::remove_file(&test_file);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_permission_probe() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(test_write_permission(dir.path()));

        let nested = dir.path().join("a/b/c");
        assert!(test_write_permission(&nested));
        assert!(nested.is_dir());
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging("info", false).expect("first init");
        init_logging("debug", false).expect("second init is a no-op");
    }
}
