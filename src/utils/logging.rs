//! Logging setup and banner helpers
//!
//! Human-readable lines go to stderr (stdout is reserved for the JSON document).
//! With a log file, a second layer writes everything at debug level without ANSI
//! colours, below a dated header.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{AppResult, FileError};

/// Install the global subscriber. A second call is a no-op.
pub fn init(log_file: Option<&Path>) -> AppResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter);

    let file_layer = match log_file {
        Some(path) => {
            let file = init_log_file(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

/// Create (or truncate) the log file and write its header
pub fn init_log_file(path: &Path) -> AppResult<File> {
    let header = format!(
        "{}\nLCSC batch log - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    let mut file = File::create(path).map_err(|e| FileError::write(path, e))?;
    file.write_all(header.as_bytes())
        .map_err(|e| FileError::write(path, e))?;
    Ok(file)
}

pub fn log_startup(jobs: usize, pool_size: usize, factory: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 Starting batch of {} job(s)", jobs);
    info!("📊 Max concurrent: {} ({})", pool_size, factory);
    info!("{}", "=".repeat(60));
}

pub fn print_final_stats(
    total: usize,
    success: usize,
    failed: usize,
    elapsed: Duration,
    results_path: Option<&Path>,
) {
    info!("{}", "=".repeat(60));
    info!("📊 Processing complete");
    info!("Finished at: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("{}", "=".repeat(60));
    info!("Total:      {}", total);
    info!("✅ Success: {}", success);
    info!("❌ Failed:  {}", failed);
    info!("⏱️ Elapsed: {:.1}s", elapsed.as_secs_f64());
    if let Some(path) = results_path {
        info!("💾 Results saved to: {}", path.display());
    }
    info!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_starts_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        init_log_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(&"=".repeat(60)));
        assert!(content.contains("LCSC batch log - "));
    }

    #[test]
    fn test_log_file_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(init_log_file(&dir.path().join("nope").join("run.log")).is_err());
    }
}
