//! Studentcache - inspect the academic bundle for one student from the shell.
//!
//! Loads (student, year) through the same cache and refresh controller the
//! dashboard uses and prints the resulting view state as JSON.

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use studentcache_core::{CacheKey, Config, HttpAcademicSource, RefreshController};

/// Environment variable overriding the configured API base URL
const API_URL_ENV: &str = "STUDENTCACHE_API_URL";

/// Environment variable holding the bearer token
const API_TOKEN_ENV: &str = "STUDENTCACHE_API_TOKEN";

const USAGE: &str = "usage: studentcache <student-id> <year> [--refresh]";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

struct Args {
    student_id: i64,
    year: i32,
    refresh: bool,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut positional = Vec::new();
    let mut refresh = false;
    for arg in args {
        match arg.as_str() {
            "--refresh" => refresh = true,
            "-h" | "--help" => bail!(USAGE),
            other => positional.push(other),
        }
    }

    let [student_id, year] = positional.as_slice() else {
        bail!(USAGE);
    };

    Ok(Args {
        student_id: student_id
            .parse()
            .with_context(|| format!("Invalid student id: {}", student_id))?,
        year: year.parse().with_context(|| format!("Invalid year: {}", year))?,
        refresh,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&args)?;

    let config = Config::load()?;
    let base_url = std::env::var(API_URL_ENV)
        .ok()
        .or_else(|| config.api_base_url.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("No API URL: set {} or api_base_url in the config file", API_URL_ENV)
        })?;

    let mut source = HttpAcademicSource::new(&base_url)?;
    if let Ok(token) = std::env::var(API_TOKEN_ENV) {
        source = source.with_token(token);
    }

    let key = CacheKey::new(args.student_id, args.year);
    info!(key = %key, base_url = %base_url, "Loading academic data");

    let controller = RefreshController::with_config(
        Arc::new(config.cache_store()),
        config.fetcher(Arc::new(source)),
        key,
        config.controller_config(),
    );

    let mut state = controller.load().await;
    if args.refresh {
        controller.refresh();
        controller.settled().await;
        state = controller.state();
    }

    println!("{}", serde_json::to_string_pretty(&state)?);

    if config.strict_fetch {
        if let Some(err) = state.error {
            bail!("{}", err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse_args(&args(&["42", "2024"])).unwrap();
        assert_eq!(parsed.student_id, 42);
        assert_eq!(parsed.year, 2024);
        assert!(!parsed.refresh);

        let parsed = parse_args(&args(&["--refresh", "7", "2023"])).unwrap();
        assert!(parsed.refresh);
        assert_eq!(parsed.student_id, 7);
    }

    #[test]
    fn test_parse_args_rejects_bad_input() {
        assert!(parse_args(&args(&["42"])).is_err());
        assert!(parse_args(&args(&["abc", "2024"])).is_err());
        assert!(parse_args(&args(&["42", "2024", "extra"])).is_err());
    }
}
