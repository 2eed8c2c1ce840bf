use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::Level;

#[derive(Debug, Clone)]
pub struct Logging {
    pub level: Level,
}

impl Logging {
    /// Installs the global compact fmt subscriber at `log_level`.
    pub fn new(log_level: &str) -> Result<Self> {
        let level = parse_level(log_level)?;

        let subscriber = tracing_subscriber::fmt()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_max_level(level)
            // Logs go to stderr so `project`/`compare` output stays pipeable.
            .with_writer(std::io::stderr)
            .compact()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("a global tracing subscriber is already installed")?;
        Ok(Logging { level })
    }
}

pub fn parse_level(log_level: &str) -> Result<Level> {
    Level::from_str(log_level.trim())
        .map_err(|_| anyhow::anyhow!("unknown log level '{log_level}'"))
}
