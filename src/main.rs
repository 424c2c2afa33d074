mod ast;
mod builtins;
mod completion;
mod config;
mod executor;
mod history;
mod jobs;
mod parser;
mod recall;
mod shell;
mod signals;
mod tokenizer;
mod types;
mod utils;
mod word;

#[cfg(test)]
mod tests;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::{ShellConfig, DEFAULT_LOG_FILTER};
use crate::shell::Shell;

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let config = ShellConfig::from_env();
    init_logging(&config.log_filter);
    debug!(?config, "loaded configuration");

    Shell::new(config).run_loop()
}
