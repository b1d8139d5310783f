use anyhow::{Context, Result};
use offhours::cli::{Cli, CommonArgs};
use tracing_log::{AsLog, LogTracer};
use tracing_subscriber::{fmt, EnvFilter};

/// `OFFHOURS_LOG` takes `RUST_LOG` syntax and refines the `-q`/`-v` level.
const LOG_ENV: &str = "OFFHOURS_LOG";

fn init_logging(common: &CommonArgs) -> Result<()> {
    let level = common.level_filter();

    // `ignore` still logs through the `log` facade
    LogTracer::builder()
        .with_max_level(level.as_log())
        .init()
        .context("Failed to forward log records")?;

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var(LOG_ENV)
        .from_env()
        .with_context(|| format!("Invalid {LOG_ENV} filter"))?;

    // stdout carries reports, so diagnostics go to stderr
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(common.verbose > 1)
        .with_ansi(console::colors_enabled_stderr())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")?;

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common)?;
    cli.execute()
}
