use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedsweep::app::AppContext;
use feedsweep::cli::{commands, Cli, Commands};
use feedsweep::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    match cli.command() {
        Commands::ClearCache => {
            commands::clear_cache(&config);
        }
        command => {
            config.validate()?;
            let ctx = AppContext::new(config)?;

            if command == Commands::Check {
                commands::check(&ctx).await?;
            } else {
                commands::run(&ctx).await?;
            }
        }
    }

    Ok(())
}
