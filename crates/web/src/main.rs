use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use splitview_web::WebConfig;

#[derive(Parser)]
#[command(name = "splitview-web")]
#[command(about = "Splitview experiment registry and tracking service")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "splitview.toml")]
    config: PathBuf,

    /// HTTP listen address (overrides the config file)
    #[arg(short, long, env = "SPLITVIEW_WEB_ADDR")]
    listen: Option<String>,

    /// Experiments file (overrides the config file)
    #[arg(short, long)]
    experiments: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!("Splitview web v{}", splitview_common::VERSION);

    let mut cfg = WebConfig::load(&cli.config)?;
    if let Some(listen) = cli.listen {
        cfg.listen = listen;
    }
    if let Some(experiments) = cli.experiments {
        cfg.experiments_file = Some(experiments);
    }

    let addr = cfg.listen_addr()?;
    splitview_web::server::serve(addr, cfg).await
}
