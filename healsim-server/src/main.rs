/// Healing Simulator API - health endpoint server
use clap::Parser;
use healsim_server::{app, DEFAULT_MESSAGE};

#[derive(Parser, Debug)]
#[command(name = "healsim-server")]
#[command(about = "Serve the Healing Simulator health endpoint", long_about = None)]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 4000)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Message returned by `GET /`
    #[arg(long, env = "HEALTH_MESSAGE", default_value = DEFAULT_MESSAGE)]
    message: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = serve(cli).await {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn serve(cli: Cli) -> anyhow::Result<()> {
    let address = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    log::info!("Server running on http://{address}");
    axum::serve(listener, app(cli.message)).await?;
    Ok(())
}
