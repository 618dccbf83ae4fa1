use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trellis_replay::{ReplayArgs, run};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trellis=info".into()),
        )
        .init();

    let args = ReplayArgs::parse();

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = run(args, &mut stdout).await {
        tracing::error!("Replay failed: {e}");
        std::process::exit(1);
    }
}
