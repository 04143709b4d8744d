use revu::{cli, logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = logger::init() {
        eprintln!("Failed to initialize logger: {e}");
    }
    cli::main().await
}
