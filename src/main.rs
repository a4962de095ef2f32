#[tokio::main]
async fn main() {
    archive_mover::init_tracing();

    if let Err(e) = archive_mover::run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
