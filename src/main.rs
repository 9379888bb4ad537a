use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before configuration is read)
    let _ = dotenvy::dotenv();

    docsum::cli::run().await
}
