use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    lmrisk_cli::main_entry().await
}
