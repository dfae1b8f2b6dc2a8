use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    oumodules_cli::main_entry().await
}
