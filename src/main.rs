#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cropchain_gateway::server::run().await
}
