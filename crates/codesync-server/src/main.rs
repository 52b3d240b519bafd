#[tokio::main]
async fn main() -> anyhow::Result<()> {
    codesync_server::run().await
}
