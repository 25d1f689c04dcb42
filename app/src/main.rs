#[tokio::main]
async fn main() -> anyhow::Result<()> {
    open_corner_lib::run().await
}
