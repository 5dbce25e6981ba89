#[tokio::main]
async fn main() {
    palaver::run().await;
}
