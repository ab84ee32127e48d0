//! Binary entry point for the Tessera driver.

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tessera::init().await
}
