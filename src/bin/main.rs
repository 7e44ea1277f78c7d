//! Binary entrypoint for the ability-network tool

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ability_network::cli::run().await
}
