// Drive Gateway Server
//
// Upload form that forwards files to Google Drive, authorized through
// Google's OAuth consent flow

use drive_gateway::{start_server, GatewayConfig};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Drive Gateway Server");
    println!();

    // Optional positional arguments: [host] [port]
    let config = GatewayConfig::default().with_args(env::args().skip(1));

    println!("[OK] Client secrets: {}", config.credentials_path.display());
    println!("[OK] Token file:     {}", config.token_path.display());
    println!("[OK] Upload staging: {}", config.upload_dir.display());
    println!();
    println!("[INFO] Available endpoints:");
    println!("  GET    http://{}/                - Upload form", config.bind_addr());
    println!("  POST   http://{}/upload          - Upload a file to Drive", config.bind_addr());
    println!("  GET    http://{}/authenticate    - Start Google authorization", config.bind_addr());
    println!("  GET    http://{}/googleCallback  - OAuth callback handler", config.bind_addr());
    println!();

    start_server(config).await?;

    Ok(())
}
