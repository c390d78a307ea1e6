//! Runs a Gloomhall server on localhost with open-door auth.
//!
//! ```sh
//! RUST_LOG=gloomhall=debug cargo run --example server
//! ```

use gloomhall::prelude::*;
use gloomhall_protocol::JsonCodec;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), GloomhallError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server = GloomhallServer::<OpenDoorAuth, JsonCodec>::builder()
        .bind("127.0.0.1:8080")
        .build(OpenDoorAuth)
        .await?;

    tracing::info!(addr = ?server.local_addr()?, "listening");
    server.run().await
}
