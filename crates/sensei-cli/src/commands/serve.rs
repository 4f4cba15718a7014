//! Server command implementation

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use sensei_core::SenseiConfig;
use sensei_server::AppState;

pub async fn cmd_serve(
    config: SenseiConfig,
    host: Option<String>,
    port: Option<u16>,
    static_dir: Option<PathBuf>,
    no_seed: bool,
    cors_origins: Vec<String>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let static_dir = static_dir.or_else(|| config.server.static_dir.clone());
    let seed_demo = config.server.seed_demo && !no_seed;

    println!("🚀 Starting UPISensei web server...");
    println!("   Listening: http://{}:{}", host, port);
    if let Some(ref dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    println!(
        "   OCR credentials: {} configured (OCR_SPACE_API_KEYS)",
        config.ocr.retry.credentials.len()
    );
    if config.ocr.retry.credentials.is_empty() {
        println!("   ⚠️  PDF uploads will fall back to demo data until a key is set");
    }
    if seed_demo {
        println!("   🌱 Demo transactions seeded (--no-seed to start empty)");
    }
    if !cors_origins.is_empty() {
        println!("   CORS origins: {}", cors_origins.join(", "));
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let mut state = AppState::from_config(&config, seed_demo).await?;
    state.config.allowed_origins = cors_origins;

    let static_dir_str = static_dir
        .as_deref()
        .map(|p| {
            p.to_str()
                .ok_or_else(|| anyhow!("static_dir path must be valid UTF-8: {}", p.display()))
        })
        .transpose()?;
    sensei_server::serve(state, &host, port, static_dir_str).await?;

    Ok(())
}
