//! Configuration inspection commands

use std::path::Path;

use sensei_core::config::default_config_path;
use sensei_core::SenseiConfig;

/// Show only the last four characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

fn optional_secret(secret: Option<&str>) -> String {
    secret.map(mask_secret).unwrap_or_else(|| "(not set)".to_string())
}

pub fn cmd_config_show(config: &SenseiConfig) {
    let ocr = &config.ocr;
    println!("[ocr]");
    println!("  endpoint:          {}", ocr.endpoint);
    println!("  language:          {}", ocr.language);
    println!("  engine:            {}", ocr.engine);
    println!("  max request:       {} KB", ocr.max_request_bytes / 1024);
    println!("  chunk ratio:       {}", ocr.chunk_ratio);
    println!("  bytes per page:    {} KB", ocr.bytes_per_page / 1024);
    let keys: Vec<String> = ocr.retry.credentials.iter().map(|k| mask_secret(k)).collect();
    if keys.is_empty() {
        println!("  credentials:       (none)");
    } else {
        println!("  credentials:       {}", keys.join(", "));
    }
    println!(
        "  backoff:           {}ms rate limit / {}ms error",
        ocr.retry.rate_limit_backoff.as_millis(),
        ocr.retry.error_backoff.as_millis()
    );
    println!(
        "  chunk delay:       {}ms",
        ocr.retry.inter_chunk_delay.as_millis()
    );
    println!(
        "  request timeout:   {}s",
        ocr.retry.request_timeout.as_secs()
    );

    let llm = &config.llm;
    println!();
    println!("[llm]");
    println!("  backend:           {}", llm.backend);
    println!("  gemini model:      {}", llm.gemini_model);
    println!("  gemini base url:   {}", llm.gemini_base_url);
    println!(
        "  gemini api key:    {}",
        optional_secret(llm.gemini_api_key.as_deref())
    );
    println!(
        "  openai host:       {}",
        llm.openai_host.as_deref().unwrap_or("(not set)")
    );
    println!("  openai model:      {}", llm.openai_model);
    println!(
        "  openai api key:    {}",
        optional_secret(llm.openai_api_key.as_deref())
    );
    println!("  request timeout:   {}s", llm.request_timeout_secs);

    let server = &config.server;
    println!();
    println!("[server]");
    println!("  host:              {}", server.host);
    println!("  port:              {}", server.port);
    println!(
        "  static dir:        {}",
        server
            .static_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!("  seed demo:         {}", server.seed_demo);
}

pub fn cmd_config_path(explicit: Option<&Path>) {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(default_config_path);
    match path {
        Some(path) => {
            let marker = if path.exists() { "" } else { " (not present)" };
            println!("{}{}", path.display(), marker);
        }
        None => println!("No data directory available on this platform"),
    }
}
