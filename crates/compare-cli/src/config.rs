use std::path::Path;

use compare_core::{ClientConfig, CompareError};

/// Loads `.env` from the crate directory, then from the working directory.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/.env")));
    dotenvy::dotenv().ok();
}

/// Client configuration from the environment, with CLI flag overrides.
pub fn client_config(base_url: Option<String>) -> Result<ClientConfig, CompareError> {
    let config = ClientConfig::from_env()?;
    Ok(match base_url {
        Some(url) => config.base_url(url),
        None => config,
    })
}
