//! Client configuration.
//!
//! The API endpoint is fixed when the binary is built (`LEADERBOARD_API_URL` at compile
//! time); only the session file location is read from the environment at runtime.

use std::path::PathBuf;

use anyhow::Context;
use tracing::debug;
use url::Url;

const LOCAL_API_URL: &str = "http://localhost:8080/api";
const SESSION_FILE: &str = "session.json";

/// Build-time API base URL.
pub const API_BASE_URL: &str = match option_env!("LEADERBOARD_API_URL") {
    Some(url) => url,
    None => LOCAL_API_URL,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    /// Keep cookies between requests, the equivalent of sending credentials cross-origin.
    pub with_credentials: bool,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid API base URL `{base_url}`"))?;
        Ok(Self {
            base_url,
            with_credentials: true,
        })
    }

    pub fn from_build() -> anyhow::Result<Self> {
        debug!(base_url = API_BASE_URL, "using build-time API endpoint");
        Self::new(API_BASE_URL)
    }
}

/// Directory holding client state: `$LEADERBOARD_HOME`, else `~/.config/leaderboard`.
pub fn client_home() -> anyhow::Result<PathBuf> {
    if let Ok(home) = std::env::var("LEADERBOARD_HOME") {
        return Ok(PathBuf::from(home));
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join("leaderboard"))
        .context("could not determine home directory; set LEADERBOARD_HOME")
}

pub fn session_path() -> anyhow::Result<PathBuf> {
    Ok(client_home()?.join(SESSION_FILE))
}
