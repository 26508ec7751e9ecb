//! Configuration and stored credentials.
//!
//! Base URLs come from the environment, then `~/.config/docchat/config.json`,
//! then defaults. Credentials for the login-gated assist surface live next
//! to the config file; they are loaded here and passed explicitly into the
//! transport client, which never reads them on its own.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::api::AuthContext;

/// Default backend address for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

const CONFIG_FILE: &str = "config.json";
const CREDENTIALS_FILE: &str = "credentials.json";

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the document backend.
    pub api_url: String,
    /// Base URL of the assist backend. The two surfaces may be separate
    /// deployments; this defaults to `api_url`.
    pub assist_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api_url: Option<String>,
    assist_url: Option<String>,
}

impl Config {
    /// Resolve configuration from environment, config file and defaults.
    pub fn load() -> Self {
        let file = config_dir()
            .map(|dir| dir.join(CONFIG_FILE))
            .and_then(|path| read_config_file(&path).ok())
            .unwrap_or_default();

        let api_url = std::env::var("DOCCHAT_API_URL")
            .ok()
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let assist_url = std::env::var("DOCCHAT_ASSIST_URL")
            .ok()
            .or(file.assist_url)
            .unwrap_or_else(|| api_url.clone());

        Self { api_url, assist_url }
    }
}

/// `~/.config/docchat`.
fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("docchat"))
}

fn read_config_file(path: &Path) -> Result<ConfigFile, String> {
    let data =
        fs::read(path).map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    serde_json::from_slice(&data)
        .map_err(|err| format!("failed to parse {}: {err}", path.display()))
}

/// Load stored credentials, if a previous `docchat login` saved any.
pub fn load_credentials() -> Option<AuthContext> {
    let path = config_dir()?.join(CREDENTIALS_FILE);
    if !path.exists() {
        return None;
    }
    match read_credentials_file(&path) {
        Ok(auth) => Some(auth),
        Err(err) => {
            tracing::debug!("ignoring stored credentials: {err}");
            None
        }
    }
}

fn read_credentials_file(path: &Path) -> Result<AuthContext, String> {
    let data =
        fs::read(path).map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    serde_json::from_slice(&data)
        .map_err(|err| format!("failed to parse {}: {err}", path.display()))
}

/// Persist credentials after a successful login.
pub fn save_credentials(auth: &AuthContext) -> io::Result<()> {
    let dir = config_dir().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "could not determine home directory")
    })?;
    write_credentials_file(&dir, auth)
}

fn write_credentials_file(dir: &Path, auth: &AuthContext) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let final_path = dir.join(CREDENTIALS_FILE);
    let tmp_path = dir.join(format!("{CREDENTIALS_FILE}.tmp"));
    let bytes = serde_json::to_vec_pretty(auth)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;

    fs::write(&tmp_path, bytes)?;
    match fs::rename(&tmp_path, &final_path) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if final_path.exists() {
                fs::remove_file(&final_path)?;
                fs::rename(&tmp_path, &final_path)?;
                Ok(())
            } else {
                Err(rename_err)
            }
        }
    }
}

/// Forget stored credentials. Missing file is not an error.
pub fn clear_credentials() -> io::Result<()> {
    let Some(dir) = config_dir() else {
        return Ok(());
    };
    let path = dir.join(CREDENTIALS_FILE);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_round_trip_through_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let auth = AuthContext {
            access_token: "tok".into(),
            username: "ada".into(),
        };

        write_credentials_file(dir.path(), &auth).expect("credentials should write");
        let loaded =
            read_credentials_file(&dir.path().join(CREDENTIALS_FILE)).expect("should load");
        assert_eq!(loaded.access_token, "tok");
        assert_eq!(loaded.username, "ada");
    }

    #[test]
    fn malformed_credentials_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CREDENTIALS_FILE);
        fs::write(&path, b"not json").expect("fixture should write");

        let error = read_credentials_file(&path).expect_err("parse should fail");
        assert!(error.contains("failed to parse"));
    }

    #[test]
    fn config_file_fields_are_optional() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, br#"{"api_url": "https://rag.example.com"}"#)
            .expect("fixture should write");

        let file = read_config_file(&path).expect("should parse");
        assert_eq!(file.api_url.as_deref(), Some("https://rag.example.com"));
        assert!(file.assist_url.is_none());
    }
}
