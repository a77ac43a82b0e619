//! Persistent application settings (JSON file in app data directory).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    /// Base URL of the academic dialogue service.
    pub service_url: String,
    /// Bearer token for dialogue calls. The `COLLOQUY_ACCESS_TOKEN`
    /// environment variable takes precedence when set.
    pub access_token: Option<String>,
    pub voice_output_enabled: bool,
    pub greeting_enabled: bool,
    /// Console "speech" pacing in words per minute.
    pub speaking_rate_wpm: u32,
    pub request_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8000".into(),
            access_token: None,
            voice_output_enabled: true,
            greeting_enabled: true,
            speaking_rate_wpm: 160,
            request_timeout_secs: 30,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        let trimmed = self.service_url.trim().trim_end_matches('/');
        self.service_url = if trimmed.is_empty() {
            AppSettings::default().service_url
        } else {
            trimmed.to_string()
        };
        self.access_token = self
            .access_token
            .as_ref()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self.speaking_rate_wpm = self.speaking_rate_wpm.clamp(60, 600);
        self.request_timeout_secs = self.request_timeout_secs.clamp(1, 120);
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Colloquy")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("colloquy")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_service_url_and_empty_token() {
        let mut settings = AppSettings {
            service_url: "  http://campus.example:8000/  ".into(),
            access_token: Some("   ".into()),
            ..AppSettings::default()
        };
        settings.normalize();
        assert_eq!(settings.service_url, "http://campus.example:8000");
        assert!(settings.access_token.is_none());
    }

    #[test]
    fn normalize_clamps_pacing_and_timeout() {
        let mut settings = AppSettings {
            speaking_rate_wpm: 9_999,
            request_timeout_secs: 0,
            ..AppSettings::default()
        };
        settings.normalize();
        assert_eq!(settings.speaking_rate_wpm, 600);
        assert_eq!(settings.request_timeout_secs, 1);
    }

    #[test]
    fn unknown_or_corrupt_settings_fall_back_to_defaults() {
        let settings = load_settings(Path::new("/nonexistent/colloquy-settings.json"));
        assert_eq!(settings.service_url, "http://localhost:8000");
        assert!(settings.voice_output_enabled);
    }
}
