#![forbid(unsafe_code)]

use clap::Args;
use std::path::PathBuf;
use td_core::browser::{DEFAULT_BROWSER_URL, DEFAULT_ORGANISM};
use td_core::hub::HubSettings;

pub const DEFAULT_STORAGE_DIR: &str = ".topdata";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_TRACK_SELECTION_LIMIT: usize = 100;
pub const DEFAULT_ALL_DATA_URL: &str = "https://github.com/Duke-GCB/TrackHubGenerator";

/// Runtime settings shared by every request handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub storage_dir: PathBuf,
    pub bind: String,
    /// Largest number of tracks a transcription factor x cell type selection may yield.
    pub track_selection_limit: usize,
    pub all_data_url: String,
    /// Externally visible base URL (scheme + host). When unset the request `Host` is used.
    pub public_url: Option<String>,
    pub browser_url: String,
    pub organism: String,
    pub hub: HubSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            bind: DEFAULT_BIND.to_string(),
            track_selection_limit: DEFAULT_TRACK_SELECTION_LIMIT,
            all_data_url: DEFAULT_ALL_DATA_URL.to_string(),
            public_url: None,
            browser_url: DEFAULT_BROWSER_URL.to_string(),
            organism: DEFAULT_ORGANISM.to_string(),
            hub: HubSettings::default(),
        }
    }
}

impl Settings {
    /// Base for absolute URLs handed to the genome browser, without a trailing slash.
    pub fn base_url(&self, host: Option<&str>) -> String {
        if let Some(public_url) = self.public_url.as_deref() {
            return public_url.trim_end_matches('/').to_string();
        }
        let host = host.unwrap_or(self.bind.as_str());
        format!("http://{host}")
    }
}

#[derive(Args, Clone, Debug)]
pub struct StorageArgs {
    /// Directory holding the track database.
    #[arg(long, env = "TOPDATA_STORAGE_DIR", default_value = DEFAULT_STORAGE_DIR)]
    pub storage_dir: PathBuf,
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Address to listen on.
    #[arg(long, env = "TOPDATA_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    /// Maximum number of tracks a cell type selection may produce.
    #[arg(long, env = "TOPDATA_TRACK_SELECTION_LIMIT", default_value_t = DEFAULT_TRACK_SELECTION_LIMIT)]
    pub track_selection_limit: usize,

    /// Link target for "download all data".
    #[arg(long, env = "TOPDATA_ALL_DATA_URL", default_value = DEFAULT_ALL_DATA_URL)]
    pub all_data_url: String,

    /// Public base URL of this service (e.g. `https://topdata.example.org`).
    #[arg(long, env = "TOPDATA_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Genome browser page that receives the hub URL.
    #[arg(long, env = "TOPDATA_BROWSER_URL", default_value = DEFAULT_BROWSER_URL)]
    pub browser_url: String,

    #[arg(long, env = "TOPDATA_ORGANISM", default_value = DEFAULT_ORGANISM)]
    pub organism: String,

    /// Contact address written to hub.txt.
    #[arg(long, env = "TOPDATA_HUB_EMAIL")]
    pub hub_email: Option<String>,

    /// Description URL written to hub.txt.
    #[arg(long, env = "TOPDATA_HUB_DESCRIPTION_URL")]
    pub hub_description_url: Option<String>,
}

impl ServeArgs {
    pub fn into_settings(self) -> Settings {
        let mut hub = HubSettings::default();
        if let Some(email) = self.hub_email {
            hub.email = email;
        }
        if let Some(description_url) = self.hub_description_url {
            hub.description_url = description_url;
        }
        Settings {
            storage_dir: self.storage.storage_dir,
            bind: self.bind,
            track_selection_limit: self.track_selection_limit,
            all_data_url: self.all_data_url,
            public_url: self
                .public_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            browser_url: self.browser_url,
            organism: self.organism,
            hub,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_prefers_public_url() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.base_url(Some("testserver")),
            "http://testserver"
        );
        assert_eq!(settings.base_url(None), "http://127.0.0.1:8000");

        settings.public_url = Some("https://topdata.example.org/".to_string());
        assert_eq!(
            settings.base_url(Some("testserver")),
            "https://topdata.example.org"
        );
    }
}
