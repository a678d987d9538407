//! Local and remote directory defaults.

use serde::{Deserialize, Serialize};

/// Default directories used by CLI operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Default remote directory for uploads.
    #[serde(default = "default_remote_upload_dir")]
    pub remote_upload_dir: String,
    /// Default local directory for downloads.
    #[serde(default = "default_local_download_dir")]
    pub local_download_dir: String,
    /// Scratch directory for partially transferred files.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            remote_upload_dir: default_remote_upload_dir(),
            local_download_dir: default_local_download_dir(),
            temp_dir: default_temp_dir(),
        }
    }
}

fn default_remote_upload_dir() -> String {
    "/".to_string()
}

fn default_local_download_dir() -> String {
    "./downloads".to_string()
}

fn default_temp_dir() -> String {
    "./temp".to_string()
}
