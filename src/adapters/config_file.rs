//! `conf.txt` configuration adapter.
//!
//! Implements [`ConfigPort`] by reading a JSON file from the filesystem and
//! validating it.  On the device the file lives on the SPIFFS data
//! partition, which [`ConfigFile::mount`] registers with the VFS first.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::ControllerConfig;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Where the SPIFFS partition is mounted.
pub const MOUNT_POINT: &str = "/spiffs";

/// File name kept from existing deployments.
pub const FILE_NAME: &str = "conf.txt";

pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Register the SPIFFS partition at [`MOUNT_POINT`] and point at
    /// `conf.txt` inside it.
    #[cfg(target_os = "espidf")]
    pub fn mount() -> Result<Self, ConfigError> {
        let base = c"/spiffs";
        let conf = esp_vfs_spiffs_conf_t {
            base_path: base.as_ptr(),
            partition_label: core::ptr::null(),
            max_files: 4,
            format_if_mount_failed: false,
        };
        // SAFETY: `conf` and the static path outlive the call; registration
        // happens once at boot before any file access.
        let ret = unsafe { esp_vfs_spiffs_register(&conf) };
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            warn!("Config: SPIFFS mount failed ({})", ret);
            return Err(ConfigError::IoError);
        }
        Ok(Self::new(Path::new(MOUNT_POINT).join(FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse and validate a configuration document.
    pub fn parse(text: &str) -> Result<ControllerConfig, ConfigError> {
        let config: ControllerConfig = serde_json::from_str(text).map_err(|e| {
            warn!("Config: {}", e);
            ConfigError::Corrupted
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl ConfigPort for ConfigFile {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound,
            std::io::ErrorKind::InvalidData => ConfigError::Corrupted,
            _ => ConfigError::IoError,
        })?;
        let config = Self::parse(&text)?;
        info!(
            "Config: loaded {} ({:?}, {} actuator(s))",
            self.path.display(),
            config.variant,
            config.actuator_layout().len()
        );
        Ok(config)
    }
}
