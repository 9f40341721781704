use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub photos: PhotosConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub web: WebConfig,
}

/// Photo gallery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotosConfig {
    /// Whether the camera entity is enabled by default in the host registry
    #[serde(default = "default_photos_enabled")]
    pub enabled: bool,
    /// How often the camera advances to the next image
    #[serde(default = "default_rotation_interval", with = "duration_serde::duration")]
    pub rotation_interval: Duration,
    /// Maximum number of images retained in the gallery
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    /// Placeholder shown when the gallery is empty or an image cannot be fetched
    #[serde(default = "default_image_url")]
    pub default_image_url: String,
    /// Where the gallery snapshot is persisted
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Number of URL validation requests in flight per ingested batch
    #[serde(default = "default_validation_concurrency")]
    pub validation_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_request_timeout", with = "duration_serde::duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_photos_enabled() -> bool {
    DEFAULT_PHOTOS_ENABLED
}

fn default_rotation_interval() -> Duration {
    Duration::from_secs(DEFAULT_ROTATION_INTERVAL_SECONDS)
}

fn default_max_images() -> usize {
    DEFAULT_MAX_IMAGES
}

fn default_image_url() -> String {
    DEFAULT_IMAGE_URL.to_string()
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_PATH)
}

fn default_validation_concurrency() -> usize {
    DEFAULT_VALIDATION_CONCURRENCY
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for PhotosConfig {
    fn default() -> Self {
        Self {
            enabled: default_photos_enabled(),
            rotation_interval: default_rotation_interval(),
            max_images: default_max_images(),
            default_image_url: default_image_url(),
            snapshot_path: default_snapshot_path(),
            validation_concurrency: default_validation_concurrency(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Layer defaults, the TOML file and `ACTIVITY_CAM_*` environment overrides.
    ///
    /// A missing file is created with the default settings first.
    pub fn load_from_file(config_file: &str) -> AppResult<Self> {
        let path = Path::new(config_file);
        if !path.exists() {
            let contents = toml::to_string_pretty(&Self::default())
                .map_err(|e| AppError::configuration(format!("default settings: {e}")))?;
            std::fs::write(path, contents)?;
            info!("Created default config file: {}", config_file);
        }

        let config: Config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| AppError::configuration(format!("{config_file}: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the gallery cannot operate with
    pub fn validate(&self) -> AppResult<()> {
        if self.photos.max_images == 0 {
            return Err(AppError::configuration(
                "photos.max_images must be at least 1",
            ));
        }
        if self.photos.rotation_interval.is_zero() {
            return Err(AppError::configuration(
                "photos.rotation_interval must be greater than zero",
            ));
        }
        if self.photos.validation_concurrency == 0 {
            return Err(AppError::configuration(
                "photos.validation_concurrency must be at least 1",
            ));
        }
        if self.http.request_timeout.is_zero() {
            return Err(AppError::configuration(
                "http.request_timeout must be greater than zero",
            ));
        }
        Url::parse(&self.photos.default_image_url).map_err(|e| {
            AppError::configuration(format!(
                "photos.default_image_url '{}' is not a valid URL: {e}",
                self.photos.default_image_url
            ))
        })?;
        Ok(())
    }
}
