/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Photo gallery defaults
pub const DEFAULT_PHOTOS_ENABLED: bool = true;
pub const DEFAULT_ROTATION_INTERVAL_SECONDS: u64 = 15;
pub const DEFAULT_MAX_IMAGES: usize = 100;
pub const DEFAULT_SNAPSHOT_PATH: &str = "./data/img_urls.json";
pub const DEFAULT_VALIDATION_CONCURRENCY: usize = 4;

/// Placeholder served whenever no gallery image is selected or a fetch fails
pub const DEFAULT_IMAGE_URL: &str = "https://upload.wikimedia.org/wikipedia/commons/thumb/1/15/No_image_available_600_x_450.svg/1280px-No_image_available_600_x_450.svg.png";

// HTTP client defaults
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = concat!("activity-photo-cam/", env!("CARGO_PKG_VERSION"));

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8123;

// Entity identity
pub const ENTITY_ID: &str = "activity_photo_cam";
pub const ENTITY_NAME: &str = "Activity Photos";

// Environment overrides, e.g. ACTIVITY_CAM_PHOTOS__MAX_IMAGES=50
pub const ENV_PREFIX: &str = "ACTIVITY_CAM_";
