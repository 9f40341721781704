//! Camera entity exposed to the host
//!
//! `CameraEntity` is the capability contract a host registry needs: identity,
//! a state string, image bytes and an attribute map. `PhotoCamera` implements
//! it on top of the rotating cache and never mutates it.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::{CurrentImage, RotatingImageCache};
use crate::config::defaults::{ENTITY_ID, ENTITY_NAME};

pub const ATTR_IMG_URL: &str = "img_url";

#[async_trait]
pub trait CameraEntity: Send + Sync {
    fn unique_id(&self) -> &str;

    fn name(&self) -> &str;

    /// State is pushed on change, hosts should not poll
    fn should_poll(&self) -> bool {
        false
    }

    fn enabled_by_default(&self) -> bool;

    async fn state(&self) -> String;

    async fn image_bytes(&self) -> Option<Bytes>;

    async fn attributes(&self) -> BTreeMap<String, String>;

    /// State, attributes and image bytes resolved together.
    ///
    /// `state`, `image_bytes` and `attributes` each read the rotation on their
    /// own and may straddle a rotation. Hosts that need all three to agree call
    /// this instead.
    async fn frame(&self) -> CameraFrame;
}

/// State, attributes and image resolved from a single rotation snapshot
#[derive(Debug, Clone, Serialize)]
pub struct CameraFrame {
    pub state: String,
    pub attributes: BTreeMap<String, String>,
    #[serde(skip)]
    pub image: Option<Bytes>,
}

pub struct PhotoCamera {
    cache: Arc<RotatingImageCache>,
    enabled_by_default: bool,
}

impl PhotoCamera {
    pub fn new(cache: Arc<RotatingImageCache>, enabled_by_default: bool) -> Self {
        Self {
            cache,
            enabled_by_default,
        }
    }

    pub fn cache(&self) -> &Arc<RotatingImageCache> {
        &self.cache
    }

    fn attributes_for(current: &CurrentImage) -> BTreeMap<String, String> {
        BTreeMap::from([(ATTR_IMG_URL.to_string(), current.url().to_string())])
    }

    /// State and attributes only, no network access
    pub async fn describe(&self) -> CameraFrame {
        let current = self.cache.current_reference().await;
        CameraFrame {
            state: current.url().to_string(),
            attributes: Self::attributes_for(&current),
            image: None,
        }
    }

    /// State, attributes and image bytes for the same current image
    pub async fn render(&self) -> CameraFrame {
        let current = self.cache.current_reference().await;
        CameraFrame {
            state: current.url().to_string(),
            attributes: Self::attributes_for(&current),
            image: self.cache.fetch_bytes(&current).await,
        }
    }
}

#[async_trait]
impl CameraEntity for PhotoCamera {
    fn unique_id(&self) -> &str {
        ENTITY_ID
    }

    fn name(&self) -> &str {
        ENTITY_NAME
    }

    fn enabled_by_default(&self) -> bool {
        self.enabled_by_default
    }

    async fn state(&self) -> String {
        self.cache.current_reference().await.url().to_string()
    }

    async fn image_bytes(&self) -> Option<Bytes> {
        let current = self.cache.current_reference().await;
        self.cache.fetch_bytes(&current).await
    }

    async fn attributes(&self) -> BTreeMap<String, String> {
        Self::attributes_for(&self.cache.current_reference().await)
    }

    async fn frame(&self) -> CameraFrame {
        self.render().await
    }
}
