use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Host-page specific knobs for the upscaling controller.
///
/// Every field has a default, so a partial (or absent) object from the embedding page is valid.
/// The upscale factor and the enhancement preset are deliberately not part of this surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControllerConfig {
    /// Route prefix of the pages the feature applies to.
    pub watch_path: String,
    /// The media locator never looks outside this container.
    pub player_root_selector: String,
    /// Media inside any of these subtrees are advertisements.
    pub ad_container_selectors: Vec<String>,
    /// DOM id of the single overlay surface.
    pub surface_id: String,
    /// Attribute set to `active` on the source element while it is being upscaled.
    pub marker_attribute: String,
    pub ready_max_retries: u32,
    pub ready_attempt_timeout_ms: u32,
    pub ready_settle_ms: u32,
    pub fullscreen_exit_settle_ms: u32,
    /// `EnvFilter` directives for the console logger.
    pub log_filter: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            watch_path: "/watch".to_owned(),
            player_root_selector: "#movie_player".to_owned(),
            ad_container_selectors: vec![
                ".video-ads".to_owned(),
                ".ytp-ad-module".to_owned(),
                ".ytp-ad-player-overlay".to_owned(),
            ],
            surface_id: "sharpview-upscale-surface".to_owned(),
            marker_attribute: "data-sharpview-upscale".to_owned(),
            ready_max_retries: 3,
            ready_attempt_timeout_ms: 10_000,
            ready_settle_ms: 50,
            fullscreen_exit_settle_ms: 300,
            log_filter: "info".to_owned(),
        }
    }
}

impl ControllerConfig {
    /// Checks the configuration and normalizes values that have an obvious meaning.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.watch_path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "watchPath",
                reason: "must not be empty",
            });
        }
        if self.surface_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "surfaceId",
                reason: "must not be empty",
            });
        }
        if self.marker_attribute.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "markerAttribute",
                reason: "must not be empty",
            });
        }
        // A waiter with zero attempts could never observe readiness.
        self.ready_max_retries = self.ready_max_retries.max(1);
        Ok(self)
    }

    /// Whether `path` is a page the feature applies to.
    ///
    /// Matches `watch_path` as a whole path segment: `/watch`, `/watch/x` and `/watch?v=x` match,
    /// `/watchlist` does not.
    pub fn is_watch_route(&self, path: &str) -> bool {
        let prefix = self.watch_path.trim_end_matches('/');
        match path.strip_prefix(prefix) {
            Some(rest) => {
                rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') || rest.starts_with('#')
            }
            None => false,
        }
    }

    pub fn ready_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_attempt_timeout_ms.into())
    }

    pub fn ready_settle(&self) -> Duration {
        Duration::from_millis(self.ready_settle_ms.into())
    }

    pub fn fullscreen_exit_settle(&self) -> Duration {
        Duration::from_millis(self.fullscreen_exit_settle_ms.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_object_fills_in_defaults() {
        let config: ControllerConfig =
            serde_json::from_str(r#"{"surfaceId":"custom","readySettleMs":10}"#).unwrap();
        assert_eq!(config.surface_id, "custom");
        assert_eq!(config.ready_settle(), Duration::from_millis(10));
        assert_eq!(config.watch_path, "/watch");
        assert_eq!(config.ready_max_retries, 3);
        assert_eq!(config.ad_container_selectors.len(), 3);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(ControllerConfig::default()).unwrap();
        assert_eq!(json["fullscreenExitSettleMs"], 300);
        assert_eq!(json["playerRootSelector"], "#movie_player");
    }

    #[test]
    fn validate_rejects_empty_identifiers_and_clamps_retries() {
        let err = ControllerConfig {
            surface_id: " ".to_owned(),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                field: "surfaceId",
                reason: "must not be empty"
            }
        );

        let err = ControllerConfig {
            watch_path: String::new(),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("watchPath"));

        let config = ControllerConfig {
            ready_max_retries: 0,
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(config.ready_max_retries, 1);
    }

    #[test]
    fn watch_route_matches_whole_segment_only() {
        let config = ControllerConfig::default();
        assert!(config.is_watch_route("/watch"));
        assert!(config.is_watch_route("/watch?v=abc"));
        assert!(config.is_watch_route("/watch/abc"));
        assert!(!config.is_watch_route("/watchlist"));
        assert!(!config.is_watch_route("/"));
        assert!(!config.is_watch_route("/feed/subscriptions"));

        let trailing = ControllerConfig {
            watch_path: "/watch/".to_owned(),
            ..Default::default()
        };
        assert!(trailing.is_watch_route("/watch"));
    }
}
