use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Playback session options.
///
/// A `Player` holds one instance as the process-wide defaults; every
/// [`Queue`](super::Queue) carries its own snapshot produced by
/// [`PlayerOptions::merge`] at creation time.
///
/// # Serialization
///
/// Field names are camelCase and `timeout` is a human readable duration:
///
/// ```json
/// { "leaveOnEmpty": true, "timeout": "30s", "deafenOnJoin": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerOptions {
    /// Self-deafen when joining a voice channel.
    pub deafen_on_join: bool,
    /// Leave the channel once the client is alone in it.
    pub leave_on_empty: bool,
    /// Delay before an empty channel is re-checked and left.
    #[serde(with = "humantime_str")]
    pub timeout: Duration,
    /// Enable the lookup cache.
    pub cache: bool,
    /// Base directory of the lookup cache.
    pub cache_path: Option<PathBuf>,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            deafen_on_join: false,
            leave_on_empty: true,
            timeout: Duration::ZERO,
            cache: false,
            cache_path: None,
        }
    }
}

impl PlayerOptions {
    /// Applies per-call overrides on top of `self`. Explicit overrides win.
    pub fn merge(&self, overrides: &PlayerOptionsOverride) -> PlayerOptions {
        PlayerOptions {
            deafen_on_join: overrides.deafen_on_join.unwrap_or(self.deafen_on_join),
            leave_on_empty: overrides.leave_on_empty.unwrap_or(self.leave_on_empty),
            timeout: overrides.timeout.unwrap_or(self.timeout),
            cache: overrides.cache.unwrap_or(self.cache),
            cache_path: overrides
                .cache_path
                .clone()
                .or_else(|| self.cache_path.clone()),
        }
    }
}

/// Per-call overrides for [`PlayerOptions`]. Unset fields keep the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerOptionsOverride {
    pub deafen_on_join: Option<bool>,
    pub leave_on_empty: Option<bool>,
    pub timeout: Option<Duration>,
    pub cache: Option<bool>,
    pub cache_path: Option<PathBuf>,
}

impl PlayerOptionsOverride {
    pub fn deafen_on_join(mut self, deafen: bool) -> Self {
        self.deafen_on_join = Some(deafen);
        self
    }

    pub fn leave_on_empty(mut self, leave: bool) -> Self {
        self.leave_on_empty = Some(leave);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = Some(enabled);
        self
    }

    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }
}

mod humantime_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
