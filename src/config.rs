use crate::branding::{APP_CONFIG_APPLICATION, APP_CONFIG_ORGANIZATION, APP_CONFIG_QUALIFIER};
use crate::dock::geometry::Orientation;
use crate::dock::session::{DragThreshold, PreviewStrategy};
use eframe::egui;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const SHORTCUTS_DIR_NAME: &str = "Shortcuts";

pub const DEFAULT_OPACITY: f32 = 45.0;
pub const DEFAULT_SCALE: f32 = 100.0;
pub const MIN_SCALE: f32 = 50.0;
pub const MAX_SCALE: f32 = 300.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where the dock keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_file: PathBuf,
    pub shortcuts_dir: PathBuf,
    pub icon_cache_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Option<Self> {
        directories::ProjectDirs::from(
            APP_CONFIG_QUALIFIER,
            APP_CONFIG_ORGANIZATION,
            APP_CONFIG_APPLICATION,
        )
        .map(|dirs| {
            let mut paths = Self::under(dirs.config_dir());
            paths.icon_cache_dir = dirs.cache_dir().join("icons");
            paths
        })
    }

    pub fn under(root: &Path) -> Self {
        Self {
            config_file: root.join(CONFIG_FILE_NAME),
            shortcuts_dir: root.join(SHORTCUTS_DIR_NAME),
            icon_cache_dir: root.join("icons"),
        }
    }
}

/// Knobs for the drag engine that are platform conventions rather than
/// domain rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionSettings {
    pub drag_threshold: DragThreshold,
    pub preview: PreviewStrategy,
    pub copy_links_into_storage: bool,
}

impl InteractionSettings {
    pub fn sanitized(self) -> Self {
        Self {
            drag_threshold: self.drag_threshold.sanitized(),
            ..self
        }
    }
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            drag_threshold: DragThreshold::default(),
            preview: PreviewStrategy::default(),
            copy_links_into_storage: true,
        }
    }
}

/// The on-disk record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedConfig {
    pub window_left: f64,
    pub window_top: f64,
    pub opacity: f64,
    pub scale: f64,
    pub is_vertical: bool,
    pub shortcut_paths: Vec<PathBuf>,
    pub interaction: InteractionSettings,
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self {
            window_left: -1.0,
            window_top: -1.0,
            opacity: DEFAULT_OPACITY as f64,
            scale: DEFAULT_SCALE as f64,
            is_vertical: false,
            shortcut_paths: Vec::new(),
            interaction: InteractionSettings::default(),
        }
    }
}

impl PersistedConfig {
    pub fn from_parts(
        prefs: &PanelPreferences,
        shortcut_paths: Vec<PathBuf>,
        interaction: InteractionSettings,
    ) -> Self {
        let (window_left, window_top) = prefs
            .window_pos
            .map(|pos| (pos.x as f64, pos.y as f64))
            .unwrap_or((-1.0, -1.0));
        Self {
            window_left,
            window_top,
            opacity: prefs.opacity_percent as f64,
            scale: prefs.scale_percent as f64,
            is_vertical: prefs.orientation.is_vertical(),
            shortcut_paths,
            interaction,
        }
    }

    pub fn preferences(&self) -> PanelPreferences {
        let window_pos = (self.window_left.is_finite()
            && self.window_top.is_finite()
            && self.window_left >= 0.0
            && self.window_top >= 0.0)
            .then(|| egui::pos2(self.window_left as f32, self.window_top as f32));
        let mut prefs = PanelPreferences {
            window_pos,
            orientation: Orientation::from_vertical(self.is_vertical),
            ..PanelPreferences::default()
        };
        prefs.set_opacity(self.opacity as f32);
        prefs.set_scale(self.scale as f32);
        prefs
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelPreferences {
    /// `None` until the user has placed the window somewhere.
    pub window_pos: Option<egui::Pos2>,
    pub opacity_percent: f32,
    pub scale_percent: f32,
    pub orientation: Orientation,
}

impl Default for PanelPreferences {
    fn default() -> Self {
        Self {
            window_pos: None,
            opacity_percent: DEFAULT_OPACITY,
            scale_percent: DEFAULT_SCALE,
            orientation: Orientation::Horizontal,
        }
    }
}

impl PanelPreferences {
    pub fn set_opacity(&mut self, percent: f32) {
        self.opacity_percent = sanitize_percent(percent, DEFAULT_OPACITY, 0.0, 100.0);
    }

    pub fn set_scale(&mut self, percent: f32) {
        self.scale_percent = sanitize_percent(percent, DEFAULT_SCALE, MIN_SCALE, MAX_SCALE);
    }

    /// Resize-grip gesture: a combined drag of 200 px changes the scale by
    /// 100 percentage points.
    pub fn adjust_scale_by_drag(&mut self, delta: egui::Vec2) {
        let change = (delta.x + delta.y) / 200.0 * 100.0;
        self.set_scale(self.scale_percent + change);
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_percent / 100.0
    }
}

fn sanitize_percent(value: f32, fallback: f32, min: f32, max: f32) -> f32 {
    if !value.is_finite() {
        return fallback;
    }
    value.clamp(min, max)
}

/// Durable storage for the dock. Loading never fails and saving never
/// reports; both degrade to defaults / dropped writes.
pub trait PersistenceGateway {
    fn load(&self) -> PersistedConfig;
    fn save(&self, config: &PersistedConfig);
}

/// `config.json` on disk.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceGateway for JsonConfigStore {
    fn load(&self) -> PersistedConfig {
        match load_from_path(&self.path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!("no config at {}, using defaults", self.path.display());
                PersistedConfig::default()
            }
            Err(err) => {
                warn!("{err}; using defaults");
                PersistedConfig::default()
            }
        }
    }

    fn save(&self, config: &PersistedConfig) {
        if let Err(err) = save_to_path(&self.path, config) {
            warn!("config not saved: {err}");
        }
    }
}

fn load_from_path(path: &Path) -> Result<Option<PersistedConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(Some(PersistedConfig::default()));
    }
    let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(config))
}

fn save_to_path(path: &Path, config: &PersistedConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
