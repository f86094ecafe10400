//! Game configuration and item catalog
//!
//! Loaded from JSON, falling back to built-in defaults.

use std::collections::BTreeMap;
use std::path::Path;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{ConfigError, GameError};
use crate::sim::backend::{ColliderShape, PhysicalMaterial};
use crate::sim::ladder::ItemKind;

/// Visual and physical description of one item kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    /// Model reference handed to the asset loader
    pub asset: String,
    /// Uniform scale applied to the render handle
    pub scale: f32,
    pub collider: ColliderShape,
    /// Collider offset relative to the body
    #[serde(default)]
    pub collider_offset: Vec3,
    #[serde(default = "identity_rotation")]
    pub collider_rotation: Quat,
    #[serde(default)]
    pub material: PhysicalMaterial,
    #[serde(default)]
    pub linear_damping: f32,
    #[serde(default)]
    pub angular_damping: f32,
}

fn identity_rotation() -> Quat {
    Quat::IDENTITY
}

impl ItemSpec {
    /// Default spec for a kind: a ball that grows along the ladder
    pub fn for_kind(kind: ItemKind) -> Self {
        let radius = match kind {
            ItemKind::Rice => 0.35,
            ItemKind::Chili => 0.45,
            ItemKind::Garlic => 0.55,
            ItemKind::DarkGarlic => 0.65,
            ItemKind::Plum => 0.75,
            ItemKind::Apple => 0.9,
            ItemKind::Peach => 1.05,
        };
        Self {
            asset: format!("models/{}.glb", kind.as_str()),
            scale: radius,
            collider: ColliderShape::Ball { radius },
            collider_offset: Vec3::ZERO,
            collider_rotation: Quat::IDENTITY,
            material: PhysicalMaterial {
                mass: 1.0 + kind.rank() as f32 * 0.5,
                ..PhysicalMaterial::default()
            },
            linear_damping: 0.1,
            angular_damping: 0.5,
        }
    }
}

/// Item kind -> spec lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemCatalog {
    items: BTreeMap<ItemKind, ItemSpec>,
}

impl ItemCatalog {
    pub fn new(items: impl IntoIterator<Item = (ItemKind, ItemSpec)>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    /// Look up a kind, failing with `UnknownItemType` if it is not configured
    pub fn get(&self, kind: ItemKind) -> Result<&ItemSpec, GameError> {
        self.items
            .get(&kind)
            .ok_or_else(|| GameError::UnknownItemType(kind.to_string()))
    }

    pub fn contains(&self, kind: ItemKind) -> bool {
        self.items.contains_key(&kind)
    }

    /// Configured kinds in ladder order
    pub fn kinds(&self) -> impl Iterator<Item = ItemKind> + '_ {
        self.items.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for ItemCatalog {
    fn default() -> Self {
        Self::new(ItemKind::ALL.map(|k| (k, ItemSpec::for_kind(k))))
    }
}

/// Container the items fall into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub wall_thickness: f32,
    pub wall_restitution: f32,
    pub wall_friction: f32,
    pub floor_half_extent: f32,
    pub floor_half_thickness: f32,
    pub floor_y: f32,
}

impl Default for ContainerSpec {
    fn default() -> Self {
        Self {
            width: CONTAINER_WIDTH,
            height: CONTAINER_HEIGHT,
            depth: CONTAINER_DEPTH,
            wall_thickness: CONTAINER_WALL_THICKNESS,
            wall_restitution: 0.0,
            wall_friction: 1.0,
            floor_half_extent: FLOOR_HALF_EXTENT,
            floor_half_thickness: FLOOR_HALF_THICKNESS,
            floor_y: FLOOR_Y,
        }
    }
}

/// Complete session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub catalog: ItemCatalog,
    pub container: ContainerSpec,
    pub gravity: Vec3,

    // === Merging ===
    /// Upward bias added to a merge's spawn midpoint
    pub merge_spawn_lift: f32,

    // === Preview ===
    /// Drag clamp: x stays within [-limit, limit]
    pub preview_x_limit: f32,
    pub preview_spawn_height: f32,
    /// Seconds between a commit and the next preview spawn
    pub preview_settle_delay: f32,
    pub first_preview: ItemKind,
    /// Kinds never offered as a preview
    pub preview_excluded: Vec<ItemKind>,

    // === Timing ===
    pub max_frame_dt: f32,

    /// Seed for preview selection
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            catalog: ItemCatalog::default(),
            container: ContainerSpec::default(),
            gravity: Vec3::new(0.0, GRAVITY_Y, 0.0),
            merge_spawn_lift: MERGE_SPAWN_LIFT,
            preview_x_limit: PREVIEW_X_LIMIT,
            preview_spawn_height: PREVIEW_SPAWN_HEIGHT,
            preview_settle_delay: PREVIEW_SETTLE_DELAY,
            first_preview: ItemKind::Rice,
            preview_excluded: Vec::new(),
            max_frame_dt: MAX_FRAME_DT,
            seed: 0x5eed,
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&json)?;
        log::info!(
            "Loaded config from {} ({} catalog items)",
            path.as_ref().display(),
            config.catalog.len()
        );
        Ok(config)
    }

    /// Load a config file, or fall back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Using default config ({}: {})", path.as_ref().display(), e);
                Self::default()
            }
        }
    }

    /// Kinds a preview may be drawn from
    pub fn preview_pool(&self) -> Vec<ItemKind> {
        self.catalog
            .kinds()
            .filter(|k| !self.preview_excluded.contains(k))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview_x_limit <= 0.0 {
            return Err(ConfigError::Invalid("preview_x_limit must be positive".into()));
        }
        if self.max_frame_dt <= 0.0 {
            return Err(ConfigError::Invalid("max_frame_dt must be positive".into()));
        }
        if self.preview_settle_delay < 0.0 {
            return Err(ConfigError::Invalid(
                "preview_settle_delay must not be negative".into(),
            ));
        }
        if !self.catalog.contains(self.first_preview) {
            return Err(ConfigError::Invalid(format!(
                "first preview '{}' is not in the catalog",
                self.first_preview
            )));
        }
        if self.preview_pool().is_empty() {
            return Err(ConfigError::Invalid(
                "every catalog item is excluded from previews".into(),
            ));
        }
        // Merges into an unconfigured kind would always fail to spawn
        for kind in self.catalog.kinds() {
            if let Some(next) = kind.successor() {
                if !self.catalog.contains(next) {
                    return Err(ConfigError::Invalid(format!(
                        "'{kind}' merges into '{next}', which is not in the catalog"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.catalog.len(), ItemKind::ALL.len());
        assert_eq!(config.preview_pool(), ItemKind::ALL.to_vec());
    }

    #[test]
    fn test_json_round_trip_keeps_catalog() {
        let config = GameConfig::default();
        let json = config.to_json_string().unwrap();
        let parsed = GameConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.catalog, config.catalog);
        assert_eq!(parsed.container, config.container);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            GameConfig::from_json_str(r#"{ "preview_x_limit": 2.5, "preview_excluded": ["apple", "peach"] }"#)
                .unwrap();
        assert_eq!(config.preview_x_limit, 2.5);
        assert_eq!(config.merge_spawn_lift, MERGE_SPAWN_LIFT);
        assert!(!config.preview_pool().contains(&ItemKind::Peach));
        assert_eq!(config.preview_pool().len(), 5);
    }

    #[test]
    fn test_catalog_gap_is_rejected() {
        let mut config = GameConfig::default();
        config.catalog = ItemCatalog::new(
            [ItemKind::Rice, ItemKind::Garlic].map(|k| (k, ItemSpec::for_kind(k))),
        );
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = ItemCatalog::new([(ItemKind::Rice, ItemSpec::for_kind(ItemKind::Rice))]);
        assert!(catalog.get(ItemKind::Rice).is_ok());
        assert_eq!(
            catalog.get(ItemKind::Plum),
            Err(GameError::UnknownItemType("plum".into()))
        );
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = GameConfig::load_or_default("/nonexistent/merge-drop.json");
        assert_eq!(config.preview_x_limit, PREVIEW_X_LIMIT);
    }
}
