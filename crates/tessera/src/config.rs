//! Configuration management for the Tessera driver.
//!
//! This module handles loading, validation, and conversion of cluster
//! configuration from TOML files and command-line arguments. Every worker
//! in the in-process cluster is built from the same `AppConfig`, which is
//! what guarantees the cluster-wide agreement the migration protocol
//! depends on: identical group order, identical wire format, identical
//! guard-band arithmetic.

use mesh_store::{ConfigError, GroupConfig, GroupSpec, Partition, StoreSettings, WireFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tessera_spatial::{GroupId, Vec3, WorkerRank};
use tracing::info;

/// Defaults for serde deserialization
fn default_grid() -> [u32; 3] {
    [2, 2, 1]
}

fn default_cells() -> [u32; 3] {
    [8, 8, 8]
}

fn default_guard_cells() -> u32 {
    1
}

fn default_pitch() -> f64 {
    1.0
}

fn default_leaf_capacity() -> usize {
    8
}

fn default_steps() -> u64 {
    4
}

fn default_delta_t() -> f64 {
    0.1
}

fn default_tolerance() -> f64 {
    1e-9
}

fn default_movable() -> bool {
    true
}

fn default_motion_class() -> String {
    "static".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
///
/// This is the main configuration structure that encompasses all cluster
/// settings including the partition grid, spatial index tuning, wire
/// format, group definitions, and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Partition grid settings
    pub cluster: ClusterSettings,
    /// Spatial index tuning
    #[serde(default)]
    pub index: IndexSettings,
    /// Wire-format negotiation
    #[serde(default)]
    pub wire: WireSettings,
    /// Simulation run settings
    #[serde(default)]
    pub run: RunSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Ordered group definitions, identical on every worker
    pub groups: Vec<GroupSettings>,
}

/// Partition grid configuration.
///
/// The domain is a `grid` of axis-aligned blocks, one worker per block,
/// each block `cells` voxels of edge `pitch` plus a guard band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSettings {
    /// Worker blocks per axis
    #[serde(default = "default_grid")]
    pub grid: [u32; 3],
    /// Interior voxels per block per axis
    #[serde(default = "default_cells")]
    pub cells: [u32; 3],
    /// Guard band width in voxels
    #[serde(default = "default_guard_cells")]
    pub guard_cells: u32,
    /// Voxel edge length
    #[serde(default = "default_pitch")]
    pub pitch: f64,
    /// Minimum corner of the whole domain
    #[serde(default)]
    pub origin: [f64; 3],
}

/// Spatial index tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    /// KD-tree leaf capacity before a split
    #[serde(default = "default_leaf_capacity")]
    pub leaf_capacity: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            leaf_capacity: default_leaf_capacity(),
        }
    }
}

/// Wire-format selection, negotiated here rather than sniffed on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireSettings {
    /// Whether migration messages carry the trailing user-tag array
    #[serde(default)]
    pub user_tags: bool,
}

/// Simulation run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    /// Number of move/migrate steps to run
    #[serde(default = "default_steps")]
    pub steps: u64,
    /// Physical time per step
    #[serde(default = "default_delta_t")]
    pub delta_t: f64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            delta_t: default_delta_t(),
        }
    }
}

/// Logging system configuration.
///
/// Controls log output format, levels, and destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// One group definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSettings {
    /// Unique group name
    pub name: String,
    /// Optional parent group name
    #[serde(default)]
    pub parent: Option<String>,
    /// Whether the group's geometry moves per step
    #[serde(default = "default_movable")]
    pub movable: bool,
    /// Vertex deduplication tolerance
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Motion class name
    #[serde(default = "default_motion_class")]
    pub motion_class: String,
    /// Motion class parameters
    #[serde(default)]
    pub motion_params: Option<toml::Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterSettings {
                grid: default_grid(),
                cells: default_cells(),
                guard_cells: default_guard_cells(),
                pitch: default_pitch(),
                origin: [0.0, 0.0, 0.0],
            },
            index: IndexSettings::default(),
            wire: WireSettings::default(),
            run: RunSettings::default(),
            logging: LoggingSettings::default(),
            groups: vec![GroupSettings {
                name: "sheet".to_string(),
                parent: None,
                movable: true,
                tolerance: default_tolerance(),
                motion_class: "translate".to_string(),
                motion_params: Some(
                    "velocity = [0.25, 0.1, 0.0]"
                        .parse::<toml::Value>()
                        .expect("default motion params parse"),
                ),
            }],
        }
    }
}

impl AppConfig {
    /// Loads the configuration from `path`, falling back to defaults when
    /// the file does not exist.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let config: AppConfig = toml::from_str(&contents)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Validates the merged configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cluster.grid.iter().any(|&g| g == 0) {
            return Err("cluster.grid components must be at least 1".to_string());
        }
        if self.cluster.cells.iter().any(|&c| c == 0) {
            return Err("cluster.cells components must be at least 1".to_string());
        }
        if self.cluster.pitch <= 0.0 {
            return Err("cluster.pitch must be positive".to_string());
        }
        if self.run.delta_t <= 0.0 {
            return Err("run.delta_t must be positive".to_string());
        }
        if self.index.leaf_capacity == 0 {
            return Err("index.leaf_capacity must be at least 1".to_string());
        }
        if self.groups.is_empty() {
            return Err("at least one group must be defined".to_string());
        }
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(format!("unknown log level '{other}'")),
        }
        Ok(())
    }

    /// Total number of workers in the grid.
    pub fn world_size(&self) -> usize {
        self.cluster.grid.iter().product::<u32>() as usize
    }

    /// Partition descriptor for one rank, laid out X-fastest.
    pub fn partition_for_rank(&self, rank: WorkerRank) -> Partition {
        let [gx, gy, _gz] = self.cluster.grid;
        let ix = (rank.0 as u32) % gx;
        let iy = ((rank.0 as u32) / gx) % gy;
        let iz = (rank.0 as u32) / (gx * gy);
        let cells = self.cluster.cells;
        let pitch = self.cluster.pitch;
        let base = Vec3::new(
            self.cluster.origin[0] + f64::from(ix * cells[0]) * pitch,
            self.cluster.origin[1] + f64::from(iy * cells[1]) * pitch,
            self.cluster.origin[2] + f64::from(iz * cells[2]) * pitch,
        );
        Partition::new(rank, base, cells, self.cluster.guard_cells, pitch)
    }

    /// Bbox of the whole domain interior.
    pub fn domain_bbox(&self) -> tessera_spatial::BoundingBox {
        let min = Vec3::new(
            self.cluster.origin[0],
            self.cluster.origin[1],
            self.cluster.origin[2],
        );
        let max = Vec3::new(
            min.x + f64::from(self.cluster.grid[0] * self.cluster.cells[0]) * self.cluster.pitch,
            min.y + f64::from(self.cluster.grid[1] * self.cluster.cells[1]) * self.cluster.pitch,
            min.z + f64::from(self.cluster.grid[2] * self.cluster.cells[2]) * self.cluster.pitch,
        );
        tessera_spatial::BoundingBox::new(min, max)
    }

    /// Resolves the ordered group list into store-level configurations,
    /// assigning sequential group ids and resolving parent names.
    pub fn to_group_configs(&self) -> Result<Vec<GroupConfig>, ConfigError> {
        let mut configs = Vec::with_capacity(self.groups.len());
        for (position, group) in self.groups.iter().enumerate() {
            let parent = match &group.parent {
                Some(name) => {
                    let parent_position = self
                        .groups
                        .iter()
                        .position(|g| &g.name == name)
                        .ok_or_else(|| ConfigError::GroupNotFound(name.clone()))?;
                    Some(GroupId(parent_position as i32))
                }
                None => None,
            };
            let motion_params = match &group.motion_params {
                Some(value) => serde_json::to_value(value).map_err(|e| {
                    ConfigError::GeometryLoad {
                        group: group.name.clone(),
                        reason: format!("motion parameters: {e}"),
                    }
                })?,
                None => serde_json::Value::Null,
            };
            configs.push(GroupConfig {
                spec: GroupSpec {
                    id: GroupId(position as i32),
                    parent,
                    name: group.name.clone(),
                    movable: group.movable,
                    tolerance: group.tolerance,
                },
                motion_class: group.motion_class.clone(),
                motion_params,
            });
        }
        Ok(configs)
    }

    /// Store-level settings shared by every worker.
    pub fn to_store_settings(&self) -> StoreSettings {
        StoreSettings {
            leaf_capacity: self.index.leaf_capacity,
            wire_format: WireFormat {
                user_tags: self.wire.user_tags,
            },
            coordinator: WorkerRank(0),
        }
    }
}
