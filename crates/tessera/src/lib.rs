//! # Tessera Mesh Partitioner - Main Entry Point
//!
//! Distributed surface-mesh partitioning driver. This entry point handles
//! CLI parsing, configuration loading, and application lifecycle
//! management for an in-process cluster of mesh workers.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! tessera
//!
//! # Specify custom configuration
//! tessera --config production.toml
//!
//! # Override specific settings
//! tessera --steps 20 --log-level debug
//!
//! # JSON logging for production
//! tessera --json-logs
//! ```
//!
//! ## Configuration
//!
//! The driver loads configuration from a TOML file (default:
//! `config.toml`). If the file doesn't exist, built-in defaults are used:
//! a 2×2 worker grid with one translating sheet group.

use tracing::error;

mod app;
mod cli;
mod config;
mod geometry;
mod logging;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the Tessera driver.
///
/// Handles the complete application lifecycle including:
/// 1. Command-line argument parsing
/// 2. Configuration loading and validation
/// 3. Logging system initialization
/// 4. Application creation and execution
///
/// # Exit Codes
///
/// * **0**: Successful execution
/// * **1**: Error during startup, configuration, or the run
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments first
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();

    // Setup logging before anything else
    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    // Create and run application
    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {e:?}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for potential library usage
pub use config::{ClusterSettings, GroupSettings, LoggingSettings, RunSettings};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.world_size(), 4);

        let groups = config.to_group_configs().expect("group resolution");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].spec.name, "sheet");
        assert!(groups[0].motion_params.get("velocity").is_some());

        let settings = config.to_store_settings();
        assert_eq!(settings.leaf_capacity, 8);
        assert!(!settings.wire_format.user_tags);
    }

    #[tokio::test]
    async fn test_config_validation() {
        let mut config = AppConfig::default();

        // Test invalid grid
        config.cluster.grid = [0, 2, 1];
        assert!(config.validate().is_err());

        // Test invalid pitch
        config.cluster.grid = [2, 2, 1];
        config.cluster.pitch = 0.0;
        assert!(config.validate().is_err());

        // Test invalid log level
        config.cluster.pitch = 1.0;
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partition_grid_layout() {
        let config = AppConfig::default();
        // X-fastest layout: ranks 0,1 along X, then 2,3 on the next Y row.
        let p0 = config.partition_for_rank(tessera_spatial::WorkerRank(0));
        let p1 = config.partition_for_rank(tessera_spatial::WorkerRank(1));
        let p2 = config.partition_for_rank(tessera_spatial::WorkerRank(2));
        assert_eq!(p0.base, tessera_spatial::Vec3::zero());
        assert_eq!(p1.base, tessera_spatial::Vec3::new(8.0, 0.0, 0.0));
        assert_eq!(p2.base, tessera_spatial::Vec3::new(0.0, 8.0, 0.0));
        assert!(p0.is_neighbor_of(&p1));
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let mut config = AppConfig::default();
        config.groups[0].parent = Some("missing".to_string());
        assert!(matches!(
            config.to_group_configs(),
            Err(mesh_store::ConfigError::GroupNotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_cli_parsing() {
        // Test CLI argument structure
        let args = CliArgs {
            config_path: PathBuf::from("test.toml"),
            steps: Some(12),
            log_level: Some("debug".to_string()),
            json_logs: true,
        };

        assert_eq!(args.config_path, PathBuf::from("test.toml"));
        assert_eq!(args.steps, Some(12));
        assert_eq!(args.log_level, Some("debug".to_string()));
        assert!(args.json_logs);
    }

    #[tokio::test]
    async fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");

        let config = AppConfig::default();
        let toml_content = toml::to_string_pretty(&config).expect("serialize config");
        tokio::fs::write(&path, toml_content)
            .await
            .expect("write config file");

        let loaded = AppConfig::load_from_file(&path).await.expect("load config");
        assert!(loaded.validate().is_ok());
        assert_eq!(loaded.cluster.grid, config.cluster.grid);
        assert_eq!(loaded.groups.len(), config.groups.len());
        assert_eq!(loaded.groups[0].motion_class, "translate");
    }

    #[tokio::test]
    async fn test_missing_config_falls_back_to_defaults() {
        let config = AppConfig::load_from_file(std::path::Path::new("does/not/exist.toml"))
            .await
            .expect("defaults on missing file");
        assert!(config.validate().is_ok());
    }
}
