//! Main application logic and lifecycle management.
//!
//! The `Application` struct owns the merged configuration and drives one
//! complete cluster run: it builds the in-process transport cluster,
//! spawns one worker task per rank, lets the coordinator distribute the
//! demo geometry, and steps every worker through the configured number of
//! move/migrate rounds before reporting the final balance.

use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::geometry::SheetSource;
use crate::logging::display_banner;
use mesh_store::{
    DistributedStore, GeometrySource, GroupConfig, LocalCluster, LocalTransport, Partition,
    StepStats, StoreError, StoreSettings, Transport, WorkerContext,
};
use motion_system::{MotionRegistry, StepParams};
use std::sync::Arc;
use tracing::{info, Instrument};

/// Default sheet resolution for the demo geometry source.
const SHEET_RESOLUTION: u32 = 16;

/// Final balance of one worker after the run.
#[derive(Debug, Clone)]
struct WorkerSummary {
    rank: usize,
    triangles: usize,
    totals: StepStats,
}

/// Main application struct.
///
/// # Process
///
/// 1. Load configuration from file (defaults if missing)
/// 2. Apply command-line argument overrides
/// 3. Validate the merged configuration
/// 4. Spawn the worker cluster and run the configured steps
/// 5. Report per-worker balances
pub struct Application {
    config: AppConfig,
}

impl Application {
    /// Creates an application instance from parsed CLI arguments.
    pub async fn new(args: CliArgs) -> anyhow::Result<Self> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path)
            .await
            .map_err(|e| anyhow::anyhow!("configuration load failed: {e}"))?;

        if let Some(steps) = args.steps {
            config.run.steps = steps;
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("configuration validation failed: {e}"))?;
        info!("✅ Configuration loaded and validated successfully");

        display_banner();
        Ok(Self { config })
    }

    /// Runs the cluster to completion.
    pub async fn run(self) -> anyhow::Result<()> {
        let world_size = self.config.world_size();
        let group_configs = self.config.to_group_configs()?;
        let settings = self.config.to_store_settings();
        let source = SheetSource::new(self.config.domain_bbox(), SHEET_RESOLUTION);

        self.log_configuration_summary(world_size);

        let transports = LocalCluster::new(world_size);
        let mut handles = Vec::with_capacity(world_size);
        for transport in transports {
            let rank = transport.rank();
            let partition = self.config.partition_for_rank(rank);
            let groups = group_configs.clone();
            let steps = self.config.run.steps;
            let delta_t = self.config.run.delta_t;
            let source = (rank.0 == 0).then(|| source.clone());
            let ctx = WorkerContext::new(rank, world_size);
            let span = ctx.span();
            handles.push(tokio::spawn(
                run_worker(ctx, transport, partition, groups, settings, source, steps, delta_t)
                    .instrument(span),
            ));
        }

        let mut summaries = Vec::with_capacity(world_size);
        for handle in handles {
            let summary = handle
                .await
                .map_err(|e| anyhow::anyhow!("worker task panicked: {e}"))??;
            summaries.push(summary);
        }
        summaries.sort_by_key(|s| s.rank);

        info!("📊 Final balance after {} steps:", self.config.run.steps);
        let mut total = 0usize;
        for summary in &summaries {
            total += summary.triangles;
            info!(
                "  worker {} - {} triangles | sent {} | received {} | erased {}",
                summary.rank,
                summary.triangles,
                summary.totals.sent,
                summary.totals.received,
                summary.totals.erased
            );
        }
        info!("✅ Run complete - {} local copies across the cluster", total);
        Ok(())
    }

    fn log_configuration_summary(&self, world_size: usize) {
        let cluster = &self.config.cluster;
        info!("📋 Configuration Summary:");
        info!(
            "  🌍 Grid: {}x{}x{} workers ({} total)",
            cluster.grid[0], cluster.grid[1], cluster.grid[2], world_size
        );
        info!(
            "  📦 Block: {}x{}x{} voxels @ pitch {} (guard {})",
            cluster.cells[0],
            cluster.cells[1],
            cluster.cells[2],
            cluster.pitch,
            cluster.guard_cells
        );
        info!(
            "  🧩 Groups: {}",
            self.config
                .groups
                .iter()
                .map(|g| g.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        info!(
            "  ⏱️ Steps: {} @ delta_t {}",
            self.config.run.steps, self.config.run.delta_t
        );
    }
}

/// One worker's whole life: exchange, distribute, then step in lockstep
/// with the rest of the cluster.
#[allow(clippy::too_many_arguments)]
async fn run_worker(
    ctx: WorkerContext,
    transport: LocalTransport,
    partition: Partition,
    groups: Vec<GroupConfig>,
    settings: StoreSettings,
    source: Option<SheetSource>,
    steps: u64,
    delta_t: f64,
) -> Result<WorkerSummary, StoreError> {
    let registry = MotionRegistry::with_builtins();
    let mut store = DistributedStore::new(
        ctx,
        Arc::new(transport),
        partition,
        groups,
        &registry,
        settings,
    )?;

    store.exchange_partitions().await?;
    store
        .distribute(source.as_ref().map(|s| s as &dyn GeometrySource))
        .await?;

    let mut totals = StepStats::default();
    for step in 0..steps {
        let params = StepParams {
            current_step: step,
            next_step: step + 1,
            delta_t,
        };
        store.move_step(&params)?;
        let stats = store.migrate().await?;
        totals.sent += stats.sent;
        totals.received += stats.received;
        totals.skipped += stats.skipped;
        totals.erased += stats.erased;
    }

    Ok(WorkerSummary {
        rank: store.context().rank.0,
        triangles: store.groups().iter().map(|g| g.len()).sum(),
        totals,
    })
}
