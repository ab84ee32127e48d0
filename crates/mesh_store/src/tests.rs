
// Include tests
#[cfg(test)]
mod tests {
    use crate::context::WorkerContext;
    use crate::error::{ConfigError, StoreError, ValidationError};
    use crate::geometry::{GeometrySource, RawGroupGeometry};
    use crate::group::{GroupConfig, GroupSpec};
    use crate::messaging::transport::{LocalCluster, LocalTransport, Transport};
    use crate::messaging::wire::WireFormat;
    use crate::partition::Partition;
    use crate::store::{DistributedStore, StepPhase, StepStats, StoreSettings};
    use motion_system::{MotionRegistry, StepParams};
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use tessera_spatial::{BoundingBox, GroupId, TriangleId, Vec3, WorkerRank};

    // ========================================================================
    // Harness
    // ========================================================================

    #[derive(Clone, Default)]
    struct FixedSource {
        groups: HashMap<String, RawGroupGeometry>,
    }

    impl GeometrySource for FixedSource {
        fn load(&self, spec: &GroupSpec) -> Result<RawGroupGeometry, ConfigError> {
            Ok(self.groups.get(&spec.name).cloned().unwrap_or_default())
        }
    }

    /// Triangle soup with three independent vertices per triangle.
    fn soup(triangles: &[[f64; 9]], tags: Option<Vec<i32>>) -> RawGroupGeometry {
        let mut positions = Vec::with_capacity(triangles.len() * 3);
        let mut corners = Vec::with_capacity(triangles.len());
        for (i, c) in triangles.iter().enumerate() {
            positions.push(Vec3::new(c[0], c[1], c[2]));
            positions.push(Vec3::new(c[3], c[4], c[5]));
            positions.push(Vec3::new(c[6], c[7], c[8]));
            let base = (i * 3) as u32;
            corners.push([base, base + 1, base + 2]);
        }
        RawGroupGeometry {
            positions,
            corners,
            tags,
        }
    }

    fn group_config(name: &str, movable: bool, class: &str, params: serde_json::Value) -> GroupConfig {
        GroupConfig {
            spec: GroupSpec {
                id: GroupId(0),
                parent: None,
                name: name.to_string(),
                movable,
                tolerance: 1e-9,
            },
            motion_class: class.to_string(),
            motion_params: params,
        }
    }

    /// A row of axis-aligned blocks along X, or a 2×2 sheet in XY.
    fn block_partition(rank: usize, ix: f64, iy: f64) -> Partition {
        Partition::new(
            WorkerRank(rank),
            Vec3::new(ix * 4.0, iy * 4.0, 0.0),
            [4, 4, 4],
            1,
            1.0,
        )
    }

    #[derive(Debug)]
    struct WorkerReport {
        rank: usize,
        triangles: HashMap<String, Vec<(TriangleId, [f64; 9])>>,
        stats: Vec<StepStats>,
    }

    fn snapshot(store: &DistributedStore, stats: Vec<StepStats>) -> WorkerReport {
        let mut triangles = HashMap::new();
        for group in store.groups() {
            let entries = group
                .triangles
                .iter()
                .map(|t| (t.id, t.coords(&group.arena)))
                .collect();
            triangles.insert(group.spec.name.clone(), entries);
        }
        WorkerReport {
            rank: store.context().rank.0,
            triangles,
            stats,
        }
    }

    async fn run_worker(
        transport: LocalTransport,
        partition: Partition,
        groups: Vec<GroupConfig>,
        source: Option<FixedSource>,
        steps: Vec<StepParams>,
        settings: StoreSettings,
    ) -> WorkerReport {
        let registry = MotionRegistry::with_builtins();
        let ctx = WorkerContext::new(transport.rank(), transport.world_size());
        let mut store = DistributedStore::new(
            ctx,
            Arc::new(transport),
            partition,
            groups,
            &registry,
            settings,
        )
        .expect("store construction");

        store.exchange_partitions().await.expect("partition exchange");
        store
            .distribute(source.as_ref().map(|s| s as &dyn GeometrySource))
            .await
            .expect("initial distribution");

        let mut stats = Vec::with_capacity(steps.len());
        for params in &steps {
            store.move_step(params).expect("move_step");
            stats.push(store.migrate().await.expect("migrate"));
        }
        snapshot(&store, stats)
    }

    async fn run_cluster(
        partitions: Vec<Partition>,
        groups: Vec<GroupConfig>,
        source: FixedSource,
        steps: Vec<StepParams>,
        settings: StoreSettings,
    ) -> Vec<WorkerReport> {
        let transports = LocalCluster::new(partitions.len());
        let coordinator = settings.coordinator;
        let handles: Vec<_> = transports
            .into_iter()
            .zip(partitions)
            .map(|(transport, partition)| {
                let groups = groups.clone();
                let steps = steps.clone();
                let source = (transport.rank() == coordinator).then(|| source.clone());
                tokio::spawn(run_worker(
                    transport, partition, groups, source, steps, settings,
                ))
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            reports.push(handle.await.expect("worker task"));
        }
        reports.sort_by_key(|r| r.rank);
        reports
    }

    fn step(current: u64, next: u64) -> StepParams {
        StepParams {
            current_step: current,
            next_step: next,
            delta_t: 1.0,
        }
    }

    fn ids_of(report: &WorkerReport, group: &str) -> HashSet<TriangleId> {
        report.triangles[group].iter().map(|(id, _)| *id).collect()
    }

    fn coords_close(a: &[f64; 9], b: &[f64; 9], tolerance: f64) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance)
    }

    // ========================================================================
    // Scenarios
    // ========================================================================

    #[tokio::test(flavor = "multi_thread")]
    async fn seam_straddling_triangles_reach_all_four_workers() {
        // 2×2 grid; two triangles straddling the common corner at (4, 4).
        let partitions = vec![
            block_partition(0, 0.0, 0.0),
            block_partition(1, 1.0, 0.0),
            block_partition(2, 0.0, 1.0),
            block_partition(3, 1.0, 1.0),
        ];
        let triangles = [
            [3.5, 3.5, 1.0, 4.5, 3.5, 1.0, 4.0, 4.5, 1.0],
            [3.5, 4.2, 1.0, 4.5, 4.4, 1.0, 4.1, 3.6, 1.0],
        ];
        let mut source = FixedSource::default();
        source
            .groups
            .insert("skin".to_string(), soup(&triangles, None));
        let groups = vec![group_config(
            "skin",
            true,
            "translate",
            serde_json::json!({ "velocity": [0.0, 0.0, 0.0] }),
        )];

        let reports = run_cluster(
            partitions,
            groups,
            source,
            Vec::new(),
            StoreSettings::default(),
        )
        .await;

        // Every worker's guard region sees the seam, so every worker holds
        // both triangles; the deduplicated union is the original two.
        let mut union: HashSet<TriangleId> = HashSet::new();
        for report in &reports {
            assert_eq!(ids_of(report, "skin").len(), 2, "rank {}", report.rank);
            union.extend(ids_of(report, "skin"));
        }
        let expected: HashSet<TriangleId> = [TriangleId(0), TriangleId(1)].into_iter().collect();
        assert_eq!(union, expected);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn displaced_seam_triangles_collapse_onto_one_worker() {
        // Same 2×2 grid; one step drives every vertex deep into worker 0's
        // interior, clear of every other guard region.
        let partitions = vec![
            block_partition(0, 0.0, 0.0),
            block_partition(1, 1.0, 0.0),
            block_partition(2, 0.0, 1.0),
            block_partition(3, 1.0, 1.0),
        ];
        let triangles = [
            [3.5, 3.5, 1.0, 4.5, 3.5, 1.0, 4.0, 4.5, 1.0],
            [3.5, 4.2, 1.0, 4.5, 4.4, 1.0, 4.1, 3.6, 1.0],
        ];
        let mut source = FixedSource::default();
        source
            .groups
            .insert("skin".to_string(), soup(&triangles, None));
        let groups = vec![group_config(
            "skin",
            true,
            "translate",
            serde_json::json!({ "velocity": [-2.6, -2.6, 0.0] }),
        )];

        let reports = run_cluster(
            partitions,
            groups,
            source,
            vec![step(0, 1)],
            StoreSettings::default(),
        )
        .await;

        assert_eq!(ids_of(&reports[0], "skin").len(), 2);
        for report in &reports[1..] {
            assert!(
                report.triangles["skin"].is_empty(),
                "rank {} still holds {:?}",
                report.rank,
                ids_of(report, "skin")
            );
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn boundary_triangle_is_excluded_from_migration() {
        // One triangle with a vertex exactly on the seam plane x = 4 is in
        // both guard regions from the start. A no-op motion law changes
        // nothing, so the pre-move exclusion snapshot must suppress every
        // transfer.
        let partitions = vec![block_partition(0, 0.0, 0.0), block_partition(1, 1.0, 0.0)];
        let triangles = [[4.0, 1.0, 1.0, 3.0, 1.0, 1.0, 3.5, 2.0, 1.0]];
        let mut source = FixedSource::default();
        source
            .groups
            .insert("skin".to_string(), soup(&triangles, None));
        let groups = vec![group_config(
            "skin",
            true,
            "static",
            serde_json::Value::Null,
        )];

        let reports = run_cluster(
            partitions,
            groups,
            source,
            vec![step(0, 1)],
            StoreSettings::default(),
        )
        .await;

        for report in &reports {
            assert_eq!(ids_of(report, "skin").len(), 1, "rank {}", report.rank);
            let stats = report.stats[0];
            assert_eq!(stats.sent, 0, "rank {} sent {}", report.rank, stats.sent);
            assert_eq!(stats.received, 0);
            assert_eq!(stats.erased, 0);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn migration_conserves_every_surviving_triangle() {
        // Four triangles drifting +1.5 in X across a two-block row. The
        // union of both local sets after one full round must equal exactly
        // the triangles whose displaced geometry still crosses either
        // guard region.
        let partitions = vec![block_partition(0, 0.0, 0.0), block_partition(1, 1.0, 0.0)];
        let triangles = [
            [0.5, 1.0, 1.0, 1.5, 1.0, 1.0, 1.0, 2.0, 1.0],
            [2.8, 1.0, 1.0, 3.8, 1.0, 1.0, 3.3, 2.0, 1.0],
            [6.0, 1.0, 1.0, 7.0, 1.0, 1.0, 6.5, 2.0, 1.0],
            [-0.9, 1.0, 1.0, -0.1, 1.0, 1.0, -0.5, 2.0, 1.0],
        ];
        let velocity = [1.5, 0.0, 0.0];
        let mut source = FixedSource::default();
        source
            .groups
            .insert("skin".to_string(), soup(&triangles, None));
        let groups = vec![group_config(
            "skin",
            true,
            "translate",
            serde_json::json!({ "velocity": velocity }),
        )];

        let reports = run_cluster(
            partitions.clone(),
            groups,
            source,
            vec![step(0, 1)],
            StoreSettings::default(),
        )
        .await;

        // Brute-force expectation from the displaced source geometry.
        let mut expected: HashSet<TriangleId> = HashSet::new();
        for (i, t) in triangles.iter().enumerate() {
            let mut bbox = BoundingBox::empty();
            for corner in 0..3 {
                bbox.add_point(Vec3::new(
                    t[corner * 3] + velocity[0],
                    t[corner * 3 + 1] + velocity[1],
                    t[corner * 3 + 2] + velocity[2],
                ));
            }
            if partitions.iter().any(|p| bbox.crossed(&p.guard_bbox())) {
                expected.insert(TriangleId(i as i32));
            }
        }
        assert_eq!(expected.len(), 4, "test geometry should all survive");

        let mut union: HashSet<TriangleId> = HashSet::new();
        for report in &reports {
            union.extend(ids_of(report, "skin"));
        }
        assert_eq!(union, expected);

        // Each worker's set is exactly the displaced triangles crossing its
        // own guard region.
        for (report, partition) in reports.iter().zip(&partitions) {
            let mut local_expected: HashSet<TriangleId> = HashSet::new();
            for (i, t) in triangles.iter().enumerate() {
                let mut bbox = BoundingBox::empty();
                for corner in 0..3 {
                    bbox.add_point(Vec3::new(
                        t[corner * 3] + velocity[0],
                        t[corner * 3 + 1] + velocity[1],
                        t[corner * 3 + 2] + velocity[2],
                    ));
                }
                if bbox.crossed(&partition.guard_bbox()) {
                    local_expected.insert(TriangleId(i as i32));
                }
            }
            assert_eq!(ids_of(report, "skin"), local_expected, "rank {}", report.rank);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn oscillating_triangle_returns_with_id_and_coords_intact() {
        // Out on step 1, back on step 2. The triangle must come home to
        // worker 0 with its original id and coordinates, and worker 1 must
        // have let it go. Tags ride along to prove the tagged wire format
        // carries them through both hops.
        let partitions = vec![block_partition(0, 0.0, 0.0), block_partition(1, 1.0, 0.0)];
        let original = [0.5, 1.0, 1.0, 1.5, 1.0, 1.0, 1.0, 2.0, 1.0];
        let mut source = FixedSource::default();
        source
            .groups
            .insert("skin".to_string(), soup(&[original], Some(vec![42])));
        let groups = vec![group_config(
            "skin",
            true,
            "oscillate",
            serde_json::json!({ "amplitude": [5.0, 0.0, 0.0] }),
        )];
        let settings = StoreSettings {
            wire_format: WireFormat { user_tags: true },
            ..StoreSettings::default()
        };

        let reports = run_cluster(
            partitions,
            groups,
            source,
            vec![step(0, 1), step(1, 2)],
            settings,
        )
        .await;

        // Step 1 moved it out of worker 0 entirely.
        assert_eq!(reports[0].stats[0].sent, 1);
        assert_eq!(reports[0].stats[0].erased, 1);
        assert_eq!(reports[1].stats[0].received, 1);

        // Step 2 brought it home.
        assert_eq!(reports[1].stats[1].sent, 1);
        assert_eq!(reports[1].stats[1].erased, 1);
        assert_eq!(reports[0].stats[1].received, 1);

        let home = &reports[0].triangles["skin"];
        assert_eq!(home.len(), 1);
        let (id, coords) = &home[0];
        assert_eq!(*id, TriangleId(0));
        assert!(
            coords_close(coords, &original, 1e-9),
            "coordinates drifted: {coords:?}"
        );
        assert!(reports[1].triangles["skin"].is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn immovable_groups_ride_in_headers_but_never_migrate() {
        // Two groups: a movable skin and a static scaffold pinned across
        // the seam. The scaffold's zero-count batches keep every header
        // aligned, and its triangles never move or transfer.
        let partitions = vec![block_partition(0, 0.0, 0.0), block_partition(1, 1.0, 0.0)];
        let mut source = FixedSource::default();
        source.groups.insert(
            "skin".to_string(),
            soup(&[[0.5, 1.0, 1.0, 1.5, 1.0, 1.0, 1.0, 2.0, 1.0]], None),
        );
        source.groups.insert(
            "scaffold".to_string(),
            soup(&[[3.5, 1.0, 1.0, 4.5, 1.0, 1.0, 4.0, 2.0, 1.0]], None),
        );
        let mut skin = group_config(
            "skin",
            true,
            "translate",
            serde_json::json!({ "velocity": [0.5, 0.0, 0.0] }),
        );
        skin.spec.id = GroupId(0);
        let mut scaffold = group_config("scaffold", false, "static", serde_json::Value::Null);
        scaffold.spec.id = GroupId(1);

        let reports = run_cluster(
            partitions,
            vec![skin, scaffold],
            source,
            vec![step(0, 1)],
            StoreSettings::default(),
        )
        .await;

        // The scaffold straddles the seam, so both workers keep their copy.
        for report in &reports {
            assert_eq!(report.triangles["scaffold"].len(), 1, "rank {}", report.rank);
        }
        // Nothing scaffold-related was ever counted as migration traffic.
        let skin_home = ids_of(&reports[0], "skin");
        assert_eq!(skin_home.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn distribution_erases_out_of_guard_geometry_and_stays_idempotent() {
        // Single worker whose guard region covers only part of the loaded
        // geometry: distribution itself runs erase-outbounded, and another
        // pass right after finds nothing more to drop.
        let transports = LocalCluster::new(1);
        let transport = transports.into_iter().next().expect("one transport");
        let partition = block_partition(0, 0.0, 0.0);
        let triangles = [
            [1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.5, 2.0, 1.0],
            [20.0, 1.0, 1.0, 21.0, 1.0, 1.0, 20.5, 2.0, 1.0],
        ];
        let mut source = FixedSource::default();
        source
            .groups
            .insert("skin".to_string(), soup(&triangles, None));

        let registry = MotionRegistry::with_builtins();
        let ctx = WorkerContext::new(WorkerRank(0), 1);
        let mut store = DistributedStore::new(
            ctx,
            Arc::new(transport),
            partition,
            vec![group_config("skin", true, "static", serde_json::Value::Null)],
            &registry,
            StoreSettings::default(),
        )
        .expect("store construction");

        store.exchange_partitions().await.expect("exchange");
        store
            .distribute(Some(&source as &dyn GeometrySource))
            .await
            .expect("distribute");

        let group = store.group("skin").expect("group");
        assert_eq!(group.len(), 1);
        assert!(group.contains(TriangleId(0)));

        // Idempotence: no geometry changed, so nothing else leaves.
        assert_eq!(store.erase_outbounded().expect("first pass"), 0);
        assert_eq!(store.erase_outbounded().expect("second pass"), 0);
        assert_eq!(store.group("skin").expect("group").len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn move_step_validates_before_mutating() {
        let transports = LocalCluster::new(1);
        let transport = transports.into_iter().next().expect("one transport");
        let partition = block_partition(0, 0.0, 0.0);
        let mut source = FixedSource::default();
        source.groups.insert(
            "skin".to_string(),
            soup(&[[1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.5, 2.0, 1.0]], None),
        );

        let registry = MotionRegistry::with_builtins();
        let ctx = WorkerContext::new(WorkerRank(0), 1);
        let mut store = DistributedStore::new(
            ctx,
            Arc::new(transport),
            partition,
            vec![group_config(
                "skin",
                true,
                "translate",
                serde_json::json!({ "velocity": [1.0, 0.0, 0.0] }),
            )],
            &registry,
            StoreSettings::default(),
        )
        .expect("store construction");
        store.exchange_partitions().await.expect("exchange");
        store
            .distribute(Some(&source as &dyn GeometrySource))
            .await
            .expect("distribute");

        let before: Vec<_> = store.group("skin").expect("group").triangles.clone();

        let err = store
            .move_step(&StepParams {
                current_step: 3,
                next_step: 3,
                delta_t: 1.0,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::InvalidStepOrder { current: 3, next: 3 })
        ));

        let err = store
            .move_step(&StepParams {
                current_step: 0,
                next_step: 1,
                delta_t: 0.0,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::InvalidTimeDelta { .. })
        ));

        // Fail-fast: the rejected calls left phase, step, and geometry alone.
        assert_eq!(store.phase(), StepPhase::Placed);
        assert_eq!(store.current_step(), 0);
        let after = &store.group("skin").expect("group").triangles;
        assert_eq!(after.len(), before.len());
        for (a, b) in after.iter().zip(&before) {
            assert_eq!(a.vertices, b.vertices);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn migrate_requires_a_preceding_move() {
        let transports = LocalCluster::new(1);
        let transport = transports.into_iter().next().expect("one transport");
        let registry = MotionRegistry::with_builtins();
        let ctx = WorkerContext::new(WorkerRank(0), 1);
        let mut store = DistributedStore::new(
            ctx,
            Arc::new(transport),
            block_partition(0, 0.0, 0.0),
            vec![group_config("skin", true, "static", serde_json::Value::Null)],
            &registry,
            StoreSettings::default(),
        )
        .expect("store construction");
        store.exchange_partitions().await.expect("exchange");
        store
            .distribute(Some(&FixedSource::default() as &dyn GeometrySource))
            .await
            .expect("distribute");

        let err = store.migrate().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::Phase {
                expected: StepPhase::Moved,
                actual: StepPhase::Placed,
            })
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn coordinator_without_source_aborts() {
        let transports = LocalCluster::new(1);
        let transport = transports.into_iter().next().expect("one transport");
        let registry = MotionRegistry::with_builtins();
        let ctx = WorkerContext::new(WorkerRank(0), 1);
        let mut store = DistributedStore::new(
            ctx,
            Arc::new(transport),
            block_partition(0, 0.0, 0.0),
            vec![group_config("skin", true, "static", serde_json::Value::Null)],
            &registry,
            StoreSettings::default(),
        )
        .expect("store construction");
        store.exchange_partitions().await.expect("exchange");

        let err = store.distribute(None).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Config(ConfigError::MissingGeometry)
        ));
    }
}
