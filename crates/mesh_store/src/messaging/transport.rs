//! Transport substrate for cross-worker messaging.
//!
//! The migration protocol needs exactly four primitives: a non-blocking
//! buffered point-to-point send, a blocking per-source receive, a startup
//! all-to-all collective, and a final wait on outstanding sends. Frames
//! from one sender to one receiver arrive in FIFO order, which is what
//! makes header-before-body decoding sound; nothing is guaranteed across
//! different sender/receiver pairs.
//!
//! There are no timeouts and no cancellation. All workers advance through
//! simulation steps in lockstep, so a partner that never sends indicates a
//! broken deployment, not a recoverable error.

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use tessera_spatial::WorkerRank;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tracing::trace;

/// Messaging interface the store runs the distribution and migration
/// protocols over.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Rank of the local worker.
    fn rank(&self) -> WorkerRank;

    /// Number of workers in the cluster.
    fn world_size(&self) -> usize;

    /// Enqueues `frame` for delivery to `to` without blocking.
    ///
    /// The frame buffer is handed off to the transport and remains valid
    /// until [`wait_outstanding`](Transport::wait_outstanding) completes.
    fn send(&self, to: WorkerRank, frame: Bytes) -> Result<(), TransportError>;

    /// Receives the next frame from `from`, blocking until one arrives.
    async fn recv(&self, from: WorkerRank) -> Result<Bytes, TransportError>;

    /// All-to-all collective: every worker contributes one frame and
    /// receives every worker's contribution, indexed by source rank.
    async fn all_gather(&self, frame: Bytes) -> Result<Vec<Bytes>, TransportError>;

    /// Blocks until every outstanding outbound send has completed.
    async fn wait_outstanding(&self) -> Result<(), TransportError>;
}

/// Routing key for one directed worker pair.
type PairKey = (usize, usize);

/// In-process cluster transport over per-pair unbounded channels.
///
/// Built once per run by [`LocalCluster::new`]; each worker task owns one
/// transport. The shared routing table maps a `(from, to)` pair to its
/// dedicated channel, so per-pair FIFO ordering comes straight from the
/// channel and pairs never contend.
pub struct LocalTransport {
    rank: WorkerRank,
    world_size: usize,
    routes: Arc<DashMap<PairKey, mpsc::UnboundedSender<Bytes>>>,
    inbound: Vec<Mutex<mpsc::UnboundedReceiver<Bytes>>>,
}

#[async_trait]
impl Transport for LocalTransport {
    fn rank(&self) -> WorkerRank {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn send(&self, to: WorkerRank, frame: Bytes) -> Result<(), TransportError> {
        let sender = self
            .routes
            .get(&(self.rank.0, to.0))
            .ok_or_else(|| TransportError::Protocol(format!("no route to worker {to}")))?;
        trace!(from = %self.rank, %to, bytes = frame.len(), "frame enqueued");
        sender
            .send(frame)
            .map_err(|_| TransportError::ChannelClosed(to))
    }

    async fn recv(&self, from: WorkerRank) -> Result<Bytes, TransportError> {
        let slot = self
            .inbound
            .get(from.0)
            .ok_or_else(|| TransportError::Protocol(format!("no inbound slot for worker {from}")))?;
        let mut receiver = slot.lock().await;
        receiver
            .recv()
            .await
            .ok_or(TransportError::ChannelClosed(from))
    }

    async fn all_gather(&self, frame: Bytes) -> Result<Vec<Bytes>, TransportError> {
        for to in 0..self.world_size {
            self.send(WorkerRank(to), frame.clone())
                .map_err(|e| TransportError::Collective(e.to_string()))?;
        }
        let mut gathered = Vec::with_capacity(self.world_size);
        for from in 0..self.world_size {
            let contribution = self
                .recv(WorkerRank(from))
                .await
                .map_err(|e| TransportError::Collective(e.to_string()))?;
            gathered.push(contribution);
        }
        Ok(gathered)
    }

    async fn wait_outstanding(&self) -> Result<(), TransportError> {
        // Unbounded channels take ownership of the buffer at send time;
        // nothing is ever outstanding. Network transports block here.
        Ok(())
    }
}

/// Factory for a fixed-size in-process cluster.
pub struct LocalCluster;

impl LocalCluster {
    /// Creates `world_size` connected transports, one per rank.
    ///
    /// Every directed pair, self-delivery included, gets its own channel;
    /// self-delivery is what lets the all-to-all collective treat the local
    /// contribution uniformly.
    pub fn new(world_size: usize) -> Vec<LocalTransport> {
        let routes: Arc<DashMap<PairKey, mpsc::UnboundedSender<Bytes>>> = Arc::new(DashMap::new());
        let mut inbound_per_rank: Vec<Vec<Mutex<mpsc::UnboundedReceiver<Bytes>>>> =
            Vec::with_capacity(world_size);

        for to in 0..world_size {
            let mut inbound = Vec::with_capacity(world_size);
            for from in 0..world_size {
                let (tx, rx) = mpsc::unbounded_channel();
                routes.insert((from, to), tx);
                inbound.push(Mutex::new(rx));
            }
            inbound_per_rank.push(inbound);
        }

        inbound_per_rank
            .into_iter()
            .enumerate()
            .map(|(rank, inbound)| LocalTransport {
                rank: WorkerRank(rank),
                world_size,
                routes: Arc::clone(&routes),
                inbound,
            })
            .collect()
    }
}
