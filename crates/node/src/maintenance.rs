//! Periodic repair of a node's routing state.
//!
//! One cycle runs stabilize, fix-fingers and check-predecessor in order. A
//! cycle never overlaps the previous one. A failed step is logged and the
//! cycle carries on; the next tick tries again.

use std::sync::Arc;

use metrics::counter;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::node::ChordNode;

/// Drive the maintenance cycle of `node` until `cancel` fires.
pub async fn run(node: Arc<ChordNode>, cancel: CancellationToken) {
    let mut ticker = interval(node.config().stabilize_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(
        node = %node.address(),
        every = ?node.config().stabilize_interval,
        "maintenance started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = node.run_cycle() => {}
        }
    }

    debug!(node = %node.address(), "maintenance stopped");
}

impl ChordNode {
    /// One maintenance cycle.
    pub async fn run_cycle(&self) {
        trace!(node = %self.address(), "maintenance cycle");
        if let Err(e) = self.stabilize().await {
            counter!("chord_maintenance_failures_total", "step" => "stabilize").increment(1);
            warn!(node = %self.address(), error = %e, "stabilize failed");
        }
        if let Err(e) = self.fix_fingers().await {
            counter!("chord_maintenance_failures_total", "step" => "fix_fingers").increment(1);
            warn!(node = %self.address(), error = %e, "fix_fingers failed");
        }
        self.check_predecessor();
    }

    /// Adopt the successor's predecessor if it sits between us, then tell the
    /// successor about ourselves.
    pub async fn stabilize(&self) -> Result<()> {
        let own = self.address();
        let successor = self.get_successor();

        let candidate = if successor == *own {
            self.get_predecessor()
        } else {
            self.pool()
                .client(&successor)
                .get_predecessor()
                .await
                .inspect_err(|e| self.pool().evict_if_down(&successor, e))?
        };

        if let Some(candidate) = candidate {
            if candidate.id.is_between(&own.id, &successor.id, false) || successor == *own {
                debug!(node = %own, successor = %candidate, "adopting new successor");
                self.table().lock().set(0, candidate);
            }
        }

        let successor = self.get_successor();
        if successor != *own {
            self.pool()
                .client(&successor)
                .notify(own)
                .await
                .inspect_err(|e| self.pool().evict_if_down(&successor, e))?;
        }
        Ok(())
    }

    /// Recompute the next finger table row.
    pub async fn fix_fingers(&self) -> Result<()> {
        let row = self.table().lock().next_fix_row();
        if row == 0 {
            return Ok(());
        }
        let target = self.address().id.finger_target(row);
        let owner = self.find_successor(&target).await?;
        trace!(node = %self.address(), row, %owner, "fixed finger");
        self.table().lock().set(row, owner);
        Ok(())
    }

    /// Predecessor liveness hook. Failed predecessors are never evicted.
    pub fn check_predecessor(&self) {}
}
