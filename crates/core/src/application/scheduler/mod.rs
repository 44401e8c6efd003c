// Promotion Scheduler - periodic and event-driven promotion sweeps

pub mod constants;
mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::AdmissionController;
use crate::domain::{Audience, QueueEvent, UserId};
use crate::error::Result;
use crate::port::{Notifier, TimeProvider, TokenIssuer};
use constants::REASON_TICK;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// A user admitted by a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub user_id: UserId,
    pub access_token: String,
}

/// What one sweep did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub admitted: Vec<Admission>,
    /// Waiting users sent a positional update
    pub updated: usize,
}

impl SweepReport {
    pub fn access_token_for(&self, user_id: &str) -> Option<&str> {
        self.admitted
            .iter()
            .find(|a| a.user_id == user_id)
            .map(|a| a.access_token.as_str())
    }
}

/// Promotion scheduler
///
/// Runs `sweep` on a fixed interval (`run`) and on demand (`trigger`).
/// Sweeps may overlap; the store serializes the promotion step itself.
pub struct PromotionScheduler {
    controller: Arc<AdmissionController>,
    token_issuer: Arc<dyn TokenIssuer>,
    notifier: Arc<dyn Notifier>,
    time_provider: Arc<dyn TimeProvider>,
    tick_interval: Duration,
}

impl PromotionScheduler {
    pub fn new(
        controller: Arc<AdmissionController>,
        token_issuer: Arc<dyn TokenIssuer>,
        notifier: Arc<dyn Notifier>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let tick_interval = controller.capacity().tick_interval();
        Self {
            controller,
            token_issuer,
            notifier,
            time_provider,
            tick_interval,
        }
    }

    /// Promote, hand out access tokens, then push positional updates
    ///
    /// Store and token errors propagate; nothing is retried here.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let promoted = self.controller.promote().await?;

        let mut admitted = Vec::with_capacity(promoted.len());
        for user_id in promoted {
            let access_token = self.token_issuer.issue_access_token(&user_id).await?;
            self.notifier.publish(
                Audience::User(user_id.clone()),
                QueueEvent::ready(access_token.clone(), self.time_provider.now_rfc3339()),
            );
            admitted.push(Admission {
                user_id,
                access_token,
            });
        }

        let updated = self.publish_positions().await?;

        Ok(SweepReport { admitted, updated })
    }

    /// Run a sweep on behalf of an event source
    pub async fn trigger(&self, reason: &str) -> Result<SweepReport> {
        debug!(reason, "Promotion sweep triggered");
        let report = self.sweep().await?;
        if !report.admitted.is_empty() {
            info!(reason, admitted = report.admitted.len(), "Sweep admitted users");
        }
        Ok(report)
    }

    /// Periodic sweep loop (background task)
    ///
    /// Failures are logged and the loop continues. A sweep in flight when
    /// shutdown arrives runs to completion.
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(
            interval_ms = self.tick_interval.as_millis() as u64,
            "Promotion scheduler started"
        );

        let mut tick = interval(self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_shutdown() {
                break;
            }
            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = self.trigger(REASON_TICK).await {
                        error!(error = %e, "Scheduled promotion sweep failed");
                    }
                }
                _ = shutdown.wait() => {
                    info!("Promotion scheduler interrupted");
                    break;
                }
            }
        }

        info!("Promotion scheduler stopped");
    }

    async fn publish_positions(&self) -> Result<usize> {
        let info = self.controller.queue_info().await?;
        let timestamp = self.time_provider.now_rfc3339();

        for queued in &info.next_in_queue {
            self.notifier.publish(
                Audience::User(queued.user_id.clone()),
                QueueEvent::QueueUpdate {
                    position: queued.position,
                    estimated_wait_time: queued.estimated_wait_time.clone(),
                    timestamp: timestamp.clone(),
                },
            );
        }
        Ok(info.next_in_queue.len())
    }
}
