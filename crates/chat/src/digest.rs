use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use fern_core::{
    plan_digest, ChannelId, Clock, DigestEntry, DigestPlan, DigestSchedule, SharedBotState,
    SystemClock,
};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

use crate::blocks;
use crate::client::{ChatClient, ChatClientError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DigestReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Posts one digest pass to the digest channel.
pub struct DigestBroadcaster {
    client: Arc<dyn ChatClient>,
    channel: ChannelId,
}

impl DigestBroadcaster {
    pub fn new(client: Arc<dyn ChatClient>, channel: ChannelId) -> Self {
        Self { client, channel }
    }

    /// Fails only when the greeting cannot be posted. A failure for one user
    /// is logged and counted, and the pass moves on to the next user.
    pub async fn broadcast(&self, plan: &DigestPlan) -> Result<DigestReport, ChatClientError> {
        self.client.post_message(&self.channel, &blocks::digest_greeting_message()).await?;

        let entries = match plan {
            DigestPlan::Nobody => {
                self.client.post_message(&self.channel, &blocks::digest_nobody_message()).await?;
                return Ok(DigestReport::default());
            }
            DigestPlan::Entries(entries) => entries,
        };

        let mut report = DigestReport::default();
        for entry in entries {
            match self.deliver(entry).await {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    warn!(
                        event_name = "digest.user_failed",
                        user_id = %entry.user(),
                        error = %error,
                        "digest delivery failed for user; continuing"
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn deliver(&self, entry: &DigestEntry) -> Result<(), ChatClientError> {
        let user = self.client.fetch_user(entry.user()).await?;
        let message = match entry {
            DigestEntry::Tasks { user: id, tasks } => {
                blocks::digest_user_tasks_message(id, &user.display_name, tasks)
            }
            DigestEntry::NoTasks { user: id } => blocks::digest_user_no_tasks_message(id),
        };
        self.client.post_message(&self.channel, &message).await?;
        Ok(())
    }
}

/// Polls the clock and fires the broadcaster once per local date.
pub struct DigestRunner {
    schedule: DigestSchedule,
    timezone: Tz,
    state: SharedBotState,
    broadcaster: DigestBroadcaster,
    poll_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl DigestRunner {
    pub fn new(
        schedule: DigestSchedule,
        timezone: Tz,
        state: SharedBotState,
        broadcaster: DigestBroadcaster,
        poll_interval: Duration,
    ) -> Self {
        Self {
            schedule,
            timezone,
            state,
            broadcaster,
            poll_interval,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn schedule(&self) -> &DigestSchedule {
        &self.schedule
    }

    /// One poll. Returns the pass report when the digest fired.
    pub async fn tick(&mut self) -> Option<DigestReport> {
        let now_local = self.clock.now().with_timezone(&self.timezone).naive_local();
        if !self.schedule.poll(now_local) {
            return None;
        }

        let plan = plan_digest(&self.state.lock().await.tasks);
        let correlation_id = Uuid::new_v4();
        info!(
            event_name = "digest.fired",
            correlation_id = %correlation_id,
            date = %now_local.date(),
            hour = self.schedule.hour(),
            "sending daily digest"
        );

        match self.broadcaster.broadcast(&plan).await {
            Ok(report) => {
                info!(
                    event_name = "digest.completed",
                    correlation_id = %correlation_id,
                    delivered = report.delivered,
                    failed = report.failed,
                    "daily digest sent"
                );
                Some(report)
            }
            Err(error) => {
                warn!(
                    event_name = "digest.channel_failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "digest channel unreachable; skipping today's digest"
                );
                Some(DigestReport::default())
            }
        }
    }

    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            hour = self.schedule.hour(),
            timezone = %self.timezone,
            poll_interval_secs = self.poll_interval.as_secs(),
            "digest scheduler started"
        );
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}
