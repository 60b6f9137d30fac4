use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::domain::chat::UserId;
use crate::domain::task::TaskList;

/// Decides when the daily digest goes out.
///
/// Fires on the first poll whose local hour matches `hour`, then stays quiet
/// until the local date changes. Polling faster than once an hour therefore
/// never double-fires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigestSchedule {
    hour: u32,
    last_fired: Option<NaiveDate>,
}

impl DigestSchedule {
    pub fn new(hour: u32) -> Self {
        Self { hour, last_fired: None }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn last_fired(&self) -> Option<NaiveDate> {
        self.last_fired
    }

    pub fn is_due(&self, now_local: NaiveDateTime) -> bool {
        now_local.hour() == self.hour && self.last_fired != Some(now_local.date())
    }

    /// Returns `true` exactly once per matching local date and records the firing.
    pub fn poll(&mut self, now_local: NaiveDateTime) -> bool {
        if !self.is_due(now_local) {
            return false;
        }
        self.last_fired = Some(now_local.date());
        true
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DigestEntry {
    Tasks { user: UserId, tasks: Vec<String> },
    NoTasks { user: UserId },
}

impl DigestEntry {
    pub fn user(&self) -> &UserId {
        match self {
            Self::Tasks { user, .. } | Self::NoTasks { user } => user,
        }
    }
}

/// One digest pass worth of content, taken as a snapshot so the broadcast can
/// run without holding the state lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DigestPlan {
    /// Nobody has ever added a task.
    Nobody,
    Entries(Vec<DigestEntry>),
}

pub fn plan_digest(tasks: &TaskList) -> DigestPlan {
    if tasks.is_empty() {
        return DigestPlan::Nobody;
    }

    DigestPlan::Entries(
        tasks
            .snapshot()
            .into_iter()
            .map(|(user, tasks)| {
                if tasks.is_empty() {
                    DigestEntry::NoTasks { user }
                } else {
                    DigestEntry::Tasks { user, tasks }
                }
            })
            .collect(),
    )
}
