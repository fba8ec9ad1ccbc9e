use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::db::ContentRepository;
use crate::error::Result;
use crate::services::{ScheduleEntry, ScheduleStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

/// Hands pending artifacts to the schedule store.
///
/// The external insert and the local status update are separate writes. If the
/// process dies between them the artifact stays pending and is sent again on
/// the next run.
pub struct Dispatcher {
    repository: Arc<ContentRepository>,
    schedule: Arc<dyn ScheduleStore>,
}

impl Dispatcher {
    pub fn new(repository: Arc<ContentRepository>, schedule: Arc<dyn ScheduleStore>) -> Self {
        Self {
            repository,
            schedule,
        }
    }

    #[instrument(skip_all)]
    pub async fn dispatch_pending(&self) -> Result<DispatchReport> {
        let pending = self.repository.pending_artifacts().await?;
        let mut report = DispatchReport::default();
        if pending.is_empty() {
            info!("no pending scripts to send");
            return Ok(report);
        }
        info!(count = pending.len(), "sending scripts to schedule store");

        for artifact in &pending {
            let schedule_id = match self
                .schedule
                .insert_schedule(ScheduleEntry::from(artifact))
                .await
            {
                Ok(id) => id,
                Err(e) => {
                    warn!(artifact = artifact.id, error = %e, "schedule insert failed");
                    report.failed += 1;
                    continue;
                }
            };

            match self
                .repository
                .mark_artifact_sent(artifact.id, schedule_id)
                .await
            {
                Ok(()) => {
                    info!(artifact = artifact.id, schedule_id, title = %artifact.title, "sent");
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(
                        artifact = artifact.id,
                        schedule_id,
                        error = %e,
                        "scheduled but local status update failed"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(sent = report.sent, failed = report.failed, "dispatch finished");
        Ok(report)
    }
}
