//! Change history dispatch
//!
//! Services call [`HistoryService::record`] after their transaction commits.
//! Recording runs on its own task and never fails the caller.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::{
    error::AppResult,
    models::{ChangeAction, ChangeSet},
    repository::Repository,
};

/// Sink for committed changes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChangeRecorder: Send + Sync {
    async fn record(&self, change: &ChangeSet) -> AppResult<()>;
}

/// Stores change sets in the `change_history` table
pub struct PgChangeRecorder {
    repository: Repository,
}

impl PgChangeRecorder {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl ChangeRecorder for PgChangeRecorder {
    async fn record(&self, change: &ChangeSet) -> AppResult<()> {
        self.repository.history_insert(change).await
    }
}

#[derive(Clone)]
pub struct HistoryService {
    recorder: Arc<dyn ChangeRecorder>,
}

impl HistoryService {
    pub fn new(recorder: Arc<dyn ChangeRecorder>) -> Self {
        Self { recorder }
    }

    /// Fire-and-forget. An update that changed nothing is not recorded.
    pub fn record(&self, change: ChangeSet) -> Option<JoinHandle<()>> {
        if change.action == ChangeAction::Update && change.is_empty() {
            return None;
        }

        let recorder = self.recorder.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = recorder.record(&change).await {
                tracing::warn!(
                    change_id = %change.change_id,
                    entity = change.entity_type.as_str(),
                    entity_id = change.entity_id,
                    action = change.action.as_str(),
                    "Failed to record change: {}",
                    e
                );
            }
        }))
    }

    pub fn record_all(&self, changes: impl IntoIterator<Item = ChangeSet>) {
        for change in changes {
            self.record(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{
            equipment::tests::equipment,
            user::{tests::claims, Role},
            EntityType,
        },
    };

    #[tokio::test]
    async fn test_record_dispatches_to_recorder() {
        let mut recorder = MockChangeRecorder::new();
        recorder
            .expect_record()
            .withf(|c| c.action == ChangeAction::Attach && c.entity_id == 7)
            .times(1)
            .returning(|_| Ok(()));

        let service = HistoryService::new(Arc::new(recorder));
        let before = equipment(7, None);
        let after = equipment(7, Some(3));
        let handle = service
            .record(ChangeSet::equipment(ChangeAction::Attach, Some(&before), &after, &claims(Role::Editor)))
            .unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_recorder_failure_is_swallowed() {
        let mut recorder = MockChangeRecorder::new();
        recorder
            .expect_record()
            .times(1)
            .returning(|_| Err(AppError::Internal("history store down".into())));

        let service = HistoryService::new(Arc::new(recorder));
        let change = ChangeSet::new(EntityType::RepairBatch, 1, None, ChangeAction::BatchCreated, &claims(Role::Editor));
        // the task completes normally even though the recorder failed
        service.record(change).unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_update_is_skipped() {
        let mut recorder = MockChangeRecorder::new();
        recorder.expect_record().never();

        let service = HistoryService::new(Arc::new(recorder));
        let e = equipment(1, None);
        let change = ChangeSet::equipment(ChangeAction::Update, Some(&e), &e, &claims(Role::Editor));
        assert!(service.record(change).is_none());
    }
}
