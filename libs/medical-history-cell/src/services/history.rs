use chrono::{SecondsFormat, Utc};
use tracing::{debug, info};

use shared_database::{Committed, SessionRepositories, SyncContext};
use shared_models::error::AppError;
use shared_models::session::UserSession;

use crate::models::{ImageUpload, MedicalDocument, MedicalHistory, RecordForm, RecordKind};

pub struct MedicalHistoryService {
    repos: SessionRepositories<MedicalHistory>,
}

impl MedicalHistoryService {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            repos: SessionRepositories::new(ctx),
        }
    }

    pub async fn history(&self, session: &UserSession) -> MedicalHistory {
        self.repos.get(session).await.snapshot().await
    }

    pub async fn add_record(
        &self,
        session: &UserSession,
        form: RecordForm,
    ) -> Result<Committed<RecordKind>, AppError> {
        let now = now_iso();
        let repo = self.repos.get(session).await;

        let committed = repo
            .update(|history: &mut MedicalHistory| {
                form.apply(history, &now).map_err(AppError::ValidationError)
            })
            .await?;

        info!("Added {} record for {}", committed.value, session.user_id());
        Ok(committed)
    }

    pub async fn upload_image(
        &self,
        session: &UserSession,
        upload: ImageUpload,
    ) -> Result<Committed<MedicalDocument>, AppError> {
        let document = upload
            .into_document(&now_iso())
            .map_err(AppError::ValidationError)?;
        let repo = self.repos.get(session).await;

        let committed = repo
            .update(|history: &mut MedicalHistory| {
                history.documents.insert(0, document.clone());
                Ok::<_, AppError>(document)
            })
            .await?;

        info!("Uploaded image document {} for {}", committed.value.name, session.user_id());
        Ok(committed)
    }

    pub async fn delete_record(
        &self,
        session: &UserSession,
        kind: RecordKind,
        index: usize,
    ) -> Result<Committed<()>, AppError> {
        let repo = self.repos.get(session).await;

        let committed = repo
            .update(|history: &mut MedicalHistory| {
                if history.remove(kind, index) {
                    Ok(())
                } else {
                    Err(AppError::NotFound(format!("No {} record at index {}", kind, index)))
                }
            })
            .await?;

        debug!("Deleted {} record {} for {}", kind, index, session.user_id());
        Ok(committed)
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
