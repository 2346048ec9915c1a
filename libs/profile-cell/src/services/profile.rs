use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::info;

use shared_database::{SessionRepositories, SyncContext};
use shared_models::error::AppError;
use shared_models::session::UserSession;

use crate::models::{MedicalProfile, PersonalDetails, ProfileForm, ProfileView};

/// A saved profile and the merge-writes for its two documents.
#[derive(Debug)]
pub struct SavedProfile {
    pub view: ProfileView,
    pub remote_writes: Vec<JoinHandle<()>>,
}

pub struct ProfileService {
    personal: SessionRepositories<PersonalDetails>,
    medical: SessionRepositories<MedicalProfile>,
}

impl ProfileService {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            personal: SessionRepositories::new(ctx.clone()),
            medical: SessionRepositories::new(ctx),
        }
    }

    pub async fn profile(&self, session: &UserSession) -> ProfileView {
        let personal = self.personal.get(session).await.snapshot().await;
        let medical = self.medical.get(session).await.snapshot().await;
        ProfileView::new(personal, medical)
    }

    /// Replaces both slices. Age is recomputed from the birth date.
    pub async fn save(
        &self,
        session: &UserSession,
        form: ProfileForm,
        today: NaiveDate,
    ) -> Result<SavedProfile, AppError> {
        let personal_details = form.personal_details(today);
        let medical_profile = form.medical;

        let personal = self.personal
            .get(session)
            .await
            .update(|state: &mut PersonalDetails| {
                *state = personal_details.clone();
                Ok::<_, AppError>(personal_details)
            })
            .await?;

        let medical = self.medical
            .get(session)
            .await
            .update(|state: &mut MedicalProfile| {
                *state = medical_profile.clone();
                Ok::<_, AppError>(medical_profile)
            })
            .await?;

        info!("Saved profile for {}", session.user_id());

        Ok(SavedProfile {
            view: ProfileView::new(personal.value, medical.value),
            remote_writes: vec![personal.remote_write, medical.remote_write],
        })
    }
}
