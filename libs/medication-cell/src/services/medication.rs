use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use tracing::{debug, info};

use shared_database::{Committed, SessionRepositories, SyncContext, SyncedRepository};
use shared_models::error::AppError;
use shared_models::session::UserSession;

use crate::models::{
    Medication, MedicationForm, MedicationList, MedicationStatus, MedicationSummary,
    MedicationView, RefillReminder, ScheduleEntry,
};
use crate::services::schedule::ScheduleBuilder;

/// Refills due within this many days (or already overdue) are reported.
pub const REFILL_WINDOW_DAYS: i64 = 7;

pub struct MedicationService {
    repos: SessionRepositories<MedicationList>,
    schedule: ScheduleBuilder,
}

impl MedicationService {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            repos: SessionRepositories::new(ctx),
            schedule: ScheduleBuilder::new(),
        }
    }

    pub fn schedule_builder(&self) -> &ScheduleBuilder {
        &self.schedule
    }

    pub async fn repository(&self, session: &UserSession) -> Arc<SyncedRepository<MedicationList>> {
        self.repos.get(session).await
    }

    pub async fn list(&self, session: &UserSession) -> Vec<MedicationView> {
        let state = self.repository(session).await.snapshot().await;
        state.medications.into_iter().map(MedicationView::from).collect()
    }

    pub async fn get(&self, session: &UserSession, id: i64) -> Result<MedicationView, AppError> {
        let state = self.repository(session).await.snapshot().await;
        state.medications
            .into_iter()
            .find(|medication| medication.id == id)
            .map(MedicationView::from)
            .ok_or_else(|| not_found(id))
    }

    /// Adds a medication at the front of the list.
    pub async fn add(
        &self,
        session: &UserSession,
        form: MedicationForm,
    ) -> Result<Committed<MedicationView>, AppError> {
        let today = Local::now().date_naive();
        let repo = self.repository(session).await;

        let committed = repo
            .update(|state: &mut MedicationList| {
                let id = next_id(&state.medications, Utc::now().timestamp_millis());
                let medication = form
                    .into_medication(id, today)
                    .map_err(AppError::ValidationError)?;

                state.medications.insert(0, medication.clone());
                Ok::<_, AppError>(MedicationView::from(medication))
            })
            .await?;

        info!("Added medication {} for {}", committed.value.medication.id, session.user_id());
        Ok(committed)
    }

    /// Replaces a medication in place, keeping its id and position.
    pub async fn edit(
        &self,
        session: &UserSession,
        id: i64,
        form: MedicationForm,
    ) -> Result<Committed<MedicationView>, AppError> {
        let today = Local::now().date_naive();
        let repo = self.repository(session).await;

        let committed = repo
            .update(|state: &mut MedicationList| {
                let slot = state.medications
                    .iter_mut()
                    .find(|medication| medication.id == id)
                    .ok_or_else(|| not_found(id))?;

                let medication = form
                    .into_medication(id, today)
                    .map_err(AppError::ValidationError)?;

                *slot = medication.clone();
                Ok::<_, AppError>(MedicationView::from(medication))
            })
            .await?;

        debug!("Edited medication {} for {}", id, session.user_id());
        Ok(committed)
    }

    pub async fn delete(&self, session: &UserSession, id: i64) -> Result<Committed<()>, AppError> {
        let repo = self.repository(session).await;

        let committed = repo
            .update(|state: &mut MedicationList| {
                let before = state.medications.len();
                state.medications.retain(|medication| medication.id != id);

                if state.medications.len() == before {
                    return Err(not_found(id));
                }
                Ok(())
            })
            .await?;

        info!("Deleted medication {} for {}", id, session.user_id());
        Ok(committed)
    }

    pub async fn schedule(&self, session: &UserSession) -> Vec<ScheduleEntry> {
        let state = self.repository(session).await.snapshot().await;
        self.schedule.build(&state.medications)
    }

    pub async fn upcoming(&self, session: &UserSession, now_minutes: u32) -> Vec<ScheduleEntry> {
        let state = self.repository(session).await.snapshot().await;
        self.schedule.upcoming(&state.medications, now_minutes)
    }

    pub async fn summary(
        &self,
        session: &UserSession,
        today: NaiveDate,
        now_minutes: u32,
    ) -> MedicationSummary {
        let state = self.repository(session).await.snapshot().await;
        summarize(&self.schedule, &state.medications, today, now_minutes)
    }
}

pub fn summarize(
    schedule: &ScheduleBuilder,
    medications: &[Medication],
    today: NaiveDate,
    now_minutes: u32,
) -> MedicationSummary {
    let count = |status: MedicationStatus| {
        medications.iter().filter(|medication| medication.status() == status).count()
    };

    MedicationSummary {
        total: medications.len(),
        active: count(MedicationStatus::Active),
        low_stock: count(MedicationStatus::Low),
        as_needed: count(MedicationStatus::Prn),
        upcoming: schedule.upcoming(medications, now_minutes),
        refills_due: refills_due(medications, today),
    }
}

/// Medications whose refill date is at most [`REFILL_WINDOW_DAYS`] away,
/// overdue ones included, soonest first.
pub fn refills_due(medications: &[Medication], today: NaiveDate) -> Vec<RefillReminder> {
    let mut due: Vec<RefillReminder> = medications
        .iter()
        .filter_map(|medication| {
            let refill_date = medication.refill_date?;
            let days_until = (refill_date - today).num_days();
            (days_until <= REFILL_WINDOW_DAYS).then(|| RefillReminder {
                medication_id: medication.id,
                medication_name: medication.name.clone(),
                refill_date,
                days_until,
            })
        })
        .collect();

    due.sort_by_key(|reminder| reminder.days_until);
    due
}

/// Millisecond timestamps as ids; bumped past the largest id on collision.
fn next_id(medications: &[Medication], candidate: i64) -> i64 {
    if medications.iter().any(|medication| medication.id == candidate) {
        medications.iter().map(|medication| medication.id).max().unwrap_or(candidate) + 1
    } else {
        candidate
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Medication {} not found", id))
}
