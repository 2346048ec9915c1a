use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shared_database::DocumentSlice;

/// Remaining-count at or below which a scheduled medication is low on stock.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

pub const DEFAULT_DOSAGE: &str = "As directed";
pub const DEFAULT_TIME_SLOT: &str = "8:00 AM";
pub const AS_NEEDED_TIME: &str = "When required";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    Once,
    Twice,
    Three,
    Four,
    #[default]
    AsNeeded,
}

impl Frequency {
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Once => "Once daily",
            Frequency::Twice => "Twice daily",
            Frequency::Three => "Three times daily",
            Frequency::Four => "Four times daily",
            Frequency::AsNeeded => "As needed",
        }
    }

    pub fn doses_per_day(&self) -> usize {
        match self {
            Frequency::Once => 1,
            Frequency::Twice => 2,
            Frequency::Three => 3,
            Frequency::Four => 4,
            Frequency::AsNeeded => 0,
        }
    }

    pub fn is_as_needed(&self) -> bool {
        matches!(self, Frequency::AsNeeded)
    }

    /// Accepts display labels and short form codes, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "once" | "once daily" => Some(Frequency::Once),
            "twice" | "twice daily" => Some(Frequency::Twice),
            "three" | "three times daily" => Some(Frequency::Three),
            "four" | "four times daily" => Some(Frequency::Four),
            "asneeded" | "as-needed" | "as needed" => Some(Frequency::AsNeeded),
            _ => None,
        }
    }
}

// Unrecognised frequencies fall back to as-needed.
impl From<String> for Frequency {
    fn from(raw: String) -> Self {
        Frequency::parse(&raw).unwrap_or_default()
    }
}

impl From<Frequency> for String {
    fn from(frequency: Frequency) -> Self {
        frequency.label().to_string()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicationStatus {
    Active,
    Low,
    Prn,
}

impl MedicationStatus {
    pub fn derive(frequency: Frequency, remaining_count: u32) -> Self {
        if frequency.is_as_needed() {
            MedicationStatus::Prn
        } else if remaining_count <= LOW_STOCK_THRESHOLD {
            MedicationStatus::Low
        } else {
            MedicationStatus::Active
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MedicationStatus::Active => "Active",
            MedicationStatus::Low => "Low Stock",
            MedicationStatus::Prn => "As Needed",
        }
    }
}

/// A medication as stored in the user document. `status` is not stored;
/// see [`Medication::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: Frequency,
    /// Comma-joined slots, kept for documents that predate `timeSlots`.
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub time_slots: Vec<String>,
    #[serde(rename = "reminders", default)]
    pub reminders_enabled: bool,
    #[serde(rename = "remaining", default, with = "lenient_count")]
    pub remaining_count: u32,
    #[serde(default, with = "date_prefix")]
    pub refill_date: Option<NaiveDate>,
}

impl Medication {
    pub fn status(&self) -> MedicationStatus {
        MedicationStatus::derive(self.frequency, self.remaining_count)
    }

    /// The slot list, or the legacy `time` string split on commas when the
    /// list is empty.
    pub fn effective_time_slots(&self) -> Vec<&str> {
        if !self.time_slots.is_empty() {
            return self.time_slots.iter().map(String::as_str).collect();
        }

        self.time
            .split(',')
            .map(str::trim)
            .filter(|slot| !slot.is_empty())
            .collect()
    }
}

/// The medication page's share of the user document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicationList {
    pub medications: Vec<Medication>,
}

impl DocumentSlice for MedicationList {
    const CACHE_KEY: &'static str = "medications_state";
    const COLLECTION: &'static str = "users";
}

/// Create/edit form. Everything but the name is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationForm {
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub time_slots: Vec<String>,
    #[serde(default)]
    pub reminders: bool,
    #[serde(default)]
    pub remaining: Option<i64>,
    #[serde(default)]
    pub refill_date: Option<NaiveDate>,
}

impl MedicationForm {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Medication name cannot be empty".to_string());
        }

        if let Some(remaining) = self.remaining {
            if remaining < 0 || remaining > i64::from(u32::MAX) {
                return Err("Remaining count must be zero or more".to_string());
            }
        }

        Ok(())
    }

    /// Builds the stored record, applying form defaults. As-needed
    /// medications never carry time slots.
    pub fn into_medication(self, id: i64, today: NaiveDate) -> Result<Medication, String> {
        self.validate()?;

        let frequency = self.frequency.unwrap_or_default();
        let time_slots: Vec<String> = if frequency.is_as_needed() {
            Vec::new()
        } else {
            let slots: Vec<String> = self.time_slots
                .iter()
                .map(|slot| slot.trim())
                .filter(|slot| !slot.is_empty())
                .take(frequency.doses_per_day())
                .map(str::to_string)
                .collect();

            if slots.is_empty() {
                vec![DEFAULT_TIME_SLOT.to_string()]
            } else {
                slots
            }
        };

        let time = if time_slots.is_empty() {
            AS_NEEDED_TIME.to_string()
        } else {
            time_slots.join(", ")
        };

        let dosage = self.dosage
            .as_deref()
            .map(str::trim)
            .filter(|dosage| !dosage.is_empty())
            .unwrap_or(DEFAULT_DOSAGE)
            .to_string();

        Ok(Medication {
            id,
            name: self.name.trim().to_string(),
            dosage,
            frequency,
            time,
            time_slots,
            reminders_enabled: self.reminders,
            remaining_count: self.remaining.unwrap_or(0) as u32,
            refill_date: Some(self.refill_date.unwrap_or(today)),
        })
    }
}

/// API representation: the stored record plus its derived status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationView {
    #[serde(flatten)]
    pub medication: Medication,
    pub status: MedicationStatus,
}

impl From<Medication> for MedicationView {
    fn from(medication: Medication) -> Self {
        let status = medication.status();
        Self { medication, status }
    }
}

/// One dose on the daily schedule. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub medication_id: i64,
    pub medication_name: String,
    pub time: String,
    pub dosage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefillReminder {
    pub medication_id: i64,
    pub medication_name: String,
    pub refill_date: NaiveDate,
    /// Negative when the refill is overdue.
    pub days_until: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationSummary {
    pub total: usize,
    pub active: usize,
    pub low_stock: usize,
    pub as_needed: usize,
    pub upcoming: Vec<ScheduleEntry>,
    pub refills_due: Vec<RefillReminder>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpcomingQuery {
    /// "H:MM AM/PM"; defaults to the server's local time.
    pub now: Option<String>,
}

/// Refill dates are written as `YYYY-MM-DD`. On read only the first ten
/// characters are considered, so full timestamps are accepted; anything
/// unparseable reads as no date.
mod date_prefix {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|raw| {
            let prefix = raw.get(..10).unwrap_or(&raw);
            NaiveDate::parse_from_str(prefix, FORMAT).ok()
        }))
    }
}

/// Remaining counts are written as whole non-negative numbers. On read any
/// JSON number or numeric string is accepted: fractions are truncated,
/// negatives clamp to zero, anything else reads as zero.
mod lenient_count {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(count: &u32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(*count)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = match Value::deserialize(deserializer)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };

        Ok(match raw {
            Some(count) if count.is_finite() && count > 0.0 => count.trunc().min(f64::from(u32::MAX)) as u32,
            _ => 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(MedicationStatus::derive(Frequency::Once, 10), MedicationStatus::Low);
        assert_eq!(MedicationStatus::derive(Frequency::Once, 11), MedicationStatus::Active);
        assert_eq!(MedicationStatus::derive(Frequency::Four, 0), MedicationStatus::Low);
        assert_eq!(MedicationStatus::derive(Frequency::AsNeeded, 0), MedicationStatus::Prn);
        assert_eq!(MedicationStatus::derive(Frequency::AsNeeded, 500), MedicationStatus::Prn);
    }

    #[test]
    fn test_status_derivation_is_idempotent() {
        for frequency in [Frequency::Once, Frequency::Twice, Frequency::Three, Frequency::Four, Frequency::AsNeeded] {
            for remaining in [0, 9, 10, 11, 1000] {
                let first = MedicationStatus::derive(frequency, remaining);
                assert_eq!(first, MedicationStatus::derive(frequency, remaining));
            }
        }
    }

    #[test]
    fn test_frequency_accepts_labels_and_codes() {
        let parsed: Vec<Frequency> = serde_json::from_value(json!([
            "Once daily", "twice", "Three times daily", "four", "asneeded", "as-needed", "every full moon"
        ])).unwrap();

        assert_eq!(parsed, vec![
            Frequency::Once,
            Frequency::Twice,
            Frequency::Three,
            Frequency::Four,
            Frequency::AsNeeded,
            Frequency::AsNeeded,
            Frequency::AsNeeded,
        ]);
        assert_eq!(serde_json::to_value(Frequency::Twice).unwrap(), json!("Twice daily"));
    }

    #[test]
    fn test_medication_reads_stored_document_shape() {
        let medication: Medication = serde_json::from_value(json!({
            "id": 2,
            "name": "Metformin",
            "dosage": "500mg",
            "frequency": "Twice daily",
            "time": "8:00 AM, 8:00 PM",
            "timeSlots": ["8:00 AM", "8:00 PM"],
            "reminders": true,
            "remaining": 45,
            "refillDate": "2024-02-20T10:11:12.000Z",
            "status": "low"
        })).unwrap();

        assert_eq!(medication.refill_date, NaiveDate::from_ymd_opt(2024, 2, 20));
        assert!(medication.reminders_enabled);
        // Stored status is ignored in favour of the derived one.
        assert_eq!(medication.status(), MedicationStatus::Active);

        let written = serde_json::to_value(&medication).unwrap();
        assert_eq!(written["refillDate"], "2024-02-20");
        assert!(written.get("status").is_none());
    }

    #[test]
    fn test_out_of_range_remaining_does_not_drop_the_list() {
        let list: MedicationList = serde_json::from_value(json!({
            "medications": [
                { "id": 1, "name": "A", "frequency": "Once daily", "remaining": -1 },
                { "id": 2, "name": "B", "remaining": 2.5 },
                { "id": 3, "name": "C", "remaining": "12" },
                { "id": 4, "name": "D", "remaining": null },
                { "id": 5, "name": "E", "remaining": 1e12 }
            ]
        })).unwrap();

        let counts: Vec<u32> = list.medications.iter().map(|m| m.remaining_count).collect();
        assert_eq!(counts, vec![0, 2, 12, 0, u32::MAX]);
        assert_eq!(list.medications[0].status(), MedicationStatus::Low);

        let written = serde_json::to_value(&list.medications[1]).unwrap();
        assert_eq!(written["remaining"], 2);
    }

    #[test]
    fn test_legacy_time_string_is_split() {
        let medication: Medication = serde_json::from_value(json!({
            "id": 7,
            "name": "Legacy",
            "frequency": "Twice daily",
            "time": " 9:00 AM ,, 9:00 PM"
        })).unwrap();

        assert_eq!(medication.effective_time_slots(), vec!["9:00 AM", "9:00 PM"]);
        assert_eq!(medication.refill_date, None);
    }

    #[test]
    fn test_form_requires_name() {
        let form = MedicationForm { name: "   ".into(), ..MedicationForm::default() };
        assert!(form.into_medication(1, today()).is_err());
    }

    #[test]
    fn test_form_rejects_negative_remaining() {
        let form = MedicationForm { name: "X".into(), remaining: Some(-1), ..MedicationForm::default() };
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_form_defaults() {
        let medication = MedicationForm {
            name: "  Lisinopril ".into(),
            frequency: Some(Frequency::Once),
            ..MedicationForm::default()
        }
        .into_medication(42, today())
        .unwrap();

        assert_eq!(medication.id, 42);
        assert_eq!(medication.name, "Lisinopril");
        assert_eq!(medication.dosage, DEFAULT_DOSAGE);
        assert_eq!(medication.time_slots, vec![DEFAULT_TIME_SLOT.to_string()]);
        assert_eq!(medication.time, DEFAULT_TIME_SLOT);
        assert_eq!(medication.remaining_count, 0);
        assert_eq!(medication.refill_date, Some(today()));
    }

    #[test]
    fn test_form_as_needed_has_no_slots() {
        let medication = MedicationForm {
            name: "Aspirin".into(),
            frequency: Some(Frequency::AsNeeded),
            time_slots: vec!["8:00 AM".into()],
            remaining: Some(100),
            ..MedicationForm::default()
        }
        .into_medication(4, today())
        .unwrap();

        assert!(medication.time_slots.is_empty());
        assert_eq!(medication.time, AS_NEEDED_TIME);
        assert_eq!(medication.status(), MedicationStatus::Prn);
    }

    #[test]
    fn test_form_truncates_slots_to_doses_per_day() {
        let medication = MedicationForm {
            name: "Metformin".into(),
            frequency: Some(Frequency::Twice),
            time_slots: vec![" 8:00 AM".into(), "".into(), "8:00 PM ".into(), "11:00 PM".into()],
            ..MedicationForm::default()
        }
        .into_medication(2, today())
        .unwrap();

        assert_eq!(medication.time_slots, vec!["8:00 AM".to_string(), "8:00 PM".to_string()]);
        assert_eq!(medication.time, "8:00 AM, 8:00 PM");
    }

    #[test]
    fn test_view_includes_status() {
        let view = MedicationView::from(
            MedicationForm { name: "D3".into(), frequency: Some(Frequency::Once), remaining: Some(8), ..MedicationForm::default() }
                .into_medication(3, today())
                .unwrap(),
        );

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "low");
        assert_eq!(json["name"], "D3");
    }
}
