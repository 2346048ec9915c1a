use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shared_database::DocumentSlice;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub phone: String,
}

/// Personal details, stored on the user document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Derived from `birth_date` on save.
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContact>,
}

impl DocumentSlice for PersonalDetails {
    const CACHE_KEY: &'static str = "personal_details";
    const COLLECTION: &'static str = "users";
}

impl PersonalDetails {
    /// Upper-cased first letters of the first and last name.
    pub fn initials(&self) -> String {
        [&self.first_name, &self.last_name]
            .iter()
            .filter_map(|part| part.trim().chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyHistoryEntry {
    #[serde(default)]
    pub relation: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub risk: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelinePrediction {
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub risk: String,
}

/// Family history and risk profile, kept in its own document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalProfile {
    #[serde(default)]
    pub family_history: Vec<FamilyHistoryEntry>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub timeline_predictions: Vec<TimelinePrediction>,
    #[serde(default)]
    pub lifestyle: Vec<String>,
    #[serde(default)]
    pub preventive_care: Vec<String>,
    /// Ordered so cached output is stable.
    #[serde(default)]
    pub what_if_scenarios: BTreeMap<String, String>,
}

impl DocumentSlice for MedicalProfile {
    const CACHE_KEY: &'static str = "medical_profile";
    const COLLECTION: &'static str = "medical_history";
}

/// Everything the profile page saves in one go.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContact>,
    #[serde(default)]
    pub medical: MedicalProfile,
}

impl ProfileForm {
    pub fn personal_details(&self, today: NaiveDate) -> PersonalDetails {
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        let name = if last_name.is_empty() {
            first_name.clone()
        } else {
            format!("{} {}", first_name, last_name).trim().to_string()
        };

        PersonalDetails {
            name,
            age: compute_age(&self.birth_date, today),
            first_name,
            last_name,
            gender: self.gender.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            birth_date: self.birth_date.clone(),
            address: self.address.clone(),
            emergency_contacts: self.emergency_contacts.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub personal: PersonalDetails,
    pub initials: String,
    pub medical: MedicalProfile,
}

impl ProfileView {
    pub fn new(personal: PersonalDetails, medical: MedicalProfile) -> Self {
        let initials = personal.initials();
        Self { personal, initials, medical }
    }
}

/// Age in whole calendar years. `None` for a missing, unparseable or
/// future birth date. Timestamps are accepted; only the date part is read.
pub fn compute_age(birth_date: &str, today: NaiveDate) -> Option<u32> {
    let raw = birth_date.trim();
    let prefix = raw.get(..10).unwrap_or(raw);
    let born = NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()?;
    today.years_since(born)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_counts_whole_years() {
        let today = date(2024, 5, 1);

        assert_eq!(compute_age("1990-05-01", today), Some(34));
        assert_eq!(compute_age("1990-05-02", today), Some(33));
        assert_eq!(compute_age("1990-04-30T23:00:00Z", today), Some(34));
        assert_eq!(compute_age("2024-05-01", today), Some(0));
    }

    #[test]
    fn test_age_is_none_for_bad_dates() {
        let today = date(2024, 5, 1);

        assert_eq!(compute_age("", today), None);
        assert_eq!(compute_age("05/01/1990", today), None);
        assert_eq!(compute_age("2030-01-01", today), None);
    }

    #[test]
    fn test_name_is_built_from_parts() {
        let today = date(2024, 5, 1);
        let form = ProfileForm {
            first_name: " Ada ".into(),
            last_name: "  ".into(),
            ..ProfileForm::default()
        };
        assert_eq!(form.personal_details(today).name, "Ada");

        let form = ProfileForm {
            first_name: "Ada".into(),
            last_name: " Lovelace".into(),
            birth_date: "1815-12-10".into(),
            ..ProfileForm::default()
        };
        let personal = form.personal_details(today);
        assert_eq!(personal.name, "Ada Lovelace");
        assert_eq!(personal.last_name, "Lovelace");
        assert_eq!(personal.age, Some(208));
        assert_eq!(personal.initials(), "AL");
    }

    #[test]
    fn test_what_if_scenarios_serialize_in_key_order() {
        let profile: MedicalProfile = serde_json::from_value(json!({
            "whatIfScenarios": { "smoking": "higher risk", "exercise": "lower risk" },
            "familyHistory": [{ "relation": "Father", "condition": "Diabetes", "risk": 40 }]
        })).unwrap();

        let raw = serde_json::to_string(&profile.what_if_scenarios).unwrap();
        assert_eq!(raw, r#"{"exercise":"lower risk","smoking":"higher risk"}"#);
        assert_eq!(profile.family_history[0].risk, 40.0);
    }
}
