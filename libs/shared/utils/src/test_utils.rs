use std::sync::Arc;

use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_database::{DocumentRef, DocumentStore, InMemoryDocumentStore, MemoryCache, SyncContext};

/// In-memory document store and cache wired the way the API wires the real
/// ones. Subscriptions are off so tests stay deterministic.
pub struct TestContext {
    pub config: AppConfig,
    pub store: Arc<InMemoryDocumentStore>,
    pub cache: Arc<MemoryCache>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self {
            config: AppConfig {
                remote_poll_interval_secs: 0,
                ..AppConfig::default()
            },
            store: Arc::new(InMemoryDocumentStore::new()),
            cache: Arc::new(MemoryCache::new()),
        }
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.config.clone())
    }

    pub fn sync_context(&self) -> SyncContext {
        SyncContext::new(self.store.clone(), self.cache.clone())
            .with_policy(self.config.conflict_policy)
    }

    /// Merge-writes `fields` straight into the store, as another device would.
    pub async fn seed_document(&self, collection: &str, user_id: &str, fields: Value) {
        let fields = fields.as_object().cloned().unwrap_or_default();
        self.store
            .merge(&DocumentRef::new(collection, user_id), fields)
            .await
            .expect("in-memory merge cannot fail for a non-empty id");
    }

    pub async fn remote_document(&self, collection: &str, user_id: &str) -> Option<Value> {
        self.store
            .load(&DocumentRef::new(collection, user_id))
            .await
            .expect("in-memory load cannot fail")
    }
}

pub struct MockDocuments;

impl MockDocuments {
    pub fn medications() -> Value {
        json!({
            "medications": [
                {
                    "id": 1,
                    "name": "Lisinopril",
                    "dosage": "10mg",
                    "frequency": "Once daily",
                    "time": "8:00 AM",
                    "timeSlots": ["8:00 AM"],
                    "reminders": true,
                    "remaining": 25,
                    "refillDate": "2024-02-15",
                    "status": "active"
                },
                {
                    "id": 2,
                    "name": "Metformin",
                    "dosage": "500mg",
                    "frequency": "Twice daily",
                    "time": "8:00 AM, 8:00 PM",
                    "timeSlots": ["8:00 AM", "8:00 PM"],
                    "reminders": true,
                    "remaining": 45,
                    "refillDate": "2024-02-20",
                    "status": "active"
                },
                {
                    "id": 3,
                    "name": "Vitamin D3",
                    "dosage": "1000 IU",
                    "frequency": "Once daily",
                    "time": "8:00 AM",
                    "timeSlots": ["8:00 AM"],
                    "reminders": true,
                    "remaining": 8,
                    "refillDate": "2024-01-25",
                    "status": "low"
                },
                {
                    "id": 4,
                    "name": "Aspirin",
                    "dosage": "81mg",
                    "frequency": "As needed",
                    "time": "When required",
                    "timeSlots": [],
                    "reminders": false,
                    "remaining": 100,
                    "refillDate": "2024-03-01",
                    "status": "prn"
                }
            ]
        })
    }

    pub fn medical_history() -> Value {
        json!({
            "conditions": [
                { "name": "Hypertension", "diagnosed": "2020-03-15", "status": "Active", "severity": "Moderate" }
            ],
            "allergies": [
                { "allergen": "Penicillin", "reaction": "Skin rash", "severity": "Moderate" },
                { "allergen": "Peanuts", "reaction": "Breathing difficulty", "severity": "Severe" }
            ],
            "prescriptions": [
                { "medication": "Lisinopril", "dosage": "10mg daily", "prescribed": "2023-01-15", "prescriber": "Dr. Smith" }
            ],
            "documents": [
                { "name": "Blood Test Results", "date": "2024-01-15", "type": "Lab Report", "imageData": null }
            ]
        })
    }

    pub fn personal_details() -> Value {
        json!({
            "name": "John Doe",
            "firstName": "John",
            "lastName": "Doe",
            "age": 34,
            "gender": "Male",
            "email": "john@example.com",
            "phone": "+1 555 0100",
            "birthDate": "1990-05-01",
            "address": "1 Main St",
            "emergencyContacts": [
                { "name": "Jane Doe", "relationship": "Spouse", "phone": "+1 555 0101" }
            ]
        })
    }
}
