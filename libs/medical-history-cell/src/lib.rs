// Medical History Cell - conditions, allergies, prescriptions and documents
pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{
    Allergy,
    Condition,
    ImageUpload,
    MedicalDocument,
    MedicalHistory,
    Prescription,
    RecordForm,
    RecordKind,
    RecordType,
};

pub use router::history_routes;
pub use services::history::MedicalHistoryService;
