use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog entry shared across all patients. `tracker` counts the live
/// associations referencing this symptom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symptom {
    pub symptom_id: Uuid,
    pub symptom_name: String,
    pub tracker: i64,
}

/// Row in the history ⋈ symptom junction table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySymptom {
    pub history_symptom_id: Uuid,
    pub history_id: Uuid,
    pub symptom_id: Uuid,
}
