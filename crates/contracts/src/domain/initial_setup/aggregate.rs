use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The operating company's own profile, printed as the "from" party on every
/// rendered consignment note. Saving with an id updates that row; saving
/// without one appends a new row, and readers take the latest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InitialSetup {
    #[serde(default)]
    pub id: i64,
    pub company_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub gstin: String,
    #[serde(default)]
    pub footnote: String,
    #[serde(default)]
    pub mobile: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
