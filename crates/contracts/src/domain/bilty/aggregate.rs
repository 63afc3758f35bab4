use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::company::aggregate::{AddressSnapshot, Company};
use crate::domain::user::aggregate::AppUser;

/// Consignment-note lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BiltyStatus {
    #[default]
    Draft,
    Complete,
}

impl BiltyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiltyStatus::Draft => "draft",
            BiltyStatus::Complete => "complete",
        }
    }

    /// Lenient parse for values coming back from storage. Anything
    /// unrecognized falls back to draft.
    pub fn parse_str(value: &str) -> BiltyStatus {
        match value {
            "complete" => BiltyStatus::Complete,
            _ => BiltyStatus::Draft,
        }
    }
}

/// One goods line item. Owned strictly by its note: updates replace the whole
/// set and deleting the note removes every line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Goods {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub bilty_id: i64,
    pub particulars: String,
    #[serde(default)]
    pub num_of_pkts: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

/// The consignment note aggregate. Consignor/consignee sides are resolved
/// independently and either may be absent. Nested objects are hydrated on
/// reads; on writes they are payloads the engine resolves into the id fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bilty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub bilty_no: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consignor_company_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consignee_company_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consignor_address_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consignee_address_id: Option<i64>,
    #[serde(default)]
    pub from_location: String,
    #[serde(default)]
    pub to_location: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub to_pay: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inv_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvt_marks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permit_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_rupees: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hamali: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dd_charges: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_charges: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fov: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistical: Option<String>,
    #[serde(default)]
    pub created_by: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: BiltyStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consignor_company: Option<Company>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consignee_company: Option<Company>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consignor_address_snapshot: Option<AddressSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consignee_address_snapshot: Option<AddressSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_user: Option<AppUser>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goods: Vec<Goods>,
}

impl Bilty {
    /// Creator id after falling back to the nested user payload. Zero means
    /// no creator could be resolved.
    pub fn resolved_created_by(&self) -> i64 {
        if self.created_by != 0 {
            return self.created_by;
        }
        self.created_by_user.as_ref().map(|u| u.id).unwrap_or(0)
    }

    /// A rendered document is stale once the note changed after it was
    /// produced, or when none has been produced yet.
    pub fn needs_render(&self) -> bool {
        match self.pdf_created_at {
            None => true,
            Some(rendered_at) => self
                .updated_at
                .map(|updated| updated > rendered_at)
                .unwrap_or(false),
        }
    }
}

/// Payload recording a completed document render against a note.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderedDocument {
    pub path: String,
    #[serde(default)]
    pub rendered_at: Option<DateTime<Utc>>,
}
