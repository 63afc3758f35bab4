use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A consignor/consignee company. Shared reference data: many consignment
/// notes (and many addresses) point at one company row. Deduplicated by GSTIN
/// when one is present; without a GSTIN every payload produces a fresh row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Company {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A company's address on file, the live address book. Deduplicated by exact
/// match on (company, address line, city, state, pincode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CompanyAddress {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub company_id: i64,
    pub address_line: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A point-in-time copy of an address as attached to one consignment note.
/// Lives independently of [`CompanyAddress`]: editing a company's address book
/// must never change what an already-issued note printed. The company
/// back-reference exists only so orphan cleanup can find the book twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AddressSnapshot {
    #[serde(default)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
    pub address_line: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AddressSnapshot {
    /// Field-for-field address comparison (ids and timestamps excluded).
    /// This decides whether a note's address actually changed on update.
    pub fn same_address(&self, other: &AddressSnapshot) -> bool {
        self.address_line == other.address_line
            && self.city == other.city
            && self.state == other.state
            && self.pincode == other.pincode
    }
}
