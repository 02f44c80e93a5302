//! Typed schemas for the payment workflow entity sets.
//!
//! Field names follow the service metadata exactly, so the structs double as
//! the validated boundary for both reads and deep-create writes.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::amount::Amount;
use crate::config::Role;

/// OData v2 collection wrapper (`{ "results": [...] }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ODataList<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Default for ODataList<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
        }
    }
}

impl<T> From<Vec<T>> for ODataList<T> {
    fn from(results: Vec<T>) -> Self {
        Self { results }
    }
}

/// Overall state of a payment approval request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OverallStatus {
    #[default]
    Pending,
    PmApproved,
    HodApproved,
    CfoApproved,
    AuditorApproved,
    DirectorApproved,
    Approved,
    Rejected,
    Other(String),
}

impl OverallStatus {
    pub fn code(&self) -> &str {
        match self {
            OverallStatus::Pending => "PENDING",
            OverallStatus::PmApproved => "PM_APPR",
            OverallStatus::HodApproved => "HOD_APPR",
            OverallStatus::CfoApproved => "CFO_APPR",
            OverallStatus::AuditorApproved => "AUD_APPR",
            OverallStatus::DirectorApproved => "DIR_APPR",
            OverallStatus::Approved => "APPROVED",
            OverallStatus::Rejected => "REJECTED",
            OverallStatus::Other(code) => code,
        }
    }
}

impl From<String> for OverallStatus {
    fn from(code: String) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "" | "PENDING" => OverallStatus::Pending,
            "PM_APPR" => OverallStatus::PmApproved,
            "HOD_APPR" => OverallStatus::HodApproved,
            "CFO_APPR" => OverallStatus::CfoApproved,
            "AUD_APPR" => OverallStatus::AuditorApproved,
            "DIR_APPR" => OverallStatus::DirectorApproved,
            "APPROVED" => OverallStatus::Approved,
            "REJECTED" => OverallStatus::Rejected,
            _ => OverallStatus::Other(code),
        }
    }
}

impl From<OverallStatus> for String {
    fn from(status: OverallStatus) -> Self {
        status.code().to_string()
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Key fields sometimes arrive as numbers in fixtures; accept both.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!("expected string key, got {other}"))),
    }
}

/// Payment header entity (`PaymentHeaderSet`), optionally carrying its items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HeaderRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub approval_no: String,
    pub created_on: Option<String>,
    pub profit_center: String,
    pub profit_center_name: String,
    pub vendor_code: String,
    pub vendor_name: String,
    pub company_code: String,
    pub created_by: String,
    pub creation_time: Option<String>,
    pub overall_status: OverallStatus,

    pub gross_amount: Amount,
    pub base_amount: Amount,
    #[serde(rename = "GSTAmount")]
    pub gst_amount: Amount,
    #[serde(rename = "TDSAmount")]
    pub tds_amount: Amount,
    pub total_liability: Amount,
    #[serde(rename = "GST2AReflected")]
    pub gst2a_reflected: Amount,
    #[serde(rename = "GST2ANotReflected")]
    pub gst2a_not_reflected: Amount,
    pub amount_claimed: Amount,
    pub proposed_amount: Amount,

    #[serde(rename = "PMApprovedAmount")]
    pub pm_approved_amount: Amount,
    #[serde(rename = "HODApprovedAmount")]
    pub hod_approved_amount: Amount,
    #[serde(rename = "CFOApprovedAmount")]
    pub cfo_approved_amount: Amount,
    pub auditor_approved_amount: Amount,
    pub director_approved_amount: Amount,

    pub to_items: ODataList<ItemRecord>,
}

/// One approval level's decision on a line item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleApproval {
    pub amount: Amount,
    pub user_id: String,
    pub status: String,
    pub on: Option<String>,
    pub remarks: String,
}

/// Payment line item entity (`PaymentItemSet`, nested as `ToItems`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ItemRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub approval_no: String,
    pub profit_center: String,
    pub tax_num: String,
    pub profit_center_name: String,
    pub bank_key: String,
    pub vendor_code: String,
    pub vendor_name: String,
    pub doc_num: String,
    #[serde(deserialize_with = "string_or_number")]
    pub item_num: String,
    pub liab_head: String,
    pub reference_doc: String,
    pub purch_doc: String,
    pub doc_date: Option<String>,
    pub posting_dt: Option<String>,

    pub gross_amt: Amount,
    pub base_amt: Amount,
    pub gst_amt: Amount,
    pub tds_amount: Amount,
    pub total_liability: Amount,
    pub gst2a_ref: Amount,
    pub gst2a_nref: Amount,
    pub amt_claimed: Amount,
    pub aprno_ref: String,
    pub proposed_amt: Amount,

    pub currency: String,
    pub gstr1_details: String,
    pub remark: String,

    pub account_holder: String,
    pub account_number: String,
    pub bank_name: String,
    pub branch: String,

    pub pm_appr_amt: Amount,
    pub pm_user_id: String,
    pub pm_appr_status: String,
    pub pm_appr_on: Option<String>,
    pub pm_appr_remarks: String,

    pub hod_appr_amt: Amount,
    pub hod_user_id: String,
    pub hod_appr_status: String,
    pub hod_appr_on: Option<String>,
    pub hod_appr_remarks: String,

    pub cfo_appr_amt: Amount,
    pub cfo_user_id: String,
    pub cfo_appr_status: String,
    pub cfo_appr_on: Option<String>,
    pub cfo_appr_remarks: String,

    pub aud_appr_amt: Amount,
    pub aud_user_id: String,
    pub aud_appr_status: String,
    pub aud_appr_on: Option<String>,
    pub aud_appr_remarks: String,

    pub dir_appr_amt: Amount,
    pub dir_user_id: String,
    pub dir_appr_status: String,
    pub dir_appr_on: Option<String>,
    pub dir_appr_remarks: String,

    pub mode_of_payment: String,
    pub utr_no: String,
    pub paid_amount1: Amount,
    pub payment_date1: Option<String>,
    pub paid_amount2: Amount,
    pub payment_date2: Option<String>,
    pub total_bal_out: Amount,
    pub balance_payable: Amount,
}

impl ItemRecord {
    /// Snapshot of the fields owned by one approval level.
    pub fn approval(&self, role: Role) -> RoleApproval {
        let (amount, user_id, status, on, remarks) = match role {
            Role::ProjectManager => (
                self.pm_appr_amt,
                &self.pm_user_id,
                &self.pm_appr_status,
                &self.pm_appr_on,
                &self.pm_appr_remarks,
            ),
            Role::Hod => (
                self.hod_appr_amt,
                &self.hod_user_id,
                &self.hod_appr_status,
                &self.hod_appr_on,
                &self.hod_appr_remarks,
            ),
            Role::Cfo => (
                self.cfo_appr_amt,
                &self.cfo_user_id,
                &self.cfo_appr_status,
                &self.cfo_appr_on,
                &self.cfo_appr_remarks,
            ),
            Role::Auditor => (
                self.aud_appr_amt,
                &self.aud_user_id,
                &self.aud_appr_status,
                &self.aud_appr_on,
                &self.aud_appr_remarks,
            ),
            Role::Director => (
                self.dir_appr_amt,
                &self.dir_user_id,
                &self.dir_appr_status,
                &self.dir_appr_on,
                &self.dir_appr_remarks,
            ),
        };
        RoleApproval {
            amount,
            user_id: user_id.clone(),
            status: status.clone(),
            on: on.clone(),
            remarks: remarks.clone(),
        }
    }

    /// Overwrite every field owned by one approval level.
    pub fn set_approval(&mut self, role: Role, approval: RoleApproval) {
        let RoleApproval {
            amount,
            user_id,
            status,
            on,
            remarks,
        } = approval;
        match role {
            Role::ProjectManager => {
                self.pm_appr_amt = amount;
                self.pm_user_id = user_id;
                self.pm_appr_status = status;
                self.pm_appr_on = on;
                self.pm_appr_remarks = remarks;
            }
            Role::Hod => {
                self.hod_appr_amt = amount;
                self.hod_user_id = user_id;
                self.hod_appr_status = status;
                self.hod_appr_on = on;
                self.hod_appr_remarks = remarks;
            }
            Role::Cfo => {
                self.cfo_appr_amt = amount;
                self.cfo_user_id = user_id;
                self.cfo_appr_status = status;
                self.cfo_appr_on = on;
                self.cfo_appr_remarks = remarks;
            }
            Role::Auditor => {
                self.aud_appr_amt = amount;
                self.aud_user_id = user_id;
                self.aud_appr_status = status;
                self.aud_appr_on = on;
                self.aud_appr_remarks = remarks;
            }
            Role::Director => {
                self.dir_appr_amt = amount;
                self.dir_user_id = user_id;
                self.dir_appr_status = status;
                self.dir_appr_on = on;
                self.dir_appr_remarks = remarks;
            }
        }
    }

    pub fn approved_amount_mut(&mut self, role: Role) -> &mut Amount {
        match role {
            Role::ProjectManager => &mut self.pm_appr_amt,
            Role::Hod => &mut self.hod_appr_amt,
            Role::Cfo => &mut self.cfo_appr_amt,
            Role::Auditor => &mut self.aud_appr_amt,
            Role::Director => &mut self.dir_appr_amt,
        }
    }

    pub fn remarks(&self, role: Role) -> &str {
        match role {
            Role::ProjectManager => &self.pm_appr_remarks,
            Role::Hod => &self.hod_appr_remarks,
            Role::Cfo => &self.cfo_appr_remarks,
            Role::Auditor => &self.aud_appr_remarks,
            Role::Director => &self.dir_appr_remarks,
        }
    }

    pub fn remarks_mut(&mut self, role: Role) -> &mut String {
        match role {
            Role::ProjectManager => &mut self.pm_appr_remarks,
            Role::Hod => &mut self.hod_appr_remarks,
            Role::Cfo => &mut self.cfo_appr_remarks,
            Role::Auditor => &mut self.aud_appr_remarks,
            Role::Director => &mut self.dir_appr_remarks,
        }
    }
}

/// Row of `UserApprovalLevelSet`, used to verify who is signed in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserApprovalLevel {
    pub user_name: String,
    pub approval_level: String,
}

/// Decode a collection response in either the verbose `{"d": {...}}` form or
/// the bare `{"results": [...]}` form.
pub fn parse_collection<T>(body: &str) -> crate::Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let mut value: serde_json::Value = serde_json::from_str(body)?;
    if let Some(inner) = value.get_mut("d") {
        value = inner.take();
    }
    match value {
        serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
        serde_json::Value::Object(_) if value.get("results").is_some() => {
            let list: ODataList<T> = serde_json::from_value(value)?;
            Ok(list.results)
        }
        _ => Err(crate::PayflowError::MalformedResponse(
            "expected a collection with a 'results' array".to_string(),
        )),
    }
}
