use chrono::{DateTime, Utc};

use super::dates::DateEncoding;
use super::ActionKind;
use crate::config::Role;
use crate::error::{PayflowError, Result};
use crate::model::{Amount, HeaderRecord, ItemRecord, ODataList, OverallStatus, RoleApproval};

/// Body of the deep create: a header entity with its nested `ToItems`.
pub type DeepCreatePayload = HeaderRecord;

/// Placeholder `Edm.Time` the gateway accepts for a header it recomputes.
const NEUTRAL_CREATION_TIME: &str = "PT00H00M00S";

/// Turns a selection of line items into the payload the service accepts
/// for one approval decision.
#[derive(Debug, Clone, Copy)]
pub struct PayloadBuilder {
    role: Role,
    encoding: DateEncoding,
}

impl PayloadBuilder {
    pub fn new(role: Role, encoding: DateEncoding) -> Self {
        Self { role, encoding }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn encoding(&self) -> DateEncoding {
        self.encoding
    }

    /// Build the deep-create body for `items`, all of which belong to `header`.
    ///
    /// Identity fields come from the first item (falling back to the header
    /// for blanks); totals come from the header. Every item must share the
    /// first item's approval number.
    pub fn build(
        &self,
        header: &HeaderRecord,
        items: &[&ItemRecord],
        action: ActionKind,
        actor_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<DeepCreatePayload> {
        let first = items.first().ok_or(PayflowError::EmptyBatch)?;
        let approval_no = non_blank(&first.approval_no, &header.approval_no);
        let vendor_code = non_blank(&first.vendor_code, &header.vendor_code);

        if let Some(other) = items
            .iter()
            .map(|item| item.approval_no.trim())
            .find(|no| !no.is_empty() && *no != approval_no)
        {
            return Err(PayflowError::MixedBatch {
                first: approval_no,
                other: other.to_string(),
            });
        }

        let results = items
            .iter()
            .map(|item| self.item(item, &approval_no, &vendor_code, action, actor_id, timestamp))
            .collect();

        Ok(HeaderRecord {
            approval_no: approval_no.clone(),
            created_on: self.encode(header.created_on.as_deref()),
            profit_center: non_blank(&first.profit_center, &header.profit_center),
            profit_center_name: non_blank(&first.profit_center_name, &header.profit_center_name),
            vendor_code: vendor_code.clone(),
            vendor_name: non_blank(&first.vendor_name, &header.vendor_name),
            company_code: header.company_code.clone(),
            created_by: header.created_by.clone(),
            creation_time: Some(
                header
                    .creation_time
                    .clone()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| NEUTRAL_CREATION_TIME.to_string()),
            ),
            overall_status: self.overall_status(action),

            gross_amount: header.gross_amount,
            base_amount: header.base_amount,
            gst_amount: header.gst_amount,
            tds_amount: header.tds_amount,
            total_liability: header.total_liability,
            gst2a_reflected: header.gst2a_reflected,
            gst2a_not_reflected: header.gst2a_not_reflected,
            amount_claimed: header.amount_claimed,
            proposed_amount: header.proposed_amount,

            pm_approved_amount: header.pm_approved_amount,
            hod_approved_amount: header.hod_approved_amount,
            cfo_approved_amount: header.cfo_approved_amount,
            auditor_approved_amount: header.auditor_approved_amount,
            director_approved_amount: header.director_approved_amount,

            to_items: ODataList { results },
        })
    }

    fn overall_status(&self, action: ActionKind) -> OverallStatus {
        match (action, self.role) {
            (ActionKind::Reject, _) => OverallStatus::Rejected,
            (ActionKind::Approve, Role::ProjectManager) => OverallStatus::PmApproved,
            (ActionKind::Approve, Role::Hod) => OverallStatus::HodApproved,
            (ActionKind::Approve, Role::Cfo) => OverallStatus::CfoApproved,
            (ActionKind::Approve, Role::Auditor) => OverallStatus::AuditorApproved,
            (ActionKind::Approve, Role::Director) => OverallStatus::Approved,
        }
    }

    fn encode(&self, raw: Option<&str>) -> Option<String> {
        self.encoding.reencode(raw)
    }

    fn item(
        &self,
        source: &ItemRecord,
        approval_no: &str,
        vendor_code: &str,
        action: ActionKind,
        actor_id: &str,
        timestamp: DateTime<Utc>,
    ) -> ItemRecord {
        let mut item = ItemRecord {
            approval_no: approval_no.to_string(),
            vendor_code: vendor_code.to_string(),
            item_num: source.item_num.trim().to_string(),
            doc_date: self.encode(source.doc_date.as_deref()),
            posting_dt: self.encode(source.posting_dt.as_deref()),
            ..source.clone()
        };

        for role in Role::ALL {
            let approval = if role < self.role {
                let mut carried = source.approval(role);
                carried.on = self.encoding.reencode_timestamp(carried.on.as_deref());
                carried
            } else if role == self.role {
                let remarks = source.remarks(role).trim();
                RoleApproval {
                    amount: source.approval(role).amount,
                    user_id: actor_id.to_string(),
                    status: action.item_status().to_string(),
                    on: Some(self.encoding.encode_timestamp(timestamp)),
                    remarks: if remarks.is_empty() {
                        action.default_remarks().to_string()
                    } else {
                        remarks.to_string()
                    },
                }
            } else {
                RoleApproval::default()
            };
            item.set_approval(role, approval);
        }

        // Payment tracking belongs to treasury, never to an approval decision.
        item.mode_of_payment = String::new();
        item.utr_no = String::new();
        item.paid_amount1 = Amount::ZERO;
        item.payment_date1 = None;
        item.paid_amount2 = Amount::ZERO;
        item.payment_date2 = None;
        item.total_bal_out = Amount::ZERO;
        item.balance_payable = Amount::ZERO;

        item
    }
}

fn non_blank(preferred: &str, fallback: &str) -> String {
    let preferred = preferred.trim();
    if preferred.is_empty() {
        fallback.trim().to_string()
    } else {
        preferred.to_string()
    }
}
