mod dates;
mod payload;
mod session;

pub use dates::{parse_backend_date, DateEncoding};
pub use payload::{DeepCreatePayload, PayloadBuilder};
pub use session::{
    AmountEdit, ApprovalSession, Dialog, Notice, PendingSubmission, SessionState,
    SubmissionReceipt,
};

use std::fmt;

/// Decision an approver takes on the selected items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Approve,
    Reject,
}

impl ActionKind {
    pub fn verb(self) -> &'static str {
        match self {
            ActionKind::Approve => "approve",
            ActionKind::Reject => "reject",
        }
    }

    /// Per-item status written for the acting role.
    pub fn item_status(self) -> &'static str {
        match self {
            ActionKind::Approve => "APPROVED",
            ActionKind::Reject => "REJECTED",
        }
    }

    pub fn default_remarks(self) -> &'static str {
        match self {
            ActionKind::Approve => "Approved via bulk action",
            ActionKind::Reject => "Rejected via bulk action",
        }
    }

    pub fn dialog_title(self) -> &'static str {
        match self {
            ActionKind::Approve => "Approve Items",
            ActionKind::Reject => "Reject Items",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::Approve => "APPROVE",
            ActionKind::Reject => "REJECT",
        })
    }
}
