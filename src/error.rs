use std::path::PathBuf;
use thiserror::Error;

use crate::approval::ActionKind;

#[derive(Error, Debug)]
pub enum PayflowError {
    #[error("Config directory not found at {0}. Run 'payflow init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Not logged in. Run 'payflow login' first.")]
    NotLoggedIn,

    #[error("User verification data not found")]
    UserNotVerified,

    #[error("No approval role configured for approval level '{0}'")]
    UnknownApprovalLevel(String),

    #[error("User verification requires a service connection. Use --user and --level.")]
    VerificationUnavailable,

    #[error("Please select items to {}", .0.verb())]
    NothingSelected(ActionKind),

    #[error("Node '{0}' not found in the approval tree")]
    NodeNotFound(String),

    #[error("Row {0} is outside the approval tree")]
    RowNotFound(usize),

    #[error("Invalid edit '{0}'. Expected 'REF=VALUE' (e.g., '0000000017/1=250.00')")]
    InvalidEdit(String),

    #[error("'{0}' is a header; only line items can be edited")]
    HeaderNotEditable(String),

    #[error("No approval dialog is open")]
    NoDialogOpen,

    #[error("A submission is already in progress")]
    SubmissionInFlight,

    #[error("No items to process")]
    EmptyBatch,

    #[error(
        "Please enter remarks for all items before rejecting. {count} item(s) missing remarks."
    )]
    MissingRemarks { count: usize },

    #[error("Selected items belong to different approvals ({first} and {other}); submit one approval at a time")]
    MixedBatch { first: String, other: String },

    /// The deep create failed; carries the blocking notice shown to the approver.
    #[error("{0}")]
    SubmissionFailed(String),

    #[error("Backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected backend response: {0}")]
    MalformedResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PayflowError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PayflowError::Transport(_) => true,
            PayflowError::Http { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            _ => false,
        }
    }
}

impl From<ureq::Error> for PayflowError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => PayflowError::Http {
                status,
                body: String::new(),
            },
            other => PayflowError::Transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PayflowError>;
