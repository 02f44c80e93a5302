use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use super::Backend;
use crate::approval::DeepCreatePayload;
use crate::error::{PayflowError, Result};
use crate::model::{parse_collection, HeaderRecord, UserApprovalLevel};

/// One submitted deep create as it lands in the outbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub request_key: String,
    pub payload: DeepCreatePayload,
}

/// Offline backend: reads a saved service response and records submissions
/// to a JSON outbox instead of posting them.
pub struct FileBackend {
    input: PathBuf,
    outbox: PathBuf,
}

impl FileBackend {
    pub fn new(input: impl Into<PathBuf>, outbox: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            outbox: outbox.into(),
        }
    }

    /// Entries written so far; an absent outbox is empty.
    pub fn read_outbox(&self) -> Result<Vec<OutboxEntry>> {
        if !self.outbox.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.outbox)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl Backend for FileBackend {
    fn fetch_headers(&mut self) -> Result<Vec<HeaderRecord>> {
        debug!(input = %self.input.display(), "reading payment fixture");
        let body = fs::read_to_string(&self.input)?;
        parse_collection(&body)
    }

    fn create_deep(&mut self, payload: &DeepCreatePayload, request_key: &str) -> Result<()> {
        let mut entries = self.read_outbox()?;
        if entries.iter().any(|e| e.request_key == request_key) {
            debug!(%request_key, "duplicate request key ignored");
            return Ok(());
        }
        entries.push(OutboxEntry {
            request_key: request_key.to_string(),
            payload: payload.clone(),
        });

        if let Some(parent) = self.outbox.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.outbox, serde_json::to_string_pretty(&entries)?)?;
        info!(
            outbox = %self.outbox.display(),
            approval_no = %payload.approval_no,
            "deep create recorded"
        );
        Ok(())
    }

    fn fetch_user_levels(&mut self) -> Result<Vec<UserApprovalLevel>> {
        Err(PayflowError::VerificationUnavailable)
    }
}
