//! The payment OData service, as seen by the approval session.

mod file;
mod http;
mod retry;

pub use file::{FileBackend, OutboxEntry};
pub use http::HttpBackend;
pub use retry::RetryPolicy;

use crate::approval::DeepCreatePayload;
use crate::error::Result;
use crate::model::{HeaderRecord, UserApprovalLevel};

pub trait Backend {
    /// Read payment headers with their items expanded.
    fn fetch_headers(&mut self) -> Result<Vec<HeaderRecord>>;

    /// Submit one approval decision as a single deep create.
    fn create_deep(&mut self, payload: &DeepCreatePayload, request_key: &str) -> Result<()>;

    /// Read the approval levels of the signed-in user.
    fn fetch_user_levels(&mut self) -> Result<Vec<UserApprovalLevel>>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::error::PayflowError;

    /// In-memory backend that records every deep create.
    pub struct RecordingBackend {
        pub headers: Vec<HeaderRecord>,
        pub created: Vec<(DeepCreatePayload, String)>,
        pub fail_fetch: bool,
        pub fail_create: bool,
    }

    impl RecordingBackend {
        pub fn new(headers: Vec<HeaderRecord>) -> Self {
            Self {
                headers,
                created: Vec::new(),
                fail_fetch: false,
                fail_create: false,
            }
        }
    }

    impl Backend for RecordingBackend {
        fn fetch_headers(&mut self) -> Result<Vec<HeaderRecord>> {
            if self.fail_fetch {
                return Err(PayflowError::Transport("connection refused".into()));
            }
            Ok(self.headers.clone())
        }

        fn create_deep(&mut self, payload: &DeepCreatePayload, request_key: &str) -> Result<()> {
            if self.fail_create {
                return Err(PayflowError::Http {
                    status: 400,
                    body: "Invalid key predicate".into(),
                });
            }
            self.created.push((payload.clone(), request_key.to_string()));
            Ok(())
        }

        fn fetch_user_levels(&mut self) -> Result<Vec<UserApprovalLevel>> {
            Ok(vec![UserApprovalLevel {
                user_name: "PMUSER".into(),
                approval_level: "PM".into(),
            }])
        }
    }
}
