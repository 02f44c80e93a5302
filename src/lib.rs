pub mod approval;
pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod service;

pub use approval::{ActionKind, ApprovalSession, DateEncoding, Notice, PayloadBuilder};
pub use config::{Config, Role, SessionContext};
pub use error::{PayflowError, Result};
pub use model::{build_tree, Amount, HeaderRecord, ItemRecord, NodeRef, Tree};
pub use service::{Backend, FileBackend, HttpBackend};
