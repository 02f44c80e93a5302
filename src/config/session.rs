use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PayflowError, Result};
use crate::model::UserApprovalLevel;
use crate::service::Backend;

/// Approval levels, in the order a payment passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    ProjectManager,
    Hod,
    Cfo,
    Auditor,
    Director,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::ProjectManager,
        Role::Hod,
        Role::Cfo,
        Role::Auditor,
        Role::Director,
    ];

    /// Approval level code used by `UserApprovalLevelSet`.
    pub fn code(self) -> &'static str {
        match self {
            Role::ProjectManager => "PM",
            Role::Hod => "HOD",
            Role::Cfo => "CFO",
            Role::Auditor => "AUD",
            Role::Director => "DIR",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::ProjectManager => "Project Manager",
            Role::Hod => "HOD Accounts",
            Role::Cfo => "CFO",
            Role::Auditor => "Auditor",
            Role::Director => "Director",
        }
    }
}

impl FromStr for Role {
    type Err = PayflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PM" => Ok(Role::ProjectManager),
            "HOD" => Ok(Role::Hod),
            "CFO" => Ok(Role::Cfo),
            "AUD" | "AUDITOR" => Ok(Role::Auditor),
            "DIR" | "DIRECTOR" => Ok(Role::Director),
            _ => Err(PayflowError::UnknownApprovalLevel(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = PayflowError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.code().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Verified identity of the person acting on approvals.
///
/// Built once, on login, and handed to whatever needs to know who is acting.
/// Nothing mutates it afterwards; logging out deletes the stored copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_name: String,
    pub role: Role,
    pub actor_id: String,
}

impl SessionContext {
    pub fn new(user_name: impl Into<String>, role: Role) -> Self {
        let user_name = user_name.into();
        Self {
            actor_id: user_name.clone(),
            user_name,
            role,
        }
    }

    /// Build a context from the first `UserApprovalLevelSet` record.
    pub fn from_levels(levels: &[UserApprovalLevel]) -> Result<Self> {
        let first = levels.first().ok_or(PayflowError::UserNotVerified)?;
        let role = first.approval_level.parse()?;
        Ok(Self::new(first.user_name.clone(), role))
    }

    /// Ask the backend who is signed in.
    pub fn verify(backend: &mut dyn Backend) -> Result<Self> {
        let levels = backend.fetch_user_levels()?;
        let context = Self::from_levels(&levels)?;
        tracing::info!(user = %context.user_name, role = %context.role, "user verified");
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_codes_case_insensitively() {
        assert_eq!("pm".parse::<Role>().unwrap(), Role::ProjectManager);
        assert_eq!("Auditor".parse::<Role>().unwrap(), Role::Auditor);
        assert_eq!(" DIR ".parse::<Role>().unwrap(), Role::Director);
        assert!(matches!(
            "CEO".parse::<Role>(),
            Err(PayflowError::UnknownApprovalLevel(_))
        ));
    }

    #[test]
    fn roles_are_ordered_by_approval_flow() {
        assert!(Role::ProjectManager < Role::Hod);
        assert!(Role::Cfo < Role::Auditor);
        assert!(Role::Auditor < Role::Director);
    }

    #[test]
    fn context_comes_from_first_level_record() {
        let levels = vec![
            UserApprovalLevel {
                user_name: "RKUMAR".into(),
                approval_level: "CFO".into(),
            },
            UserApprovalLevel {
                user_name: "OTHER".into(),
                approval_level: "PM".into(),
            },
        ];
        let ctx = SessionContext::from_levels(&levels).unwrap();
        assert_eq!(ctx.user_name, "RKUMAR");
        assert_eq!(ctx.actor_id, "RKUMAR");
        assert_eq!(ctx.role, Role::Cfo);
    }

    #[test]
    fn empty_verification_is_an_error() {
        assert!(matches!(
            SessionContext::from_levels(&[]),
            Err(PayflowError::UserNotVerified)
        ));
    }

    #[test]
    fn context_round_trips_through_toml() {
        let ctx = SessionContext::new("ASHAH", Role::Hod);
        let text = toml::to_string(&ctx).unwrap();
        assert!(text.contains("role = \"HOD\""));
        let back: SessionContext = toml::from_str(&text).unwrap();
        assert_eq!(back, ctx);
    }
}
