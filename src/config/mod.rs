mod session;
mod settings;

pub use session::{Role, SessionContext};
pub use settings::{Config, DisplaySettings, PayloadSettings, RetrySettings, ServiceSettings};

use crate::error::{PayflowError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";
pub const SESSION_FILE: &str = "session.toml";

/// Get the config directory path (XDG config dir, falling back to ~/.payflow/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "payflow") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = std::env::var_os("HOME").map(PathBuf::from).ok_or_else(|| {
        PayflowError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".payflow"))
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Err(PayflowError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| PayflowError::ConfigParse { path, source: e })
}

/// Load the verified identity saved by `login`
pub fn load_session(config_dir: &Path) -> Result<SessionContext> {
    let path = config_dir.join(SESSION_FILE);
    if !path.exists() {
        return Err(PayflowError::NotLoggedIn);
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| PayflowError::ConfigParse { path, source: e })
}

/// Save session.toml
pub fn save_session(config_dir: &Path, context: &SessionContext) -> Result<()> {
    let path = config_dir.join(SESSION_FILE);
    let content = toml::to_string_pretty(context).map_err(|e| {
        PayflowError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })?;
    fs::write(path, content)?;
    Ok(())
}

/// Remove session.toml; returns whether a session existed
pub fn clear_session(config_dir: &Path) -> Result<bool> {
    let path = config_dir.join(SESSION_FILE);
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path)?;
    Ok(true)
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[service]
url = "https://gateway.example.com/sap/opu/odata/sap/ZPAYMENT_WORKFLOW_SRV"
header_set = "PaymentHeaderSet"
items_navigation = "ToItems"
user_set = "UserApprovalLevelSet"
# username = "APPROVER01"      # optional; password is read from PAYFLOW_PASSWORD
# sap_client = "100"           # optional
timeout_secs = 30

[payload]
# How dates are written in approval payloads. Confirm with the backend team:
#   "edm"  -> "/Date(1718000000000)/"
#   "abap" -> "20240610" / "20240610143000"
date_encoding = "edm"

[retry]
attempts = 3        # transient network failures only
base_delay_ms = 500
max_delay_ms = 8000

[display]
show_in_lakhs = false
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::DateEncoding;
    use tempfile::TempDir;

    #[test]
    fn template_parses() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.service.header_set, "PaymentHeaderSet");
        assert_eq!(config.payload.date_encoding, DateEncoding::Edm);
        assert_eq!(config.retry.attempts, 3);
        assert!(config.service.username.is_none());
    }

    #[test]
    fn date_encoding_is_required() {
        let text = "[service]\nurl = \"http://localhost\"\n[payload]\n";
        assert!(toml::from_str::<Config>(text).is_err());
    }

    #[test]
    fn session_lifecycle() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_session(dir.path()),
            Err(PayflowError::NotLoggedIn)
        ));

        let ctx = SessionContext::new("RKUMAR", Role::Cfo);
        save_session(dir.path(), &ctx).unwrap();
        assert_eq!(load_session(dir.path()).unwrap(), ctx);

        assert!(clear_session(dir.path()).unwrap());
        assert!(!clear_session(dir.path()).unwrap());
    }

    #[test]
    fn missing_config_file_is_reported() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_config(dir.path()),
            Err(PayflowError::ConfigFileNotFound(_))
        ));
    }
}
