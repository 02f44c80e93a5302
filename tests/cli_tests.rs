use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const PAYMENTS: &str = r#"{"d":{"results":[
  {
    "ApprovalNo": "0000000017",
    "VendorCode": "V1001",
    "VendorName": "Acme Infra",
    "CompanyCode": "1000",
    "ProfitCenter": "PC01",
    "CreatedOn": "/Date(1717977600000)/",
    "OverallStatus": "",
    "GrossAmount": "123456.78",
    "TotalLiability": "120000.00",
    "ToItems": {"results": [
      {"ApprovalNo": "0000000017", "ItemNum": "1", "VendorName": "Acme Infra",
       "GrossAmt": "100000.00", "TdsAmount": "1000.00", "Currency": "INR",
       "DocDate": "20240610"},
      {"ApprovalNo": "0000000017", "ItemNum": "2", "VendorName": "Acme Infra",
       "GrossAmt": "23456.78", "TdsAmount": null, "Currency": "INR"}
    ]}
  },
  {
    "ApprovalNo": "0000000018",
    "VendorName": "Bharat Steel",
    "GrossAmount": 5400,
    "ToItems": {"results": [
      {"ApprovalNo": "0000000018", "ItemNum": "10", "GrossAmt": 5400, "Currency": "INR"}
    ]}
  }
]}}"#;

fn payflow_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("payflow"))
}

/// Initialized config dir, a payment fixture, and a logged-in PM.
struct Workspace {
    _temp: TempDir,
    config: PathBuf,
    input: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        Self::with_payments(PAYMENTS)
    }

    fn with_payments(payments: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("payflow-config");
        let input = temp.path().join("payments.json");
        fs::write(&input, payments).unwrap();

        payflow_cmd()
            .args(["-C", config.to_str().unwrap(), "init"])
            .assert()
            .success();
        payflow_cmd()
            .args(["-C", config.to_str().unwrap()])
            .args(["login", "--user", "PMUSER", "--level", "PM"])
            .assert()
            .success();

        Self {
            _temp: temp,
            config,
            input,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = payflow_cmd();
        cmd.args(["-C", self.config.to_str().unwrap()])
            .args(["--input", self.input.to_str().unwrap()]);
        cmd
    }

    fn outbox(&self) -> PathBuf {
        self.config.join("outbox.json")
    }
}

fn read_outbox(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_help() {
    payflow_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Multi-level payment approval client"));
}

#[test]
fn test_version() {
    payflow_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("payflow"));
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("payflow-config");

    payflow_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized payflow config"));

    let content = fs::read_to_string(config_path.join("config.toml")).unwrap();
    assert!(content.contains("date_encoding = \"edm\""));
}

#[test]
fn test_init_fails_if_exists() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("payflow-config");

    payflow_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success();

    payflow_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_status_without_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nonexistent");

    payflow_cmd()
        .args(["-C", config_path.to_str().unwrap(), "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_status_before_login() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("payflow-config");

    payflow_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success();

    payflow_cmd()
        .args(["-C", config_path.to_str().unwrap(), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Payflow Status"))
        .stdout(predicate::str::contains("Date encoding:    edm"))
        .stdout(predicate::str::contains("(not logged in)"));
}

#[test]
fn test_login_status_logout() {
    let ws = Workspace::new();

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("PMUSER (Project Manager)"))
        .stdout(predicate::str::contains("(offline)"));

    ws.cmd()
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out"));

    ws.cmd()
        .arg("tree")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_login_unknown_level() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["login", "--user", "BOSS", "--level", "CEO"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No approval role configured"));
}

#[test]
fn test_login_verification_needs_service() {
    let ws = Workspace::new();

    ws.cmd()
        .arg("login")
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires a service connection"));
}

#[test]
fn test_tree_lists_headers_and_items() {
    let ws = Workspace::new();

    ws.cmd()
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("Approval: 0000000017 - Acme Infra"))
        .stdout(predicate::str::contains("Item 2 - Acme Infra"))
        .stdout(predicate::str::contains("0000000018/10"))
        .stdout(predicate::str::contains("₹1,23,456.78"))
        .stdout(predicate::str::contains("PENDING"))
        .stdout(predicate::str::contains("Total: 2 approval(s), 3 item(s)"));
}

#[test]
fn test_tree_in_lakhs() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["tree", "--lakhs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Amounts now displayed in Lakhs"))
        .stdout(predicate::str::contains("₹1.23L"))
        .stdout(predicate::str::contains("₹5.40K"));
}

#[test]
fn test_tree_with_no_payments() {
    let ws = Workspace::with_payments(r#"{"d":{"results":[]}}"#);

    ws.cmd()
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("No payment data available"));
}

#[test]
fn test_approve_header_dry_run() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["approve", "0000000017", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Approve Items: 2 item(s)"))
        .stdout(predicate::str::contains("\"OverallStatus\": \"PM_APPR\""))
        .stdout(predicate::str::contains("\"PmApprStatus\": \"APPROVED\""))
        .stdout(predicate::str::contains("Approved via bulk action"))
        .stdout(predicate::str::contains("\"CreationTime\": \"PT00H00M00S\""));

    assert!(!ws.outbox().exists());
}

#[test]
fn test_approve_records_submission() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["approve", "0000000017/1", "--amount", "0000000017/1=95000.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Approval sent successfully"))
        .stdout(predicate::str::contains("Items:    1"));

    let outbox = read_outbox(&ws.outbox());
    let entries = outbox.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    let payload = &entries[0]["payload"];
    assert_eq!(payload["ApprovalNo"], "0000000017");
    assert_eq!(payload["GrossAmount"], "123456.78");
    let item = &payload["ToItems"]["results"][0];
    assert_eq!(item["PmApprAmt"], "95000.50");
    assert_eq!(item["PmUserId"], "PMUSER");
    assert_eq!(item["DocDate"], "/Date(1717977600000)/");
    assert_eq!(item["PaidAmount1"], "0.00");
}

#[test]
fn test_reject_without_remarks_is_blocked() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["reject", "0000000017"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Please enter remarks for all items before rejecting. 2 item(s) missing remarks.",
        ));

    assert!(!ws.outbox().exists());
}

#[test]
fn test_reject_with_remarks() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["reject", "0000000018/10", "--remark", "0000000018/10=GSTIN mismatch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reject Items: 1 item(s)"))
        .stdout(predicate::str::contains("Approval sent successfully"));

    let outbox = read_outbox(&ws.outbox());
    let payload = &outbox[0]["payload"];
    assert_eq!(payload["OverallStatus"], "REJECTED");
    let item = &payload["ToItems"]["results"][0];
    assert_eq!(item["PmApprStatus"], "REJECTED");
    assert_eq!(item["PmApprRemarks"], "GSTIN mismatch");
}

#[test]
fn test_negative_tds_is_clamped() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["approve", "0000000017/1", "--tds", "0000000017/1=-5", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TDS Amount cannot be negative"))
        .stdout(predicate::str::contains("\"TdsAmount\": \"0.00\""));
}

#[test]
fn test_approve_nothing_selected() {
    let ws = Workspace::new();

    ws.cmd()
        .arg("approve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please select items to approve"));
}

#[test]
fn test_approve_mixed_approvals() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["approve", "0000000017", "0000000018"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("different approvals"));

    assert!(!ws.outbox().exists());
}

#[test]
fn test_approve_unknown_reference() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["approve", "0000000099"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found in the approval tree"));
}

#[test]
fn test_invalid_edit() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["approve", "0000000017", "--tds", "0000000017/1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid edit"));
}
