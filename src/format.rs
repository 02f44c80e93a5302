//! Display helpers for amounts and statuses.

use rust_decimal::Decimal;

use crate::config::Role;
use crate::model::{Amount, TreeNode};

const LAKH: i64 = 100_000;
const THOUSAND: i64 = 1_000;

/// Rupees with Indian digit grouping: `₹1,23,456.78`.
pub fn format_inr(amount: Amount) -> String {
    let fixed = amount.to_fixed2();
    let (sign, digits) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));
    format!("{sign}₹{}.{frac_part}", group_indian(int_part))
}

/// Compact lakh/thousand form when `show_in_lakhs` is on, rupees otherwise.
pub fn format_currency(amount: Amount, show_in_lakhs: bool) -> String {
    if !show_in_lakhs {
        return format_inr(amount);
    }
    let magnitude = amount.value().abs();
    let (scaled, suffix) = if magnitude >= Decimal::from(LAKH) {
        (magnitude / Decimal::from(LAKH), "L")
    } else if magnitude >= Decimal::from(THOUSAND) {
        (magnitude / Decimal::from(THOUSAND), "K")
    } else {
        (magnitude, "")
    };
    let fixed = Amount::new(scaled).to_fixed2();
    let sign = if amount.is_negative() && fixed != "0.00" { "-" } else { "" };
    format!("{sign}₹{fixed}{suffix}")
}

/// Status column: the overall status for headers, the acting role's
/// decision for items.
pub fn status_text(node: TreeNode<'_>, role: Role) -> String {
    let status = match node {
        TreeNode::Header(h) => h.header.overall_status.code().to_string(),
        TreeNode::Item(i) => i.item.approval(role).status,
    };
    if status.trim().is_empty() {
        "PENDING".to_string()
    } else {
        status
    }
}

/// Amount column: gross amount of the header or item.
pub fn node_amount(node: TreeNode<'_>) -> Amount {
    match node {
        TreeNode::Header(h) => h.header.gross_amount,
        TreeNode::Item(i) => i.item.gross_amt,
    }
}

fn group_indian(int_part: &str) -> String {
    if int_part.len() <= 3 {
        return int_part.to_string();
    }
    let (rest, last_three) = int_part.split_at(int_part.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = rest.len();
    while end > 2 {
        groups.push(&rest[end - 2..end]);
        end -= 2;
    }
    groups.push(&rest[..end]);
    groups.reverse();
    format!("{},{last_three}", groups.join(","))
}
