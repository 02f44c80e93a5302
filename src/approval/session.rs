use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dates::DateEncoding;
use super::payload::{DeepCreatePayload, PayloadBuilder};
use super::ActionKind;
use crate::config::{Role, SessionContext};
use crate::error::{PayflowError, Result};
use crate::model::{build_tree, Amount, ItemRecord, NodeRef, Tree};
use crate::service::Backend;

/// Message for the approver. Transient notices are informational; blocking
/// ones need acknowledgement because data may not have reached the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Transient(String),
    Blocking(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Transient(m) | Notice::Blocking(m) => m,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Selected,
    DialogOpen {
        action: ActionKind,
        targets: Vec<NodeRef>,
    },
    Submitting {
        action: ActionKind,
        targets: Vec<NodeRef>,
        request_id: u64,
    },
}

/// What the confirmation dialog shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog<'a> {
    pub title: &'static str,
    pub action: ActionKind,
    pub targets: &'a [NodeRef],
}

/// Result of an amount field edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountEdit {
    Updated(Amount),
    /// Input was negative; the field now holds zero.
    ClampedToZero,
}

/// A built payload waiting for the backend.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub request_id: u64,
    pub request_key: String,
    pub action: ActionKind,
    pub payload: DeepCreatePayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub request_key: String,
    pub approval_no: String,
    pub action: ActionKind,
    pub item_count: usize,
    pub notice: Notice,
}

/// Approval screen state for one approver: the tree, what is selected,
/// and the decision in progress.
#[derive(Debug)]
pub struct ApprovalSession {
    context: SessionContext,
    builder: PayloadBuilder,
    tree: Tree,
    selection: Vec<NodeRef>,
    state: SessionState,
    show_in_lakhs: bool,
    last_request_id: u64,
    stale: bool,
}

impl ApprovalSession {
    pub fn new(context: SessionContext, encoding: DateEncoding, tree: Tree) -> Self {
        Self {
            builder: PayloadBuilder::new(context.role, encoding),
            context,
            tree,
            selection: Vec::new(),
            state: SessionState::Idle,
            show_in_lakhs: false,
            last_request_id: 0,
            stale: false,
        }
    }

    /// Fetch the tree. A failed or empty read leaves an empty tree and a notice.
    pub fn load(
        context: SessionContext,
        encoding: DateEncoding,
        backend: &mut dyn Backend,
    ) -> (Self, Option<Notice>) {
        let mut session = Self::new(context, encoding, Tree::default());
        let notice = session.reload(backend);
        (session, notice)
    }

    pub fn reload(&mut self, backend: &mut dyn Backend) -> Option<Notice> {
        self.selection.clear();
        self.state = SessionState::Idle;
        match backend.fetch_headers() {
            Ok(headers) => {
                self.tree = build_tree(headers);
                self.stale = false;
                info!(headers = self.tree.len(), "payment data loaded");
                if self.tree.is_empty() {
                    Some(Notice::Transient("No payment data available".to_string()))
                } else {
                    None
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to load payment data");
                self.tree = Tree::default();
                self.stale = false;
                Some(Notice::Transient(format!("Error loading payment data: {err}")))
            }
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn selection(&self) -> &[NodeRef] {
        &self.selection
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    pub fn show_bulk_actions(&self) -> bool {
        !self.selection.is_empty()
    }

    /// Controls stay disabled while a submission is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, SessionState::Submitting { .. })
    }

    /// Set after a failed submission: the local tree may no longer match
    /// the backend until the next reload.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn show_in_lakhs(&self) -> bool {
        self.show_in_lakhs
    }

    pub fn set_show_in_lakhs(&mut self, enabled: bool) -> Notice {
        self.show_in_lakhs = enabled;
        let unit = if enabled { "Lakhs" } else { "Rupees" };
        Notice::Transient(format!("Amounts now displayed in {unit}"))
    }

    pub fn select(&mut self, nodes: &[NodeRef]) -> Result<Option<Notice>> {
        self.ensure_not_busy()?;
        if let Some(missing) = nodes.iter().find(|n| self.tree.get(**n).is_none()) {
            return Err(PayflowError::NodeNotFound(missing.to_string()));
        }

        let mut selection: Vec<NodeRef> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if !selection.contains(node) {
                selection.push(*node);
            }
        }
        self.selection = selection;

        if self.selection.is_empty() {
            self.state = SessionState::Idle;
            return Ok(None);
        }
        self.state = SessionState::Selected;
        debug!(count = self.selection.len(), "selection changed");
        Ok(Some(Notice::Transient(format!(
            "{} item(s) selected. Use buttons below to approve or reject.",
            self.selection.len()
        ))))
    }

    /// Select by flat row index of the fully expanded tree.
    pub fn select_rows(&mut self, rows: &[usize]) -> Result<Option<Notice>> {
        let nodes = rows
            .iter()
            .map(|&r| self.tree.row(r).ok_or(PayflowError::RowNotFound(r)))
            .collect::<Result<Vec<_>>>()?;
        self.select(&nodes)
    }

    /// Open the confirmation dialog for the current selection.
    pub fn request_action(&mut self, action: ActionKind) -> Result<Dialog<'_>> {
        self.ensure_not_busy()?;
        if self.selection.is_empty() {
            return Err(PayflowError::NothingSelected(action));
        }

        let targets = self.expand_selection();
        debug!(%action, targets = targets.len(), "approval dialog opened");
        self.state = SessionState::DialogOpen { action, targets };
        self.dialog().ok_or(PayflowError::NoDialogOpen)
    }

    pub fn dialog(&self) -> Option<Dialog<'_>> {
        match &self.state {
            SessionState::DialogOpen { action, targets } => Some(Dialog {
                title: action.dialog_title(),
                action: *action,
                targets,
            }),
            _ => None,
        }
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.ensure_not_busy()?;
        self.selection.clear();
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Validate the open dialog and build its payload.
    ///
    /// On success the session is `Submitting` until
    /// [`ApprovalSession::finish_submission`] is called with the returned id.
    pub fn begin_submission(&mut self, now: DateTime<Utc>) -> Result<PendingSubmission> {
        let (action, targets) = match &self.state {
            SessionState::DialogOpen { action, targets } => (*action, targets.clone()),
            SessionState::Submitting { .. } => return Err(PayflowError::SubmissionInFlight),
            _ => return Err(PayflowError::NoDialogOpen),
        };

        let items: Vec<&ItemRecord> = targets
            .iter()
            .filter_map(|n| self.tree.item(*n))
            .map(|node| &node.item)
            .collect();
        if items.is_empty() {
            return Err(PayflowError::EmptyBatch);
        }

        if action == ActionKind::Reject {
            let role = self.context.role;
            let missing = items
                .iter()
                .filter(|item| item.remarks(role).trim().is_empty())
                .count();
            if missing > 0 {
                warn!(missing, "rejection blocked: remarks missing");
                return Err(PayflowError::MissingRemarks { count: missing });
            }
        }

        let header = &self.tree.headers[targets[0].header].header;
        let payload = self
            .builder
            .build(header, &items, action, &self.context.actor_id, now)?;

        self.last_request_id += 1;
        let request_id = self.last_request_id;
        let request_key = Uuid::new_v4().to_string();
        info!(
            request_id,
            %request_key,
            %action,
            approval_no = %payload.approval_no,
            items = payload.to_items.results.len(),
            "submitting approval"
        );
        self.state = SessionState::Submitting {
            action,
            targets,
            request_id,
        };

        Ok(PendingSubmission {
            request_id,
            request_key,
            action,
            payload,
        })
    }

    /// Record the backend's answer for a submission started earlier.
    ///
    /// Answers for anything but the in-flight request are ignored.
    pub fn finish_submission(&mut self, request_id: u64, outcome: &Result<()>) -> Option<Notice> {
        let (action, targets) = match &self.state {
            SessionState::Submitting {
                action,
                targets,
                request_id: current,
            } if *current == request_id => (*action, targets.clone()),
            _ => {
                debug!(request_id, "ignoring stale submission result");
                return None;
            }
        };

        match outcome {
            Ok(()) => {
                self.selection.clear();
                self.state = SessionState::Idle;
                Some(Notice::Transient("Approval sent successfully".to_string()))
            }
            Err(err) => {
                warn!(request_id, error = %err, "deep create failed");
                self.stale = true;
                self.state = SessionState::DialogOpen { action, targets };
                Some(Notice::Blocking(format!("Backend update failed: {err}")))
            }
        }
    }

    /// Validate, build and send the open dialog's decision in one step.
    pub fn confirm(
        &mut self,
        backend: &mut dyn Backend,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt> {
        let pending = self.begin_submission(now)?;
        let outcome = backend.create_deep(&pending.payload, &pending.request_key);
        let notice = match self.finish_submission(pending.request_id, &outcome) {
            Some(Notice::Blocking(message)) => {
                return Err(PayflowError::SubmissionFailed(message));
            }
            Some(notice) => notice,
            None => return Err(PayflowError::NoDialogOpen),
        };

        Ok(SubmissionReceipt {
            request_key: pending.request_key,
            approval_no: pending.payload.approval_no,
            action: pending.action,
            item_count: pending.payload.to_items.results.len(),
            notice,
        })
    }

    pub fn set_tds_amount(&mut self, node: NodeRef, input: &str) -> Result<AmountEdit> {
        self.edit_amount(node, input, |item, _| &mut item.tds_amount)
    }

    /// Edit the acting role's approved amount.
    pub fn set_approved_amount(&mut self, node: NodeRef, input: &str) -> Result<AmountEdit> {
        self.edit_amount(node, input, |item, role| item.approved_amount_mut(role))
    }

    /// Edit the acting role's remarks.
    pub fn set_remarks(&mut self, node: NodeRef, text: &str) -> Result<()> {
        let role = self.context.role;
        let item = self.editable_item(node)?;
        *item.remarks_mut(role) = text.to_string();
        Ok(())
    }

    fn edit_amount(
        &mut self,
        node: NodeRef,
        input: &str,
        field: impl FnOnce(&mut ItemRecord, Role) -> &mut Amount,
    ) -> Result<AmountEdit> {
        let role = self.context.role;
        let item = self.editable_item(node)?;
        let slot = field(item, role);

        let parsed = Amount::parse_lenient(input);
        if parsed.is_negative() {
            *slot = Amount::ZERO;
            return Ok(AmountEdit::ClampedToZero);
        }
        // Stored at the precision it is submitted with.
        let rounded = Amount::parse_lenient(&parsed.to_fixed2());
        *slot = rounded;
        Ok(AmountEdit::Updated(rounded))
    }

    fn editable_item(&mut self, node: NodeRef) -> Result<&mut ItemRecord> {
        self.ensure_not_busy()?;
        if node.is_header() {
            return Err(PayflowError::HeaderNotEditable(self.tree.label(node)));
        }
        self.tree
            .item_mut(node)
            .map(|n| &mut n.item)
            .ok_or_else(|| PayflowError::NodeNotFound(node.to_string()))
    }

    fn ensure_not_busy(&self) -> Result<()> {
        if self.is_busy() {
            Err(PayflowError::SubmissionInFlight)
        } else {
            Ok(())
        }
    }

    /// Selected items plus every child of each selected header, deduplicated
    /// and in tree order.
    fn expand_selection(&self) -> Vec<NodeRef> {
        let mut targets: Vec<NodeRef> = Vec::new();
        for node in &self.selection {
            match node.item {
                Some(_) => targets.push(*node),
                None => {
                    let count = self.tree.headers[node.header].children.len();
                    targets.extend((0..count).map(|i| NodeRef::item(node.header, i)));
                }
            }
        }
        targets.sort();
        targets.dedup();
        targets
    }
}
