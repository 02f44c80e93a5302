use std::fmt;

use super::records::{HeaderRecord, ItemRecord};
use crate::error::{PayflowError, Result};

/// One payment approval request with its line items.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderNode {
    pub header: HeaderRecord,
    pub display_text: String,
    pub currency: String,
    pub item_count: usize,
    pub children: Vec<ItemNode>,
}

/// A line item. Items never have children.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemNode {
    pub item: ItemRecord,
    pub display_text: String,
}

/// Borrowed view of any node in the tree.
#[derive(Debug, Clone, Copy)]
pub enum TreeNode<'a> {
    Header(&'a HeaderNode),
    Item(&'a ItemNode),
}

impl TreeNode<'_> {
    pub fn is_header(&self) -> bool {
        matches!(self, TreeNode::Header(_))
    }

    pub fn display_text(&self) -> &str {
        match self {
            TreeNode::Header(h) => &h.display_text,
            TreeNode::Item(i) => &i.display_text,
        }
    }
}

/// Position of a node: a header index, plus an item index for line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    pub header: usize,
    pub item: Option<usize>,
}

impl NodeRef {
    pub fn header(header: usize) -> Self {
        Self { header, item: None }
    }

    pub fn item(header: usize, item: usize) -> Self {
        Self {
            header,
            item: Some(item),
        }
    }

    pub fn is_header(&self) -> bool {
        self.item.is_none()
    }
}

/// The approval tree shown to an approver, in backend order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    pub headers: Vec<HeaderNode>,
}

impl Tree {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn get(&self, node: NodeRef) -> Option<TreeNode<'_>> {
        let header = self.headers.get(node.header)?;
        match node.item {
            None => Some(TreeNode::Header(header)),
            Some(i) => header.children.get(i).map(TreeNode::Item),
        }
    }

    pub fn item(&self, node: NodeRef) -> Option<&ItemNode> {
        self.headers.get(node.header)?.children.get(node.item?)
    }

    pub fn item_mut(&mut self, node: NodeRef) -> Option<&mut ItemNode> {
        self.headers
            .get_mut(node.header)?
            .children
            .get_mut(node.item?)
    }

    /// Every node in display order with the tree fully expanded.
    pub fn rows(&self) -> impl Iterator<Item = (NodeRef, TreeNode<'_>)> {
        self.headers.iter().enumerate().flat_map(|(h, header)| {
            std::iter::once((NodeRef::header(h), TreeNode::Header(header))).chain(
                header
                    .children
                    .iter()
                    .enumerate()
                    .map(move |(i, item)| (NodeRef::item(h, i), TreeNode::Item(item))),
            )
        })
    }

    /// Map a flat row index (fully expanded tree) to a node.
    pub fn row(&self, index: usize) -> Option<NodeRef> {
        self.rows().nth(index).map(|(node, _)| node)
    }

    /// Resolve `APPROVAL_NO` or `APPROVAL_NO/ITEM_NUM`.
    pub fn resolve(&self, reference: &str) -> Result<NodeRef> {
        let reference = reference.trim();
        let (approval_no, item_num) = match reference.split_once('/') {
            Some((a, i)) => (a.trim(), Some(i.trim())),
            None => (reference, None),
        };

        let not_found = || PayflowError::NodeNotFound(reference.to_string());
        let h = self
            .headers
            .iter()
            .position(|n| n.header.approval_no == approval_no)
            .ok_or_else(not_found)?;

        match item_num {
            None => Ok(NodeRef::header(h)),
            Some(num) => self.headers[h]
                .children
                .iter()
                .position(|c| same_item_num(&c.item.item_num, num))
                .map(|i| NodeRef::item(h, i))
                .ok_or_else(not_found),
        }
    }

    /// Textual form of a node ref, the inverse of [`Tree::resolve`].
    pub fn label(&self, node: NodeRef) -> String {
        match self.get(node) {
            Some(TreeNode::Header(h)) => h.header.approval_no.clone(),
            Some(TreeNode::Item(i)) => format!("{}/{}", i.item.approval_no, i.item.item_num),
            None => format!("#{}", node.header),
        }
    }
}

// Item numbers are zero-padded on some systems ("000010" vs "10").
fn same_item_num(stored: &str, wanted: &str) -> bool {
    stored == wanted
        || (!wanted.is_empty()
            && stored.trim_start_matches('0') == wanted.trim_start_matches('0'))
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item {
            Some(i) => write!(f, "{}.{}", self.header, i),
            None => write!(f, "{}", self.header),
        }
    }
}

/// Turn expanded header records into the approval tree.
pub fn build_tree(headers: Vec<HeaderRecord>) -> Tree {
    let headers = headers
        .into_iter()
        .map(|mut header| {
            let items = std::mem::take(&mut header.to_items.results);
            let children: Vec<ItemNode> = items
                .into_iter()
                .map(|mut item| {
                    if item.approval_no.trim().is_empty() {
                        item.approval_no = header.approval_no.clone();
                    }
                    ItemNode {
                        display_text: format!("Item {} - {}", item.item_num, item.vendor_name),
                        item,
                    }
                })
                .collect();

            HeaderNode {
                display_text: format!(
                    "Approval: {} - {}",
                    header.approval_no, header.vendor_name
                ),
                currency: children
                    .first()
                    .map(|c| c.item.currency.clone())
                    .unwrap_or_default(),
                item_count: children.len(),
                children,
                header,
            }
        })
        .collect();

    Tree { headers }
}
