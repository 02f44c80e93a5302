mod amount;
mod records;
mod tree;

pub use amount::Amount;
pub use records::{
    parse_collection, HeaderRecord, ItemRecord, ODataList, OverallStatus, RoleApproval,
    UserApprovalLevel,
};
pub use tree::{build_tree, HeaderNode, ItemNode, NodeRef, Tree, TreeNode};
