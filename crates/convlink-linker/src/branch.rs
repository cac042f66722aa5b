//! Branch Allocator — C7 (§4.7).
//!
//! Decides whether a request continues its parent's branch or forks a new
//! one. Takes the parent's already-resolved list of existing children as a
//! plain input rather than querying for it itself — the only query that
//! could reintroduce the read-then-write race noted in §5 stays visible at
//! the call site instead of being hidden inside this function.

use convlink_core::BranchId;

/// `existing_children` is every branch id already recorded as a child of
/// `parent_branch_id` within the parent's conversation, resolved by the
/// caller before this function runs. Returns the parent's own branch id
/// when there are no existing children (this request becomes the sole
/// continuation), or a freshly minted `branch_<unix_ms>` id when a sibling
/// already claimed the parent (§4.7: fork on contention).
pub fn allocate_branch(parent_branch_id: &BranchId, existing_children: &[BranchId], now_ms: i64) -> BranchId {
    if existing_children.is_empty() {
        parent_branch_id.clone()
    } else {
        BranchId::branch(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inherits_parent_branch_when_no_existing_children() {
        let parent = BranchId::main();
        let result = allocate_branch(&parent, &[], 1_700_000_000_000);
        assert_eq!(result, parent);
    }

    #[test]
    fn forks_new_branch_when_a_child_already_exists() {
        let parent = BranchId::main();
        let sibling = BranchId::branch(1_699_999_999_999);
        let result = allocate_branch(&parent, &[sibling], 1_700_000_000_000);
        assert_eq!(result, BranchId::branch(1_700_000_000_000));
    }

    #[test]
    fn fork_is_independent_of_which_branch_the_parent_was_on() {
        let parent = BranchId::compact("134509");
        let sibling = BranchId::subtask(1);
        let result = allocate_branch(&parent, &[sibling], 42);
        assert_eq!(result, BranchId::branch(42));
    }
}
