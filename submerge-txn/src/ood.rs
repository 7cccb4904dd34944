/// What a rebase requires to hold of a node (or its target parent)
/// across the span between a client's base revision and the server's
/// current transaction base, expressed as the per-operation table in
/// §4.2 "Out-of-date (OOD) rebase rules". Checking these against actual
/// committed history is the repository backend's job (§6 `check-ood`);
/// this struct only names which checks a given operation demands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OodRequirement {
    pub unchanged_name_and_parent: bool,
    pub unchanged_own_content: bool,
    pub not_created: bool,
    pub not_deleted: bool,
    pub recursive: bool,
}

impl OodRequirement {
    pub const NONE: OodRequirement = OodRequirement {
        unchanged_name_and_parent: false,
        unchanged_own_content: false,
        not_created: false,
        not_deleted: false,
        recursive: false,
    };

    /// `mv`'s source and the table's `alter`/`delete`-via-`mv`-shape row:
    /// name+parent unchanged, not created, not deleted.
    pub const MOVE_SOURCE: OodRequirement = OodRequirement {
        unchanged_name_and_parent: true,
        unchanged_own_content: false,
        not_created: true,
        not_deleted: true,
        recursive: false,
    };

    /// `rm`'s target: name+parent and own-content unchanged, not
    /// created, not deleted, recursive over descendants.
    pub const REMOVE_TARGET: OodRequirement = OodRequirement {
        unchanged_name_and_parent: true,
        unchanged_own_content: true,
        not_created: true,
        not_deleted: true,
        recursive: true,
    };

    /// `put`'s target: own-content unchanged, not created, not deleted.
    pub const CONTENT_TARGET: OodRequirement = OodRequirement {
        unchanged_name_and_parent: false,
        unchanged_own_content: true,
        not_created: true,
        not_deleted: true,
        recursive: false,
    };

    /// `alter`'s target: it may change both location and content, so
    /// the rebase must hold both unchanged going in — "same as
    /// rm/put per since-rev" (§4.2), read as the union of the two
    /// since `alter` touches what both of them touch. Non-recursive:
    /// `alter` only ever names the one node-branch.
    pub const ALTER_TARGET: OodRequirement = OodRequirement {
        unchanged_name_and_parent: true,
        unchanged_own_content: true,
        not_created: true,
        not_deleted: true,
        recursive: false,
    };
}
