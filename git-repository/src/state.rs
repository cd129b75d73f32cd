use std::path::Path;

/// The operation a repository is presently in the middle of, detected from a fixed set
/// of marker files under the git directory plus the index's conflict status. Extends
/// the familiar rebase/merge/cherry-pick/revert/bisect set with explicit `_Resolved`
/// variants and `Bare`/`Safe`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RepositoryState {
    /// `rebase-apply/applying`: a plain `git am` mailbox application.
    Apply,
    /// `rebase-apply/*` without `applying`: a non-interactive rebase.
    Rebasing,
    /// `rebase-merge/interactive`: an interactive rebase.
    RebasingInteractive,
    /// `rebase-merge/*` without `interactive`: a merge-based rebase.
    RebasingMerge,
    /// `MERGE_HEAD` present, index still has unresolved stages.
    Merging,
    /// `MERGE_HEAD` present, every stage resolved.
    MergingResolved,
    /// `CHERRY_PICK_HEAD` present, index still has unresolved stages.
    CherryPicking,
    /// `CHERRY_PICK_HEAD` present, every stage resolved.
    CherryPickingResolved,
    /// `REVERT_HEAD` present, index still has unresolved stages.
    Reverting,
    /// `REVERT_HEAD` present, every stage resolved.
    RevertingResolved,
    /// `BISECT_LOG` present.
    Bisecting,
    /// No worktree at all.
    Bare,
    /// None of the above markers are present.
    Safe,
}

/// What the caller may do while the repository is in a given [`RepositoryState`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Capabilities {
    pub can_checkout: bool,
    pub can_commit: bool,
    pub can_reset_head: bool,
    pub can_amend: bool,
    pub is_rebasing: bool,
}

impl RepositoryState {
    /// The capability record consulted by commands before mutating state, per spec
    /// §4.4. A conflicted merge/cherry-pick/revert blocks `canCommit` until every
    /// non-zero index stage is cleared; a rebase of any kind blocks ordinary commits
    /// and head resets entirely, since those are driven through the rebase machinery
    /// instead.
    pub fn capabilities(&self) -> Capabilities {
        use RepositoryState::*;
        match self {
            Apply | Rebasing | RebasingInteractive | RebasingMerge => Capabilities {
                can_checkout: false,
                can_commit: false,
                can_reset_head: false,
                can_amend: false,
                is_rebasing: true,
            },
            Merging | CherryPicking | Reverting => Capabilities {
                can_checkout: false,
                can_commit: false,
                can_reset_head: true,
                can_amend: false,
                is_rebasing: false,
            },
            MergingResolved | CherryPickingResolved | RevertingResolved => Capabilities {
                can_checkout: true,
                can_commit: true,
                can_reset_head: true,
                can_amend: false,
                is_rebasing: false,
            },
            Bisecting => Capabilities {
                can_checkout: true,
                can_commit: false,
                can_reset_head: false,
                can_amend: false,
                is_rebasing: false,
            },
            Bare => Capabilities {
                can_checkout: false,
                can_commit: false,
                can_reset_head: false,
                can_amend: false,
                is_rebasing: false,
            },
            Safe => Capabilities {
                can_checkout: true,
                can_commit: true,
                can_reset_head: true,
                can_amend: true,
                is_rebasing: false,
            },
        }
    }
}

/// Detect the repository's current [`RepositoryState`] by checking marker files under
/// `git_dir`, in rebase > merge > cherry-pick > revert > bisect priority order,
/// falling back to `Bare`/`Safe`. `has_conflicts` should reflect the current index's
/// `State::has_conflicts()`.
pub fn detect(git_dir: &Path, is_bare: bool, has_conflicts: bool) -> RepositoryState {
    let exists = |relative: &str| git_dir.join(relative).exists();

    if exists("rebase-apply/applying") {
        return RepositoryState::Apply;
    }
    if exists("rebase-apply") {
        return RepositoryState::Rebasing;
    }
    if exists("rebase-merge/interactive") {
        return RepositoryState::RebasingInteractive;
    }
    if exists("rebase-merge") {
        return RepositoryState::RebasingMerge;
    }
    if exists("MERGE_HEAD") {
        return if has_conflicts { RepositoryState::Merging } else { RepositoryState::MergingResolved };
    }
    if exists("CHERRY_PICK_HEAD") {
        return if has_conflicts { RepositoryState::CherryPicking } else { RepositoryState::CherryPickingResolved };
    }
    if exists("REVERT_HEAD") {
        return if has_conflicts { RepositoryState::Reverting } else { RepositoryState::RevertingResolved };
    }
    if exists("BISECT_LOG") {
        return RepositoryState::Bisecting;
    }
    if is_bare {
        return RepositoryState::Bare;
    }
    RepositoryState::Safe
}
