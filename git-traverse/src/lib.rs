//! Commit graph algorithms: ancestry traversal, merge-base, and ancestor checks,
//! all built on top of a minimal view of the object store that can load a commit's
//! parents and timestamp.
#![deny(unsafe_code)]

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use git_hash::ObjectId;

/// The error returned while walking a commit graph.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} does not resolve to a commit")]
    NotACommit(ObjectId),
    #[error(transparent)]
    Store(#[from] git_odb::Error),
}

/// A read-only view over the commit graph: given a commit id, its parents and
/// committer timestamp. Implemented for any object store via [`from_store`].
pub trait CommitGraph {
    fn parents(&self, id: &ObjectId) -> Result<Vec<ObjectId>, Error>;
    fn commit_time(&self, id: &ObjectId) -> Result<i64, Error>;
}

/// Adapt any object store into a [`CommitGraph`] by loading and parsing the commit
/// object on every query.
pub struct FromStore<'a, S>(pub &'a S);

/// Build a [`CommitGraph`] view over `store`.
pub fn from_store<S: git_odb::Find>(store: &S) -> FromStore<'_, S> {
    FromStore(store)
}

impl<'a, S: git_odb::Find> CommitGraph for FromStore<'a, S> {
    fn parents(&self, id: &ObjectId) -> Result<Vec<ObjectId>, Error> {
        match self.0.load(id)? {
            git_object::Object::Commit(commit) => Ok(commit.parents),
            _ => Err(Error::NotACommit(*id)),
        }
    }

    fn commit_time(&self, id: &ObjectId) -> Result<i64, Error> {
        match self.0.load(id)? {
            git_object::Object::Commit(commit) => Ok(commit.committer.time.seconds_since_unix_epoch),
            _ => Err(Error::NotACommit(*id)),
        }
    }
}

#[derive(Eq, PartialEq)]
struct QueueEntry {
    time: i64,
    id: ObjectId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time).then_with(|| self.id.as_slice().cmp(other.id.as_slice()))
    }
}
impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Options controlling [`walk_ancestry`].
#[derive(Default)]
pub struct WalkOptions<'a> {
    /// Commits whose own ancestry is excluded from the walk (git's "uninteresting" set),
    /// e.g. the commits already on the remote side of a `a..b` range.
    pub uninteresting: &'a [ObjectId],
}

/// Yield every commit reachable from `starts`, newest-committer-time first, each id
/// exactly once, never yielding a commit that is also an ancestor of (or equal to) one
/// of `opts.uninteresting`.
pub fn walk_ancestry<G: CommitGraph>(
    graph: &G,
    starts: impl IntoIterator<Item = ObjectId>,
    opts: WalkOptions<'_>,
) -> Result<Vec<ObjectId>, Error> {
    let excluded = flood_fill(graph, opts.uninteresting.iter().copied())?;

    let mut heap = BinaryHeap::new();
    let mut queued = HashSet::new();
    for id in starts {
        if excluded.contains(&id) {
            continue;
        }
        if queued.insert(id) {
            heap.push(QueueEntry { time: graph.commit_time(&id)?, id });
        }
    }

    let mut out = Vec::new();
    while let Some(QueueEntry { id, .. }) = heap.pop() {
        out.push(id);
        for parent in graph.parents(&id)? {
            if excluded.contains(&parent) {
                continue;
            }
            if queued.insert(parent) {
                heap.push(QueueEntry { time: graph.commit_time(&parent)?, id: parent });
            }
        }
    }
    Ok(out)
}

fn flood_fill<G: CommitGraph>(graph: &G, starts: impl IntoIterator<Item = ObjectId>) -> Result<HashSet<ObjectId>, Error> {
    let mut seen = HashSet::new();
    let mut stack: Vec<ObjectId> = starts.into_iter().collect();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        stack.extend(graph.parents(&id)?);
    }
    Ok(seen)
}

/// `a ∈ ancestors(b)`, short-circuiting once every candidate's committer time drops
/// below `a`'s.
pub fn is_ancestor<G: CommitGraph>(graph: &G, a: &ObjectId, b: &ObjectId) -> Result<bool, Error> {
    if a == b {
        return Ok(true);
    }
    let cutoff = graph.commit_time(a)?;
    let mut seen = HashSet::new();
    let mut stack = vec![*b];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if &id == a {
            return Ok(true);
        }
        if graph.commit_time(&id)? < cutoff {
            continue;
        }
        stack.extend(graph.parents(&id)?);
    }
    Ok(false)
}

/// Git's best-common-ancestors algorithm: the maximal elements of `ancestors(a) ∩
/// ancestors(b)`, i.e. common ancestors that are not themselves ancestors of another
/// common ancestor. A linear history yields a single result; criss-cross merges can
/// yield several.
pub fn find_merge_base<G: CommitGraph>(graph: &G, a: &ObjectId, b: &ObjectId) -> Result<Vec<ObjectId>, Error> {
    let ancestors_a = flood_fill(graph, Some(*a))?;
    let ancestors_b = flood_fill(graph, Some(*b))?;
    let common: Vec<ObjectId> = ancestors_a.intersection(&ancestors_b).copied().collect();

    let mut reachable_from: HashMap<ObjectId, HashSet<ObjectId>> = HashMap::new();
    for &candidate in &common {
        reachable_from.insert(candidate, flood_fill(graph, Some(candidate))?);
    }

    let mut result = Vec::new();
    for &candidate in &common {
        let dominated = common.iter().any(|&other| {
            other != candidate && reachable_from[&other].contains(&candidate)
        });
        if !dominated {
            result.push(candidate);
        }
    }
    result.sort_by_key(|id| std::cmp::Reverse(graph.commit_time(id).unwrap_or(0)));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An in-memory commit graph for tests: id -> (parents, time).
    struct Fixture(HashMap<ObjectId, (Vec<ObjectId>, i64)>);

    impl CommitGraph for Fixture {
        fn parents(&self, id: &ObjectId) -> Result<Vec<ObjectId>, Error> {
            Ok(self.0.get(id).map(|(p, _)| p.clone()).unwrap_or_default())
        }
        fn commit_time(&self, id: &ObjectId) -> Result<i64, Error> {
            Ok(self.0.get(id).map(|(_, t)| *t).unwrap_or(0))
        }
    }

    fn oid(byte: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        ObjectId::from_bytes(&bytes)
    }

    /// root(1) <- a(2) <- b(3) <- c(4), a linear chain.
    fn linear() -> Fixture {
        let mut graph = HashMap::new();
        graph.insert(oid(1), (vec![], 100));
        graph.insert(oid(2), (vec![oid(1)], 200));
        graph.insert(oid(3), (vec![oid(2)], 300));
        graph.insert(oid(4), (vec![oid(3)], 400));
        Fixture(graph)
    }

    #[test]
    fn walk_ancestry_visits_every_commit_newest_first() {
        let graph = linear();
        let out = walk_ancestry(&graph, Some(oid(4)), WalkOptions::default()).unwrap();
        assert_eq!(out, vec![oid(4), oid(3), oid(2), oid(1)]);
    }

    #[test]
    fn walk_ancestry_excludes_uninteresting_ancestry() {
        let graph = linear();
        let excluded = [oid(2)];
        let opts = WalkOptions { uninteresting: &excluded };
        let out = walk_ancestry(&graph, Some(oid(4)), opts).unwrap();
        assert_eq!(out, vec![oid(4), oid(3)]);
    }

    #[test]
    fn is_ancestor_true_for_reachable_and_false_for_descendant() {
        let graph = linear();
        assert!(is_ancestor(&graph, &oid(1), &oid(4)).unwrap());
        assert!(!is_ancestor(&graph, &oid(4), &oid(1)).unwrap());
        assert!(is_ancestor(&graph, &oid(3), &oid(3)).unwrap());
    }

    /// root(1) branches into x(2)/y(3), both merge into m(4).
    fn diamond() -> Fixture {
        let mut graph = HashMap::new();
        graph.insert(oid(1), (vec![], 100));
        graph.insert(oid(2), (vec![oid(1)], 200));
        graph.insert(oid(3), (vec![oid(1)], 200));
        graph.insert(oid(4), (vec![oid(2), oid(3)], 300));
        Fixture(graph)
    }

    #[test]
    fn find_merge_base_of_a_commit_and_its_own_ancestor() {
        let graph = diamond();
        let bases = find_merge_base(&graph, &oid(2), &oid(1)).unwrap();
        assert_eq!(bases, vec![oid(1)]);
    }

    #[test]
    fn find_merge_base_of_diamond_siblings_is_their_shared_root() {
        let graph = diamond();
        let bases = find_merge_base(&graph, &oid(2), &oid(3)).unwrap();
        assert_eq!(bases, vec![oid(1)]);
    }
}
