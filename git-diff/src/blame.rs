use std::ops::Range;

use bstr::{BStr, BString, ByteSlice};
use git_hash::ObjectId;
use git_object::tree::EntryMode;
use git_object::{Commit, Kind, Object};

use crate::text::diff_lines;
use crate::tree_merge::flatten;
use crate::Error;

/// One contiguous run of lines in the blamed file attributed to a single commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameEntry {
    pub commit: ObjectId,
    /// The path the line lived under in `commit`, which may differ from the path
    /// blamed at the starting commit if the file was renamed since.
    pub source_path: BString,
    /// 1-based, end-exclusive line range in the file as it reads at the starting commit.
    pub result_line_range: Range<u32>,
    /// 1-based, end-exclusive line range in the file as it read in `commit`. Always the
    /// same length as `result_line_range`.
    pub source_line_range: Range<u32>,
}

/// Attribute every line of `path` as it exists at `start_commit` to the commit that last
/// changed it, walking first-parent ancestry (preferring, at a merge commit, whichever
/// parent's version of the file differs least from what the merge recorded) and
/// following renames by blob identity or by line similarity once no same-named file
/// exists in the next generation.
pub fn blame_file<S: git_odb::Find>(odb: &S, start_commit: ObjectId, path: &BStr) -> Result<Vec<BlameEntry>, Error> {
    let head_content = load_path_content(odb, &start_commit, path)?.unwrap_or_default();
    let head_lines = crate::lines::split_lines(&head_content);
    let head_len = head_lines.len();

    let mut owners: Vec<Option<(ObjectId, BString, usize)>> = vec![None; head_len];

    let mut commit = start_commit;
    let mut current_path = path.to_owned();
    let mut content: Vec<BString> = head_lines.iter().map(|l| BString::from(l.to_vec())).collect();
    let mut head_index: Vec<usize> = (0..head_len).collect();

    loop {
        if head_index.is_empty() {
            break;
        }
        let commit_obj = load_commit(odb, &commit)?;
        let parent = choose_parent(odb, &commit_obj, &current_path, &content)?;

        let Some((parent_id, parent_path, parent_content)) = parent else {
            for (i, &head_idx) in head_index.iter().enumerate() {
                if owners[head_idx].is_none() {
                    owners[head_idx] = Some((commit, current_path.clone(), i));
                }
            }
            break;
        };

        let parent_refs: Vec<&BStr> = parent_content.iter().map(|l| l.as_bstr()).collect();
        let current_refs: Vec<&BStr> = content.iter().map(|l| l.as_bstr()).collect();
        let ops = diff_lines(&parent_refs, &current_refs);

        for op in &ops {
            if let crate::text::LineOp::Insert { new_start, len } = *op {
                for k in 0..len {
                    let new_idx = new_start + k;
                    let head_idx = head_index[new_idx];
                    if owners[head_idx].is_none() {
                        owners[head_idx] = Some((commit, current_path.clone(), new_idx));
                    }
                }
            }
        }

        let mut next_content = Vec::new();
        let mut next_head_index = Vec::new();
        for op in &ops {
            if let crate::text::LineOp::Equal { old_start, new_start, len } = *op {
                for k in 0..len {
                    let new_idx = new_start + k;
                    let old_idx = old_start + k;
                    if owners[head_index[new_idx]].is_none() {
                        next_content.push(parent_content[old_idx].clone());
                        next_head_index.push(head_index[new_idx]);
                    }
                }
            }
        }

        commit = parent_id;
        current_path = parent_path;
        content = next_content;
        head_index = next_head_index;
    }

    Ok(group_into_entries(&owners))
}

fn group_into_entries(owners: &[Option<(ObjectId, BString, usize)>]) -> Vec<BlameEntry> {
    let mut entries = Vec::new();
    let mut i = 0;
    while i < owners.len() {
        let (commit, path, source_start) = owners[i].clone().expect("every head line is attributed by the time the walk ends");
        let mut j = i + 1;
        while j < owners.len() {
            match &owners[j] {
                Some((c, p, s)) if *c == commit && p == &path && *s == source_start + (j - i) => j += 1,
                _ => break,
            }
        }
        entries.push(BlameEntry {
            commit,
            source_path: path,
            result_line_range: (i + 1) as u32..(j + 1) as u32,
            source_line_range: (source_start + 1) as u32..(source_start + 1 + (j - i)) as u32,
        });
        i = j;
    }
    entries
}

fn load_commit<S: git_odb::Find>(odb: &S, id: &ObjectId) -> Result<Commit, Error> {
    match odb.load(id)? {
        Object::Commit(commit) => Ok(commit),
        other => Err(Error::UnexpectedObjectKind { expected: Kind::Commit, actual: other.kind() }),
    }
}

fn lookup_path<S: git_odb::Find>(odb: &S, tree_id: &ObjectId, path: &BStr) -> Result<Option<(EntryMode, ObjectId)>, Error> {
    let mut current = *tree_id;
    let components: Vec<&[u8]> = path.split(|&b| b == b'/').collect();
    for (i, comp) in components.iter().enumerate() {
        let object = odb.load(&current)?;
        let tree = match object {
            Object::Tree(tree) => tree,
            other => return Err(Error::UnexpectedObjectKind { expected: Kind::Tree, actual: other.kind() }),
        };
        match tree.entries.iter().find(|e| e.filename.as_bstr() == comp.as_bstr()) {
            None => return Ok(None),
            Some(entry) => {
                if i == components.len() - 1 {
                    return Ok(Some((entry.mode, entry.id)));
                }
                if !entry.mode.is_tree() {
                    return Ok(None);
                }
                current = entry.id;
            }
        }
    }
    Ok(None)
}

fn load_path_content<S: git_odb::Find>(odb: &S, commit_id: &ObjectId, path: &BStr) -> Result<Option<Vec<u8>>, Error> {
    let commit = load_commit(odb, commit_id)?;
    match lookup_path(odb, &commit.tree, path)? {
        Some((mode, id)) if !mode.is_tree() => match odb.load(&id)? {
            Object::Blob(data) => Ok(Some(data)),
            other => Err(Error::UnexpectedObjectKind { expected: Kind::Blob, actual: other.kind() }),
        },
        _ => Ok(None),
    }
}

/// Same-file content similarity: the fraction of `new`'s lines matched `Equal` against
/// `old` by a patience diff. Used to decide whether a differently-named blob in the
/// parent tree is a rename of the current file.
fn line_similarity(old: &[BString], new: &[BString]) -> f64 {
    if new.is_empty() {
        return if old.is_empty() { 1.0 } else { 0.0 };
    }
    let old_refs: Vec<&BStr> = old.iter().map(|l| l.as_bstr()).collect();
    let new_refs: Vec<&BStr> = new.iter().map(|l| l.as_bstr()).collect();
    let ops = diff_lines(&old_refs, &new_refs);
    let equal_lines: usize = ops
        .iter()
        .map(|op| match op {
            crate::text::LineOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum();
    equal_lines as f64 / new.len() as f64
}

/// Find the best rename candidate for `content` among `tree`'s blobs: an exact content
/// match first, else the highest-similarity match at or above 50%.
fn find_renamed_path<S: git_odb::Find>(
    odb: &S,
    tree_id: &ObjectId,
    content: &[BString],
) -> Result<Option<(BString, Vec<BString>)>, Error> {
    let leaves = flatten(odb, Some(tree_id))?;
    let mut best: Option<(BString, Vec<BString>, f64)> = None;
    for (candidate_path, leaf) in &leaves {
        if leaf.mode.is_tree() {
            continue;
        }
        let candidate_content = match odb.load(&leaf.id)? {
            Object::Blob(data) => data,
            _ => continue,
        };
        let candidate_lines: Vec<BString> =
            crate::lines::split_lines(&candidate_content).into_iter().map(|l| BString::from(l.to_vec())).collect();
        let similarity = line_similarity(&candidate_lines, content);
        if similarity >= 1.0 {
            return Ok(Some((candidate_path.clone(), candidate_lines)));
        }
        if similarity >= 0.5 && best.as_ref().map_or(true, |(_, _, best_sim)| similarity > *best_sim) {
            best = Some((candidate_path.clone(), candidate_lines, similarity));
        }
    }
    Ok(best.map(|(path, lines, _)| (path, lines)))
}

type ParentVersion = (ObjectId, BString, Vec<BString>);

/// Resolve the parent whose version of `path` should be diffed against `content`: among
/// a merge commit's several parents, the one carrying the path whose content differs
/// least; a single-parent commit always uses that parent. Falls back to a rename search
/// in the chosen (or, for a merge, the first) parent's tree when `path` is absent there.
fn choose_parent<S: git_odb::Find>(
    odb: &S,
    commit: &Commit,
    path: &BStr,
    content: &[BString],
) -> Result<Option<ParentVersion>, Error> {
    if commit.parents.is_empty() {
        return Ok(None);
    }

    let mut best: Option<(usize, ParentVersion)> = None;
    for &parent_id in &commit.parents {
        let parent_commit = load_commit(odb, &parent_id)?;
        if let Some((mode, blob_id)) = lookup_path(odb, &parent_commit.tree, path)? {
            if mode.is_tree() {
                continue;
            }
            let parent_content = match odb.load(&blob_id)? {
                Object::Blob(data) => data,
                other => return Err(Error::UnexpectedObjectKind { expected: Kind::Blob, actual: other.kind() }),
            };
            let parent_lines: Vec<BString> =
                crate::lines::split_lines(&parent_content).into_iter().map(|l| BString::from(l.to_vec())).collect();
            let parent_refs: Vec<&BStr> = parent_lines.iter().map(|l| l.as_bstr()).collect();
            let current_refs: Vec<&BStr> = content.iter().map(|l| l.as_bstr()).collect();
            let diff_size: usize = diff_lines(&parent_refs, &current_refs)
                .into_iter()
                .map(|op| match op {
                    crate::text::LineOp::Equal { .. } => 0,
                    crate::text::LineOp::Delete { len, .. } => len,
                    crate::text::LineOp::Insert { len, .. } => len,
                })
                .sum();
            if best.as_ref().map_or(true, |(best_size, _)| diff_size < *best_size) {
                best = Some((diff_size, (parent_id, path.to_owned(), parent_lines)));
            }
        }
    }
    if let Some((_, version)) = best {
        return Ok(Some(version));
    }

    let first_parent_id = commit.parents[0];
    let first_parent_commit = load_commit(odb, &first_parent_id)?;
    if let Some((renamed_path, renamed_content)) = find_renamed_path(odb, &first_parent_commit.tree, content)? {
        return Ok(Some((first_parent_id, renamed_path, renamed_content)));
    }
    Ok(None)
}
