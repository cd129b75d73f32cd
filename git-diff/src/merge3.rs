use bstr::{BStr, BString};

use crate::text::{diff_lines, LineOp};

/// The result of a line-level three-way merge.
#[derive(Debug, Clone)]
pub struct Merge3Result {
    pub content: BString,
    pub has_conflicts: bool,
}

/// Whether to emit the base hunk (`|||||||`) in a conflict, i.e. diff3 rather than merge style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictStyle {
    Merge,
    Diff3,
}

/// Diff3-style line merge of `ours`/`theirs` against `base`. Non-conflicting hunks merge
/// silently; conflicting hunks are wrapped in `<<<<<<< ours` / `=======` / `>>>>>>> theirs`
/// markers (with a `||||||| base` section inserted first under [`ConflictStyle::Diff3`]).
pub fn merge_lines(base: &[u8], ours: &[u8], theirs: &[u8], style: ConflictStyle) -> Merge3Result {
    let base_lines = crate::lines::split_lines(base);
    let ours_lines = crate::lines::split_lines(ours);
    let theirs_lines = crate::lines::split_lines(theirs);

    let ours_ops = diff_lines(&base_lines, &ours_lines);
    let theirs_ops = diff_lines(&base_lines, &theirs_lines);

    let ours_changes = changes_by_base_line(&ours_ops, base_lines.len());
    let theirs_changes = changes_by_base_line(&theirs_ops, base_lines.len());

    let mut out = Vec::new();
    let mut has_conflicts = false;
    let mut base_idx = 0;
    while base_idx < base_lines.len() {
        let our_change = ours_changes.get(base_idx);
        let their_change = theirs_changes.get(base_idx);
        match (our_change, their_change) {
            (None, None) => {
                out.push(base_lines[base_idx]);
                base_idx += 1;
            }
            (Some(change), None) => {
                emit_replacement(&mut out, change, &ours_lines);
                base_idx = change.base_end;
            }
            (None, Some(change)) => {
                emit_replacement(&mut out, change, &theirs_lines);
                base_idx = change.base_end;
            }
            (Some(ours_change), Some(theirs_change)) => {
                let ours_text = replacement_text(ours_change, &ours_lines);
                let theirs_text = replacement_text(theirs_change, &theirs_lines);
                if ours_text == theirs_text {
                    out.extend(ours_text.iter().copied());
                } else {
                    has_conflicts = true;
                    out.push(BStr::new(b"<<<<<<< ours\n"));
                    out.extend(ours_text.iter().copied());
                    if style == ConflictStyle::Diff3 {
                        out.push(BStr::new(b"||||||| base\n"));
                        out.extend(base_lines[base_idx..ours_change.base_end.max(theirs_change.base_end)].iter().copied());
                    }
                    out.push(BStr::new(b"=======\n"));
                    out.extend(theirs_text.iter().copied());
                    out.push(BStr::new(b">>>>>>> theirs\n"));
                }
                base_idx = ours_change.base_end.max(theirs_change.base_end);
            }
        }
    }

    let mut content = BString::from(Vec::new());
    for line in out {
        content.extend_from_slice(line);
    }
    Merge3Result { content, has_conflicts }
}

/// A side's replacement of `base[base_start..base_end]` with `side[side_start..side_end]`.
#[derive(Debug, Clone, Copy)]
struct Change {
    base_start: usize,
    base_end: usize,
    side_start: usize,
    side_end: usize,
}

fn replacement_text<'a>(change: &Change, side_lines: &[&'a BStr]) -> Vec<&'a BStr> {
    side_lines[change.side_start..change.side_end].to_vec()
}

fn emit_replacement<'a>(out: &mut Vec<&'a BStr>, change: &Change, side_lines: &[&'a BStr]) {
    out.extend(replacement_text(change, side_lines));
}

/// Build a lookup from each base line index to the [`Change`] that covers it, derived
/// from a base-vs-side [`LineOp`] sequence. Equal spans contribute no entries.
fn changes_by_base_line(ops: &[LineOp], base_len: usize) -> BaseChanges {
    let mut changes: Vec<Option<Change>> = vec![None; base_len];
    let mut pending: Option<Change> = None;

    for op in ops {
        match *op {
            LineOp::Equal { .. } => flush(&mut pending, &mut changes),
            LineOp::Delete { old_start, len } => {
                let change = pending.get_or_insert(Change { base_start: old_start, base_end: old_start, side_start: 0, side_end: 0 });
                change.base_end = old_start + len;
            }
            LineOp::Insert { new_start, len } => {
                let change = pending.get_or_insert_with(|| Change {
                    base_start: base_len,
                    base_end: base_len,
                    side_start: new_start,
                    side_end: new_start,
                });
                if change.side_end == 0 && change.side_start == 0 {
                    change.side_start = new_start;
                }
                change.side_end = new_start + len;
            }
        }
    }
    flush(&mut pending, &mut changes);
    BaseChanges(changes)
}

fn flush(pending: &mut Option<Change>, changes: &mut [Option<Change>]) {
    if let Some(change) = pending.take() {
        if change.base_start < change.base_end {
            changes[change.base_start] = Some(change);
        } else if change.base_start < changes.len() {
            changes[change.base_start] = Some(change);
        }
    }
}

struct BaseChanges(Vec<Option<Change>>);

impl BaseChanges {
    fn get(&self, base_idx: usize) -> Option<&Change> {
        self.0.get(base_idx).and_then(|c| c.as_ref())
    }
}
