//! Structural diff between two JSON documents, expressed as RFC 6902 patch
//! operations with RFC 6901 pointer paths.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
}

impl PatchOperation {
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Add { path, .. }
            | PatchOperation::Remove { path }
            | PatchOperation::Replace { path, .. } => path,
        }
    }
}

/// Operations that turn `old` into `new`. Empty when the documents are equal.
///
/// Objects are compared key by key. Array items are aligned on their longest
/// common subsequence, so an insertion at the head is a single `add`; an item
/// removed and another inserted at the same spot are diffed in place. Anything
/// else that differs (including a change of JSON type) is a single `replace`.
///
/// Paths are valid when the operations are applied in order.
pub fn json_patch(old: &Value, new: &Value) -> Vec<PatchOperation> {
    let mut ops = Vec::new();
    diff_into(old, new, "", &mut ops);
    ops
}

fn diff_into(old: &Value, new: &Value, path: &str, ops: &mut Vec<PatchOperation>) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, old_value) in old_map {
                let child = child_path(path, key);
                match new_map.get(key) {
                    Some(new_value) => diff_into(old_value, new_value, &child, ops),
                    None => ops.push(PatchOperation::Remove { path: child }),
                }
            }
            for (key, new_value) in new_map {
                if !old_map.contains_key(key) {
                    ops.push(PatchOperation::Add {
                        path: child_path(path, key),
                        value: new_value.clone(),
                    });
                }
            }
        }
        (Value::Array(old_items), Value::Array(new_items)) => {
            diff_arrays(old_items, new_items, path, ops);
        }
        _ => {
            if old != new {
                ops.push(PatchOperation::Replace {
                    path: path.to_string(),
                    value: new.clone(),
                });
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Edit {
    Keep,
    Delete(usize),
    Insert(usize),
}

fn diff_arrays(old: &[Value], new: &[Value], path: &str, ops: &mut Vec<PatchOperation>) {
    let mut index = 0;
    let mut deleted: Vec<usize> = Vec::new();
    let mut inserted: Vec<usize> = Vec::new();

    for edit in align(old, new) {
        match edit {
            Edit::Delete(i) => deleted.push(i),
            Edit::Insert(j) => inserted.push(j),
            Edit::Keep => {
                flush_gap(old, new, &deleted, &inserted, path, &mut index, ops);
                deleted.clear();
                inserted.clear();
                index += 1;
            }
        }
    }
    flush_gap(old, new, &deleted, &inserted, path, &mut index, ops);
}

/// Emits the operations for one run of unmatched items sitting at `index` of
/// the partially patched array.
fn flush_gap(
    old: &[Value],
    new: &[Value],
    deleted: &[usize],
    inserted: &[usize],
    path: &str,
    index: &mut usize,
    ops: &mut Vec<PatchOperation>,
) {
    let paired = deleted.len().min(inserted.len());
    for (&i, &j) in deleted.iter().zip(inserted).take(paired) {
        diff_into(&old[i], &new[j], &child_path(path, &index.to_string()), ops);
        *index += 1;
    }

    // Highest index first so each removal leaves earlier indices valid.
    for offset in (0..deleted.len() - paired).rev() {
        ops.push(PatchOperation::Remove {
            path: child_path(path, &(*index + offset).to_string()),
        });
    }

    for &j in &inserted[paired..] {
        ops.push(PatchOperation::Add {
            path: child_path(path, &index.to_string()),
            value: new[j].clone(),
        });
        *index += 1;
    }
}

/// Edit script from `old` to `new` via a longest-common-subsequence table.
fn align(old: &[Value], new: &[Value]) -> Vec<Edit> {
    let (n, m) = (old.len(), new.len());
    // lcs[i][j] is the LCS length of old[i..] and new[j..].
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut edits = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            edits.push(Edit::Keep);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            edits.push(Edit::Delete(i));
            i += 1;
        } else {
            edits.push(Edit::Insert(j));
            j += 1;
        }
    }
    edits.extend((i..n).map(Edit::Delete));
    edits.extend((j..m).map(Edit::Insert));
    edits
}

fn child_path(parent: &str, token: &str) -> String {
    format!("{parent}/{}", escape_token(token))
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
