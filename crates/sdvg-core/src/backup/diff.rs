//! Structural config diff for resume validation.
//!
//! Compares the live config snapshot against the backup tree: objects by
//! key union, equal-length arrays elementwise, unequal primitive arrays
//! wholesale, and unequal arrays of named objects aligned by a
//! longest-common-subsequence over their `name` keys so an inserted column
//! reports one ADDED path instead of cascading mismatches. Numbers compare
//! as doubles, absorbing the integer-vs-JSON-float round trip.

use serde_json::Value;

/// One divergent path, rendered as `path old -> new`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub path: String,
    pub old: String,
    pub new: String,
}

impl DiffEntry {
    fn changed(path: &str, old: &Value, new: &Value) -> DiffEntry {
        DiffEntry {
            path: path.to_string(),
            old: render(old),
            new: render(new),
        }
    }

    fn removed(path: &str, old: &Value) -> DiffEntry {
        DiffEntry {
            path: path.to_string(),
            old: render(old),
            new: "<none>".to_string(),
        }
    }

    fn added(path: &str, new: &Value) -> DiffEntry {
        DiffEntry {
            path: path.to_string(),
            old: "<none>".to_string(),
            new: render(new),
        }
    }
}

/// Compare `old` (the backup) with `new` (the live snapshot).
pub fn diff(old: &Value, new: &Value) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    walk("", old, new, &mut entries);
    entries
}

/// Multi-line `path old -> new` report.
pub fn render_diff(entries: &[DiffEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("  {} {} -> {}", e.path, e.old, e.new))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fields whose object values are user-keyed maps; their children render
/// with bracket paths (`models[users]`) instead of field dots.
const MAP_FIELDS: &[&str] = &["models", "headers"];

fn is_map_field(path: &str) -> bool {
    let last = path
        .rsplit(['.', '[', ']'])
        .find(|s| !s.is_empty())
        .unwrap_or("");
    MAP_FIELDS.contains(&last)
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else if is_map_field(path) {
        format!("{}[{}]", path, key)
    } else {
        format!("{}.{}", path, key)
    }
}

fn walk(path: &str, old: &Value, new: &Value, out: &mut Vec<DiffEntry>) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            let mut keys: Vec<&String> = old_map.keys().chain(new_map.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = child_path(path, key);
                match (old_map.get(key.as_str()), new_map.get(key.as_str())) {
                    (Some(o), Some(n)) => walk(&child, o, n, out),
                    (Some(o), None) => out.push(DiffEntry::removed(&child, o)),
                    (None, Some(n)) => out.push(DiffEntry::added(&child, n)),
                    (None, None) => unreachable!("key came from one of the maps"),
                }
            }
        }
        (Value::Array(old_arr), Value::Array(new_arr)) => {
            walk_arrays(path, old_arr, new_arr, out);
        }
        (Value::Number(a), Value::Number(b)) => {
            // Integers wider than the JSON-safe range deserialize back as
            // floats; numeric equality after double conversion absorbs it.
            if a.as_f64() != b.as_f64() {
                out.push(DiffEntry::changed(path, old, new));
            }
        }
        (a, b) => {
            if a != b {
                out.push(DiffEntry::changed(path, old, new));
            }
        }
    }
}

fn walk_arrays(path: &str, old: &[Value], new: &[Value], out: &mut Vec<DiffEntry>) {
    if old.len() == new.len() {
        for (i, (o, n)) in old.iter().zip(new.iter()).enumerate() {
            walk(&format!("{}[{}]", path, i), o, n, out);
        }
        return;
    }

    let complex = old.iter().chain(new.iter()).any(|v| v.is_object());
    if !complex {
        out.push(DiffEntry::changed(
            path,
            &Value::Array(old.to_vec()),
            &Value::Array(new.to_vec()),
        ));
        return;
    }

    // Align by LCS over shallow keys so one insertion or removal yields one
    // ADDED/REMOVED entry at a stable path.
    for op in lcs_ops(old, new) {
        match op {
            LcsOp::Both(i, j) => {
                walk(&format!("{}[{}]", path, element_label(&old[i], i)), &old[i], &new[j], out);
            }
            LcsOp::OnlyOld(i) => out.push(DiffEntry::removed(
                &format!("{}[{}]", path, element_label(&old[i], i)),
                &old[i],
            )),
            LcsOp::OnlyNew(j) => out.push(DiffEntry::added(
                &format!("{}[{}]", path, element_label(&new[j], j)),
                &new[j],
            )),
        }
    }
}

/// Shallow identity of an array element: its `name` key when present,
/// otherwise the whole value.
fn element_key(value: &Value) -> Value {
    value
        .get("name")
        .cloned()
        .unwrap_or_else(|| value.clone())
}

fn element_label(value: &Value, index: usize) -> String {
    match value.get("name") {
        Some(Value::String(name)) => name.clone(),
        _ => index.to_string(),
    }
}

enum LcsOp {
    Both(usize, usize),
    OnlyOld(usize),
    OnlyNew(usize),
}

fn lcs_ops(old: &[Value], new: &[Value]) -> Vec<LcsOp> {
    let n = old.len();
    let m = new.len();
    let old_keys: Vec<Value> = old.iter().map(element_key).collect();
    let new_keys: Vec<Value> = new.iter().map(element_key).collect();

    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if old_keys[i] == new_keys[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old_keys[i] == new_keys[j] {
            ops.push(LcsOp::Both(i, j));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            ops.push(LcsOp::OnlyOld(i));
            i += 1;
        } else {
            ops.push(LcsOp::OnlyNew(j));
            j += 1;
        }
    }
    while i < n {
        ops.push(LcsOp::OnlyOld(i));
        i += 1;
    }
    while j < m {
        ops.push(LcsOp::OnlyNew(j));
        j += 1;
    }
    ops
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
