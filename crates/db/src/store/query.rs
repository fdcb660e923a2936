//! Evaluation of the MongoDB filter/update/sort subset used by the services.
//!
//! Filters: field equality (dotted paths, `null` matches a missing field,
//! array fields match on any element), `$eq`, `$ne`, `$in`, `$nin`, `$gt`,
//! `$gte`, `$lt`, `$lte`, `$exists`, `$regex` (+ `$options`), `$or`, `$and`.
//! Updates: `$set`, `$unset`, `$inc`.

use bson::{Bson, Document};
use std::cmp::Ordering;

use super::{StoreError, StoreResult};

pub(crate) fn matches(doc: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(doc, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            op if op.starts_with('$') => {
                return Err(StoreError::Unsupported(format!("top-level operator {op}")));
            }
            field => matches_condition(lookup(doc, field), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(op: &str, condition: &'a Bson) -> StoreResult<Vec<&'a Document>> {
    let Bson::Array(items) = condition else {
        return Err(StoreError::Unsupported(format!("{op} expects an array")));
    };
    items
        .iter()
        .map(|item| {
            item.as_document()
                .ok_or_else(|| StoreError::Unsupported(format!("{op} expects documents")))
        })
        .collect()
}

pub(crate) fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut current = doc;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        let value = current.get(part)?;
        if parts.peek().is_none() {
            return Some(value);
        }
        current = value.as_document()?;
    }
    None
}

fn is_operator_doc(condition: &Bson) -> Option<&Document> {
    match condition {
        Bson::Document(d) if !d.is_empty() && d.keys().all(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn matches_condition(value: Option<&Bson>, condition: &Bson) -> StoreResult<bool> {
    let Some(ops) = is_operator_doc(condition) else {
        return Ok(equals(value, condition));
    };

    for (op, arg) in ops {
        let ok = match op.as_str() {
            "$eq" => equals(value, arg),
            "$ne" => !equals(value, arg),
            "$in" => in_list(value, arg)?,
            "$nin" => !in_list(value, arg)?,
            "$gt" => compare_to(value, arg).is_some_and(|o| o == Ordering::Greater),
            "$gte" => compare_to(value, arg).is_some_and(|o| o != Ordering::Less),
            "$lt" => compare_to(value, arg).is_some_and(|o| o == Ordering::Less),
            "$lte" => compare_to(value, arg).is_some_and(|o| o != Ordering::Greater),
            "$exists" => {
                let present = value.is_some();
                match arg {
                    Bson::Boolean(want) => present == *want,
                    _ => present,
                }
            }
            "$regex" => {
                let case_insensitive = ops
                    .get_str("$options")
                    .map(|o| o.contains('i'))
                    .unwrap_or(false);
                regex_like(value, arg, case_insensitive)?
            }
            "$options" => true,
            other => {
                return Err(StoreError::Unsupported(format!("operator {other}")));
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match (value, expected) {
        (None | Some(Bson::Null), Bson::Null) => true,
        (None, _) => false,
        (Some(Bson::Array(items)), expected) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        (Some(actual), expected) => values_equal(actual, expected),
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn in_list(value: Option<&Bson>, arg: &Bson) -> StoreResult<bool> {
    let Bson::Array(candidates) = arg else {
        return Err(StoreError::Unsupported("$in expects an array".into()));
    };
    Ok(candidates.iter().any(|c| equals(value, c)))
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn compare_to(value: Option<&Bson>, arg: &Bson) -> Option<Ordering> {
    compare_values(value?, arg)
}

/// Ordering between two values of the same kind; `None` across kinds.
pub(crate) fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Sort comparison: missing and null sort first, other kinds compare by rank.
pub(crate) fn sort_cmp(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let rank = |v: Option<&Bson>| match v {
        None | Some(Bson::Null) => 0,
        Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => 1,
        Some(Bson::String(_)) => 2,
        Some(Bson::Document(_)) => 3,
        Some(Bson::Array(_)) => 4,
        Some(Bson::ObjectId(_)) => 5,
        Some(Bson::Boolean(_)) => 6,
        Some(Bson::DateTime(_)) => 7,
        Some(_) => 8,
    };
    match (a, b) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or_else(|| rank(a).cmp(&rank(b))),
        _ => rank(a).cmp(&rank(b)),
    }
}

pub(crate) fn sort_documents(docs: &mut [Document], sort: &Document) {
    docs.sort_by(|a, b| {
        for (field, direction) in sort {
            let descending = as_number(direction).is_some_and(|d| d < 0.0);
            let ord = sort_cmp(lookup(a, field), lookup(b, field));
            let ord = if descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Patterns are matched as literal substrings once regex escapes are removed;
/// callers escape user input before building a `$regex`.
fn regex_like(value: Option<&Bson>, pattern: &Bson, case_insensitive: bool) -> StoreResult<bool> {
    let pattern = match pattern {
        Bson::String(p) => p.as_str(),
        Bson::RegularExpression(re) => re.pattern.as_str(),
        _ => return Err(StoreError::Unsupported("$regex expects a string".into())),
    };
    let (anchored_start, pattern) = match pattern.strip_prefix('^') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    let needle = unescape(pattern);

    let Some(Bson::String(haystack)) = value else {
        return Ok(false);
    };
    let (haystack, needle) = if case_insensitive {
        (haystack.to_lowercase(), needle.to_lowercase())
    } else {
        (haystack.clone(), needle)
    };
    Ok(if anchored_start {
        haystack.starts_with(&needle)
    } else {
        haystack.contains(&needle)
    })
}

fn unescape(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn apply_update(doc: &mut Document, update: &Document) -> StoreResult<bool> {
    let mut changed = false;
    for (op, fields) in update {
        let fields = fields
            .as_document()
            .ok_or_else(|| StoreError::Unsupported(format!("{op} expects a document")))?;
        match op.as_str() {
            "$set" => {
                for (path, value) in fields {
                    if lookup(doc, path) != Some(value) {
                        set_path(doc, path, value.clone())?;
                        changed = true;
                    }
                }
            }
            "$unset" => {
                for (path, _) in fields {
                    changed |= unset_path(doc, path);
                }
            }
            "$inc" => {
                for (path, delta) in fields {
                    let current = lookup(doc, path).cloned().unwrap_or(Bson::Int32(0));
                    let next = increment(&current, delta)?;
                    set_path(doc, path, next)?;
                    changed = true;
                }
            }
            other => {
                return Err(StoreError::Unsupported(format!("update operator {other}")));
            }
        }
    }
    Ok(changed)
}

fn increment(current: &Bson, delta: &Bson) -> StoreResult<Bson> {
    match (current, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => Ok(Bson::Int32(a + b)),
        (Bson::Int64(a), Bson::Int64(b)) => Ok(Bson::Int64(a + b)),
        (Bson::Int32(a), Bson::Int64(b)) => Ok(Bson::Int64(i64::from(*a) + b)),
        (Bson::Int64(a), Bson::Int32(b)) => Ok(Bson::Int64(a + i64::from(*b))),
        _ => match (as_number(current), as_number(delta)) {
            (Some(a), Some(b)) => Ok(Bson::Double(a + b)),
            _ => Err(StoreError::Unsupported("$inc on a non-numeric field".into())),
        },
    }
}

fn set_path(doc: &mut Document, path: &str, value: Bson) -> StoreResult<()> {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !matches!(doc.get(head), Some(Bson::Document(_))) {
                doc.insert(head, Document::new());
            }
            match doc.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => Err(StoreError::Unsupported(format!("cannot set {path}"))),
            }
        }
    }
}

fn unset_path(doc: &mut Document, path: &str) -> bool {
    match path.split_once('.') {
        None => doc.remove(path).is_some(),
        Some((head, rest)) => match doc.get_mut(head) {
            Some(Bson::Document(inner)) => unset_path(inner, rest),
            _ => false,
        },
    }
}
