//! Callback marshaling
//!
//! Outbound, invocable leaves are pulled out of the parameter structure and
//! replaced by path strings so the remainder serializes cleanly. Inbound,
//! declared paths are spliced back as stub invocables that transmit
//! callback-invocation messages.
//!
//! Traversal is depth-first over maps in enumeration order. Lists are not
//! descended into: an invocable inside a list (or at the root) is not
//! addressable by a key path and serializes as `null`.

use crate::params::{Callback, Params};
use channel_types::CallbackPath;

/// Extracts every invocable reachable through map keys.
///
/// Each extracted entry is removed from `params` and returned with the
/// `/`-joined path of the keys that led to it.
pub fn extract(params: &mut Params) -> Vec<(CallbackPath, Callback)> {
    let mut found = Vec::new();
    let mut prefix = Vec::new();
    walk(params, &mut prefix, &mut found);
    found
}

fn walk(node: &mut Params, prefix: &mut Vec<String>, found: &mut Vec<(CallbackPath, Callback)>) {
    let entries = match node {
        Params::Map(entries) => entries,
        _ => return,
    };

    let mut i = 0;
    while i < entries.len() {
        if matches!(entries[i].1, Params::Callback(_)) {
            let (key, value) = entries.remove(i);
            if let Params::Callback(cb) = value {
                prefix.push(key);
                found.push((CallbackPath::from_segments(prefix.iter()), cb));
                prefix.pop();
            }
            continue;
        }
        if matches!(entries[i].1, Params::Map(_)) {
            let key = entries[i].0.clone();
            prefix.push(key);
            walk(&mut entries[i].1, prefix, found);
            prefix.pop();
        }
        i += 1;
    }
}

/// Splices a stub invocable into `params` at every declared path.
///
/// Intermediate maps are created as needed; an intermediate (or root) that
/// is not a map is replaced by one.
pub fn splice<F>(params: &mut Params, paths: &[CallbackPath], mut make_stub: F)
where
    F: FnMut(&CallbackPath) -> Callback,
{
    for path in paths {
        if path.is_empty() {
            log::warn!("ignoring empty callback path");
            continue;
        }
        let stub = Params::Callback(make_stub(path));
        set_at_path(params, path, stub);
    }
}

fn set_at_path(root: &mut Params, path: &CallbackPath, leaf: Params) {
    let segments: Vec<&str> = path.segments().collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut node = root;
    for segment in parents {
        if !matches!(node, Params::Map(_)) {
            *node = Params::Map(Vec::new());
        }
        node = match node {
            Params::Map(entries) => child_slot(entries, segment),
            _ => return,
        };
    }

    if !matches!(node, Params::Map(_)) {
        *node = Params::Map(Vec::new());
    }
    if let Params::Map(entries) = node {
        match entries.iter().position(|(k, _)| k == *last) {
            Some(pos) => entries[pos].1 = leaf,
            None => entries.push(((*last).to_string(), leaf)),
        }
    }
}

fn child_slot<'a>(entries: &'a mut Vec<(String, Params)>, key: &str) -> &'a mut Params {
    if let Some(pos) = entries.iter().position(|(k, _)| k == key) {
        if !matches!(entries[pos].1, Params::Map(_)) {
            entries[pos].1 = Params::Map(Vec::new());
        }
        &mut entries[pos].1
    } else {
        entries.push((key.to_string(), Params::Map(Vec::new())));
        let last = entries.len() - 1;
        &mut entries[last].1
    }
}
