//! Deterministic identities for projected entities.
//!
//! Every id is derived from text the bundle itself supplies (names and
//! traversal positions), so converting an unchanged bundle twice yields the
//! same ids. Hashes are SHA-256 hex; uuids are RFC 4122 version 5 under
//! [`NAMESPACE`].

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Namespace for every uuid this crate derives.
pub const NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_8d3b_5f70_9a21_c4e8_b05d_7e13);

/// A `(...)` suffix made only of Swift argument labels (`foo:bar:`) is part
/// of the method name, not a parameterization.
static ARGUMENT_LABELS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*:)+$").expect("argument label pattern compiles")
});

/// Lowercase hex SHA-256 of `text`.
#[must_use]
pub fn content_hash(text: &str) -> String {
    sha256_hex(text.as_bytes())
}

/// Dotted-path qualified name of a test leaf.
#[must_use]
pub fn full_name(package: &str, leaf: &str) -> String {
    if package.is_empty() {
        leaf.to_owned()
    } else {
        format!("{package}.{leaf}")
    }
}

/// Stable id: hash of the full name, parameterization included.
#[must_use]
pub fn stable_id(full_name: &str) -> String {
    content_hash(full_name)
}

/// Historic id: hash of the full name with any parameterization suffix
/// removed, so retries and parameterized variants group together.
///
/// The suite path is part of the hashed name: same-named methods in
/// different classes keep separate histories.
#[must_use]
pub fn historic_id(package: &str, leaf: &str) -> String {
    let (base, _) = split_parameterization(leaf);
    content_hash(&full_name(package, base))
}

/// Result uuid: distinct per occurrence of the same stable id within a run.
#[must_use]
pub fn instance_uuid(stable_id: &str, ordinal: usize) -> String {
    name_uuid(&format!("result:{stable_id}:{ordinal}"))
}

/// Container uuid from its traversal position key.
#[must_use]
pub fn container_uuid(position: &str) -> String {
    name_uuid(&format!("container:{position}"))
}

/// Attachment file name `<hash>-attachment.<ext>`.
#[must_use]
pub fn attachment_source(result_uuid: &str, ordinal: usize, extension: Option<&str>) -> String {
    let hash = content_hash(&format!("attachment:{result_uuid}:{ordinal}"));
    match extension {
        Some(ext) if !ext.is_empty() => format!("{hash}-attachment.{ext}"),
        _ => format!("{hash}-attachment"),
    }
}

/// Split `leaf` into its base name and parameterization arguments.
///
/// A trailing `[...]` is always a parameterization. A trailing `(...)` is
/// one unless it is empty or holds only argument labels.
///
/// ```
/// use xcresults_core::identity::split_parameterization;
///
/// assert_eq!(split_parameterization("testLogin [2]"), ("testLogin", Some("2")));
/// assert_eq!(split_parameterization("testFoo()"), ("testFoo()", None));
/// assert_eq!(split_parameterization("add(a:b:)"), ("add(a:b:)", None));
/// assert_eq!(split_parameterization("add(1, 2)"), ("add", Some("1, 2")));
/// ```
#[must_use]
pub fn split_parameterization(leaf: &str) -> (&str, Option<&str>) {
    let trimmed = leaf.trim_end();
    let (open_char, close_char) = match trimmed.chars().last() {
        Some(']') => ('[', ']'),
        Some(')') => ('(', ')'),
        _ => return (leaf, None),
    };
    let Some(open) = matching_open(trimmed, open_char, close_char) else {
        return (leaf, None);
    };
    let base = trimmed[..open].trim_end();
    let args = &trimmed[open + 1..trimmed.len() - 1];
    if base.is_empty() || args.trim().is_empty() {
        return (leaf, None);
    }
    if close_char == ')' && is_argument_labels(args) {
        return (leaf, None);
    }
    (base, Some(args.trim()))
}

fn is_argument_labels(args: &str) -> bool {
    ARGUMENT_LABELS.is_match(args.trim())
}

/// Byte index of the bracket opening the one that closes `text`.
fn matching_open(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0_usize;
    for (index, ch) in text.char_indices().rev() {
        if ch == close {
            depth += 1;
        } else if ch == open {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(index);
            }
        }
    }
    None
}

fn name_uuid(key: &str) -> String {
    Uuid::new_v5(&NAMESPACE, key.as_bytes()).to_string()
}

fn sha256_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0F)]));
    }
    out
}
