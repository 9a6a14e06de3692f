//! Hashtag encoding of item tags inside the notes field.
//!
//! EventKit has no native tagging, so tags live in a trailing block of
//! `#token` words at the end of an item's notes:
//!
//! ```text
//! Pick up the dry cleaning before noon.
//!
//! #errand #home
//! ```
//!
//! The block must start at the beginning of a line and run to the end of
//! the text, containing nothing but `#token` words separated by whitespace.
//! Tokens are ASCII letters, digits and underscores, matched
//! case-insensitively and reported in lowercase.
//!
//! Encoding always produces a deduplicated, sorted, normalized block, so
//! `decode_tags(&merge_notes_with_tags(n, t))` yields the cleaned notes of
//! `n` and the normalized sorted set of `t`.

use std::collections::BTreeSet;

/// Separator placed between user notes and the tag block.
const BLOCK_SEPARATOR: &str = "\n\n";

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parse `text` as a complete tag block, returning the lowercase tokens in
/// written order, or `None` if anything other than `#token` words and
/// whitespace appears.
fn parse_tag_block(text: &str) -> Option<Vec<String>> {
    let mut rest = text;
    let mut tags = Vec::new();
    while let Some(after_hash) = rest.strip_prefix('#') {
        let len = after_hash
            .find(|c: char| !is_tag_char(c))
            .unwrap_or(after_hash.len());
        if len == 0 {
            return None;
        }
        tags.push(after_hash[..len].to_ascii_lowercase());
        rest = after_hash[len..].trim_start();
    }
    if tags.is_empty() || !rest.is_empty() {
        return None;
    }
    Some(tags)
}

/// Byte offset of the earliest line start whose remainder is a tag block.
fn find_tag_block(notes: &str) -> Option<(usize, Vec<String>)> {
    let line_starts =
        std::iter::once(0).chain(notes.match_indices('\n').map(|(i, _)| i + 1));
    for start in line_starts {
        if let Some(tags) = parse_tag_block(&notes[start..]) {
            return Some((start, tags));
        }
    }
    None
}

/// Normalize a tag: trim, lowercase, fold whitespace/hyphen runs to `_`,
/// then drop anything outside `[a-z0-9_]`.
pub fn normalize_tag(tag: &str) -> String {
    let lowered = tag.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut in_separator = false;
    for c in lowered.chars() {
        if c.is_whitespace() || c == '-' {
            if !in_separator {
                out.push('_');
                in_separator = true;
            }
            continue;
        }
        in_separator = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            out.push(c);
        }
    }
    out
}

/// Normalized, deduplicated, sorted tag set.
pub fn normalized_tag_set<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    tags.iter()
        .map(|t| t.as_ref())
        .filter(|t| !t.trim().is_empty())
        .map(normalize_tag)
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Encode tags as the suffix appended to notes (`"\n\n#a #b"`).
///
/// Returns an empty string when no usable tag remains after normalization.
pub fn encode_tags<S: AsRef<str>>(tags: &[S]) -> String {
    let set = normalized_tag_set(tags);
    if set.is_empty() {
        return String::new();
    }
    let words: Vec<String> = set.iter().map(|t| format!("#{t}")).collect();
    format!("{BLOCK_SEPARATOR}{}", words.join(" "))
}

/// Split notes into the user-visible text and the trailing tag list.
///
/// Notes without a tag block are returned unchanged with no tags.
pub fn decode_tags(notes: &str) -> (String, Vec<String>) {
    if notes.is_empty() {
        return (String::new(), Vec::new());
    }
    match find_tag_block(notes) {
        Some((start, tags)) => (notes[..start].trim().to_owned(), tags),
        None => (notes.to_owned(), Vec::new()),
    }
}

/// Replace any existing tag block in `notes` with one built from `tags`.
///
/// `None` or an empty list strips the block without adding a new one.
pub fn merge_notes_with_tags<S: AsRef<str>>(notes: &str, tags: Option<&[S]>) -> String {
    let (clean, _) = decode_tags(notes);
    let suffix = tags.map(encode_tags).unwrap_or_default();

    match (clean.is_empty(), suffix.is_empty()) {
        (false, false) => clean + &suffix,
        (false, true) => clean,
        (true, false) => suffix.trim().to_owned(),
        (true, true) => String::new(),
    }
}

/// Add and remove individual tags, keeping the rest of the notes intact.
pub fn update_tags<A: AsRef<str>, R: AsRef<str>>(notes: &str, add: &[A], remove: &[R]) -> String {
    let (clean, existing) = decode_tags(notes);
    let mut set: BTreeSet<String> = existing
        .iter()
        .map(|t| normalize_tag(t))
        .filter(|t| !t.is_empty())
        .collect();
    for tag in add {
        let normalized = normalize_tag(tag.as_ref());
        if !normalized.is_empty() {
            set.insert(normalized);
        }
    }
    for tag in remove {
        set.remove(&normalize_tag(tag.as_ref()));
    }
    let tags: Vec<String> = set.into_iter().collect();
    merge_notes_with_tags(&clean, Some(tags.as_slice()))
}

/// AND filter: true when every non-blank `required` tag is in `tags`.
pub fn has_all_tags<S: AsRef<str>>(tags: &[String], required: &[S]) -> bool {
    let have: BTreeSet<String> = tags.iter().map(|t| normalize_tag(t)).collect();
    normalized_tag_set(required)
        .iter()
        .all(|needed| have.contains(needed))
}
