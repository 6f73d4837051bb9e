//! Key canonicalization.
//!
//! Every type spelling in the scanned sources — `Cache<string>`,
//! `Cache<T>`, `Repo<User>[]`, `A | B`, inline object shapes — is folded
//! into a single stable identifier so that a dependency declared in one
//! file matches a binding declared in another. All functions here are
//! pure; the same input always yields the same key.

use sha2::{Digest, Sha256};

/// Placeholder key for empty or whitespace-only spellings.
pub const EMPTY_KEY: &str = "_unknown";

/// Canonicalize a type spelling into a valid identifier.
///
/// Generic parameter lists are erased to `<any>` first (nested argument
/// lists included), so `Cache<string>`, `Cache<T>` and `Cache<Repo<User>>`
/// all become `Cache_any`. The result always matches
/// `[A-Za-z_][A-Za-z0-9_]*` and is idempotent: `sanitize(sanitize(t)) ==
/// sanitize(t)`.
pub fn sanitize(spelling: &str) -> String {
    let trimmed = spelling.trim();
    if trimmed.is_empty() {
        return EMPTY_KEY.to_string();
    }
    to_identifier(&erase_generics(trimmed))
}

/// Canonicalize an inheritance spelling, keeping the generic argument
/// structure instead of erasing it.
///
/// Primitive arguments are shortened (`string` → `str`, `number` → `num`,
/// `boolean` → `bool`) so `Repository<string>` becomes `Repository_str`.
pub fn sanitize_inheritance(spelling: &str) -> String {
    let trimmed = spelling.trim();
    if trimmed.is_empty() {
        return EMPTY_KEY.to_string();
    }
    let mut shortened = String::with_capacity(trimmed.len());
    for word in split_words(trimmed) {
        match word {
            Word::Ident(id) => shortened.push_str(match id {
                "string" => "str",
                "number" => "num",
                "boolean" => "bool",
                other => other,
            }),
            Word::Other(ch) => shortened.push(ch),
        }
    }
    to_identifier(&shortened)
}

/// Canonicalize a state-shape spelling.
///
/// Strips `State` / `Interface` / `Type` suffixes, then re-appends
/// `State` unless a semantic suffix (Service, Manager, Store, ...)
/// remains. `TodoState` and `Todo` both canonicalize to `TodoState`;
/// `CounterServiceState` canonicalizes to `CounterService`.
pub fn sanitize_state(spelling: &str) -> String {
    const STRIP: [&str; 3] = ["State", "Interface", "Type"];
    const SEMANTIC: [&str; 7] = [
        "Service",
        "Manager",
        "Store",
        "Repository",
        "Handler",
        "Controller",
        "Provider",
    ];

    let base = sanitize(spelling);
    if base == EMPTY_KEY {
        return base;
    }

    let mut stripped = base.as_str();
    loop {
        let mut changed = false;
        for suffix in STRIP {
            if stripped.len() > suffix.len() {
                if let Some(rest) = stripped.strip_suffix(suffix) {
                    stripped = rest.trim_end_matches('_');
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    if SEMANTIC.iter().any(|s| stripped.ends_with(s)) {
        stripped.to_string()
    } else {
        format!("{stripped}State")
    }
}

/// Canonicalize an array spelling: `T[]` → `T_Array`.
pub fn sanitize_array(element: &str) -> String {
    format!("{}_Array", sanitize(element))
}

/// Canonicalize a union spelling: `A | B` → `A_or_B`.
pub fn sanitize_union(members: &[&str]) -> String {
    if members.is_empty() {
        return EMPTY_KEY.to_string();
    }
    members
        .iter()
        .map(|m| sanitize(m))
        .collect::<Vec<_>>()
        .join("_or_")
}

/// Canonicalize an inline object-literal shape.
///
/// The shape text is whitespace-normalized and hashed, yielding
/// `ObjectType_<8 hex chars>`. Equal shapes spelled with different
/// formatting produce the same key.
pub fn sanitize_object(shape_text: &str) -> String {
    let normalized: String = shape_text.split_whitespace().collect::<Vec<_>>().join(" ");
    let digest = Sha256::digest(normalized.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in &digest[..4] {
        hex.push_str(&format!("{byte:02x}"));
    }
    format!("ObjectType_{hex}")
}

/// Canonicalize an arbitrary spelling, routing by its top-level shape:
/// object literals hash, unions join with `_or_`, arrays get the
/// `_Array` suffix, everything else goes through [`sanitize`].
pub fn canonical_key(spelling: &str) -> String {
    let trimmed = spelling.trim();
    if trimmed.is_empty() {
        return EMPTY_KEY.to_string();
    }
    if trimmed.starts_with('{') {
        return sanitize_object(trimmed);
    }
    let members = split_top_level(trimmed, '|');
    if members.len() > 1 {
        return sanitize_union(&members);
    }
    if let Some(element) = trimmed.strip_suffix("[]") {
        return sanitize_array(element);
    }
    sanitize(trimmed)
}

/// Split on a separator at nesting depth zero (w.r.t. `<>`, `()`, `{}`,
/// `[]`).
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '<' | '(' | '{' | '[' => depth += 1,
            '>' | ')' | '}' | ']' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

/// Join pre-sanitized parts into one composite key.
pub fn composite_key(parts: &[&str]) -> String {
    let joined: Vec<String> = parts.iter().map(|p| sanitize(p)).collect();
    joined.join("_")
}

/// Location-qualified form of a key: `<key>__<fileSegments>_line_<n>`.
///
/// Produced for every binding from its relative path and line number,
/// guaranteeing a unique, exact lookup even when two declarations share
/// a sanitized key.
pub fn location_key(key: &str, rel_path: &str, line: usize) -> String {
    let segments = to_identifier(rel_path);
    format!("{key}__{segments}_line_{line}")
}

// ── Internals ───────────────────────────────────────────────────────────────

/// Replace every balanced `<...>` list with `<any>`.
fn erase_generics(spelling: &str) -> String {
    let mut out = String::with_capacity(spelling.len());
    let chars: Vec<char> = spelling.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '<' {
            let mut depth = 1usize;
            let mut j = i + 1;
            while j < chars.len() && depth > 0 {
                match chars[j] {
                    '<' => depth += 1,
                    '>' => depth -= 1,
                    _ => {}
                }
                j += 1;
            }
            if depth == 0 {
                out.push_str("<any>");
                i = j;
                continue;
            }
            // Unbalanced '<': fall through and let sanitization eat it.
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Character-level sanitization: `[^A-Za-z0-9_]` → `_`, collapse runs,
/// trim edges, force a valid identifier start.
fn to_identifier(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_underscore = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return EMPTY_KEY.to_string();
    }
    let mut result = trimmed.to_string();
    if result.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}

enum Word<'a> {
    Ident(&'a str),
    Other(char),
}

/// Split a spelling into identifier words and single other characters.
fn split_words(text: &str) -> Vec<Word<'_>> {
    let mut words = Vec::new();
    let mut start = None;
    for (i, ch) in text.char_indices() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if start.is_none() {
                start = Some(i);
            }
        } else {
            if let Some(s) = start.take() {
                words.push(Word::Ident(&text[s..i]));
            }
            words.push(Word::Other(ch));
        }
    }
    if let Some(s) = start {
        words.push(Word::Ident(&text[s..]));
    }
    words
}
