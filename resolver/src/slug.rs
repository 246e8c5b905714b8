//! Slug normalization.
//!
//! Incoming path segments may be percent-encoded (sometimes twice), carry
//! tracking query strings, or contain the doubled separators produced by old
//! slug generators. [`normalize`] reduces all of them to one canonical form and
//! is idempotent. [`candidates`] builds the short ordered list of spellings
//! tried against upstreams that may have stored either form.

use percent_encoding::percent_decode_str;

/// Returns the canonical form of a raw slug or path.
///
/// Never fails: text that does not decode to valid UTF-8 is kept as-is.
pub fn normalize(raw: &str) -> String {
    // Every step only ever removes bytes, so this converges.
    let mut current = normalize_pass(raw);
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Returns the normalized form followed by the trimmed raw form when they differ.
pub fn candidates(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(2);
    for candidate in [normalize(raw), raw.trim().to_string()] {
        if !candidate.is_empty() && !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

fn normalize_pass(raw: &str) -> String {
    let stripped = strip_query_fragment(raw.trim());
    let decoded = decode(stripped);
    // Decoding may expose an encoded `?` or `#`.
    let stripped = strip_query_fragment(&decoded);
    let collapsed = collapse_runs(stripped);

    collapsed
        .trim_end_matches(|c: char| c == '-' || c == '/' || c.is_whitespace())
        .trim_start()
        .to_string()
}

fn strip_query_fragment(s: &str) -> &str {
    match s.find(['?', '#']) {
        Some(idx) => &s[..idx],
        None => s,
    }
}

/// Percent-decodes until the text stops changing. The first failure keeps the
/// last valid text.
fn decode(s: &str) -> String {
    let mut current = s.to_string();
    loop {
        let next = match percent_decode_str(&current).decode_utf8() {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => return current,
        };
        if next == current {
            return current;
        }
        current = next;
    }
}

fn collapse_runs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if (c == '-' || c == '/') && prev == Some(c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}
