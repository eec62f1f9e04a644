//! Textual diff-match-patch support.
//!
//! Fine-grained string edits travel as diff-match-patch patch strings:
//! `@@ -l,s +l,s @@` hunk headers followed by percent-encoded context,
//! insert and delete lines. This module produces, parses and applies that
//! format. Application is strict: a hunk whose context does not match the
//! current text is an error, there is no fuzzy fallback.
//!
//! Offsets and lengths count UTF-16 code units, which is what the wire
//! format uses.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DmpError {
    #[error("malformed patch header {0:?}")]
    BadHeader(String),
    #[error("malformed patch line {0:?}")]
    BadLine(String),
    #[error("invalid percent-encoding in {0:?}")]
    BadEncoding(String),
    #[error("patch context does not match text at offset {offset}")]
    ContextMismatch { offset: usize },
    #[error("patched text is not valid unicode")]
    InvalidText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    Delete,
    Equal,
    Insert,
}

pub type Diff = (DiffOp, String);

/// One hunk: a run of diffs plus its location in the source and target
/// texts. Coordinates are rolling, i.e. `start2` is relative to the text
/// with all previous hunks already applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DmpPatch {
    pub diffs: Vec<Diff>,
    pub start1: usize,
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
}

impl DmpPatch {
    /// The source text this hunk expects (equal and delete runs).
    pub fn source_text(&self) -> String {
        let mut out = String::new();
        for (op, text) in &self.diffs {
            if *op != DiffOp::Insert {
                out.push_str(text);
            }
        }
        out
    }

    /// The target text this hunk produces (equal and insert runs).
    pub fn target_text(&self) -> String {
        let mut out = String::new();
        for (op, text) in &self.diffs {
            if *op != DiffOp::Delete {
                out.push_str(text);
            }
        }
        out
    }
}

const PATCH_MARGIN: usize = 4;

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

// ── Diffing ───────────────────────────────────────────────────────────────

/// Diff two strings into a normalized run list.
///
/// Trims the common prefix and suffix, then handles containment of one
/// middle in the other; everything else degrades to a delete/insert pair,
/// which is always a valid (if not minimal) patch source.
pub fn diff(source: &str, target: &str) -> Vec<Diff> {
    if source == target {
        if source.is_empty() {
            return Vec::new();
        }
        return vec![(DiffOp::Equal, source.to_string())];
    }

    let src: Vec<char> = source.chars().collect();
    let dst: Vec<char> = target.chars().collect();

    let mut prefix = 0usize;
    while prefix < src.len() && prefix < dst.len() && src[prefix] == dst[prefix] {
        prefix += 1;
    }
    let mut suffix = 0usize;
    while suffix < src.len() - prefix
        && suffix < dst.len() - prefix
        && src[src.len() - 1 - suffix] == dst[dst.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let core_src: String = src[prefix..src.len() - suffix].iter().collect();
    let core_dst: String = dst[prefix..dst.len() - suffix].iter().collect();

    let mut out = Vec::new();
    if prefix > 0 {
        out.push((DiffOp::Equal, src[..prefix].iter().collect()));
    }
    out.extend(diff_core(&core_src, &core_dst));
    if suffix > 0 {
        out.push((DiffOp::Equal, src[src.len() - suffix..].iter().collect()));
    }
    normalize(out)
}

fn diff_core(source: &str, target: &str) -> Vec<Diff> {
    if source.is_empty() {
        return vec![(DiffOp::Insert, target.to_string())];
    }
    if target.is_empty() {
        return vec![(DiffOp::Delete, source.to_string())];
    }
    let source_longer = source.chars().count() > target.chars().count();
    let (long, short) = if source_longer {
        (source, target)
    } else {
        (target, source)
    };
    if let Some(at) = long.find(short) {
        let head = long[..at].to_string();
        let tail = long[at + short.len()..].to_string();
        let op = if source_longer {
            DiffOp::Delete
        } else {
            DiffOp::Insert
        };
        return vec![(op, head), (DiffOp::Equal, short.to_string()), (op, tail)];
    }
    vec![
        (DiffOp::Delete, source.to_string()),
        (DiffOp::Insert, target.to_string()),
    ]
}

/// Drop empty runs and merge adjacent runs of the same op.
fn normalize(diffs: Vec<Diff>) -> Vec<Diff> {
    let mut out: Vec<Diff> = Vec::with_capacity(diffs.len());
    for (op, text) in diffs {
        if text.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some((last_op, last_text)) if *last_op == op => last_text.push_str(&text),
            _ => out.push((op, text)),
        }
    }
    out
}

// ── Hunk construction ─────────────────────────────────────────────────────

/// Build hunks that rewrite `source` into `target`.
pub fn make_patches(source: &str, target: &str) -> Vec<DmpPatch> {
    make_patches_from_diffs(source, &diff(source, target))
}

/// Build hunks from an existing diff of `source`.
pub fn make_patches_from_diffs(source: &str, diffs: &[Diff]) -> Vec<DmpPatch> {
    let mut patches = Vec::new();
    if diffs.is_empty() {
        return patches;
    }

    let mut patch = DmpPatch::default();
    let mut count1 = 0usize;
    let mut count2 = 0usize;
    let mut prepatch: Vec<u16> = source.encode_utf16().collect();
    let mut postpatch = prepatch.clone();

    for (i, (op, text)) in diffs.iter().enumerate() {
        let text_len = utf16_len(text);
        if patch.diffs.is_empty() && *op != DiffOp::Equal {
            patch.start1 = count1;
            patch.start2 = count2;
        }
        match op {
            DiffOp::Insert => {
                patch.diffs.push((DiffOp::Insert, text.clone()));
                patch.length2 += text_len;
                let inserted: Vec<u16> = text.encode_utf16().collect();
                postpatch.splice(count2..count2, inserted);
            }
            DiffOp::Delete => {
                patch.diffs.push((DiffOp::Delete, text.clone()));
                patch.length1 += text_len;
                postpatch.drain(count2..count2 + text_len);
            }
            DiffOp::Equal => {
                if text_len <= 2 * PATCH_MARGIN
                    && !patch.diffs.is_empty()
                    && i + 1 != diffs.len()
                {
                    // Short equality: keep it inside the current hunk
                    patch.diffs.push((DiffOp::Equal, text.clone()));
                    patch.length1 += text_len;
                    patch.length2 += text_len;
                } else if text_len >= 2 * PATCH_MARGIN && !patch.diffs.is_empty() {
                    add_context(&mut patch, &prepatch);
                    patches.push(std::mem::take(&mut patch));
                    // Coordinates roll forward over the hunk just emitted
                    prepatch = postpatch.clone();
                    count1 = count2;
                }
            }
        }
        if *op != DiffOp::Insert {
            count1 += text_len;
        }
        if *op != DiffOp::Delete {
            count2 += text_len;
        }
    }
    if !patch.diffs.is_empty() {
        add_context(&mut patch, &prepatch);
        patches.push(patch);
    }
    patches
}

fn add_context(patch: &mut DmpPatch, text: &[u16]) {
    if text.is_empty() {
        return;
    }
    let prefix_start = patch.start2.saturating_sub(PATCH_MARGIN);
    let prefix = String::from_utf16_lossy(&text[prefix_start..patch.start2]);

    let span_end = (patch.start2 + patch.length1).min(text.len());
    let suffix_end = (span_end + PATCH_MARGIN).min(text.len());
    let suffix = String::from_utf16_lossy(&text[span_end..suffix_end]);

    let prefix_len = utf16_len(&prefix);
    let suffix_len = utf16_len(&suffix);
    if !prefix.is_empty() {
        patch.diffs.insert(0, (DiffOp::Equal, prefix));
    }
    if !suffix.is_empty() {
        patch.diffs.push((DiffOp::Equal, suffix));
    }
    patch.start1 = patch.start1.saturating_sub(prefix_len);
    patch.start2 = patch.start2.saturating_sub(prefix_len);
    patch.length1 += prefix_len + suffix_len;
    patch.length2 += prefix_len + suffix_len;
}

// ── Text format ───────────────────────────────────────────────────────────

fn coords(start: usize, length: usize) -> String {
    match length {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, length),
    }
}

pub fn stringify_patch(patch: &DmpPatch) -> String {
    let mut out = format!(
        "@@ -{} +{} @@\n",
        coords(patch.start1, patch.length1),
        coords(patch.start2, patch.length2)
    );
    for (op, text) in &patch.diffs {
        out.push(match op {
            DiffOp::Equal => ' ',
            DiffOp::Insert => '+',
            DiffOp::Delete => '-',
        });
        out.push_str(&encode_uri(text));
        out.push('\n');
    }
    out
}

/// Render hunks as a patch string.
pub fn stringify(patches: &[DmpPatch]) -> String {
    patches.iter().map(stringify_patch).collect()
}

/// Parse a patch string into hunks. Malformed input is an error.
pub fn parse(text: &str) -> Result<Vec<DmpPatch>, DmpError> {
    let mut patches = Vec::new();
    let mut lines = text.lines().peekable();
    while let Some(header) = lines.next() {
        if header.is_empty() {
            continue;
        }
        let inner = header
            .strip_prefix("@@ -")
            .and_then(|rest| rest.strip_suffix(" @@"))
            .ok_or_else(|| DmpError::BadHeader(header.to_string()))?;
        let (first, second) = inner
            .split_once(" +")
            .ok_or_else(|| DmpError::BadHeader(header.to_string()))?;
        let (start1, length1) = parse_coords(first, header)?;
        let (start2, length2) = parse_coords(second, header)?;

        let mut patch = DmpPatch {
            diffs: Vec::new(),
            start1,
            start2,
            length1,
            length2,
        };
        while let Some(next) = lines.peek() {
            if next.starts_with("@@") {
                break;
            }
            let line = match lines.next() {
                Some(line) => line,
                None => break,
            };
            if line.is_empty() {
                continue;
            }
            let mut chars = line.chars();
            let op = match chars.next() {
                Some(' ') => DiffOp::Equal,
                Some('+') => DiffOp::Insert,
                Some('-') => DiffOp::Delete,
                _ => return Err(DmpError::BadLine(line.to_string())),
            };
            patch.diffs.push((op, decode_uri(chars.as_str())?));
        }
        patches.push(patch);
    }
    Ok(patches)
}

fn parse_coords(token: &str, header: &str) -> Result<(usize, usize), DmpError> {
    let bad = || DmpError::BadHeader(header.to_string());
    match token.split_once(',') {
        Some((start, length)) => {
            let start: usize = start.parse().map_err(|_| bad())?;
            let length: usize = length.parse().map_err(|_| bad())?;
            if length == 0 {
                // Zero-length spans are addressed by offset, not position
                Ok((start, 0))
            } else {
                Ok((start.checked_sub(1).ok_or_else(bad)?, length))
            }
        }
        None => {
            let start: usize = token.parse().map_err(|_| bad())?;
            Ok((start.checked_sub(1).ok_or_else(bad)?, 1))
        }
    }
}

// ── Application ───────────────────────────────────────────────────────────

/// Apply hunks to `text`, in order, at their exact recorded offsets.
pub fn apply(patches: &[DmpPatch], text: &str) -> Result<String, DmpError> {
    let mut units: Vec<u16> = text.encode_utf16().collect();
    for patch in patches {
        let start = patch.start2;
        let end = start + patch.length1;
        if end > units.len() {
            return Err(DmpError::ContextMismatch { offset: start });
        }
        let expected: Vec<u16> = patch.source_text().encode_utf16().collect();
        if units[start..end] != expected[..] {
            return Err(DmpError::ContextMismatch { offset: start });
        }
        let replacement = patch.target_text();
        units.splice(start..end, replacement.encode_utf16());
    }
    String::from_utf16(&units).map_err(|_| DmpError::InvalidText)
}

// ── Percent encoding ──────────────────────────────────────────────────────

// Keep set matching JS encodeURI, which the wire format was defined with.
const URI_KEEP: &str = ";,/?:@&=+$-_.!~*'()#";

fn encode_uri(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() || URI_KEEP.contains(ch) {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                out.push('%');
                out.push(hex_digit(byte >> 4));
                out.push(hex_digit(byte & 0x0f));
            }
        }
    }
    out
}

fn hex_digit(nibble: u8) -> char {
    match nibble {
        0..=9 => (b'0' + nibble) as char,
        _ => (b'A' + nibble - 10) as char,
    }
}

fn decode_uri(text: &str) -> Result<String, DmpError> {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .ok_or_else(|| DmpError::BadEncoding(text.to_string()))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| DmpError::BadEncoding(text.to_string()))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| DmpError::BadEncoding(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_equal() {
        assert_eq!(diff("", ""), vec![]);
        assert_eq!(diff("abc", "abc"), vec![(DiffOp::Equal, "abc".to_string())]);
    }

    #[test]
    fn test_diff_insert_and_delete() {
        assert_eq!(
            diff("The cat", "The cats"),
            vec![
                (DiffOp::Equal, "The cat".to_string()),
                (DiffOp::Insert, "s".to_string()),
            ]
        );
        assert_eq!(
            diff("The cats", "The cat"),
            vec![
                (DiffOp::Equal, "The cat".to_string()),
                (DiffOp::Delete, "s".to_string()),
            ]
        );
    }

    #[test]
    fn test_diff_containment() {
        assert_eq!(
            diff("XXabcYY", "abc"),
            vec![
                (DiffOp::Delete, "XX".to_string()),
                (DiffOp::Equal, "abc".to_string()),
                (DiffOp::Delete, "YY".to_string()),
            ]
        );
    }

    #[test]
    fn test_diff_fallback() {
        assert_eq!(
            diff("abc", "xyz"),
            vec![
                (DiffOp::Delete, "abc".to_string()),
                (DiffOp::Insert, "xyz".to_string()),
            ]
        );
    }

    fn patch_roundtrip(source: &str, target: &str) {
        let patches = make_patches(source, target);
        let patched = apply(&patches, source).unwrap();
        assert_eq!(patched, target, "apply(make({source:?}, {target:?}))");

        let text = stringify(&patches);
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed, patches, "parse(stringify()) for {text:?}");
        assert_eq!(apply(&parsed, source).unwrap(), target);
    }

    #[test]
    fn test_patch_roundtrips() {
        patch_roundtrip("", "hello");
        patch_roundtrip("hello", "");
        patch_roundtrip("The cat", "The cats");
        patch_roundtrip("The quick brown fox", "The quick red fox");
        patch_roundtrip("XX hello world YY", "hello world");
        patch_roundtrip("line one\nline two\n", "line one\nline 2\n");
        patch_roundtrip("percent % and plus +", "percent %% and plus ++");
    }

    #[test]
    fn test_patch_roundtrip_unicode() {
        patch_roundtrip("héllo wörld", "héllo earth");
        // Surrogate pair content: lengths count UTF-16 units
        patch_roundtrip("ab\u{1F600}cd", "ab\u{1F600}xy");
    }

    #[test]
    fn test_stringify_shape() {
        let patches = make_patches("The cat", "The cats");
        let text = stringify(&patches);
        assert_eq!(text, "@@ -4,4 +4,5 @@\n cat\n+s\n");
    }

    #[test]
    fn test_stringify_insert_into_empty() {
        let patches = make_patches("", "hi");
        assert_eq!(stringify(&patches), "@@ -0,0 +1,2 @@\n+hi\n");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse("not a patch"), Err(DmpError::BadHeader(_))));
        assert!(matches!(
            parse("@@ -1,2 +1,2 @@\n?zz\n"),
            Err(DmpError::BadLine(_))
        ));
        assert!(matches!(
            parse("@@ -x,2 +1,2 @@\n ab\n"),
            Err(DmpError::BadHeader(_))
        ));
        assert!(matches!(
            parse("@@ -1,2 +1,2 @@\n a%G1\n"),
            Err(DmpError::BadEncoding(_))
        ));
    }

    #[test]
    fn test_apply_context_mismatch() {
        let patches = make_patches("The cat", "The cats");
        assert!(matches!(
            apply(&patches, "The dog"),
            Err(DmpError::ContextMismatch { .. })
        ));
    }

    #[test]
    fn test_apply_out_of_range() {
        let patches = make_patches("a much longer text here", "a much longer test here");
        assert!(matches!(
            apply(&patches, "short"),
            Err(DmpError::ContextMismatch { .. })
        ));
    }

    #[test]
    fn test_multiple_hunks() {
        // Two edits separated by enough context to split into two hunks
        let source = "XX hello world YY";
        let target = "hello world";
        let patches = make_patches(source, target);
        assert_eq!(patches.len(), 2);
        assert_eq!(apply(&patches, source).unwrap(), target);
    }

    #[test]
    fn test_encode_decode_uri() {
        assert_eq!(encode_uri("a b\nc"), "a%20b%0Ac");
        assert_eq!(decode_uri("a%20b%0Ac").unwrap(), "a b\nc");
        assert_eq!(encode_uri("keep;,/?:@&=+$-_.!~*'()#"), "keep;,/?:@&=+$-_.!~*'()#");
        assert_eq!(decode_uri(&encode_uri("héllo")).unwrap(), "héllo");
    }
}
