//! Locating the `<html>` boundary of a document and splicing a signed
//! block back into it.
//!
//! This is deliberately not an HTML parser. The first `<html ...>` tag and
//! the first `</html ...>` tag after it delimit the signed region; nested or
//! repeated root tags are not detected.

use std::borrow::Cow;
use std::ops::Range;

use crate::error::{Error, Result};

/// Replacement for a hyphen that starts a line of the signed body.
pub const ESCAPED_DASH: &str = "&#x2D;";

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

/// Read-only view of a document partitioned around its root element.
///
/// Each part is trimmed of surrounding whitespace. Whitespace lying outside
/// the signed region is therefore not reproduced byte for byte when the
/// document is reassembled; everything else is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundarySplit<'a> {
    pub prefix: &'a str,
    pub open_tag: &'a str,
    pub body: &'a str,
    pub close_tag: &'a str,
    pub suffix: &'a str,
}

/// Partitions `document` around the first `<html>` tag and the first
/// `</html>` tag that follows it.
pub fn locate(document: &str) -> Result<BoundarySplit<'_>> {
    let open = find_tag(document, 0, false).ok_or_else(|| {
        Error::MalformedDocument("no opening <html> tag found".to_string())
    })?;
    let close = find_tag(document, open.end, true).ok_or_else(|| {
        Error::MalformedDocument("no closing </html> tag found after <html>".to_string())
    })?;

    tracing::debug!(
        open = ?open,
        close = ?close,
        "located html boundary"
    );

    Ok(BoundarySplit {
        prefix: document[..open.start].trim(),
        open_tag: document[open.clone()].trim(),
        body: document[open.end..close.start].trim(),
        close_tag: document[close.clone()].trim(),
        suffix: document[close.end..].trim(),
    })
}

/// Finds the byte range of the first `<html ...>` (or `</html ...>` when
/// `closing` is set) at or after `from`. Tag names match case-insensitively
/// and must be followed by whitespace, `/` or `>`.
fn find_tag(document: &str, from: usize, closing: bool) -> Option<Range<usize>> {
    let name: &[u8] = if closing { b"</html" } else { b"<html" };
    let bytes = document.as_bytes();
    let mut cursor = from;

    while let Some(offset) = document[cursor..].find('<') {
        let start = cursor + offset;
        let name_end = start + name.len();
        let matches_name = bytes
            .get(start..name_end)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name));
        let bounded = matches!(
            bytes.get(name_end),
            Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
        );

        if matches_name && bounded {
            // An unterminated tag cannot be followed by a terminated one.
            let end = document[name_end..].find('>')? + name_end + 1;
            return Some(start..end);
        }
        cursor = start + 1;
    }

    None
}

/// Rewrites the hyphens that begin any line of `body` as [`ESCAPED_DASH`].
///
/// Only the run of hyphens at the start of a line is rewritten; hyphens
/// after the first other character are left alone. Bodies with no such
/// line are returned borrowed.
pub fn escape_leading_dashes(body: &str) -> Cow<'_, str> {
    if !body.split('\n').any(|line| line.starts_with('-')) {
        return Cow::Borrowed(body);
    }

    let mut escaped = String::with_capacity(body.len() + 16);
    for (index, line) in body.split('\n').enumerate() {
        if index > 0 {
            escaped.push('\n');
        }
        let rest = line.trim_start_matches('-');
        for _ in 0..line.len() - rest.len() {
            escaped.push_str(ESCAPED_DASH);
        }
        escaped.push_str(rest);
    }
    Cow::Owned(escaped)
}

/// Builds the exact text handed to the signer: the header message, the
/// end of the opening comment, the escaped body and the start of the
/// closing comment. The signature thereby covers the comment markers too.
pub fn frame_payload(header: &str, escaped_body: &str) -> String {
    format!("{header}\n{COMMENT_CLOSE}\n{escaped_body}\n{COMMENT_OPEN}")
}

impl BoundarySplit<'_> {
    /// Splices `signed_block` between the root tags inside an HTML comment.
    pub fn assemble(&self, signed_block: &str) -> String {
        let mut document = String::with_capacity(
            self.prefix.len()
                + self.open_tag.len()
                + signed_block.len()
                + self.close_tag.len()
                + self.suffix.len()
                + COMMENT_OPEN.len()
                + COMMENT_CLOSE.len()
                + 1,
        );
        document.push_str(self.prefix);
        document.push_str(self.open_tag);
        document.push_str(COMMENT_OPEN);
        document.push('\n');
        document.push_str(signed_block);
        document.push_str(COMMENT_CLOSE);
        document.push_str(self.close_tag);
        document.push_str(self.suffix);
        document
    }
}
