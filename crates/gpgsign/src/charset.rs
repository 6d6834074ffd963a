use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

use crate::error::{Error, Result};

pub const DEFAULT_CHARSET: &str = "utf-8";

/// Extracts the `charset` parameter from a MIME content type.
///
/// Falls back to [`DEFAULT_CHARSET`] when the content type is absent,
/// carries no charset parameter, or the parameter is empty.
pub fn resolve(content_type: Option<&str>) -> String {
    content_type
        .and_then(charset_parameter)
        .unwrap_or(DEFAULT_CHARSET)
        .to_string()
}

fn charset_parameter(content_type: &str) -> Option<&str> {
    const NAME: &str = "charset=";

    content_type.split(';').skip(1).find_map(|parameter| {
        let parameter = parameter.trim_start();
        let head = parameter.get(..NAME.len())?;
        if !head.eq_ignore_ascii_case(NAME) {
            return None;
        }
        let value = &parameter[NAME.len()..];
        let value = value
            .split(|c: char| c.is_whitespace())
            .next()
            .unwrap_or_default()
            .trim_matches('"');
        (!value.is_empty()).then_some(value)
    })
}

/// Maps a charset label onto an encoding, substituting UTF-8 for labels
/// that are not recognised.
pub fn encoding_for(label: &str) -> &'static Encoding {
    Encoding::for_label(label.trim().as_bytes()).unwrap_or_else(|| {
        tracing::warn!(charset = label, "unknown charset, falling back to utf-8");
        UTF_8
    })
}

/// Decodes document bytes under `label`. Bytes that are invalid in that
/// charset are rejected rather than replaced.
pub fn decode<'a>(bytes: &'a [u8], label: &str) -> Result<Cow<'a, str>> {
    let encoding = encoding_for(label);
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| {
            Error::MalformedDocument(format!("document is not valid {}", encoding.name()))
        })
}

/// Encodes `text` back into `label`. Characters the charset cannot
/// represent become HTML numeric character references.
pub fn encode(text: &str, label: &str) -> Vec<u8> {
    let encoding = encoding_for(label);
    // encoding_rs only encodes into its output encoding, which is UTF-8
    // for the UTF-16 family.
    if encoding == UTF_16LE {
        return text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    }
    if encoding == UTF_16BE {
        return text.encode_utf16().flat_map(u16::to_be_bytes).collect();
    }
    let (bytes, _, _) = encoding.encode(text);
    bytes.into_owned()
}

/// Rejects charsets whose bytes cannot carry ASCII clearsign armor next
/// to the document text, such as UTF-16.
pub fn ensure_signable(label: &str) -> Result<&'static Encoding> {
    let encoding = encoding_for(label);
    if encoding.is_ascii_compatible() {
        Ok(encoding)
    } else {
        Err(Error::MalformedDocument(format!(
            "{} documents cannot carry an embedded clearsign signature",
            encoding.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_content_type_is_utf8() {
        assert_eq!(resolve(None), "utf-8");
    }

    #[test]
    fn reads_charset_parameter() {
        assert_eq!(resolve(Some("text/html; charset=ISO-8859-1")), "ISO-8859-1");
    }

    #[test]
    fn parameter_name_is_case_insensitive() {
        assert_eq!(resolve(Some("text/html;CharSet=windows-1252")), "windows-1252");
    }

    #[test]
    fn value_ends_at_whitespace_or_semicolon() {
        assert_eq!(resolve(Some("text/html; charset=koi8-r ; q=1")), "koi8-r");
        assert_eq!(resolve(Some("text/html; charset=koi8-r;q=1")), "koi8-r");
    }

    #[test]
    fn later_parameters_are_searched() {
        assert_eq!(
            resolve(Some("text/html; level=1; charset=\"shift_jis\"")),
            "shift_jis"
        );
    }

    #[test]
    fn missing_or_empty_parameter_is_utf8() {
        assert_eq!(resolve(Some("text/html")), "utf-8");
        assert_eq!(resolve(Some("text/html; charset=")), "utf-8");
        assert_eq!(resolve(Some("")), "utf-8");
    }

    #[test]
    fn unknown_label_decodes_as_utf8() {
        let text = decode("héllo".as_bytes(), "no-such-charset").unwrap();
        assert_eq!(text, "héllo");
    }

    #[test]
    fn decodes_latin1() {
        let text = decode(&[0x63, 0x61, 0x66, 0xe9], "ISO-8859-1").unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn invalid_bytes_are_rejected() {
        let err = decode(&[0xff, 0xfe, 0x80], "utf-8").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument(_)));
    }

    #[test]
    fn utf16_round_trips_in_its_own_byte_order() {
        let le = encode("<html>é</html>", "utf-16");
        assert_eq!(&le[..4], [b'<', 0, b'h', 0]);
        assert_eq!(decode(&le, "utf-16").unwrap(), "<html>é</html>");

        let be = encode("<html>é</html>", "utf-16be");
        assert_eq!(&be[..4], [0, b'<', 0, b'h']);
        assert_eq!(decode(&be, "utf-16be").unwrap(), "<html>é</html>");
    }

    #[test]
    fn ascii_incompatible_charsets_are_not_signable() {
        assert!(ensure_signable("utf-8").is_ok());
        assert!(ensure_signable("ISO-8859-1").is_ok());
        let err = ensure_signable("utf-16").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument(_)));
        assert!(matches!(ensure_signable("UTF-16BE"), Err(Error::MalformedDocument(_))));
    }

    #[test]
    fn encodes_back_to_declared_charset() {
        assert_eq!(encode("café", "ISO-8859-1"), vec![0x63, 0x61, 0x66, 0xe9]);
        assert_eq!(encode("café", "utf-8"), "café".as_bytes());
    }
}
