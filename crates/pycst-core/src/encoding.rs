//! Source encoding detection and conversion
//!
//! Only the codecs needed for round-tripping are supported. Detection follows
//! the usual rules: a UTF-8 byte order mark wins, otherwise a coding cookie on
//! one of the first two lines, otherwise UTF-8.

use crate::{CstError, Result};
use once_cell::sync::Lazy;
use regex::bytes::Regex;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

static CODING_COOKIE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t\x0c]*#.*?coding[:=][ \t]*([-\w.]+)").expect("coding cookie pattern")
});

/// Canonical name for a supported encoding.
pub fn normalize_encoding(name: &str) -> Result<String> {
    let lowered = name.trim().to_ascii_lowercase().replace('_', "-");
    let canonical = match lowered.as_str() {
        "utf-8" | "utf8" => "utf-8",
        "utf-8-sig" | "utf8-sig" => "utf-8-sig",
        "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "l1" => "latin-1",
        "ascii" | "us-ascii" => "ascii",
        _ => {
            return Err(CstError::encoding(format!(
                "unsupported encoding {name:?}"
            )));
        }
    };
    Ok(canonical.to_string())
}

/// Encoding declared by `bytes`, if any.
pub fn detect_encoding(bytes: &[u8]) -> Option<String> {
    if bytes.starts_with(UTF8_BOM) {
        return Some("utf-8-sig".to_string());
    }
    for line in bytes.split_inclusive(|b| *b == b'\n').take(2) {
        if let Some(captures) = CODING_COOKIE.captures(line) {
            return Some(String::from_utf8_lossy(&captures[1]).into_owned());
        }
        // A cookie on line two only counts if line one is blank or a comment.
        let trimmed = line.iter().skip_while(|b| matches!(b, b' ' | b'\t' | b'\x0c'));
        let first = trimmed.clone().next();
        if !matches!(first, None | Some(b'#') | Some(b'\r') | Some(b'\n')) {
            break;
        }
    }
    None
}

/// Codec for decoding `bytes`: the requested one, else the declared one,
/// else UTF-8.
///
/// A byte order mark pins the codec to `utf-8-sig` so the mark is written
/// back; asking for a non-UTF-8 codec on such input is an error.
pub fn source_encoding(bytes: &[u8], requested: Option<&str>) -> Result<String> {
    let declared = detect_encoding(bytes);
    let encoding = match (requested, &declared) {
        (Some(requested), _) => normalize_encoding(requested)?,
        (None, Some(declared)) => normalize_encoding(declared)?,
        (None, None) => return Ok("utf-8".to_string()),
    };
    if !bytes.starts_with(UTF8_BOM) {
        return Ok(encoding);
    }
    match encoding.as_str() {
        "utf-8" | "utf-8-sig" => Ok("utf-8-sig".to_string()),
        other => Err(CstError::encoding(format!(
            "source starts with a utf-8 byte order mark but {other} was requested"
        ))),
    }
}

/// Decode `bytes` with the given canonical encoding.
pub fn decode(bytes: &[u8], encoding: &str) -> Result<String> {
    match encoding {
        "utf-8" | "utf-8-sig" => {
            let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            String::from_utf8(body.to_vec())
                .map_err(|e| CstError::encoding(format!("source is not valid {encoding}: {e}")))
        }
        "latin-1" => Ok(bytes.iter().map(|b| char::from(*b)).collect()),
        "ascii" => {
            if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                return Err(CstError::encoding(format!(
                    "byte 0x{:02x} at offset {pos} is not ascii",
                    bytes[pos]
                )));
            }
            Ok(bytes.iter().map(|b| char::from(*b)).collect())
        }
        other => Err(CstError::encoding(format!("unsupported encoding {other:?}"))),
    }
}

/// Encode `text` with the given canonical encoding.
pub fn encode(text: &str, encoding: &str) -> Result<Vec<u8>> {
    match encoding {
        "utf-8" => Ok(text.as_bytes().to_vec()),
        "utf-8-sig" => {
            let mut out = UTF8_BOM.to_vec();
            out.extend_from_slice(text.as_bytes());
            Ok(out)
        }
        "latin-1" | "ascii" => {
            let limit = if encoding == "ascii" { 0x7f } else { 0xff };
            text.chars()
                .map(|c| {
                    u8::try_from(u32::from(c))
                        .ok()
                        .filter(|b| u32::from(*b) <= limit)
                        .ok_or_else(|| {
                            CstError::encoding(format!("{c:?} cannot be encoded as {encoding}"))
                        })
                })
                .collect()
        }
        other => Err(CstError::encoding(format!("unsupported encoding {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cookie_on_second_line() {
        let src = b"#!/usr/bin/env python\n# -*- coding: latin-1 -*-\nx = 1\n";
        assert_eq!(detect_encoding(src).as_deref(), Some("latin-1"));
    }

    #[test]
    fn cookie_after_code_is_ignored() {
        let src = b"x = 1\n# coding: latin-1\n";
        assert_eq!(detect_encoding(src), None);
    }

    #[test]
    fn bom_round_trips() {
        let src = b"\xef\xbb\xbfx = 1\n";
        let encoding = detect_encoding(src).unwrap();
        let text = decode(src, &encoding).unwrap();
        assert_eq!(text, "x = 1\n");
        assert_eq!(encode(&text, &encoding).unwrap(), src.to_vec());
    }

    #[test]
    fn byte_order_mark_keeps_its_codec() {
        let src = b"\xef\xbb\xbfx = 1\n";
        assert_eq!(source_encoding(src, Some("utf8")).unwrap(), "utf-8-sig");
        assert_eq!(source_encoding(src, None).unwrap(), "utf-8-sig");
        assert_eq!(source_encoding(b"x = 1\n", Some("UTF-8")).unwrap(), "utf-8");
        assert!(source_encoding(src, Some("latin-1")).is_err());
    }

    #[test]
    fn latin1_round_trips() {
        let src = b"s = '\xe9'\n";
        let text = decode(src, "latin-1").unwrap();
        assert_eq!(text, "s = '\u{e9}'\n");
        assert_eq!(encode(&text, "latin-1").unwrap(), src.to_vec());
        assert!(encode("\u{20ac}", "latin-1").is_err());
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_encoding("UTF_8").unwrap(), "utf-8");
        assert_eq!(normalize_encoding("ISO-8859-1").unwrap(), "latin-1");
        assert!(normalize_encoding("shift-jis").is_err());
    }
}
