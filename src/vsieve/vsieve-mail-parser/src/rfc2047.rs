/*
 * vSieve mail filtering engine
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

//! rfc2047 encoded words: `=?charset?B|Q?payload?=`.
//!
//! Header values are decoded before any comparator sees them, and re-encoded
//! when an edit writes a non-ascii value back into the header section.

use base64::Engine;

use crate::error::{ParserError, ParserResult};

/// Decode every encoded word found in a header value, leaving everything
/// else (malformed words included) verbatim. Whitespace separating two
/// adjacent encoded words is dropped, per rfc2047 section 6.2.
#[must_use]
pub fn decode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    let mut last_was_word = false;

    while let Some(start) = rest.find("=?") {
        let gap = &rest[..start];
        match parse_encoded_word(&rest[start..]) {
            Some((decoded, consumed)) => {
                let separator_only =
                    last_was_word && !gap.is_empty() && gap.chars().all(char::is_whitespace);
                if !separator_only {
                    out.push_str(gap);
                }
                out.push_str(&decoded);
                rest = &rest[start + consumed..];
                last_was_word = true;
            }
            None => {
                tracing::trace!("malformed encoded word left verbatim");
                out.push_str(gap);
                out.push_str("=?");
                rest = &rest[start + 2..];
                last_was_word = false;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Encode a header value for the wire. Printable ascii passes through;
/// anything else becomes a single B-encoded word.
///
/// # Errors
///
/// * the requested charset cannot represent the value ([`ParserError::Unencodable`])
pub fn encode(value: &str, charset: &str) -> ParserResult<String> {
    if value.chars().all(|c| matches!(c, ' '..='~' | '\t')) {
        return Ok(value.to_string());
    }

    // values are utf-8 on our side of the boundary, so only unicode
    // charsets can round-trip without a transcoding table.
    if !matches!(
        charset.to_ascii_lowercase().as_str(),
        "utf-8" | "utf8" | "us-ascii" | "ascii"
    ) {
        return Err(ParserError::Unencodable(charset.to_string()));
    }

    let payload = base64::engine::general_purpose::STANDARD.encode(value.as_bytes());
    Ok(format!("=?utf-8?B?{payload}?="))
}

/// parse one encoded word at the start of the input; returns the decoded
/// text and how many input bytes the word consumed.
fn parse_encoded_word(input: &str) -> Option<(String, usize)> {
    let inner = input.strip_prefix("=?")?;
    let mut fields = inner.splitn(3, '?');
    let charset = fields.next()?;
    let encoding = fields.next()?;
    let tail = fields.next()?;

    let payload_end = tail.find("?=")?;
    let payload = &tail[..payload_end];

    let bytes = match encoding {
        "B" | "b" => base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()?,
        "Q" | "q" => decode_q(payload)?,
        _ => return None,
    };

    let decoded = bytes_to_string(&bytes, charset);
    let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + payload_end + 2;
    Some((decoded, consumed))
}

fn decode_q(payload: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len());
    let mut bytes = payload.bytes();
    while let Some(b) = bytes.next() {
        match b {
            b'_' => out.push(b' '),
            b'=' => {
                let hi = bytes.next()?;
                let lo = bytes.next()?;
                let hex = [hi, lo];
                let hex = std::str::from_utf8(&hex).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
            }
            other => out.push(other),
        }
    }
    Some(out)
}

fn bytes_to_string(bytes: &[u8], charset: &str) -> String {
    match charset.to_ascii_lowercase().as_str() {
        "iso-8859-1" | "latin1" => bytes.iter().map(|&b| char::from(b)).collect(),
        // utf-8, us-ascii and anything unknown: lossy utf-8 keeps the
        // value usable for matching instead of failing the whole test.
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn passthrough_plain_ascii() {
        assert_eq!(decode("a plain subject"), "a plain subject");
        assert_eq!(encode("a plain subject", "utf-8").unwrap(), "a plain subject");
    }

    #[test]
    fn decode_b_and_q_words() {
        assert_eq!(decode("=?utf-8?B?Y2Fmw6k=?="), "café");
        assert_eq!(decode("=?utf-8?Q?caf=C3=A9_au_lait?="), "café au lait");
        assert_eq!(decode("=?iso-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn mixed_text_and_words() {
        assert_eq!(decode("Re: =?utf-8?B?Y2Fmw6k=?= tomorrow"), "Re: café tomorrow");
    }

    #[test]
    fn malformed_word_left_verbatim() {
        assert_eq!(decode("=?utf-8?X?nope?="), "=?utf-8?X?nope?=");
        assert_eq!(decode("=?broken"), "=?broken");
    }

    #[test]
    fn encode_round_trip() {
        let encoded = encode("café", "utf-8").unwrap();
        assert_eq!(decode(&encoded), "café");
    }

    #[test]
    fn encode_rejects_unknown_charset() {
        assert_eq!(
            encode("café", "shift-jis").unwrap_err(),
            ParserError::Unencodable("shift-jis".to_string())
        );
    }
}
