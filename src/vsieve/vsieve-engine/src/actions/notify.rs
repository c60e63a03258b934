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

//! `mailto:` method URIs of the enotify extension (rfc5436).

use vsieve_common::{Address, MailtoParams};

use crate::error::{FilterError, FilterResult};

/// A parsed `mailto:` method URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Mailto {
    pub recipient: Address,
    /// `subject=` URI parameter; `:message` takes precedence over it.
    pub subject: Option<String>,
    pub params: MailtoParams,
}

/// header fields a URI is not allowed to set on the notification
/// (rfc5436 section 2.7).
const FORBIDDEN_URI_HEADERS: &[&str] = &[
    "from",
    "auto-submitted",
    "received",
    "message-id",
    "date",
];

/// Parse a `mailto:` URI into the notification target plus its header
/// and body parameters, percent-decoding throughout.
///
/// # Errors
///
/// * not a `mailto:` URI, undecodable percent-escapes, or an invalid
///   target address ([`FilterError::Syntax`])
pub(crate) fn parse_mailto(uri: &str) -> FilterResult<Mailto> {
    let rest = uri
        .strip_prefix("mailto:")
        .ok_or_else(|| FilterError::Syntax(format!("'{uri}' is not a mailto URI")))?;

    let (target, query) = rest.split_once('?').unwrap_or((rest, ""));
    let target = percent_decode(target)?;
    let recipient = target
        .parse::<Address>()
        .map_err(|error| FilterError::Syntax(format!("invalid notify target: {error}")))?;

    let mut subject = None;
    let mut params = MailtoParams::default();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = percent_decode(key)?.to_lowercase();
        let value = percent_decode(value)?;

        match key.as_str() {
            "body" => params.body = Some(value),
            "subject" => subject = Some(value),
            forbidden if FORBIDDEN_URI_HEADERS.contains(&forbidden) => {
                tracing::warn!(header = key, "forbidden mailto header parameter dropped");
            }
            _ => params.headers.push((key, value)),
        }
    }

    Ok(Mailto {
        recipient,
        subject,
        params,
    })
}

fn percent_decode(input: &str) -> FilterResult<String> {
    urlencoding::decode(input)
        .map(std::borrow::Cow::into_owned)
        .map_err(|error| FilterError::Syntax(format!("bad percent-encoding: {error}")))
}

/// Truncate a notification body to a byte limit without splitting a
/// character.
#[must_use]
pub(crate) fn truncate_body(body: &str, max_bytes: usize) -> String {
    if body.len() <= max_bytes {
        return body.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
