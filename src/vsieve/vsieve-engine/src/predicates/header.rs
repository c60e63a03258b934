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

//! header, mime-header, exists and size tests.

use vsieve_mail_parser::{rfc2047, Mail};

use crate::error::FilterResult;
use crate::predicates::match_sources;
use crate::script::TestParams;
use crate::variables::VariableStore;

/// rfc5228 header test: top-level headers only, values decoded before
/// matching.
pub fn evaluate(
    mail: &Mail,
    store: Option<&mut VariableStore>,
    params: &TestParams,
) -> FilterResult<bool> {
    let mut sources = vec![];
    for name in &params.sources {
        for value in mail.get_all_headers(name) {
            sources.push(rfc2047::decode(value));
        }
    }
    match_sources(params, store, &sources)
}

/// The same test applied to every MIME part's headers as well as the
/// top level, the value set deduplicated across parts.
pub fn evaluate_mime(
    mail: &Mail,
    store: Option<&mut VariableStore>,
    params: &TestParams,
) -> FilterResult<bool> {
    let mut seen = std::collections::HashSet::new();
    let mut sources = vec![];

    let mut push = |value: String| {
        if seen.insert(value.clone()) {
            sources.push(value);
        }
    };

    for name in &params.sources {
        for value in mail.get_all_headers(name) {
            push(rfc2047::decode(value));
        }
        for part in mail.mime_parts() {
            for header in &part.headers {
                if header.name.eq_ignore_ascii_case(name) {
                    push(rfc2047::decode(&header.value));
                }
            }
        }
    }
    match_sources(params, store, &sources)
}

/// rfc5228 exists test: every named header must be present.
#[must_use]
pub fn exists(mail: &Mail, headers: &[String]) -> bool {
    headers.iter().all(|name| mail.get_header(name).is_some())
}

/// rfc5228 size test against the byte-form size.
#[must_use]
pub const fn size(message_size: usize, over: bool, limit: usize) -> bool {
    if over {
        message_size > limit
    } else {
        message_size < limit
    }
}
