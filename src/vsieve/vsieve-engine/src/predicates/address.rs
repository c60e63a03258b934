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

//! address and envelope tests over parsed address lists.

use vsieve_mail_parser::{rfc2047, Mail};

use vsieve_common::{parse_address_header, Address, Envelope};

use crate::error::{FilterError, FilterResult};
use crate::predicates::match_sources;
use crate::script::{AddressPart, TestParams};
use crate::variables::VariableStore;

/// headers whose values carry addresses; the address test refuses
/// anything else.
const ADDRESS_HEADERS: &[&str] = &["from", "sender", "to", "cc", "bcc", "reply-to"];

/// rfc5228 address test: parse every address of the named headers,
/// extract the requested part and match.
pub fn evaluate(
    mail: &Mail,
    store: Option<&mut VariableStore>,
    params: &TestParams,
) -> FilterResult<bool> {
    let mut sources = vec![];
    for name in &params.sources {
        if !ADDRESS_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name)) {
            return Err(FilterError::Syntax(format!(
                "'{name}' is not an address header"
            )));
        }
        for value in mail.get_all_headers(name) {
            for addr in parse_address_header(&rfc2047::decode(value)) {
                sources.push(extract_part(&addr, params.address_part));
            }
        }
    }
    match_sources(params, store, &sources)
}

/// rfc5228 envelope test; sources name the `from`/`to` pseudo-headers.
/// A null reverse path contributes nothing, so `:count` sees zero for
/// bounces.
pub fn evaluate_envelope(
    envelope: &Envelope,
    store: Option<&mut VariableStore>,
    params: &TestParams,
) -> FilterResult<bool> {
    let mut sources = vec![];
    for name in &params.sources {
        match name.to_ascii_lowercase().as_str() {
            "from" => {
                if let Some(mail_from) = &envelope.mail_from {
                    sources.push(extract_part(mail_from, params.address_part));
                }
            }
            "to" => {
                for rcpt in &envelope.rcpt {
                    sources.push(extract_part(rcpt, params.address_part));
                }
            }
            other => {
                return Err(FilterError::Syntax(format!(
                    "'{other}' is not an envelope part"
                )))
            }
        }
    }
    match_sources(params, store, &sources)
}

pub(crate) fn extract_part(address: &Address, part: AddressPart) -> String {
    match part {
        AddressPart::All => address.full().to_string(),
        AddressPart::LocalPart => address.local_part().to_string(),
        // the domain is compared lowercased.
        AddressPart::Domain => address.domain().to_lowercase(),
    }
}
