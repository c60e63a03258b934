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

//! Heuristic message classifiers and the oracle-backed identity tests.
//! The header heuristics are fixed decision procedures; the oracle
//! calls are read-only and their failures are handled by the caller as
//! "predicate is false".

use vsieve_common::{
    parse_address_header, Address, ConversationScope, LookupError, MailboxOracle, MessageView,
};
use vsieve_mail_parser::{rfc2047, Mail};

/// Bulk mail: an explicit bulk/junk precedence, a campaign marker, or
/// an unsubscribe offer on something that is not a mailing list.
#[must_use]
pub fn bulk(mail: &Mail) -> bool {
    if mail
        .get_header("Precedence")
        .is_some_and(|v| v.eq_ignore_ascii_case("bulk") || v.eq_ignore_ascii_case("junk"))
    {
        return true;
    }
    if mail.get_header("X-CampaignId").is_some() || mail.get_header("X-Campaign-Id").is_some() {
        return true;
    }
    mail.get_header("List-Unsubscribe").is_some() && !list(mail)
}

/// Mailing-list traffic per rfc2369/rfc2919 markers.
#[must_use]
pub fn list(mail: &Mail) -> bool {
    ["List-Id", "List-Post", "List-Subscribe", "Mailing-List"]
        .iter()
        .any(|name| mail.get_header(name).is_some())
        || mail
            .get_header("Precedence")
            .is_some_and(|v| v.eq_ignore_ascii_case("list"))
}

///
#[must_use]
pub fn socialcast(mail: &Mail) -> bool {
    sender_domain_ends_with(mail, "socialcast.com")
}

///
#[must_use]
pub fn linkedin(mail: &Mail) -> bool {
    sender_domain_ends_with(mail, "linkedin.com")
}

fn sender_domain_ends_with(mail: &Mail, suffix: &str) -> bool {
    ["From", "Sender", "Reply-To"].iter().any(|name| {
        addresses_of(mail, &[(*name).to_string()])
            .iter()
            .any(|addr| {
                let domain = addr.domain().to_lowercase();
                domain == suffix || domain.ends_with(&format!(".{suffix}"))
            })
    })
}

/// every address carried by the named headers.
#[must_use]
pub fn addresses_of(mail: &Mail, headers: &[String]) -> Vec<Address> {
    let mut out = vec![];
    for name in headers {
        for value in mail.get_all_headers(name) {
            out.extend(parse_address_header(&rfc2047::decode(value)));
        }
    }
    out
}

/// any address of the named headers is one of the recipient's own.
///
/// # Errors
///
/// * the mailbox store could not be reached
pub fn me(
    mail: &Mail,
    headers: &[String],
    oracle: &dyn MailboxOracle,
) -> Result<bool, LookupError> {
    for address in addresses_of(mail, headers) {
        if oracle.is_me(&address)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// any address of the named headers is in the address book.
///
/// # Errors
///
/// * the mailbox store could not be reached
pub fn address_book(
    mail: &Mail,
    headers: &[String],
    oracle: &dyn MailboxOracle,
) -> Result<bool, LookupError> {
    for address in addresses_of(mail, headers) {
        if oracle.in_address_book(&address)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// any address of the named headers was ever written to by the
/// recipient.
///
/// # Errors
///
/// * the mailbox store could not be reached
pub fn contact_ranking(
    mail: &Mail,
    headers: &[String],
    oracle: &dyn MailboxOracle,
) -> Result<bool, LookupError> {
    for address in addresses_of(mail, headers) {
        if oracle.is_ranked_contact(&address)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// the message continues a conversation of the given scope.
///
/// # Errors
///
/// * the mailbox store could not be reached
pub fn conversation(
    view: &MessageView,
    scope: ConversationScope,
    oracle: &dyn MailboxOracle,
) -> Result<bool, LookupError> {
    oracle.in_conversation(scope, view.message_id().as_deref(), &view.references())
}

#[cfg(test)]
mod tests {
    use vsieve_mail_parser::{BodyType, MailHeaders};

    use super::*;

    fn mail_with(headers: &[(&str, &str)]) -> Mail {
        Mail {
            headers: MailHeaders(
                headers
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            ),
            body: BodyType::Undefined,
        }
    }

    #[test]
    fn precedence_bulk() {
        assert!(bulk(&mail_with(&[("Precedence", "Bulk")])));
        assert!(!bulk(&mail_with(&[("Precedence", "first-class")])));
    }

    #[test]
    fn unsubscribe_without_list_markers_is_bulk() {
        assert!(bulk(&mail_with(&[(
            "List-Unsubscribe",
            "<mailto:out@x.com>"
        )])));
        // a real mailing list is not bulk.
        assert!(!bulk(&mail_with(&[
            ("List-Unsubscribe", "<mailto:out@x.com>"),
            ("List-Id", "<dev.lists.x.com>"),
        ])));
    }

    #[test]
    fn list_markers() {
        assert!(list(&mail_with(&[("List-Id", "<dev.lists.x.com>")])));
        assert!(list(&mail_with(&[("Precedence", "list")])));
        assert!(!list(&mail_with(&[("Subject", "hello")])));
    }

    #[test]
    fn social_network_domains() {
        assert!(linkedin(&mail_with(&[(
            "From",
            "Updates <updates@news.linkedin.com>"
        )])));
        assert!(!linkedin(&mail_with(&[(
            "From",
            "Someone <a@notlinkedin.com.evil.org>"
        )])));
        assert!(socialcast(&mail_with(&[(
            "Sender",
            "feed@socialcast.com"
        )])));
    }

    #[test]
    fn addresses_of_collects_all_entries() {
        let mail = mail_with(&[("To", "a@x.org, B <b@y.org>"), ("Cc", "c@z.org")]);
        let addrs = addresses_of(&mail, &["to".to_string(), "cc".to_string()]);
        assert_eq!(addrs.len(), 3);
    }
}
