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

//! Leaf nodes of the script tree. The script front end builds these;
//! `allof`/`anyof`/`not` and rule sequencing stay on its side, the
//! engine only sees one leaf at a time.

use vsieve_common::{Comparator, ConversationScope, FlagKind, MatchType, Relational};

use crate::actions::edit_header::EditHeaderDirective;
use crate::error::{FilterError, FilterResult};
use crate::variables::Modifier;

/// Which part of a parsed address a test compares.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum AddressPart {
    ///
    #[default]
    All,
    ///
    LocalPart,
    /// compared lowercased.
    Domain,
}

/// Arguments shared by the comparator-driven tests, built fresh per
/// predicate invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct TestParams {
    ///
    pub comparator: Comparator,
    ///
    pub match_type: MatchType,
    /// required by `:count`/`:value`, rejected elsewhere.
    pub operator: Option<Relational>,
    ///
    pub address_part: AddressPart,
    /// header names (or envelope parts, or literal sources for the
    /// string test).
    pub sources: Vec<String>,
    /// candidate keys; variables are substituted before matching.
    pub keys: Vec<String>,
}

impl TestParams {
    /// Check the argument combination before evaluation.
    ///
    /// # Errors
    ///
    /// * relational operator missing or misplaced, or the numeric
    ///   comparator combined with a containment scan
    ///   ([`FilterError::Syntax`])
    pub fn validate(&self) -> FilterResult<()> {
        if self.match_type.is_relational() && self.operator.is_none() {
            return Err(FilterError::Syntax(format!(
                "':{}' requires a relational operator",
                self.match_type
            )));
        }
        if !self.match_type.is_relational() && self.operator.is_some() {
            return Err(FilterError::Syntax(format!(
                "relational operator is not allowed with ':{}'",
                self.match_type
            )));
        }
        if self.comparator == Comparator::AsciiNumeric
            && !matches!(
                self.match_type,
                MatchType::Is | MatchType::Count | MatchType::Value
            )
        {
            return Err(FilterError::Syntax(format!(
                "comparator 'i;ascii-numeric' does not support ':{}'",
                self.match_type
            )));
        }
        Ok(())
    }
}

/// A leaf predicate.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum Test {
    /// rfc5228 address test over the address-bearing headers.
    Address(TestParams),
    /// rfc5228 envelope test; sources are `from`/`to` pseudo-headers.
    Envelope(TestParams),
    /// rfc5228 header test, top-level headers only.
    Header(TestParams),
    /// header test applied to every MIME part, values deduplicated.
    MimeHeader(TestParams),
    /// rfc5229 string test over literal sources.
    String(TestParams),
    /// rfc5228 exists test.
    Exists {
        ///
        headers: Vec<String>,
    },
    /// rfc5228 size test.
    Size {
        /// `:over` when true, `:under` otherwise.
        over: bool,
        ///
        limit: usize,
    },
    /// substring scan over the text parts of the body.
    Body(TestParams),
    /// at least one part is flagged as an attachment.
    Attachment,
    /// calendar payload method test; entries are explicit method names
    /// or the synthetic `anyrequest`/`anyreply` classes.
    Invite {
        ///
        methods: Vec<String>,
    },
    /// bulk-mail heuristics over the header section.
    Bulk,
    /// mailing-list heuristics over the header section.
    List,
    ///
    Socialcast,
    ///
    LinkedIn,
    /// any address of the named headers is one of the recipient's own.
    Me {
        ///
        headers: Vec<String>,
    },
    /// any address of the named headers is in the address book.
    AddressBook {
        ///
        headers: Vec<String>,
    },
    /// any address of the named headers was ever written to.
    ContactRanking {
        ///
        headers: Vec<String>,
    },
    /// the message belongs to a conversation of the given scope.
    Conversation {
        ///
        scope: ConversationScope,
    },
    /// the message's effective date against a day threshold.
    Date {
        /// `:before` when true, `:after` otherwise.
        before: bool,
        ///
        threshold: time::Date,
    },
    /// the account's current day of week, `0` = Sunday.
    CurrentDayOfWeek {
        ///
        days: Vec<u8>,
    },
    /// the account's current time of day against a threshold.
    CurrentTime {
        /// `:before` when true, `:after` otherwise.
        before: bool,
        ///
        threshold: time::Time,
    },
}

/// A command node.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum ActionNode {
    ///
    Keep,
    ///
    Discard,
    /// end the run after the current rule.
    Stop,
    ///
    FileInto {
        ///
        folder: String,
        ///
        copy: bool,
    },
    ///
    Redirect {
        ///
        address: String,
        ///
        copy: bool,
    },
    ///
    Reject {
        ///
        message: String,
    },
    ///
    Ereject {
        ///
        message: String,
    },
    ///
    Tag {
        ///
        name: String,
    },
    ///
    Flag {
        ///
        kind: FlagKind,
        ///
        set: bool,
    },
    /// legacy notify with subject/body templates.
    Notify {
        ///
        address: String,
        ///
        subject: String,
        ///
        body: String,
        ///
        max_body_bytes: Option<usize>,
        ///
        origin_headers: Vec<String>,
    },
    /// rfc5435 notify with a `mailto:` method URI.
    NotifyMailto {
        /// the method URI.
        method: String,
        ///
        from: Option<String>,
        ///
        importance: vsieve_common::Importance,
        ///
        options: Vec<String>,
        /// `:message` override for the notification subject.
        message: Option<String>,
    },
    /// rfc5229 set command.
    Set {
        ///
        name: String,
        ///
        value: String,
        ///
        modifiers: Vec<Modifier>,
    },
    ///
    AddHeader {
        ///
        name: String,
        ///
        value: String,
        /// append after existing headers instead of the front.
        last: bool,
    },
    ///
    DeleteHeader(EditHeaderDirective),
    ///
    ReplaceHeader {
        ///
        directive: EditHeaderDirective,
        ///
        new_name: Option<String>,
        ///
        new_value: Option<String>,
    },
    /// write a line to the server log.
    Log {
        ///
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn relational_pairing() {
        let mut params = TestParams {
            match_type: MatchType::Count,
            ..TestParams::default()
        };
        assert!(matches!(params.validate(), Err(FilterError::Syntax(_))));

        params.operator = Some(Relational::Ge);
        params.validate().unwrap();

        params.match_type = MatchType::Contains;
        assert!(matches!(params.validate(), Err(FilterError::Syntax(_))));
    }

    #[test]
    fn numeric_comparator_restrictions() {
        let params = TestParams {
            comparator: Comparator::AsciiNumeric,
            match_type: MatchType::Matches,
            ..TestParams::default()
        };
        assert!(matches!(params.validate(), Err(FilterError::Syntax(_))));

        let params = TestParams {
            comparator: Comparator::AsciiNumeric,
            match_type: MatchType::Is,
            ..TestParams::default()
        };
        params.validate().unwrap();
    }

    #[test]
    fn address_part_tags() {
        assert_eq!(
            "localpart".parse::<AddressPart>().unwrap(),
            AddressPart::LocalPart
        );
        assert_eq!(AddressPart::Domain.to_string(), "domain");
    }
}
