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

use crate::{Address, Comparator, MatchType};

/// Importance level carried by a notification, `1` highest.
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
pub enum Importance {
    ///
    #[strum(serialize = "1")]
    High,
    ///
    #[default]
    #[strum(serialize = "2")]
    Normal,
    ///
    #[strum(serialize = "3")]
    Low,
}

/// System flag a filter can set or clear on the delivered message.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FlagKind {
    ///
    Flagged,
    ///
    Read,
    ///
    Priority,
}

/// Extra content a `mailto:` notification URI asked to be placed on the
/// notification message.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct MailtoParams {
    /// headers from the URI query part, percent-decoded, in URI order.
    pub headers: Vec<(String, String)>,
    /// `body=` parameter, percent-decoded.
    pub body: Option<String>,
}

/// One disposition decided by a filter run. The caller drains the list
/// returned by the run and is responsible for carrying each entry out.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum Action {
    /// deliver to the default folder. `explicit` records whether the
    /// script asked for it or the run fell back to the implicit keep.
    Keep {
        ///
        explicit: bool,
    },
    /// drop the message silently.
    Discard,
    /// deliver into the named folder.
    FileInto {
        /// target folder path.
        folder: String,
        /// `:copy` was present: the implicit keep is not cancelled.
        copy: bool,
    },
    /// forward the message.
    Redirect {
        ///
        address: Address,
        /// `:copy` was present: the implicit keep is not cancelled.
        copy: bool,
    },
    /// refuse delivery with an MDN carrying the reason.
    Reject {
        ///
        message: String,
    },
    /// refuse delivery at the protocol level.
    Ereject {
        ///
        message: String,
    },
    /// attach a user tag to the delivered message.
    Tag {
        ///
        name: String,
    },
    /// set or clear a system flag on the delivered message.
    Flag {
        ///
        kind: FlagKind,
        /// `true` sets the flag, `false` clears it.
        set: bool,
    },
    /// legacy notification: send a templated message to one recipient.
    Notify {
        ///
        recipient: Address,
        /// subject template, variables already substituted.
        subject: String,
        /// body template, variables already substituted.
        body: String,
        /// truncate the notification body to this many bytes.
        max_body_bytes: Option<usize>,
        /// header names to copy from the triggering message.
        origin_headers: Vec<String>,
    },
    /// rfc5435/rfc5436 notification through a `mailto:` method URI.
    NotifyMailto {
        ///
        recipient: Address,
        /// `:from` override, already validated.
        from: Option<Address>,
        ///
        importance: Importance,
        /// `:options` arguments, passed through to the delivery pipeline.
        options: Vec<String>,
        /// subject for the notification, after the rfc5436 precedence
        /// rules (`:message`, then URI `subject=`, then triggering subject).
        subject: String,
        /// body for the notification.
        body: String,
        /// remaining URI content (extra recipients, custom headers).
        params: MailtoParams,
    },
    /// a header was added to the message (already applied in place by
    /// the run; recorded here for downstream diagnostics).
    AddHeader {
        ///
        name: String,
        ///
        value: String,
        /// inserted at the front of the header section (`:last` absent).
        at_front: bool,
    },
    /// a deleteheader directive ran (already applied in place).
    DeleteHeader {
        ///
        name: String,
        /// values the directive matched against, empty for delete-all.
        values: Vec<String>,
        /// 1-based instance offset, when `:index` was given.
        index: Option<usize>,
        /// offset counted from the last matching instance.
        last: bool,
        ///
        comparator: Comparator,
        ///
        match_type: MatchType,
    },
    /// a replaceheader directive ran (already applied in place).
    ReplaceHeader {
        ///
        name: String,
        /// `:newname` override.
        new_name: Option<String>,
        /// `:newvalue` override, variables already substituted.
        new_value: Option<String>,
        /// values the directive matched against.
        values: Vec<String>,
        /// 1-based instance offset, when `:index` was given.
        index: Option<usize>,
        /// offset counted from the last matching instance.
        last: bool,
        ///
        comparator: Comparator,
        ///
        match_type: MatchType,
    },
}

impl Action {
    /// whether this action replaces the implicit keep.
    #[must_use]
    pub const fn cancels_implicit_keep(&self) -> bool {
        match self {
            Self::Keep { .. }
            | Self::Discard
            | Self::Reject { .. }
            | Self::Ereject { .. } => true,
            Self::FileInto { copy, .. } | Self::Redirect { copy, .. } => !*copy,
            Self::Tag { .. }
            | Self::Flag { .. }
            | Self::Notify { .. }
            | Self::NotifyMailto { .. }
            | Self::AddHeader { .. }
            | Self::DeleteHeader { .. }
            | Self::ReplaceHeader { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn importance_wire_values() {
        assert_eq!(Importance::High.to_string(), "1");
        assert_eq!("3".parse::<Importance>().unwrap(), Importance::Low);
        assert!("urgent".parse::<Importance>().is_err());
    }

    #[test]
    fn flag_names_case_insensitive() {
        assert_eq!("Flagged".parse::<FlagKind>().unwrap(), FlagKind::Flagged);
        assert_eq!(FlagKind::Priority.to_string(), "priority");
    }

    #[test]
    fn copy_keeps_the_implicit_keep() {
        assert!(Action::FileInto {
            folder: "inbox/sub".to_string(),
            copy: false
        }
        .cancels_implicit_keep());
        assert!(!Action::FileInto {
            folder: "inbox/sub".to_string(),
            copy: true
        }
        .cancels_implicit_keep());
        assert!(!Action::Tag {
            name: "work".to_string()
        }
        .cancels_implicit_keep());
    }
}
