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

//! The engine never talks to a directory or a mailbox store itself: the
//! hosting server hands it a [`MailboxOracle`] and the engine asks.

use crate::Address;

/// A lookup against the mailbox store failed. Tests treat the lookup as
/// not matching and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mailbox lookup failed: {0}")]
pub struct LookupError(pub String);

/// Which messages of a conversation count for the conversation test.
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
pub enum ConversationScope {
    /// the recipient sent the first message of the thread.
    Started,
    /// the recipient sent any message of the thread.
    Participated,
}

/// Per-account switches the hosting server resolves before the run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct AccountFeatures {
    /// `editheader` actions are honored; when off they are skipped.
    pub edit_header_enabled: bool,
    /// `reject`/`ereject` are honored; when off they degrade to keep.
    pub reject_enabled: bool,
    /// `require` lines must declare every extension used.
    pub require_enforced: bool,
    /// `variables` is available to scripts.
    pub variables_enabled: bool,
    /// headers `editheader` must never touch, compared case-insensitively.
    pub immutable_headers: Vec<String>,
}

impl Default for AccountFeatures {
    fn default() -> Self {
        Self {
            edit_header_enabled: true,
            reject_enabled: true,
            require_enforced: true,
            variables_enabled: true,
            immutable_headers: [
                "Received",
                "Return-Path",
                "DKIM-Signature",
                "Message-ID",
                "MIME-Version",
                "Content-Type",
                "Content-Disposition",
                "Content-Transfer-Encoding",
                "Auto-Submitted",
            ]
            .map(str::to_string)
            .to_vec(),
        }
    }
}

impl AccountFeatures {
    /// whether `editheader` may touch this header.
    #[must_use]
    pub fn is_mutable_header(&self, name: &str) -> bool {
        !self
            .immutable_headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(name))
    }
}

/// Mailbox-side knowledge the engine needs during a run.
pub trait MailboxOracle {
    /// is this one of the recipient's own addresses (aliases included)?
    ///
    /// # Errors
    ///
    /// * the store could not be reached
    fn is_me(&self, address: &Address) -> Result<bool, LookupError>;

    /// does the recipient's address book contain this address?
    ///
    /// # Errors
    ///
    /// * the store could not be reached
    fn in_address_book(&self, address: &Address) -> Result<bool, LookupError>;

    /// has the recipient ever sent mail to this address?
    ///
    /// # Errors
    ///
    /// * the store could not be reached
    fn is_ranked_contact(&self, address: &Address) -> Result<bool, LookupError>;

    /// does the thread this message belongs to satisfy the scope?
    ///
    /// # Errors
    ///
    /// * the store could not be reached
    fn in_conversation(
        &self,
        scope: ConversationScope,
        message_id: Option<&str>,
        references: &[String],
    ) -> Result<bool, LookupError>;

    /// current wall clock in the recipient's time zone, used by the
    /// date/currentdate tests.
    fn now(&self) -> time::OffsetDateTime;

    /// charset used when a script omits one on an edit.
    fn default_charset(&self) -> String {
        "utf-8".to_string()
    }

    /// account switches for this run.
    fn features(&self) -> AccountFeatures;
}
