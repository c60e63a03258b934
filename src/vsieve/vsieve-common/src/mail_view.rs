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

use std::sync::Arc;

use vsieve_mail_parser::{Mail, RawBody};

use crate::{Envelope, Invite};

/// How well the message parsed before the run started.
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
)]
#[strum(serialize_all = "lowercase")]
pub enum ParseStatus {
    ///
    #[default]
    Unknown,
    /// parsed with recoverable defects, all tests stay available.
    Tolerable,
    /// the MIME structure could not be parsed. Structure-dependent
    /// tests degrade, header tests keep working.
    Malformed,
}

/// The message a filter run operates on.
///
/// The parsed form delivered by the server is shared and never touched;
/// the first mutating action clones it and every later read and write
/// goes through the clone. The byte-form is regenerated on demand by
/// [`MessageView::resync`] so that readers downstream of the run see
/// the edited state.
#[derive(Debug, Clone)]
pub struct MessageView {
    original: Arc<Mail>,
    edited: Option<Mail>,
    raw: RawBody,
    parse_status: ParseStatus,
    envelope: Envelope,
    invite: Option<Invite>,
}

impl MessageView {
    ///
    #[must_use]
    pub fn new(mail: Mail, envelope: Envelope) -> Self {
        Self {
            raw: RawBody::from(&mail),
            original: Arc::new(mail),
            edited: None,
            parse_status: ParseStatus::Unknown,
            envelope,
            invite: None,
        }
    }

    /// reuse an already shared parsed form, rendering the byte-form
    /// from it.
    #[must_use]
    pub fn from_shared(mail: Arc<Mail>, envelope: Envelope) -> Self {
        Self {
            raw: RawBody::from(&*mail),
            original: mail,
            edited: None,
            parse_status: ParseStatus::Unknown,
            envelope,
            invite: None,
        }
    }

    /// the parsed form reads go through: the edited clone once one
    /// exists, the shared original otherwise.
    #[must_use]
    pub fn mail(&self) -> &Mail {
        self.edited.as_ref().map_or(&*self.original, |m| m)
    }

    /// mutable access to the parsed form, cloning the shared original
    /// on the first call.
    pub fn mail_mut(&mut self) -> &mut Mail {
        if self.edited.is_none() {
            self.edited = Some((*self.original).clone());
        }
        self.edited.as_mut().expect("clone was just installed")
    }

    /// whether a mutating action ran.
    #[must_use]
    pub const fn is_edited(&self) -> bool {
        self.edited.is_some()
    }

    /// regenerate the byte-form from the current parsed form. Called
    /// after each applied edit so size and raw reads stay coherent.
    pub fn resync(&mut self) {
        tracing::trace!(edited = self.is_edited(), "regenerating message byte-form");
        self.raw = RawBody::from(self.mail());
    }

    /// byte-form as of the last [`MessageView::resync`].
    #[must_use]
    pub const fn raw(&self) -> &RawBody {
        &self.raw
    }

    /// size in bytes of the byte-form.
    #[must_use]
    pub fn size(&self) -> usize {
        self.raw.size()
    }

    ///
    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    ///
    #[must_use]
    pub const fn parse_status(&self) -> ParseStatus {
        self.parse_status
    }

    ///
    pub fn set_parse_status(&mut self, status: ParseStatus) {
        self.parse_status = status;
    }

    /// calendar payload, when the server extracted one.
    #[must_use]
    pub const fn invite(&self) -> Option<&Invite> {
        self.invite.as_ref()
    }

    ///
    pub fn set_invite(&mut self, invite: Invite) {
        self.invite = Some(invite);
    }

    /// does any MIME part look like an attachment?
    #[must_use]
    pub fn has_attachment(&self) -> bool {
        self.mail().mime_parts().iter().any(|p| p.is_attachment())
    }

    /// `Message-ID` of the message, angle brackets stripped.
    #[must_use]
    pub fn message_id(&self) -> Option<String> {
        self.mail()
            .get_header("Message-ID")
            .map(|v| v.trim().trim_start_matches('<').trim_end_matches('>').to_string())
    }

    /// entries of the `References` header, angle brackets stripped.
    #[must_use]
    pub fn references(&self) -> Vec<String> {
        self.mail()
            .get_header("References")
            .map(|v| {
                v.split_whitespace()
                    .map(|r| r.trim_start_matches('<').trim_end_matches('>').to_string())
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use vsieve_mail_parser::{BodyType, MailHeaders};

    use super::*;

    fn sample() -> MessageView {
        MessageView::new(
            Mail {
                headers: MailHeaders(vec![
                    ("Message-ID".to_string(), "<id-1@x.org>".to_string()),
                    ("References".to_string(), "<a@x.org> <b@x.org>".to_string()),
                    ("Subject".to_string(), "hi".to_string()),
                ]),
                body: BodyType::Regular(vec!["hello".to_string()]),
            },
            Envelope::default(),
        )
    }

    #[test]
    fn reads_share_the_original_until_first_write() {
        let mut view = sample();
        assert!(!view.is_edited());
        assert_eq!(view.mail().get_header("Subject").unwrap(), "hi");

        view.mail_mut()
            .headers
            .push("X-Tag".to_string(), "v".to_string());
        assert!(view.is_edited());
        assert_eq!(view.mail().get_header("X-Tag").unwrap(), "v");
    }

    #[test]
    fn raw_reflects_edits_only_after_resync() {
        let mut view = sample();
        view.mail_mut()
            .headers
            .push("X-Tag".to_string(), "v".to_string());

        assert!(view.raw().get_header("X-Tag").is_none());
        view.resync();
        assert_eq!(view.raw().get_header("X-Tag").unwrap(), "v");
    }

    #[test]
    fn threading_headers() {
        let view = sample();
        assert_eq!(view.message_id().unwrap(), "id-1@x.org");
        assert_eq!(
            view.references(),
            vec!["a@x.org".to_string(), "b@x.org".to_string()]
        );
    }
}
