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

/// iCalendar method of a calendar part, as announced by the
/// `method=` parameter of its `Content-Type`.
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
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum InviteMethod {
    ///
    Publish,
    ///
    Request,
    ///
    Reply,
    ///
    Add,
    ///
    Cancel,
    ///
    Refresh,
    ///
    Counter,
    ///
    #[strum(serialize = "DECLINECOUNTER")]
    DeclineCounter,
}

/// Coarse method classes the invite test matches on.
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
pub enum InviteMethodClass {
    /// organizer to attendee traffic.
    AnyRequest,
    /// attendee to organizer traffic.
    AnyReply,
}

/// Attendee answer carried by a REPLY.
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
#[strum(ascii_case_insensitive)]
pub enum ParticipantStatus {
    ///
    #[strum(serialize = "NEEDS-ACTION")]
    NeedsAction,
    ///
    #[strum(serialize = "ACCEPTED")]
    Accepted,
    ///
    #[strum(serialize = "DECLINED")]
    Declined,
    ///
    #[strum(serialize = "TENTATIVE")]
    Tentative,
    ///
    #[strum(serialize = "DELEGATED")]
    Delegated,
}

/// Calendar payload found on a message, extracted by the caller before
/// the filter run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Invite {
    ///
    pub method: InviteMethod,
    /// only meaningful on replies.
    pub participant_status: Option<ParticipantStatus>,
}

impl Invite {
    /// class the method belongs to.
    #[must_use]
    pub const fn method_class(&self) -> InviteMethodClass {
        match self.method {
            InviteMethod::Reply | InviteMethod::Counter => InviteMethodClass::AnyReply,
            InviteMethod::Publish
            | InviteMethod::Request
            | InviteMethod::Add
            | InviteMethod::Cancel
            | InviteMethod::Refresh
            | InviteMethod::DeclineCounter => InviteMethodClass::AnyRequest,
        }
    }
}
