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

//! vSieve common definition

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::missing_const_for_fn)] // see https://github.com/rust-lang/rust-clippy/issues/9271

#[macro_use]
mod types {
    #[macro_use]
    pub mod address;
}

pub use types::address::{parse_address_header, Address};

mod envelop;
pub use envelop::Envelope;

mod filter;
pub use filter::{Comparator, MatchType, Relational};

mod action;
pub use action::{Action, FlagKind, Importance, MailtoParams};

mod invite;
pub use invite::{Invite, InviteMethod, InviteMethodClass, ParticipantStatus};

/// account oracle boundary.
pub mod account;
pub use account::{AccountFeatures, ConversationScope, LookupError, MailboxOracle};

mod mail_view;
pub use mail_view::{MessageView, ParseStatus};
