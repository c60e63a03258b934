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

use crate::Address;

/// Envelope of the message as received at delivery time, distinct from
/// the `From`/`To` headers carried inside the message itself.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Envelope {
    /// the sender of the message, `None` for a null reverse path (bounces).
    pub mail_from: Option<Address>,
    /// recipients the delivery is being attempted for.
    pub rcpt: Vec<Address>,
}

impl Envelope {
    /// build an envelope for a single recipient.
    #[must_use]
    pub fn new(mail_from: Option<Address>, rcpt: Address) -> Self {
        Self {
            mail_from,
            rcpt: vec![rcpt],
        }
    }
}
