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

/// Errors a filter run can raise. Only the first two abort the rule that
/// raised them; the rest are recovered where they occur so a filtering
/// problem never loses mail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// malformed or missing arguments on a test or action. Raised
    /// before any mutation happens.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// a capability was used without being declared by `require`, with
    /// enforcement on.
    #[error("extension '{0}' used without being declared")]
    UndeclaredExtension(String),

    /// a runtime failure while mutating message state; the action is
    /// skipped and the run continues.
    #[error("operation failed: {0}")]
    Operation(String),

    /// a header value could not be charset-encoded; the raw value is
    /// used instead.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// a mailbox-store lookup failed; the predicate evaluates false.
    #[error(transparent)]
    Lookup(#[from] vsieve_common::LookupError),
}

///
pub type FilterResult<T> = Result<T, FilterError>;
