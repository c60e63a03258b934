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

/// Errors produced while reading or rewriting a message representation.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParserError {
    /// The message could not be split into a header section and a body.
    #[error("parsing email failed: {0}")]
    InvalidMail(String),
    /// A multipart boundary was declared but never found.
    #[error("boundary not found in content-type header parameters, {0}")]
    BoundaryNotFound(String),
    /// A header value could not be represented in the requested charset.
    #[error("cannot encode header value with charset '{0}'")]
    Unencodable(String),
}

/// Result alias for this crate.
pub type ParserResult<T> = Result<T, ParserError>;
