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

//! rfc5173 body test, restricted to `:contains` over text parts.

use vsieve_common::{Comparator, MatchType};
use vsieve_mail_parser::Mail;

use crate::error::{FilterError, FilterResult};
use crate::script::TestParams;

/// Substring scan over the text segments of the body (text/plain
/// verbatim, text/html reduced to extracted text). Line endings are
/// normalized before scanning so a key can span what used to be a fold.
pub fn evaluate(mail: &Mail, params: &TestParams) -> FilterResult<bool> {
    if params.match_type != MatchType::Contains {
        return Err(FilterError::Syntax(format!(
            "the body test only supports ':contains', got ':{}'",
            params.match_type
        )));
    }
    let case_fold = match params.comparator {
        Comparator::AsciiCasemap => true,
        Comparator::Octet => false,
        Comparator::AsciiNumeric => {
            return Err(FilterError::Syntax(
                "comparator 'i;ascii-numeric' does not apply to the body test".to_string(),
            ))
        }
    };

    for segment in mail.text_segments() {
        let mut segment = segment.replace("\r\n", "\n");
        if case_fold {
            segment = segment.to_lowercase();
        }
        for key in &params.keys {
            let key = if case_fold {
                key.to_lowercase()
            } else {
                key.clone()
            };
            if segment.contains(&key) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}
