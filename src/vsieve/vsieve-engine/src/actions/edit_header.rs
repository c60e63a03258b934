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

//! In-place header mutation (rfc5293). Every entry point validates
//! before touching anything, skips silently on immutable targets or a
//! malformed parse, and resyncs the byte-form after a change.

use vsieve_common::{AccountFeatures, Comparator, MatchType, MessageView, ParseStatus, Relational};
use vsieve_mail_parser::rfc2047;

use crate::comparator;
use crate::error::{FilterError, FilterResult};

/// Parameters shared by `deleteheader` and `replaceheader`.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct EditHeaderDirective {
    /// target header name, case-insensitive.
    pub name: String,
    /// candidate values tested against existing instances; empty means
    /// every instance matches.
    pub values: Vec<String>,
    /// 1-based instance offset.
    pub index: Option<usize>,
    /// count the offset from the last matching instance.
    pub last: bool,
    ///
    pub comparator: Comparator,
    ///
    pub match_type: MatchType,
    /// required by `:count`/`:value`.
    pub operator: Option<Relational>,
}

impl EditHeaderDirective {
    /// Check the argument combination, defaulting a bare `:last` to
    /// offset 0 (the last instance).
    ///
    /// # Errors
    ///
    /// * invalid header name, numeric comparator without
    ///   `count`/`value`/`is`, or a broken relational pairing
    ///   ([`FilterError::Syntax`])
    pub fn validate(&mut self) -> FilterResult<()> {
        validate_header_name(&self.name)?;
        if self.last && self.index.is_none() {
            self.index = Some(0);
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
        Ok(())
    }

    /// forward 1-based index constraining eligibility, `None` when
    /// every instance is eligible. A `:last` offset is converted once
    /// the matching-instance count is known.
    fn effective_index(&self, count: usize) -> Option<usize> {
        self.index.map(|index| {
            if self.last && count > index {
                if index == 0 {
                    count
                } else {
                    count - index + 1
                }
            } else {
                index
            }
        })
    }

    /// 0-based positions in the header list of the instances this
    /// directive matches.
    fn matched_positions(&self, headers: &[(String, String)]) -> FilterResult<Vec<usize>> {
        let matching: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, (key, _))| key.eq_ignore_ascii_case(&self.name))
            .map(|(pos, (_, value))| (pos, rfc2047::decode(value)))
            .collect();

        if matching.is_empty() {
            return Ok(vec![]);
        }

        let eligible: Vec<&(usize, String)> = match self.effective_index(matching.len()) {
            Some(index) => matching
                .iter()
                .enumerate()
                .filter(|(occurrence, _)| occurrence + 1 == index)
                .map(|(_, entry)| entry)
                .collect(),
            None => matching.iter().collect(),
        };

        if self.match_type == MatchType::Count {
            let operator = self.operator.ok_or_else(|| {
                FilterError::Syntax("':count' requires an operator".to_string())
            })?;
            let values: Vec<&str> = eligible.iter().map(|(_, v)| v.as_str()).collect();
            for key in &self.values {
                if comparator::counts(operator, &values, key)? {
                    return Ok(eligible.iter().map(|(pos, _)| *pos).collect());
                }
            }
            return Ok(vec![]);
        }

        let mut positions = vec![];
        for (pos, value) in eligible {
            if self.values.is_empty() {
                positions.push(*pos);
                continue;
            }
            for key in &self.values {
                if comparator::verify(self.comparator, self.match_type, self.operator, value, key)?
                {
                    positions.push(*pos);
                    break;
                }
            }
        }
        Ok(positions)
    }
}

/// `addheader`: prepend (keeping `Return-Path` first) or append.
/// Returns whether the message changed.
///
/// # Errors
///
/// * invalid header name ([`FilterError::Syntax`])
pub(crate) fn add(
    view: &mut MessageView,
    features: &AccountFeatures,
    status: ParseStatus,
    charset: &str,
    name: &str,
    value: &str,
    last: bool,
) -> FilterResult<bool> {
    validate_header_name(name)?;
    if skip_edit(features, status, name) {
        return Ok(false);
    }

    let value = encode_value(value, charset);
    let mail = view.mail_mut();
    if last {
        mail.headers.push(name, value);
    } else {
        // Return-Path stays the very first header when it already is.
        let at = usize::from(
            mail.headers
                .0
                .first()
                .is_some_and(|(key, _)| key.eq_ignore_ascii_case("Return-Path")),
        );
        mail.headers.0.insert(at, (name.to_string(), value));
    }
    view.resync();
    Ok(true)
}

/// `deleteheader`. Returns whether the message changed.
///
/// # Errors
///
/// * invalid directive arguments ([`FilterError::Syntax`])
pub(crate) fn delete(
    view: &mut MessageView,
    features: &AccountFeatures,
    status: ParseStatus,
    directive: &mut EditHeaderDirective,
) -> FilterResult<bool> {
    directive.validate()?;
    if skip_edit(features, status, &directive.name) {
        return Ok(false);
    }

    let positions = directive.matched_positions(&view.mail().headers.0)?;
    if positions.is_empty() {
        return Ok(false);
    }

    let headers = &mut view.mail_mut().headers.0;
    for pos in positions.iter().rev() {
        headers.remove(*pos);
    }
    view.resync();
    Ok(true)
}

/// `replaceheader`: rewrite name and/or value of every matched
/// instance, in place. Returns whether the message changed.
///
/// # Errors
///
/// * invalid directive arguments, or neither `:newname` nor
///   `:newvalue` supplied ([`FilterError::Syntax`])
pub(crate) fn replace(
    view: &mut MessageView,
    features: &AccountFeatures,
    status: ParseStatus,
    charset: &str,
    directive: &mut EditHeaderDirective,
    new_name: Option<&str>,
    new_value: Option<&str>,
) -> FilterResult<bool> {
    directive.validate()?;
    if new_name.is_none() && new_value.is_none() {
        return Err(FilterError::Syntax(
            "replaceheader requires ':newname' or ':newvalue'".to_string(),
        ));
    }
    if let Some(new_name) = new_name {
        validate_header_name(new_name)?;
    }
    if skip_edit(features, status, &directive.name) {
        return Ok(false);
    }

    let positions = directive.matched_positions(&view.mail().headers.0)?;
    if positions.is_empty() {
        return Ok(false);
    }

    let new_value = new_value.map(|v| encode_value(v, charset));
    let headers = &mut view.mail_mut().headers.0;
    for pos in positions {
        let (key, value) = &mut headers[pos];
        if let Some(new_name) = new_name {
            *key = new_name.to_string();
        }
        if let Some(new_value) = &new_value {
            *value = new_value.clone();
        }
    }
    view.resync();
    Ok(true)
}

/// steps shared by every edit: immutable-header and parse-status gates.
fn skip_edit(features: &AccountFeatures, status: ParseStatus, name: &str) -> bool {
    if !features.is_mutable_header(name.trim()) {
        tracing::debug!(header = name, "edit of an immutable header skipped");
        return true;
    }
    if status == ParseStatus::Malformed {
        tracing::info!(header = name, "header edit skipped, message is malformed");
        return true;
    }
    false
}

/// charset-encode a header value, falling back to the raw value when
/// the charset cannot represent it.
fn encode_value(value: &str, charset: &str) -> String {
    match rfc2047::encode(value, charset) {
        Ok(encoded) => encoded,
        Err(error) => {
            tracing::warn!(%error, "header value kept unencoded");
            value.to_string()
        }
    }
}

/// field-name per rfc5322: printable US-ASCII, no colon, non-empty.
pub(crate) fn validate_header_name(name: &str) -> FilterResult<()> {
    if name.is_empty() || !name.chars().all(|c| matches!(c, '!'..='9' | ';'..='~')) {
        return Err(FilterError::Syntax(format!(
            "invalid header name '{name}'"
        )));
    }
    Ok(())
}
