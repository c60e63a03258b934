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

//! Comparison vocabulary shared by tests and header-edit actions. The
//! script front end decodes the rfc5228 tags into these enums once;
//! everything downstream dispatches on the enum.

/// String ordering rule used by a match type (rfc4790 collations).
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
    strum::AsRefStr,
)]
pub enum Comparator {
    /// case-insensitive ordinal compare, the rfc5228 default.
    #[default]
    #[strum(serialize = "i;ascii-casemap", serialize = "ascii-casemap")]
    AsciiCasemap,
    /// case-sensitive ordinal compare.
    #[strum(serialize = "i;octet", serialize = "octet")]
    Octet,
    /// leading-decimal-digits numeric compare (rfc4790 section 9.1).
    #[strum(serialize = "i;ascii-numeric", serialize = "ascii-numeric")]
    AsciiNumeric,
}

/// Comparison mode of a test (rfc5228 section 2.7.1, rfc5231).
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
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum MatchType {
    /// exact match under the comparator's ordering.
    #[default]
    Is,
    /// substring under the comparator's case rule.
    Contains,
    /// glob semantics, `*` and `?` wildcards, anchored.
    Matches,
    /// cardinality of the source list against the key.
    Count,
    /// element-wise relational comparison against the key.
    Value,
}

impl MatchType {
    /// whether this match type consumes a relational operator.
    #[must_use]
    pub const fn is_relational(self) -> bool {
        matches!(self, Self::Count | Self::Value)
    }
}

/// Relational operator of the `:count`/`:value` match types (rfc5231).
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
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Relational {
    ///
    Gt,
    ///
    Ge,
    ///
    Lt,
    ///
    Le,
    ///
    Eq,
    ///
    Ne,
}

impl Relational {
    /// apply the operator to an ordering between source and key.
    #[must_use]
    pub const fn holds(self, ordering: std::cmp::Ordering) -> bool {
        match self {
            Self::Gt => ordering.is_gt(),
            Self::Ge => ordering.is_ge(),
            Self::Lt => ordering.is_lt(),
            Self::Le => ordering.is_le(),
            Self::Eq => ordering.is_eq(),
            Self::Ne => ordering.is_ne(),
        }
    }
}
