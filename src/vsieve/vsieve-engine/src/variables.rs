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

//! Named variables (rfc5229) and the positional captures produced by
//! wildcard matches.

use std::collections::HashMap;

use crate::error::{FilterError, FilterResult};

/// String modifier of the `set` action. Precedence is fixed by the RFC,
/// not by the order the script wrote them.
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
#[strum(serialize_all = "lowercase")]
pub enum Modifier {
    ///
    Lower,
    ///
    Upper,
    ///
    LowerFirst,
    ///
    UpperFirst,
    ///
    QuoteWildcard,
    ///
    EncodeUrl,
    ///
    Length,
}

impl Modifier {
    /// rfc5229 section 4.1 precedence, higher applies first. One
    /// modifier per tier.
    const fn precedence(self) -> u8 {
        match self {
            Self::Lower | Self::Upper => 40,
            Self::LowerFirst | Self::UpperFirst => 30,
            Self::QuoteWildcard => 20,
            Self::EncodeUrl => 15,
            Self::Length => 10,
        }
    }

    fn apply(self, value: &str) -> String {
        match self {
            Self::Lower => value.to_lowercase(),
            Self::Upper => value.to_uppercase(),
            Self::LowerFirst => recase_first(value, false),
            Self::UpperFirst => recase_first(value, true),
            Self::QuoteWildcard => {
                let mut out = String::with_capacity(value.len());
                for c in value.chars() {
                    if matches!(c, '\\' | '*' | '?') {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out
            }
            Self::EncodeUrl => urlencoding::encode(value).into_owned(),
            Self::Length => value.chars().count().to_string(),
        }
    }
}

fn recase_first(value: &str, upper: bool) -> String {
    let mut chars = value.chars();
    chars.next().map_or_else(String::new, |first| {
        let first: String = if upper {
            first.to_uppercase().collect()
        } else {
            first.to_lowercase().collect()
        };
        first + chars.as_str()
    })
}

/// Named-variable map plus the positional capture slots `${0}`..`${9}`.
/// Names are case-insensitive; one store per run.
#[derive(Debug, Default, Clone)]
pub struct VariableStore {
    named: HashMap<String, String>,
    positional: Vec<String>,
}

impl VariableStore {
    ///
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a variable, applying the modifiers in precedence order.
    ///
    /// # Errors
    ///
    /// * the name is not a valid variable identifier, or two modifiers
    ///   of the same precedence tier were supplied ([`FilterError::Syntax`])
    pub fn set(&mut self, name: &str, raw: &str, modifiers: &[Modifier]) -> FilterResult<()> {
        if !is_valid_name(name) {
            return Err(FilterError::Syntax(format!(
                "invalid variable name '{name}'"
            )));
        }
        validate_modifiers(modifiers)?;

        let mut ordered = modifiers.to_vec();
        ordered.sort_by_key(|m| std::cmp::Reverse(m.precedence()));

        let mut value = raw.to_string();
        for modifier in ordered {
            value = modifier.apply(&value);
        }
        self.named.insert(name.to_lowercase(), value);
        Ok(())
    }

    ///
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Replace the positional slots after a successful wildcard match.
    /// A match that produced no capture groups leaves them untouched.
    pub fn set_matched(&mut self, captures: Vec<String>) {
        if captures.len() > 1 {
            self.positional = captures;
            self.positional.truncate(10);
        }
    }

    ///
    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    /// Replace every `${N}` and `${identifier}` token of the template.
    /// Absent variables become the empty string; token syntax that is
    /// neither is left verbatim. Resolution is least-greedy: in
    /// `${foo${bar}}` the inner token is the one substituted.
    ///
    /// # Errors
    ///
    /// * a numeric index outside `0..=9` ([`FilterError::Syntax`])
    pub fn substitute(&self, template: &str) -> FilterResult<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        'outer: while let Some(mut start) = rest.find("${") {
            let mut close;
            loop {
                match rest[start + 2..].find('}') {
                    Some(offset) => close = start + 2 + offset,
                    None => break 'outer,
                }
                // narrow to the innermost opening brace before the close.
                match rest[start + 2..close].find("${") {
                    Some(inner) => start += 2 + inner,
                    None => break,
                }
            }

            let token = rest[start + 2..close].replace('\\', "");
            match self.resolve(&token)? {
                Some(value) => {
                    out.push_str(&rest[..start]);
                    out.push_str(&value);
                }
                // unrecognized token syntax stays as written.
                None => out.push_str(&rest[..=close]),
            }
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// `Ok(Some)` resolved, `Ok(None)` not a variable token.
    fn resolve(&self, token: &str) -> FilterResult<Option<String>> {
        if token.chars().all(|c| c.is_ascii_digit()) && !token.is_empty() {
            let index: u64 = token.parse().map_err(|_| {
                FilterError::Syntax(format!("variable index '{token}' out of range"))
            })?;
            if index > 9 {
                return Err(FilterError::Syntax(format!(
                    "variable index '{token}' out of range"
                )));
            }
            return Ok(Some(
                self.positional(index as usize).unwrap_or("").to_string(),
            ));
        }
        if token.starts_with('-') && token[1..].chars().all(|c| c.is_ascii_digit())
            && token.len() > 1
        {
            return Err(FilterError::Syntax(format!(
                "variable index '{token}' out of range"
            )));
        }
        if is_valid_name(token) {
            return Ok(Some(self.get(token).unwrap_or("").to_string()));
        }
        Ok(None)
    }
}

/// rfc5229 identifier: letters, digits, underscores, dot-separated
/// namespace segments, never starting with a digit.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            segment
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

fn validate_modifiers(modifiers: &[Modifier]) -> FilterResult<()> {
    let mut seen = std::collections::HashSet::new();
    for modifier in modifiers {
        if !seen.insert(modifier.precedence()) {
            return Err(FilterError::Syntax(format!(
                "conflicting modifier ':{modifier}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn modifiers_apply_in_precedence_order() {
        let mut store = VariableStore::new();
        // :lower (40) runs before :upperfirst (30) whatever the script order.
        store
            .set("b", "juMBlEd lETteRS", &[Modifier::UpperFirst, Modifier::Lower])
            .unwrap();
        assert_eq!(store.get("b").unwrap(), "Jumbled letters");

        store
            .set("l", "juMBlEd lETteRS", &[Modifier::Length, Modifier::Lower])
            .unwrap();
        assert_eq!(store.get("l").unwrap(), "15");
    }

    #[test]
    fn two_modifiers_of_one_tier_rejected() {
        let mut store = VariableStore::new();
        assert!(matches!(
            store.set("a", "x", &[Modifier::Lower, Modifier::Upper]),
            Err(FilterError::Syntax(_))
        ));
    }

    #[test]
    fn quotewildcard_escapes_globs() {
        let mut store = VariableStore::new();
        store
            .set("q", r"a*b?c\d", &[Modifier::QuoteWildcard])
            .unwrap();
        assert_eq!(store.get("q").unwrap(), r"a\*b\?c\\d");
    }

    #[test]
    fn encodeurl_percent_encodes() {
        let mut store = VariableStore::new();
        store
            .set("u", "a b&c", &[Modifier::EncodeUrl])
            .unwrap();
        assert_eq!(store.get("u").unwrap(), "a%20b%26c");
    }

    #[test]
    fn names_are_case_insensitive() {
        let mut store = VariableStore::new();
        store.set("Company", "ACME", &[]).unwrap();
        assert_eq!(store.get("company").unwrap(), "ACME");
        assert_eq!(store.substitute("at ${COMPANY}").unwrap(), "at ACME");
    }

    #[rstest]
    #[case("1a")]
    #[case("")]
    #[case("with space")]
    #[case("dash-ed")]
    fn invalid_names(#[case] name: &str) {
        let mut store = VariableStore::new();
        assert!(matches!(
            store.set(name, "x", &[]),
            Err(FilterError::Syntax(_))
        ));
    }

    #[test]
    fn positionals_from_captures() {
        let mut store = VariableStore::new();
        store.set_matched(vec![
            "foo@example.com".to_string(),
            "foo".to_string(),
            "example".to_string(),
        ]);
        assert_eq!(
            store.substitute("user ${1} at ${2}, whole ${0}").unwrap(),
            "user foo at example, whole foo@example.com"
        );
        // leading zeroes are tolerated.
        assert_eq!(store.substitute("${01}").unwrap(), "foo");
        // out of range captures resolve empty.
        assert_eq!(store.substitute("[${9}]").unwrap(), "[]");
    }

    #[test]
    fn captureless_match_keeps_previous_positionals() {
        let mut store = VariableStore::new();
        store.set_matched(vec!["whole".to_string(), "part".to_string()]);
        store.set_matched(vec!["other".to_string()]);
        assert_eq!(store.positional(1).unwrap(), "part");
    }

    #[test]
    fn invalid_indexes_are_syntax_errors() {
        let store = VariableStore::new();
        assert!(matches!(
            store.substitute("${10}"),
            Err(FilterError::Syntax(_))
        ));
        assert!(matches!(
            store.substitute("${-1}"),
            Err(FilterError::Syntax(_))
        ));
    }

    #[test]
    fn least_greedy_resolution() {
        let mut store = VariableStore::new();
        store.set("foo", "bar", &[]).unwrap();
        assert_eq!(store.substitute("${foo${foo}}").unwrap(), "${foobar}");
    }

    #[test]
    fn malformed_tokens_left_verbatim() {
        let store = VariableStore::new();
        assert_eq!(store.substitute("${a b}").unwrap(), "${a b}");
        assert_eq!(store.substitute("${unclosed").unwrap(), "${unclosed");
        assert_eq!(store.substitute("no tokens").unwrap(), "no tokens");
    }

    #[test]
    fn absent_variables_become_empty() {
        let store = VariableStore::new();
        assert_eq!(store.substitute("[${ghost}]").unwrap(), "[]");
    }
}
