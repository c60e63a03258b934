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

//! Equality, containment, wildcard, counting and relational semantics
//! over strings. Callers normalize (unfold, decode) before invoking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use vsieve_common::{Comparator, MatchType, Relational};

use crate::error::{FilterError, FilterResult};

/// compiled wildcard patterns are reused across runs; bounded, cleared
/// wholesale when full.
static PATTERNS: OnceLock<Mutex<HashMap<String, Arc<regex::Regex>>>> = OnceLock::new();
const PATTERN_CACHE_CAP: usize = 512;

/// Evaluate one source value against one key.
///
/// `:count` does not belong here, it aggregates a whole source list:
/// see [`counts`].
///
/// # Errors
///
/// * `:value` without a relational operator, a relational operator with
///   `is`/`contains`/`matches`, `:count` routed here, or a containment
///   scan under the numeric comparator ([`FilterError::Syntax`])
/// * the key is not a valid wildcard pattern ([`FilterError::Syntax`])
pub fn verify(
    comparator: Comparator,
    match_type: MatchType,
    operator: Option<Relational>,
    source: &str,
    key: &str,
) -> FilterResult<bool> {
    if operator.is_some() && !match_type.is_relational() {
        return Err(FilterError::Syntax(format!(
            "relational operator is not allowed with ':{match_type}'"
        )));
    }

    match match_type {
        MatchType::Is => Ok(is_equal(comparator, source, key)),
        MatchType::Contains => match comparator {
            Comparator::AsciiCasemap => Ok(source
                .to_ascii_lowercase()
                .contains(&key.to_ascii_lowercase())),
            Comparator::Octet => Ok(source.contains(key)),
            Comparator::AsciiNumeric => Err(FilterError::Syntax(
                "comparator 'i;ascii-numeric' does not support ':contains'".to_string(),
            )),
        },
        MatchType::Matches => Ok(glob_match(source, key)?.is_some()),
        MatchType::Value => {
            let operator = operator.ok_or_else(|| {
                FilterError::Syntax("':value' requires a relational operator".to_string())
            })?;
            Ok(operator.holds(order(comparator, source, key)))
        }
        MatchType::Count => Err(FilterError::Syntax(
            "':count' applies to a source list, not a single value".to_string(),
        )),
    }
}

/// Evaluate `:count`: the cardinality of the non-empty source values
/// against a numeric key. The comparator plays no role in counting.
///
/// # Errors
///
/// * the key does not start with a decimal number ([`FilterError::Syntax`])
pub fn counts(
    operator: Relational,
    sources: &[impl AsRef<str>],
    key: &str,
) -> FilterResult<bool> {
    let key = leading_number(key).ok_or_else(|| {
        FilterError::Syntax(format!("':count' key '{key}' is not a number"))
    })?;

    let count = sources.iter().filter(|s| !s.as_ref().is_empty()).count() as u64;
    Ok(operator.holds(count.cmp(&key)))
}

/// Anchored, case-insensitive wildcard match. On success the returned
/// list carries the whole matched span at index 0 followed by one entry
/// per wildcard, ready to become the positional variables.
///
/// # Errors
///
/// * the translated pattern does not compile ([`FilterError::Syntax`])
pub fn glob_match(source: &str, pattern: &str) -> FilterResult<Option<Vec<String>>> {
    let regex = compiled(pattern)?;
    Ok(regex.captures(source).map(|captures| {
        captures
            .iter()
            .take(10)
            .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect()
    }))
}

fn is_equal(comparator: Comparator, source: &str, key: &str) -> bool {
    match comparator {
        Comparator::AsciiCasemap => source.eq_ignore_ascii_case(key),
        Comparator::Octet => source == key,
        Comparator::AsciiNumeric => match (leading_number(source), leading_number(key)) {
            (Some(a), Some(b)) => a == b,
            // two non-numeric operands: equal-by-string matches.
            (None, None) => source == key,
            _ => false,
        },
    }
}

/// ordering of source against key under the comparator. Non-numeric
/// operands of the numeric comparator sort as positive infinity, equal
/// to each other.
fn order(comparator: Comparator, source: &str, key: &str) -> std::cmp::Ordering {
    match comparator {
        Comparator::AsciiCasemap => source
            .to_ascii_lowercase()
            .cmp(&key.to_ascii_lowercase()),
        Comparator::Octet => source.cmp(key),
        Comparator::AsciiNumeric => match (leading_number(source), leading_number(key)) {
            (Some(a), Some(b)) => a.cmp(&b),
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (Some(_), None) => std::cmp::Ordering::Less,
        },
    }
}

/// value of the leading decimal digits, `None` when the operand does
/// not start with a digit or overflows.
fn leading_number(operand: &str) -> Option<u64> {
    let digits: String = operand.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn compiled(pattern: &str) -> FilterResult<Arc<regex::Regex>> {
    let cache = PATTERNS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut cache = cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.clone());
    }

    let regex = regex::RegexBuilder::new(&sieve_to_regex(pattern))
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| FilterError::Syntax(format!("invalid wildcard pattern '{pattern}': {e}")))?;
    let regex = Arc::new(regex);

    if cache.len() >= PATTERN_CACHE_CAP {
        cache.clear();
    }
    cache.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// Translate rfc5228 glob syntax to an anchored regex: `*` becomes a
/// capture group matching any run of characters (non-greedy except for
/// the final star, which may run to the end), `?` captures exactly one
/// character, `\` quotes the next character, everything else is taken
/// literally.
fn sieve_to_regex(pattern: &str) -> String {
    let last_star = pattern
        .char_indices()
        .filter(|&(_, c)| c == '*')
        .next_back()
        .map(|(idx, _)| idx);

    let mut out = String::with_capacity(pattern.len() + 16);
    out.push('^');

    let mut chars = pattern.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '*' if Some(idx) == last_star => out.push_str("(.*)"),
            '*' => out.push_str("(.*?)"),
            '?' => out.push_str("(.)"),
            '\\' => {
                if let Some((_, quoted)) = chars.next() {
                    out.push_str(&regex::escape(&quoted.to_string()));
                } else {
                    out.push_str("\\\\");
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn casemap_versus_octet() {
        assert!(verify(
            Comparator::AsciiCasemap,
            MatchType::Is,
            None,
            "ABC",
            "abc"
        )
        .unwrap());
        assert!(!verify(Comparator::Octet, MatchType::Is, None, "ABC", "abc").unwrap());
    }

    #[test]
    fn contains_follows_the_case_rule() {
        assert!(verify(
            Comparator::AsciiCasemap,
            MatchType::Contains,
            None,
            "An Urgent Subject",
            "urgent"
        )
        .unwrap());
        assert!(!verify(
            Comparator::Octet,
            MatchType::Contains,
            None,
            "An Urgent Subject",
            "urgent"
        )
        .unwrap());
    }

    #[rstest]
    #[case("foo@example.com", "*@example.com", true)]
    #[case("foo@example.com", "*@EXAMPLE.*", true)]
    #[case("foo@other.org", "*@example.com", false)]
    #[case("abc", "a?c", true)]
    #[case("ac", "a?c", false)]
    #[case("a*c", r"a\*c", true)]
    #[case("abc", r"a\*c", false)]
    fn wildcard_cases(#[case] source: &str, #[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(glob_match(source, pattern).unwrap().is_some(), expected);
    }

    #[test]
    fn wildcard_captures_feed_positionals() {
        let captures = glob_match("foo@example.com", "*@*.com").unwrap().unwrap();
        assert_eq!(
            captures,
            vec![
                "foo@example.com".to_string(),
                "foo".to_string(),
                "example".to_string(),
            ]
        );
    }

    #[test]
    fn stars_before_the_last_are_lazy() {
        // a greedy first star would swallow up to the second '-'.
        let captures = glob_match("a-b-c", "*-*").unwrap().unwrap();
        assert_eq!(captures[1], "a");
        assert_eq!(captures[2], "b-c");
    }

    #[test]
    fn wildcard_spans_line_breaks() {
        assert!(glob_match("first\nsecond", "first*second")
            .unwrap()
            .is_some());
    }

    #[test]
    fn count_ignores_empty_sources() {
        let sources = ["", "a", "", "b"];
        assert!(counts(Relational::Eq, &sources, "2").unwrap());
        assert!(counts(Relational::Lt, &sources, "3").unwrap());
        assert!(!counts(Relational::Ge, &sources, "3").unwrap());
    }

    #[test]
    fn count_key_must_be_numeric() {
        assert!(matches!(
            counts(Relational::Eq, &["a"], "many"),
            Err(FilterError::Syntax(_))
        ));
    }

    #[rstest]
    #[case("17", "5", Relational::Gt, true)]
    #[case("5", "5", Relational::Ge, true)]
    #[case("5x", "5", Relational::Eq, true)] // leading digits only
    #[case("abc", "5", Relational::Gt, true)] // non-numeric is infinity
    #[case("5", "abc", Relational::Lt, true)]
    #[case("abc", "def", Relational::Eq, true)]
    fn numeric_value_comparisons(
        #[case] source: &str,
        #[case] key: &str,
        #[case] operator: Relational,
        #[case] expected: bool,
    ) {
        assert_eq!(
            verify(
                Comparator::AsciiNumeric,
                MatchType::Value,
                Some(operator),
                source,
                key
            )
            .unwrap(),
            expected
        );
    }

    #[test]
    fn numeric_is_of_non_numeric_operands() {
        assert!(verify(
            Comparator::AsciiNumeric,
            MatchType::Is,
            None,
            "abc",
            "abc"
        )
        .unwrap());
        assert!(!verify(
            Comparator::AsciiNumeric,
            MatchType::Is,
            None,
            "abc",
            "5"
        )
        .unwrap());
    }

    #[test]
    fn misplaced_relational_operator() {
        assert!(matches!(
            verify(
                Comparator::AsciiCasemap,
                MatchType::Is,
                Some(Relational::Gt),
                "a",
                "b"
            ),
            Err(FilterError::Syntax(_))
        ));
        assert!(matches!(
            verify(Comparator::AsciiCasemap, MatchType::Value, None, "a", "b"),
            Err(FilterError::Syntax(_))
        ));
    }
}
