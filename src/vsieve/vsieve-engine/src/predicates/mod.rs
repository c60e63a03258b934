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

//! One module per predicate family. All share a contract: sources and
//! keys arrive already variable-substituted, the output is a boolean,
//! and the only side effect is `matches` refreshing the positional
//! variables.

pub mod address;
pub mod body;
pub mod classify;
pub mod date;
pub mod header;

use vsieve_common::MatchType;

use crate::comparator;
use crate::error::{FilterError, FilterResult};
use crate::script::TestParams;
use crate::variables::VariableStore;

/// Evaluate extracted source values against the params' keys: true as
/// soon as any source/key pair matches. `:count` aggregates over the
/// whole source list instead. The first successful wildcard match
/// refreshes the store's positional variables.
pub(crate) fn match_sources(
    params: &TestParams,
    mut store: Option<&mut VariableStore>,
    sources: &[String],
) -> FilterResult<bool> {
    params.validate()?;

    if params.match_type == MatchType::Count {
        let operator = params
            .operator
            .ok_or_else(|| FilterError::Syntax("':count' requires an operator".to_string()))?;
        for key in &params.keys {
            if comparator::counts(operator, sources, key)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }

    for source in sources {
        for key in &params.keys {
            if params.match_type == MatchType::Matches {
                if let Some(captures) = comparator::glob_match(source, key)? {
                    if let Some(store) = store.as_deref_mut() {
                        store.set_matched(captures);
                    }
                    return Ok(true);
                }
            } else if comparator::verify(
                params.comparator,
                params.match_type,
                params.operator,
                source,
                key,
            )? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use vsieve_common::{Comparator, Relational};

    use super::*;

    #[test]
    fn any_pair_matching_is_enough() {
        let params = TestParams {
            keys: vec!["nope".to_string(), "beta".to_string()],
            ..TestParams::default()
        };
        let sources = vec!["alpha".to_string(), "BETA".to_string()];
        assert!(match_sources(&params, None, &sources).unwrap());
    }

    #[test]
    fn count_aggregates_the_source_list() {
        let params = TestParams {
            match_type: MatchType::Count,
            operator: Some(Relational::Ge),
            keys: vec!["2".to_string()],
            ..TestParams::default()
        };
        let three = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let one = vec!["a".to_string()];
        assert!(match_sources(&params, None, &three).unwrap());
        assert!(!match_sources(&params, None, &one).unwrap());
    }

    #[test]
    fn first_wildcard_match_updates_positionals() {
        let params = TestParams {
            match_type: MatchType::Matches,
            keys: vec!["*@example.com".to_string()],
            ..TestParams::default()
        };
        let mut store = VariableStore::new();
        let sources = vec!["foo@example.com".to_string()];
        assert!(match_sources(&params, Some(&mut store), &sources).unwrap());
        assert_eq!(store.positional(1).unwrap(), "foo");
    }

    #[test]
    fn octet_comparator_respected() {
        let params = TestParams {
            comparator: Comparator::Octet,
            keys: vec!["beta".to_string()],
            ..TestParams::default()
        };
        let sources = vec!["BETA".to_string()];
        assert!(!match_sources(&params, None, &sources).unwrap());
    }
}
