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

//! `require` bookkeeping: which extensions a run declared, and whether
//! using an undeclared one is an error or merely tolerated.

use std::collections::HashSet;

use crate::error::{FilterError, FilterResult};

/// Extensions a script can declare with `require`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Capability {
    ///
    FileInto,
    ///
    Copy,
    ///
    Envelope,
    ///
    Body,
    ///
    Variables,
    ///
    Relational,
    ///
    #[strum(serialize = "comparator-i;ascii-numeric")]
    ComparatorAsciiNumeric,
    ///
    EditHeader,
    ///
    Index,
    ///
    Reject,
    ///
    Ereject,
    ///
    Enotify,
    ///
    Imap4Flags,
    ///
    Tag,
    ///
    Flag,
    ///
    Date,
    ///
    Log,
}

/// Extensions declared so far in a run. Declarations are monotonic: an
/// extension stays declared until the run ends.
#[derive(Debug, Clone)]
pub struct CapabilityGate {
    declared: HashSet<Capability>,
    /// when off, undeclared use is tolerated (scripts written before
    /// `require` was enforced).
    enforced: bool,
}

impl CapabilityGate {
    ///
    #[must_use]
    pub fn new(enforced: bool) -> Self {
        Self {
            declared: HashSet::new(),
            enforced,
        }
    }

    /// declare an extension by its `require` name.
    ///
    /// # Errors
    ///
    /// * the name is not a supported extension ([`FilterError::Syntax`])
    pub fn declare(&mut self, name: &str) -> FilterResult<Capability> {
        let capability = name
            .parse::<Capability>()
            .map_err(|_| FilterError::Syntax(format!("unsupported extension '{name}'")))?;
        self.declared.insert(capability);
        Ok(capability)
    }

    ///
    #[must_use]
    pub fn is_declared(&self, capability: Capability) -> bool {
        self.declared.contains(&capability)
    }

    /// gate an extension's use.
    ///
    /// # Errors
    ///
    /// * enforcement is on and the extension was never declared
    ///   ([`FilterError::UndeclaredExtension`])
    pub fn require_or_fail(&self, capability: Capability) -> FilterResult<()> {
        if self.enforced && !self.declared.contains(&capability) {
            return Err(FilterError::UndeclaredExtension(capability.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn declare_then_use() {
        let mut gate = CapabilityGate::new(true);
        assert_eq!(
            gate.require_or_fail(Capability::EditHeader).unwrap_err(),
            FilterError::UndeclaredExtension("editheader".to_string())
        );

        gate.declare("editheader").unwrap();
        gate.require_or_fail(Capability::EditHeader).unwrap();
    }

    #[test]
    fn unknown_extension_is_a_syntax_error() {
        let mut gate = CapabilityGate::new(true);
        assert!(matches!(
            gate.declare("teleportation"),
            Err(FilterError::Syntax(_))
        ));
    }

    #[test]
    fn enforcement_off_tolerates_undeclared_use() {
        let gate = CapabilityGate::new(false);
        gate.require_or_fail(Capability::Enotify).unwrap();
    }

    #[test]
    fn numeric_comparator_require_name() {
        let mut gate = CapabilityGate::new(true);
        assert_eq!(
            gate.declare("comparator-i;ascii-numeric").unwrap(),
            Capability::ComparatorAsciiNumeric
        );
    }
}
