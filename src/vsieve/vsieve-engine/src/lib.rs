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

//! vSieve filtering engine
//!
//! Evaluates the leaf predicates of a pre-parsed Sieve script against
//! an inbound message and accumulates the ordered action list the
//! delivery pipeline carries out. Header-editing actions mutate the
//! message in place under rfc5293 rules.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::missing_const_for_fn)] // see https://github.com/rust-lang/rust-clippy/issues/9271

pub mod actions;
pub mod capability;
pub mod comparator;
pub mod predicates;
pub mod script;
pub mod variables;

mod error;
mod run_context;

pub use actions::edit_header::EditHeaderDirective;
pub use capability::{Capability, CapabilityGate};
pub use error::{FilterError, FilterResult};
pub use run_context::RunContext;
pub use script::{ActionNode, AddressPart, Test, TestParams};
pub use variables::{Modifier, VariableStore};
