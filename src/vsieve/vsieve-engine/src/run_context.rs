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

use vsieve_common::{
    Action, AccountFeatures, Address, Comparator, Importance, InviteMethod, InviteMethodClass,
    MailboxOracle, MessageView, ParseStatus,
};
use vsieve_mail_parser::rfc2047;

use crate::actions::{edit_header, notify};
use crate::capability::{Capability, CapabilityGate};
use crate::error::{FilterError, FilterResult};
use crate::predicates;
use crate::script::{ActionNode, Test, TestParams};
use crate::variables::VariableStore;

/// One filter evaluation over one inbound message. Owns everything the
/// run mutates; never shared across deliveries. The surrounding script
/// driver walks the rule tree, calling [`RunContext::evaluate_test`]
/// for leaf predicates and [`RunContext::execute_action`] for commands,
/// checking [`RunContext::stop`] between top-level rules.
pub struct RunContext<'a> {
    oracle: &'a dyn MailboxOracle,
    features: AccountFeatures,
    charset: String,
    view: MessageView,
    gate: CapabilityGate,
    variables: VariableStore,
    actions: Vec<Action>,
    stop: bool,
    discard_present: bool,
    add_header_fired: bool,
    delete_header_fired: bool,
    replace_header_fired: bool,
}

impl<'a> RunContext<'a> {
    /// start a run for one delivery attempt.
    #[must_use]
    pub fn new(view: MessageView, oracle: &'a dyn MailboxOracle) -> Self {
        let features = oracle.features();
        Self {
            gate: CapabilityGate::new(features.require_enforced),
            charset: oracle.default_charset(),
            oracle,
            features,
            view,
            variables: VariableStore::new(),
            actions: vec![],
            stop: false,
            discard_present: false,
            add_header_fired: false,
            delete_header_fired: false,
            replace_header_fired: false,
        }
    }

    /// the script's `require` construct.
    ///
    /// # Errors
    ///
    /// * an unsupported extension name ([`FilterError::Syntax`])
    pub fn require(&mut self, names: &[impl AsRef<str>]) -> FilterResult<()> {
        for name in names {
            self.gate.declare(name.as_ref())?;
        }
        Ok(())
    }

    ///
    #[must_use]
    pub const fn view(&self) -> &MessageView {
        &self.view
    }

    ///
    #[must_use]
    pub const fn stop(&self) -> bool {
        self.stop
    }

    ///
    #[must_use]
    pub const fn discard_present(&self) -> bool {
        self.discard_present
    }

    /// which edit-header action kinds fired (or would have, with the
    /// feature disabled); for downstream diagnostics.
    #[must_use]
    pub const fn edit_headers_fired(&self) -> (bool, bool, bool) {
        (
            self.add_header_fired,
            self.delete_header_fired,
            self.replace_header_fired,
        )
    }

    ///
    pub fn set_parse_status(&mut self, status: ParseStatus) {
        self.view.set_parse_status(status);
    }

    /// Evaluate one leaf predicate.
    ///
    /// # Errors
    ///
    /// * malformed arguments ([`FilterError::Syntax`]) or an undeclared
    ///   capability ([`FilterError::UndeclaredExtension`])
    pub fn evaluate_test(&mut self, test: &Test) -> FilterResult<bool> {
        match test {
            Test::Address(params) => {
                let params = self.resolved(params)?;
                predicates::address::evaluate(
                    self.view.mail(),
                    Some(&mut self.variables),
                    &params,
                )
            }
            Test::Envelope(params) => {
                self.gate.require_or_fail(Capability::Envelope)?;
                let params = self.resolved(params)?;
                predicates::address::evaluate_envelope(
                    self.view.envelope(),
                    Some(&mut self.variables),
                    &params,
                )
            }
            Test::Header(params) => {
                let params = self.resolved(params)?;
                predicates::header::evaluate(self.view.mail(), Some(&mut self.variables), &params)
            }
            Test::MimeHeader(params) => {
                let params = self.resolved(params)?;
                predicates::header::evaluate_mime(
                    self.view.mail(),
                    Some(&mut self.variables),
                    &params,
                )
            }
            Test::String(params) => {
                // without the variables extension the string test never fires.
                if !self.variables_active() {
                    return Ok(false);
                }
                let params = self.resolved(params)?;
                predicates::match_sources(&params, Some(&mut self.variables), &params.sources)
            }
            Test::Exists { headers } => Ok(predicates::header::exists(self.view.mail(), headers)),
            Test::Size { over, limit } => {
                Ok(predicates::header::size(self.view.size(), *over, *limit))
            }
            Test::Body(params) => {
                self.gate.require_or_fail(Capability::Body)?;
                let params = self.resolved(params)?;
                predicates::body::evaluate(self.view.mail(), &params)
            }
            Test::Attachment => Ok(self.view.has_attachment()),
            Test::Invite { methods } => Ok(self.invite_matches(methods)),
            Test::Bulk => Ok(predicates::classify::bulk(self.view.mail())),
            Test::List => Ok(predicates::classify::list(self.view.mail())),
            Test::Socialcast => Ok(predicates::classify::socialcast(self.view.mail())),
            Test::LinkedIn => Ok(predicates::classify::linkedin(self.view.mail())),
            Test::Me { headers } => Ok(self.contained_lookup(predicates::classify::me(
                self.view.mail(),
                headers,
                self.oracle,
            ))),
            Test::AddressBook { headers } => {
                Ok(self.contained_lookup(predicates::classify::address_book(
                    self.view.mail(),
                    headers,
                    self.oracle,
                )))
            }
            Test::ContactRanking { headers } => {
                Ok(self.contained_lookup(predicates::classify::contact_ranking(
                    self.view.mail(),
                    headers,
                    self.oracle,
                )))
            }
            Test::Conversation { scope } => {
                Ok(self.contained_lookup(predicates::classify::conversation(
                    &self.view,
                    *scope,
                    self.oracle,
                )))
            }
            Test::Date { before, threshold } => {
                self.gate.require_or_fail(Capability::Date)?;
                Ok(predicates::date::date_test(
                    self.view.mail(),
                    self.oracle.now(),
                    *before,
                    *threshold,
                ))
            }
            Test::CurrentDayOfWeek { days } => {
                self.gate.require_or_fail(Capability::Date)?;
                Ok(predicates::date::current_day_of_week(self.oracle.now(), days))
            }
            Test::CurrentTime { before, threshold } => {
                self.gate.require_or_fail(Capability::Date)?;
                Ok(predicates::date::current_time(
                    self.oracle.now(),
                    *before,
                    *threshold,
                ))
            }
        }
    }

    /// Execute one command node: appends a fully-resolved [`Action`]
    /// and, for the edit-header family, mutates the message in place.
    ///
    /// # Errors
    ///
    /// * malformed arguments ([`FilterError::Syntax`]) or an undeclared
    ///   capability ([`FilterError::UndeclaredExtension`]), both raised
    ///   before any mutation
    pub fn execute_action(&mut self, node: &ActionNode) -> FilterResult<()> {
        match node {
            ActionNode::Keep => self.actions.push(Action::Keep { explicit: true }),
            ActionNode::Discard => {
                self.discard_present = true;
                self.actions.push(Action::Discard);
            }
            ActionNode::Stop => self.stop = true,
            ActionNode::FileInto { folder, copy } => {
                self.gate.require_or_fail(Capability::FileInto)?;
                if *copy {
                    self.gate.require_or_fail(Capability::Copy)?;
                }
                let folder = self.subst(folder)?;
                self.actions.push(Action::FileInto {
                    folder,
                    copy: *copy,
                });
            }
            ActionNode::Redirect { address, copy } => {
                if *copy {
                    self.gate.require_or_fail(Capability::Copy)?;
                }
                let address = self.parse_address(&self.subst(address)?)?;
                self.actions.push(Action::Redirect {
                    address,
                    copy: *copy,
                });
            }
            ActionNode::Reject { message } => {
                self.gate.require_or_fail(Capability::Reject)?;
                let message = self.subst(message)?;
                if self.features.reject_enabled {
                    self.actions.push(Action::Reject { message });
                } else {
                    tracing::info!("reject is disabled for this account, keeping instead");
                }
            }
            ActionNode::Ereject { message } => {
                self.gate.require_or_fail(Capability::Ereject)?;
                let message = self.subst(message)?;
                if self.features.reject_enabled {
                    self.actions.push(Action::Ereject { message });
                } else {
                    tracing::info!("ereject is disabled for this account, keeping instead");
                }
            }
            ActionNode::Tag { name } => {
                self.gate.require_or_fail(Capability::Tag)?;
                let name = self.subst(name)?;
                self.actions.push(Action::Tag { name });
            }
            ActionNode::Flag { kind, set } => {
                self.gate.require_or_fail(Capability::Flag)?;
                self.actions.push(Action::Flag {
                    kind: *kind,
                    set: *set,
                });
            }
            ActionNode::Notify {
                address,
                subject,
                body,
                max_body_bytes,
                origin_headers,
            } => {
                self.gate.require_or_fail(Capability::Enotify)?;
                let recipient = self.parse_address(&self.subst(address)?)?;
                let subject = self.subst(subject)?;
                let mut body = self.subst(body)?;
                if let Some(max) = max_body_bytes {
                    body = notify::truncate_body(&body, *max);
                }
                self.actions.push(Action::Notify {
                    recipient,
                    subject,
                    body,
                    max_body_bytes: *max_body_bytes,
                    origin_headers: origin_headers.clone(),
                });
            }
            ActionNode::NotifyMailto {
                method,
                from,
                importance,
                options,
                message,
            } => self.notify_mailto(method, from.as_deref(), *importance, options, message.as_deref())?,
            ActionNode::Set {
                name,
                value,
                modifiers,
            } => {
                self.gate.require_or_fail(Capability::Variables)?;
                if !self.features.variables_enabled {
                    tracing::info!("variables are disabled for this account, 'set' skipped");
                    return Ok(());
                }
                let value = self.variables.substitute(value)?;
                self.variables.set(name, &value, modifiers)?;
            }
            ActionNode::AddHeader { name, value, last } => {
                self.gate.require_or_fail(Capability::EditHeader)?;
                let name = self.subst(name)?;
                let value = self.subst(value)?;
                self.add_header_fired = true;
                if !self.features.edit_header_enabled {
                    tracing::info!("editheader is disabled for this account, 'addheader' skipped");
                    return Ok(());
                }
                let status = self.view.parse_status();
                edit_header::add(
                    &mut self.view,
                    &self.features,
                    status,
                    &self.charset,
                    &name,
                    &value,
                    *last,
                )?;
                self.actions.push(Action::AddHeader {
                    name,
                    value,
                    at_front: !*last,
                });
            }
            ActionNode::DeleteHeader(directive) => {
                self.gate.require_or_fail(Capability::EditHeader)?;
                if directive.index.is_some() || directive.last {
                    self.gate.require_or_fail(Capability::Index)?;
                }
                let mut directive = self.resolved_directive(directive)?;
                self.delete_header_fired = true;
                if !self.features.edit_header_enabled {
                    tracing::info!(
                        "editheader is disabled for this account, 'deleteheader' skipped"
                    );
                    return Ok(());
                }
                let status = self.view.parse_status();
                edit_header::delete(&mut self.view, &self.features, status, &mut directive)?;
                self.actions.push(Action::DeleteHeader {
                    name: directive.name,
                    values: directive.values,
                    index: directive.index,
                    last: directive.last,
                    comparator: directive.comparator,
                    match_type: directive.match_type,
                });
            }
            ActionNode::ReplaceHeader {
                directive,
                new_name,
                new_value,
            } => {
                self.gate.require_or_fail(Capability::EditHeader)?;
                if directive.index.is_some() || directive.last {
                    self.gate.require_or_fail(Capability::Index)?;
                }
                let mut directive = self.resolved_directive(directive)?;
                let new_name = new_name.as_deref().map(|n| self.subst(n)).transpose()?;
                let new_value = new_value.as_deref().map(|v| self.subst(v)).transpose()?;
                self.replace_header_fired = true;
                if !self.features.edit_header_enabled {
                    tracing::info!(
                        "editheader is disabled for this account, 'replaceheader' skipped"
                    );
                    return Ok(());
                }
                let status = self.view.parse_status();
                edit_header::replace(
                    &mut self.view,
                    &self.features,
                    status,
                    &self.charset,
                    &mut directive,
                    new_name.as_deref(),
                    new_value.as_deref(),
                )?;
                self.actions.push(Action::ReplaceHeader {
                    name: directive.name,
                    new_name,
                    new_value,
                    values: directive.values,
                    index: directive.index,
                    last: directive.last,
                    comparator: directive.comparator,
                    match_type: directive.match_type,
                });
            }
            ActionNode::Log { message } => {
                self.gate.require_or_fail(Capability::Log)?;
                let message = self.subst(message)?;
                tracing::info!(target: "filter_script", "{message}");
            }
        }
        Ok(())
    }

    /// End the run. When nothing cancelled it, the implicit keep is
    /// appended so the delivery pipeline always has a disposition.
    #[must_use]
    pub fn finish(mut self) -> Vec<Action> {
        if !self.actions.iter().any(Action::cancels_implicit_keep) {
            self.actions.push(Action::Keep { explicit: false });
        }
        self.actions
    }

    fn variables_active(&self) -> bool {
        self.features.variables_enabled && self.gate.is_declared(Capability::Variables)
    }

    fn subst(&self, template: &str) -> FilterResult<String> {
        if self.variables_active() {
            self.variables.substitute(template)
        } else {
            Ok(template.to_string())
        }
    }

    /// substitute variables in sources and keys, and gate the
    /// comparator extensions the params pull in.
    fn resolved(&self, params: &TestParams) -> FilterResult<TestParams> {
        self.check_comparator_caps(params)?;
        let mut params = params.clone();
        if self.variables_active() {
            for source in &mut params.sources {
                *source = self.variables.substitute(source)?;
            }
            for key in &mut params.keys {
                *key = self.variables.substitute(key)?;
            }
        }
        Ok(params)
    }

    fn resolved_directive(
        &self,
        directive: &edit_header::EditHeaderDirective,
    ) -> FilterResult<edit_header::EditHeaderDirective> {
        let mut directive = directive.clone();
        directive.name = self.subst(&directive.name)?;
        for value in &mut directive.values {
            *value = self.subst(value)?;
        }
        Ok(directive)
    }

    fn check_comparator_caps(&self, params: &TestParams) -> FilterResult<()> {
        if params.match_type.is_relational() {
            self.gate.require_or_fail(Capability::Relational)?;
        }
        if params.comparator == Comparator::AsciiNumeric {
            self.gate.require_or_fail(Capability::ComparatorAsciiNumeric)?;
        }
        Ok(())
    }

    fn parse_address(&self, raw: &str) -> FilterResult<Address> {
        raw.parse::<Address>()
            .map_err(|error| FilterError::Syntax(format!("invalid address: {error}")))
    }

    /// a failed mailbox lookup never blocks delivery: log it, the
    /// predicate is false.
    fn contained_lookup(&self, result: Result<bool, vsieve_common::LookupError>) -> bool {
        result.unwrap_or_else(|error| {
            tracing::warn!(%error, "mailbox lookup failed, predicate evaluates false");
            false
        })
    }

    fn invite_matches(&self, methods: &[String]) -> bool {
        self.view.invite().is_some_and(|invite| {
            if methods.is_empty() {
                return true;
            }
            methods.iter().any(|entry| {
                entry
                    .parse::<InviteMethodClass>()
                    .map(|class| invite.method_class() == class)
                    .or_else(|_| {
                        entry
                            .parse::<InviteMethod>()
                            .map(|method| invite.method == method)
                    })
                    .unwrap_or(false)
            })
        })
    }

    fn notify_mailto(
        &mut self,
        method: &str,
        from: Option<&str>,
        importance: Importance,
        options: &[String],
        message: Option<&str>,
    ) -> FilterResult<()> {
        self.gate.require_or_fail(Capability::Enotify)?;
        let mailto = notify::parse_mailto(&self.subst(method)?)?;

        // an unparseable :from is dropped, not fatal (rfc5436 2.7).
        let from = match from {
            Some(raw) => match self.subst(raw)?.parse::<Address>() {
                Ok(address) => Some(address),
                Err(error) => {
                    tracing::warn!(%error, "invalid notify ':from' dropped");
                    None
                }
            },
            None => None,
        };

        // subject precedence: :message, then the URI parameter, then
        // the subject of the triggering message.
        let subject = match message {
            Some(message) => self.subst(message)?,
            None => mailto.subject.unwrap_or_else(|| {
                self.view
                    .mail()
                    .get_header("Subject")
                    .map(rfc2047::decode)
                    .unwrap_or_default()
            }),
        };
        let body = mailto.params.body.clone().unwrap_or_default();

        self.actions.push(Action::NotifyMailto {
            recipient: mailto.recipient,
            from,
            importance,
            options: options.to_vec(),
            subject,
            body,
            params: mailto.params,
        });
        Ok(())
    }
}
