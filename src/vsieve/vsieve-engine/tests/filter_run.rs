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

//! A full run the way the script driver performs it: require, test,
//! act, finish.

use pretty_assertions::assert_eq;
use time::macros::datetime;

use vsieve_common::{
    Action, AccountFeatures, Address, ConversationScope, Envelope, LookupError, MailboxOracle,
    MatchType, MessageView,
};
use vsieve_engine::{ActionNode, EditHeaderDirective, RunContext, Test, TestParams};
use vsieve_mail_parser::{BodyType, Mail, MailHeaders};

struct Oracle;

impl MailboxOracle for Oracle {
    fn is_me(&self, address: &Address) -> Result<bool, LookupError> {
        Ok(address.full() == "me@example.com")
    }

    fn in_address_book(&self, _: &Address) -> Result<bool, LookupError> {
        Ok(false)
    }

    fn is_ranked_contact(&self, _: &Address) -> Result<bool, LookupError> {
        Ok(false)
    }

    fn in_conversation(
        &self,
        _: ConversationScope,
        _: Option<&str>,
        _: &[String],
    ) -> Result<bool, LookupError> {
        Ok(false)
    }

    fn now(&self) -> time::OffsetDateTime {
        datetime!(2023-06-01 09:30 UTC)
    }

    fn features(&self) -> AccountFeatures {
        AccountFeatures::default()
    }
}

fn newsletter() -> MessageView {
    MessageView::new(
        Mail {
            headers: MailHeaders(vec![
                ("Return-Path".to_string(), "<news@letters.example>".to_string()),
                ("From".to_string(), "News <news@letters.example>".to_string()),
                ("To".to_string(), "me@example.com".to_string()),
                ("Subject".to_string(), "weekly digest #12".to_string()),
                ("List-Id".to_string(), "<digest.letters.example>".to_string()),
                ("X-Spam-Score".to_string(), "2".to_string()),
            ]),
            body: BodyType::Regular(vec!["this week in review".to_string()]),
        },
        Envelope::default(),
    )
}

#[test]
fn newsletter_is_filed_and_stamped() {
    let oracle = Oracle;
    let mut run = RunContext::new(newsletter(), &oracle);
    run.require(&["fileinto", "variables", "editheader"]).unwrap();

    // rule 1: capture the digest number, stamp the message, file it.
    if run
        .evaluate_test(&Test::Header(TestParams {
            match_type: MatchType::Matches,
            sources: vec!["subject".to_string()],
            keys: vec!["weekly digest #*".to_string()],
            ..TestParams::default()
        }))
        .unwrap()
        && run.evaluate_test(&Test::List).unwrap()
    {
        run.execute_action(&ActionNode::AddHeader {
            name: "X-Filed-As".to_string(),
            value: "digest ${1}".to_string(),
            last: true,
        })
        .unwrap();
        run.execute_action(&ActionNode::FileInto {
            folder: "newsletters".to_string(),
            copy: false,
        })
        .unwrap();
        run.execute_action(&ActionNode::Stop).unwrap();
    }
    assert!(run.stop());

    // the stamp was substituted and applied in place, and the raw
    // byte-form was resynced for whoever reads the message next.
    assert_eq!(
        run.view().mail().get_header("X-Filed-As").unwrap(),
        "digest 12"
    );
    assert_eq!(
        run.view().raw().get_header("X-Filed-As").unwrap(),
        "digest 12"
    );

    let actions = run.finish();
    assert_eq!(
        actions,
        vec![
            Action::AddHeader {
                name: "X-Filed-As".to_string(),
                value: "digest 12".to_string(),
                at_front: false,
            },
            Action::FileInto {
                folder: "newsletters".to_string(),
                copy: false,
            },
        ]
    );
}

#[test]
fn spam_scrub_then_default_delivery() {
    let oracle = Oracle;
    let mut run = RunContext::new(newsletter(), &oracle);
    run.require(&["editheader", "relational", "comparator-i;ascii-numeric"])
        .unwrap();

    // low spam score: the scrubbing rule does not fire.
    let spammy = run
        .evaluate_test(&Test::Header(TestParams {
            comparator: vsieve_common::Comparator::AsciiNumeric,
            match_type: MatchType::Value,
            operator: Some(vsieve_common::Relational::Ge),
            sources: vec!["x-spam-score".to_string()],
            keys: vec!["5".to_string()],
            ..TestParams::default()
        }))
        .unwrap();
    assert!(!spammy);

    // the scrub still runs for the tracking header, which is absent.
    run.execute_action(&ActionNode::DeleteHeader(EditHeaderDirective {
        name: "X-Tracking".to_string(),
        ..EditHeaderDirective::default()
    }))
    .unwrap();
    assert!(!run.view().is_edited());

    let actions = run.finish();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions.last().unwrap(), &Action::Keep { explicit: false });
}
