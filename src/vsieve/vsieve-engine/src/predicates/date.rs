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

//! Date and time-of-day predicates, always evaluated in the account's
//! timezone (`now` comes from the mailbox oracle already localized).

use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

use vsieve_mail_parser::Mail;

/// The message's effective date: its own `Date` header when present
/// and parseable, the current time otherwise.
#[must_use]
pub fn effective_date(mail: &Mail, now: OffsetDateTime) -> OffsetDateTime {
    mail.get_header("Date")
        .and_then(|value| OffsetDateTime::parse(value.trim(), &Rfc2822).ok())
        .unwrap_or(now)
}

/// `date :before`/`date :after` against a day threshold, exclusive on
/// both sides.
#[must_use]
pub fn date_test(mail: &Mail, now: OffsetDateTime, before: bool, threshold: time::Date) -> bool {
    let date = effective_date(mail, now).to_offset(now.offset()).date();
    if before {
        date < threshold
    } else {
        date > threshold
    }
}

/// `currentdayofweek`: `0` = Sunday through `6` = Saturday.
#[must_use]
pub fn current_day_of_week(now: OffsetDateTime, days: &[u8]) -> bool {
    let today = now.date().weekday().number_days_from_sunday();
    days.contains(&today)
}

/// `currenttime :before`/`:after` against a time-of-day threshold.
#[must_use]
pub fn current_time(now: OffsetDateTime, before: bool, threshold: time::Time) -> bool {
    if before {
        now.time() < threshold
    } else {
        now.time() > threshold
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{datetime, date, time};
    use vsieve_mail_parser::{BodyType, MailHeaders};

    use super::*;

    fn mail_with_date(value: &str) -> Mail {
        Mail {
            headers: MailHeaders(vec![("Date".to_string(), value.to_string())]),
            body: BodyType::Undefined,
        }
    }

    #[test]
    fn date_header_wins_over_now() {
        let now = datetime!(2023-03-10 12:00 UTC);
        let mail = mail_with_date("Wed, 1 Feb 2023 10:30:00 +0000");
        assert_eq!(
            effective_date(&mail, now),
            datetime!(2023-02-01 10:30 UTC)
        );
    }

    #[test]
    fn unparseable_date_falls_back_to_now() {
        let now = datetime!(2023-03-10 12:00 UTC);
        let mail = mail_with_date("yesterday-ish");
        assert_eq!(effective_date(&mail, now), now);
    }

    #[test]
    fn before_and_after_are_exclusive() {
        let now = datetime!(2023-03-10 12:00 UTC);
        let mail = mail_with_date("Wed, 1 Feb 2023 10:30:00 +0000");

        assert!(date_test(&mail, now, true, date!(2023 - 02 - 02)));
        assert!(!date_test(&mail, now, true, date!(2023 - 02 - 01)));
        assert!(date_test(&mail, now, false, date!(2023 - 01 - 31)));
        assert!(!date_test(&mail, now, false, date!(2023 - 02 - 01)));
    }

    #[test]
    fn day_of_week_numbering() {
        // 2023-03-12 is a Sunday.
        let sunday = datetime!(2023-03-12 09:00 UTC);
        assert!(current_day_of_week(sunday, &[0, 6]));
        assert!(!current_day_of_week(sunday, &[1, 2, 3, 4, 5]));
    }

    #[test]
    fn time_of_day() {
        let now = datetime!(2023-03-10 12:00 UTC);
        assert!(current_time(now, true, time!(13:00)));
        assert!(current_time(now, false, time!(11:00)));
        assert!(!current_time(now, true, time!(12:00)));
    }
}
