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

use super::mime_type::Mime;

/// we use Vec instead of a `HashMap` because header ordering is important:
/// duplicates are permitted, removal and insertion are order-preserving.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct MailHeaders(pub Vec<(String, String)>);

impl MailHeaders {
    /// value of the first header with that name, case-insensitive.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// values of every header with that name, in message order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// number of headers with that name.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.0
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .count()
    }

    /// append a header after all existing ones.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// insert a header at the very front of the section.
    pub fn prepend(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(0, (name.into(), value.into()));
    }

    /// remove every header with that name, preserving the relative order of
    /// the survivors. Returns the number of removed instances.
    pub fn remove_all(&mut self, name: &str) -> usize {
        let before = self.0.len();
        self.0.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        before - self.0.len()
    }
}

impl std::fmt::Display for MailHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in self.0.iter().map(|(k, v)| HeaderFoldable(k, v)) {
            write!(f, "{i}")?;
        }
        Ok(())
    }
}

/// see rfc5322 (section 2.1 and 2.3)
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum BodyType {
    /// Text message body
    Regular(Vec<String>),
    /// Mime
    Mime(Box<Mime>),
    /// Empty message body
    #[default]
    Undefined,
}

impl std::fmt::Display for BodyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regular(content) => {
                for i in content {
                    if i.starts_with('.') {
                        std::fmt::Write::write_char(f, '.')?;
                    }
                    f.write_str(i)?;
                    f.write_str("\r\n")?;
                }
                Ok(())
            }
            Self::Mime(content) => {
                write!(f, "{content}")
            }
            Self::Undefined => Ok(()),
        }
    }
}

/// Message representation the filtering engine reads and edits.
#[derive(Clone, Default, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Mail {
    /// Message 's top level headers
    pub headers: MailHeaders,
    /// Message body content
    pub body: BodyType,
}

/// RFC 5322 rendering of one header: canonical key casing and folding.
#[derive(Debug)]
struct HeaderFoldable<'a>(&'a str, &'a str);

/// preferred fold column (soft), see rfc5322 section 2.1.1.
const FOLD_SOFT: usize = 78;
/// lines must never exceed this (hard).
const FOLD_HARD: usize = 998;

impl<'a> std::fmt::Display for HeaderFoldable<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = convert_case::Casing::to_case(&self.0, convert_case::Case::Train)
            .replace("Id", "ID")
            .replace("Mime-Version", "MIME-Version")
            .replace("Dkim", "DKIM")
            .replace("Spf", "SPF");

        f.write_str(&key)?;
        f.write_str(": ")?;

        let mut rest = self.1;
        if rest.is_empty() {
            return f.write_str("\r\n");
        }

        let mut prev = key.len() + 2;
        while !rest.is_empty() {
            let (left, right) = if rest.len() + prev > FOLD_SOFT {
                let soft = &rest[..std::cmp::min(rest.len(), FOLD_SOFT.saturating_sub(prev))];
                let hard = &rest[..std::cmp::min(rest.len(), FOLD_HARD.saturating_sub(prev))];
                soft.rfind(char::is_whitespace)
                    .or_else(|| hard.rfind(char::is_whitespace))
                    .filter(|idx| *idx > 0)
                    .map(|idx| (&rest[..idx], &rest[idx..]))
            } else {
                None
            }
            .unwrap_or((rest, ""));

            f.write_str(left)?;
            f.write_str("\r\n")?;

            rest = right;
            if !rest.is_empty() {
                std::fmt::Write::write_char(f, '\t')?;
                prev = 1;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Mail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.headers)?;

        if !matches!(self.body, BodyType::Mime(_)) {
            f.write_str("\r\n")?;
        }

        write!(f, "{}", self.body)
    }
}

impl Mail {
    /// get the value of a top level header, `None` if it does not exist.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// all values carried by headers with that name, in message order.
    #[must_use]
    pub fn get_all_headers(&self, name: &str) -> Vec<&str> {
        self.headers.get_all(name)
    }

    /// Count the number of time a header is present.
    #[must_use]
    pub fn count_header(&self, name: &str) -> usize {
        self.headers.count(name)
    }

    /// push new headers to the email.
    pub fn push_headers(&mut self, headers: impl IntoIterator<Item = (String, String)>) {
        self.headers.0.extend(headers);
    }

    /// prepend new headers to the email.
    pub fn prepend_headers(&mut self, headers: impl IntoIterator<Item = (String, String)>) {
        self.headers.0.splice(..0, headers);
    }

    /// Remove every header with that name from the list.
    pub fn remove_header(&mut self, name: &str) -> bool {
        self.headers.remove_all(name) != 0
    }

    /// every mime part of the body, depth first, `None` body gives an empty list.
    #[must_use]
    pub fn mime_parts(&self) -> Vec<&Mime> {
        match &self.body {
            BodyType::Mime(mime) => mime.flatten(),
            BodyType::Regular(_) | BodyType::Undefined => vec![],
        }
    }

    /// body of the message reduced to plain text segments, one per
    /// text/plain or text/html part. Used by substring scans over the body.
    #[must_use]
    pub fn text_segments(&self) -> Vec<String> {
        match &self.body {
            BodyType::Regular(lines) => vec![lines.join("\n")],
            BodyType::Mime(mime) => mime
                .flatten()
                .into_iter()
                .filter_map(Mime::text_content)
                .collect(),
            BodyType::Undefined => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::mime_type::{MimeBodyType, MimeHeader};

    #[test]
    fn construct_mail() {
        let empty_mail = Mail {
            headers: MailHeaders(vec![("From".to_string(), "a@a".to_string())]),
            body: BodyType::Undefined,
        };

        assert_eq!(format!("{empty_mail}"), "From: a@a\r\n\r\n".to_string());

        let regular_mail = Mail {
            headers: MailHeaders(vec![("From".to_string(), "a@a".to_string())]),
            body: BodyType::Regular(vec!["This is a regular body.".to_string()]),
        };

        assert_eq!(
            format!("{regular_mail}"),
            "From: a@a\r\n\r\nThis is a regular body.\r\n".to_string()
        );

        let mime_mail = Mail {
            headers: MailHeaders(vec![
                ("From".to_string(), "a@a".to_string()),
                ("Mime-Version".to_string(), "1.0".to_string()),
            ]),
            body: BodyType::Mime(Box::new(Mime {
                // mime headers render their stored name verbatim.
                headers: vec![MimeHeader {
                    name: "Content-Type".to_string(),
                    value: "text/plain".to_string(),
                    args: std::collections::HashMap::new(),
                }],
                content: MimeBodyType::Regular(vec!["this is a regular mime body.".to_string()]),
            })),
        };

        // mime headers are merged with the rfc822 message header section.
        assert_eq!(
            format!("{mime_mail}"),
            [
                "From: a@a\r\n",
                "MIME-Version: 1.0\r\n",
                "Content-Type: text/plain\r\n",
                "\r\n",
                "this is a regular mime body.\r\n",
            ]
            .concat()
        );
    }

    #[test]
    fn duplicate_headers_keep_order() {
        let mut headers = MailHeaders::default();
        headers.push("Received", "from a");
        headers.push("X-Test", "v1");
        headers.push("Received", "from b");
        headers.push("x-test", "v2");

        assert_eq!(headers.get("X-Test"), Some("v1"));
        assert_eq!(headers.get_all("x-TEST"), vec!["v1", "v2"]);
        assert_eq!(headers.count("received"), 2);

        assert_eq!(headers.remove_all("Received"), 2);
        assert_eq!(
            headers.0,
            vec![
                ("X-Test".to_string(), "v1".to_string()),
                ("x-test".to_string(), "v2".to_string()),
            ]
        );
    }

    #[test]
    fn long_values_are_folded() {
        let mail = Mail {
            headers: MailHeaders(vec![(
                "Subject".to_string(),
                "a very long subject line that goes on and on and on and keeps \
                 going past the preferred seventy eight character soft limit"
                    .to_string(),
            )]),
            body: BodyType::Undefined,
        };

        let rendered = mail.to_string();
        for line in rendered.split("\r\n") {
            assert!(line.len() <= 78, "line too long: {line:?}");
        }
        assert!(rendered.contains("\r\n\t"));
    }

    #[test]
    fn text_segments_of_regular_body() {
        let mail = Mail {
            headers: MailHeaders::default(),
            body: BodyType::Regular(vec!["line one".to_string(), "line two".to_string()]),
        };
        assert_eq!(mail.text_segments(), vec!["line one\nline two".to_string()]);
    }
}
