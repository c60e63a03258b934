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

use super::mail::Mail;

/// Byte-form of a message: the representation concurrent readers (virus and
/// spam scans, final delivery) consume. Header lines are kept verbatim,
/// folded continuations included.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct RawBody {
    headers: Vec<String>,
    body: Option<String>,
}

impl RawBody {
    ///
    #[must_use]
    pub fn new(headers: Vec<String>, body: String) -> Self {
        Self {
            headers,
            body: Some(body),
        }
    }

    ///
    #[must_use]
    pub fn new_empty(headers: Vec<String>) -> Self {
        Self {
            headers,
            body: None,
        }
    }

    /// Return an iterator over the headers field
    pub fn headers_lines(&self) -> impl Iterator<Item = &str> {
        self.headers.iter().map(String::as_str)
    }

    ///
    #[must_use]
    pub const fn body(&self) -> &Option<String> {
        &self.body
    }

    /// size in bytes of the rendered message.
    #[must_use]
    pub fn size(&self) -> usize {
        self.headers.iter().map(|l| l.len() + 2).sum::<usize>()
            + 2
            + self.body.as_ref().map_or(0, String::len)
    }

    /// header name/value pairs, folded continuation lines unfolded into
    /// a single space separated value.
    #[must_use]
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut out = vec![];
        for (idx, header) in self.headers.iter().enumerate() {
            if header.starts_with(' ') || header.starts_with('\t') {
                continue;
            }
            let mut split = header.splitn(2, ':');
            match (split.next(), split.next()) {
                (Some(key), Some(value)) => {
                    let mut s = value.to_string();
                    for i in self.headers[idx + 1..]
                        .iter()
                        .take_while(|s| s.starts_with(' ') || s.starts_with('\t'))
                    {
                        s.push(' ');
                        s.push_str(i.trim_start());
                    }
                    out.push((key.to_string(), s.trim().to_string()));
                }
                _ => continue,
            }
        }
        out
    }

    ///
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<String> {
        self.headers()
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }
}

impl From<&Mail> for RawBody {
    /// render the parsed form back into byte-form lines; called by
    /// `resync` after a header edit so later reads see the edited state.
    fn from(mail: &Mail) -> Self {
        let rendered = mail.to_string();
        let (headers, body) = rendered
            .split_once("\r\n\r\n")
            .map_or((rendered.as_str(), None), |(h, b)| (h, Some(b)));

        Self {
            headers: headers
                .split("\r\n")
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            body: body.map(str::to_string),
        }
    }
}

impl std::fmt::Display for RawBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in &self.headers {
            f.write_str(i)?;
            f.write_str("\r\n")?;
        }
        f.write_str("\r\n")?;
        if let Some(body) = &self.body {
            f.write_str(body)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::mail::{BodyType, MailHeaders};

    #[test]
    fn unfold_multiline_header() {
        let raw = RawBody::new(
            vec![
                "Subject: a folded".to_string(),
                "\tsubject value".to_string(),
                "X-Test: v1".to_string(),
            ],
            "body\r\n".to_string(),
        );

        assert_eq!(
            raw.headers(),
            vec![
                ("Subject".to_string(), "a folded subject value".to_string()),
                ("X-Test".to_string(), "v1".to_string()),
            ]
        );
        assert_eq!(raw.get_header("subject").unwrap(), "a folded subject value");
    }

    #[test]
    fn resync_from_parsed_form() {
        let mail = Mail {
            headers: MailHeaders(vec![
                ("Return-Path".to_string(), "<a@a>".to_string()),
                ("Subject".to_string(), "hi".to_string()),
            ]),
            body: BodyType::Regular(vec!["hello".to_string()]),
        };

        let raw = RawBody::from(&mail);
        assert_eq!(raw.get_header("Subject").unwrap(), "hi");
        assert_eq!(raw.body(), &Some("hello\r\n".to_string()));
        assert_eq!(raw.headers_lines().next().unwrap(), "Return-Path: <a@a>");
    }
}
