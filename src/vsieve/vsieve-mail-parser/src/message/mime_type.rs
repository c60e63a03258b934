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

/// header of a mime section
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct MimeHeader {
    ///
    pub name: String,
    ///
    pub value: String,
    /// parameter ordering does not matter.
    pub args: std::collections::HashMap<String, String>,
}

///
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum MimeBodyType {
    ///
    Regular(Vec<String>),
    ///
    Multipart(MimeMultipart),
    ///
    Embedded(Mail),
}

///
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct MimeMultipart {
    ///
    pub preamble: String,
    ///
    pub parts: Vec<Mime>,
    ///
    pub epilogue: String,
}

impl std::fmt::Display for MimeHeader {
    /// the stored name goes out verbatim; part headers keep whatever
    /// casing the wire carried, unlike the canonicalized rfc822 section.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}: {}", self.name, self.value))?;
        if !self.args.is_empty() {
            for (key, value) in &self.args {
                f.write_fmt(format_args!("; {key}=\"{value}\""))?;
            }
        }
        f.write_str("\r\n")?;
        Ok(())
    }
}

struct MimeMultipartDisplayable<'a>(&'a MimeMultipart, &'a str);

impl<'a> std::fmt::Display for MimeMultipartDisplayable<'a> {
    ///  preamble
    ///  --boundary
    ///  *{ headers \n body \n boundary}
    ///  epilogue || nothing
    ///  --end-boundary--
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.0.preamble.is_empty() {
            f.write_fmt(format_args!("{}\r\n", self.0.preamble))?;
        }

        for i in &self.0.parts {
            f.write_fmt(format_args!("--{}\r\n", self.1))?;
            f.write_fmt(format_args!("{i}"))?;
        }

        if !self.0.epilogue.is_empty() {
            f.write_str(&self.0.epilogue)?;
            f.write_str("\r\n")?;
        }
        f.write_fmt(format_args!("--{}--\r\n\r\n", self.1))?;
        Ok(())
    }
}

///
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Mime {
    ///
    pub headers: Vec<MimeHeader>,
    ///
    pub content: MimeBodyType,
}

/// html text extraction stops reading the source past this point.
const HTML_SCAN_CAP: usize = 1 << 20;

impl Mime {
    /// find a mime header of the part, case-insensitive.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&MimeHeader> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
    }

    /// `type/subtype` of the part, lowercased, `None` when the part
    /// carries no content-type header.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.get_header("content-type")
            .map(|header| header.value.trim().to_lowercase())
    }

    /// a part is an attachment when its disposition says so or when a
    /// filename parameter is attached to either disposition or type.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        if let Some(disposition) = self.get_header("content-disposition") {
            if disposition.value.trim().eq_ignore_ascii_case("attachment") {
                return true;
            }
            if disposition.args.contains_key("filename") {
                return true;
            }
        }
        self.get_header("content-type")
            .map_or(false, |ct| ct.args.contains_key("name"))
    }

    /// this part and every part nested below it, depth first.
    #[must_use]
    pub fn flatten(&self) -> Vec<&Mime> {
        let mut out = vec![self];
        match &self.content {
            MimeBodyType::Multipart(multipart) => {
                for part in &multipart.parts {
                    out.extend(part.flatten());
                }
            }
            MimeBodyType::Embedded(mail) => out.extend(mail.mime_parts()),
            MimeBodyType::Regular(_) => {}
        }
        out
    }

    /// plain text carried by this part: text/plain content verbatim,
    /// text/html reduced to its extracted text. `None` for anything else.
    #[must_use]
    pub fn text_content(&self) -> Option<String> {
        let kind = self.content_type().unwrap_or_else(|| "text/plain".into());
        let lines = match &self.content {
            MimeBodyType::Regular(lines) => lines,
            MimeBodyType::Multipart(_) | MimeBodyType::Embedded(_) => return None,
        };
        match kind.as_str() {
            "text/plain" => Some(lines.join("\n")),
            "text/html" => Some(extract_html_text(&lines.join("\n"))),
            _ => None,
        }
    }
}

/// Strip markup from an html part, dropping script and style islands.
/// The input is capped so a pathological part cannot stall a filter run.
fn extract_html_text(html: &str) -> String {
    let html = &html[..floor_char_boundary(html, HTML_SCAN_CAP)];
    let mut out = String::with_capacity(html.len() / 2);
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        rest = &rest[open..];

        let tag_end = match rest.find('>') {
            Some(idx) => idx,
            None => return decode_basic_entities(&out),
        };
        let tag = rest[1..tag_end].trim().to_lowercase();
        rest = &rest[tag_end + 1..];

        for skipped in ["script", "style"] {
            if tag.starts_with(skipped) {
                let close = format!("</{skipped}");
                match rest.to_lowercase().find(&close) {
                    Some(idx) => {
                        rest = &rest[idx..];
                        rest = rest.find('>').map_or("", |end| &rest[end + 1..]);
                    }
                    None => rest = "",
                }
            }
        }
        // block level tags separate words
        if matches!(
            tag.split([' ', '/']).next().unwrap_or(""),
            "p" | "br" | "div" | "tr" | "li" | "td"
        ) && !out.ends_with(char::is_whitespace)
        {
            out.push(' ');
        }
    }
    out.push_str(rest);
    decode_basic_entities(&out)
}

fn decode_basic_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

impl std::fmt::Display for Mime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in &self.headers {
            write!(f, "{i}")?;
        }
        f.write_str("\r\n")?;

        match &self.content {
            MimeBodyType::Regular(regular) => {
                for i in regular {
                    write!(f, "{i}")?;
                    f.write_str("\r\n")?;
                }
                Ok(())
            }
            MimeBodyType::Multipart(multipart) => {
                let boundary = self
                    .headers
                    .iter()
                    .find_map(|header| header.args.get("boundary"))
                    .ok_or(std::fmt::Error)?;

                write!(f, "{}", MimeMultipartDisplayable(multipart, boundary))
            }
            MimeBodyType::Embedded(mail) => write!(f, "{mail}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn text_part(kind: &str, lines: &[&str]) -> Mime {
        Mime {
            headers: vec![MimeHeader {
                name: "Content-Type".to_string(),
                value: kind.to_string(),
                args: std::collections::HashMap::new(),
            }],
            content: MimeBodyType::Regular(lines.iter().map(ToString::to_string).collect()),
        }
    }

    #[test]
    fn attachment_detection() {
        let mut part = text_part("application/pdf", &[]);
        assert!(!part.is_attachment());

        part.headers.push(MimeHeader {
            name: "Content-Disposition".to_string(),
            value: "attachment".to_string(),
            args: std::collections::HashMap::new(),
        });
        assert!(part.is_attachment());

        let named = Mime {
            headers: vec![MimeHeader {
                name: "Content-Type".to_string(),
                value: "application/pdf".to_string(),
                args: std::collections::HashMap::from([(
                    "name".to_string(),
                    "report.pdf".to_string(),
                )]),
            }],
            content: MimeBodyType::Regular(vec![]),
        };
        assert!(named.is_attachment());
    }

    #[test]
    fn flatten_walks_nested_parts() {
        let inner = MimeMultipart {
            preamble: String::new(),
            parts: vec![
                text_part("text/plain", &["hello"]),
                text_part("text/html", &["<p>hello</p>"]),
            ],
            epilogue: String::new(),
        };
        let root = Mime {
            headers: vec![MimeHeader {
                name: "Content-Type".to_string(),
                value: "multipart/alternative".to_string(),
                args: std::collections::HashMap::from([(
                    "boundary".to_string(),
                    "b".to_string(),
                )]),
            }],
            content: MimeBodyType::Multipart(inner),
        };

        let parts = root.flatten();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].content_type().unwrap(), "text/plain");
    }

    #[test]
    fn html_reduced_to_text() {
        let part = text_part(
            "text/html",
            &["<html><style>p { color: red }</style><p>Hello &amp; welcome</p></html>"],
        );
        assert_eq!(part.text_content().unwrap().trim(), "Hello & welcome");
    }
}
