//! KS script tokenizer.
//!
//! Line oriented:
//! - `*label|heading` declares a label (heading defaults to the label)
//! - `@name key=value ...` is a tag occupying the whole line
//! - `; ...` is a comment
//! - anything else is text, possibly interleaved with `[name key=value]`
//!   inline tags; `[[`, `]]` and `@@` escape the bracket and at characters
//! - a lone `@` inside a text line ends the text and starts a line tag that
//!   runs to the end of the line
//!
//! Attribute values may be double-quoted to contain spaces. A bare attribute
//! with no `=` is recorded as `"true"`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ScriptError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub label: String,
    pub heading: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Token {
    Label(Label),
    Tag(Tag),
    Text { text: String },
}

impl Token {
    pub fn text(text: impl Into<String>) -> Self {
        Token::Text { text: text.into() }
    }
}

/// Tokenize a whole script.
pub fn parse_script(input: &str) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    for (index, raw) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('*') {
            tokens.push(parse_label(rest, line_no)?);
        } else if line.starts_with("@@") {
            parse_text_line(line, line_no, &mut tokens)?;
        } else if let Some(rest) = line.strip_prefix('@') {
            tokens.push(Token::Tag(parse_tag_body(rest, line_no)?));
        } else {
            parse_text_line(line, line_no, &mut tokens)?;
        }
    }
    Ok(tokens)
}

fn parse_label(rest: &str, line: usize) -> Result<Token, ScriptError> {
    let (label, heading) = match rest.split_once('|') {
        Some((label, heading)) => (label.trim(), heading.trim()),
        None => (rest.trim(), ""),
    };
    if label.is_empty() {
        return Err(ScriptError::EmptyLabel { line });
    }
    let heading = if heading.is_empty() { label } else { heading };
    Ok(Token::Label(Label {
        label: label.to_string(),
        heading: heading.to_string(),
    }))
}

/// `name key=value key="quoted value" flag`
fn parse_tag_body(body: &str, line: usize) -> Result<Tag, ScriptError> {
    let mut words = split_words(body, line)?.into_iter();
    let name = match words.next() {
        Some(name) if !name.contains('=') => name,
        _ => return Err(ScriptError::EmptyTag { line }),
    };

    let mut tag = Tag::new(name);
    for word in words {
        let (key, value) = match word.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (word, "true".to_string()),
        };
        tag.attributes.insert(key, value);
    }
    Ok(tag)
}

/// Split on whitespace, keeping double-quoted runs together and dropping the
/// quotes.
fn split_words(body: &str, line: usize) -> Result<Vec<String>, ScriptError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in body.chars() {
        match ch {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if quoted {
        let key = current.split('=').next().unwrap_or_default().to_string();
        return Err(ScriptError::UnterminatedQuote { line, key });
    }
    if !current.is_empty() {
        words.push(current);
    }
    Ok(words)
}

fn parse_text_line(line: &str, line_no: usize, tokens: &mut Vec<Token>) -> Result<(), ScriptError> {
    let mut text = String::new();
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '[' if chars.peek() == Some(&'[') => {
                chars.next();
                text.push('[');
            }
            ']' if chars.peek() == Some(&']') => {
                chars.next();
                text.push(']');
            }
            '@' if chars.peek() == Some(&'@') => {
                chars.next();
                text.push('@');
            }
            '[' => {
                let mut body = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    body.push(c);
                }
                if !closed {
                    return Err(ScriptError::UnterminatedTag { line: line_no, tag: body });
                }
                if !text.is_empty() {
                    tokens.push(Token::text(std::mem::take(&mut text)));
                }
                tokens.push(Token::Tag(parse_tag_body(&body, line_no)?));
            }
            '@' => {
                if !text.is_empty() {
                    tokens.push(Token::text(std::mem::take(&mut text)));
                }
                let body: String = chars.by_ref().collect();
                tokens.push(Token::Tag(parse_tag_body(&body, line_no)?));
            }
            ']' => return Err(ScriptError::UnexpectedChar { line: line_no, ch }),
            c => text.push(c),
        }
    }

    if !text.is_empty() {
        tokens.push(Token::text(text));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_heading_defaults_to_label() {
        assert_eq!(
            parse_script("*page12|").unwrap(),
            vec![Token::Label(Label {
                label: "page12".into(),
                heading: "page12".into(),
            })]
        );
        assert_eq!(
            parse_script("*page12|wakeup").unwrap(),
            vec![Token::Label(Label {
                label: "page12".into(),
                heading: "wakeup".into(),
            })]
        );
    }

    #[test]
    fn line_tag_with_quoted_attribute() {
        let tokens = parse_script("@eval exp=\"sf.scriptresname = '桜ルート十二日目'\"").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Tag(
                Tag::new("eval").with("exp", "sf.scriptresname = '桜ルート十二日目'")
            )]
        );
    }

    #[test]
    fn page_of_mixed_tokens() {
        let script = "
            *page47|
            @sestop file=se009 time=1500 nowait=true
            Illya and I are alone in the small park.[lr]
            @pg
        ";
        assert_eq!(
            parse_script(script).unwrap(),
            vec![
                Token::Label(Label {
                    label: "page47".into(),
                    heading: "page47".into(),
                }),
                Token::Tag(
                    Tag::new("sestop")
                        .with("file", "se009")
                        .with("time", "1500")
                        .with("nowait", "true")
                ),
                Token::text("Illya and I are alone in the small park."),
                Token::Tag(Tag::new("lr")),
                Token::Tag(Tag::new("pg")),
            ]
        );
    }

    #[test]
    fn inline_tag_splits_text() {
        let tokens = parse_script("“O[line3]Oh yeah.”").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::text("“O"),
                Token::Tag(Tag::new("line3")),
                Token::text("Oh yeah.”"),
            ]
        );
    }

    #[test]
    fn escapes_and_comments() {
        let tokens = parse_script("; a comment\n@@home [[1]] done").unwrap();
        assert_eq!(tokens, vec![Token::text("@home [1] done")]);
    }

    #[test]
    fn lone_at_mid_line_starts_a_line_tag() {
        let tokens = parse_script("hello@bg storage=x.png\nmail me@@home").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::text("hello"),
                Token::Tag(Tag::new("bg").with("storage", "x.png")),
                Token::text("mail me@home"),
            ]
        );
        assert_eq!(parse_script("text @"), Err(ScriptError::EmptyTag { line: 1 }));
    }

    #[test]
    fn bare_attribute_is_true() {
        let tokens = parse_script("[wait canskip]").unwrap();
        assert_eq!(tokens, vec![Token::Tag(Tag::new("wait").with("canskip", "true"))]);
    }

    #[test]
    fn malformed_lines_report_their_line() {
        assert_eq!(
            parse_script("ok\nbroken [lr"),
            Err(ScriptError::UnterminatedTag {
                line: 2,
                tag: "lr".into()
            })
        );
        assert_eq!(parse_script("*|x"), Err(ScriptError::EmptyLabel { line: 1 }));
        assert_eq!(parse_script("@"), Err(ScriptError::EmptyTag { line: 1 }));
        assert_eq!(
            parse_script("@bg storage=\"open"),
            Err(ScriptError::UnterminatedQuote {
                line: 1,
                key: "storage".into()
            })
        );
        assert_eq!(
            parse_script("stray ] here"),
            Err(ScriptError::UnexpectedChar { line: 1, ch: ']' })
        );
    }

    #[test]
    fn tokens_serialize_tagged() {
        let json = serde_json::to_string(&Token::Tag(Tag::new("lr"))).unwrap();
        assert_eq!(json, r#"{"type":"tag","name":"lr"}"#);
    }
}
