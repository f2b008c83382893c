//! logos-based markup tokenizer.
//!
//! Tags are lexed whole; their attribute lists are lexed again with
//! [`AttrToken`]. Only the HTML subset produced by the server pass is
//! recognised: elements, quoted attributes, text, comments and doctypes.

use logos::Logos;

/// Markup token produced by the lexer.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    /// `<!-- ... -->`
    #[regex(r"<!--[^>]*-->")]
    Comment,

    /// `<!DOCTYPE html>` and friends.
    #[regex(r"<![a-zA-Z][^>]*>")]
    Doctype,

    /// `</tag>`
    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*[ \t\r\n]*>")]
    EndTag,

    /// `<tag attr="v" flag>` or `<tag/>`.
    #[regex(r#"<[a-zA-Z][a-zA-Z0-9-]*([ \t\r\n]+[a-zA-Z_:][a-zA-Z0-9_:.-]*([ \t\r\n]*=[ \t\r\n]*"[^"]*")?)*[ \t\r\n]*/?>"#)]
    StartTag,

    /// Character data between tags.
    #[regex(r"[^<]+")]
    Text,
}

/// Token inside a start tag's attribute list.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum AttrToken {
    /// Attribute name.
    #[regex(r"[a-zA-Z_:][a-zA-Z0-9_:.-]*")]
    Name,

    /// `=`
    #[token("=")]
    Equals,

    /// Double-quoted value, quotes included.
    #[regex(r#""[^"]*""#)]
    Quoted,
}

/// Tokenize markup into `(Token, slice, byte offset)` triples.
///
/// Input that matches no token is reported as `Err(offset)`.
pub fn tokenize(input: &str) -> Result<Vec<(Token, &str, usize)>, usize> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => tokens.push((token, &input[span.clone()], span.start)),
            Err(()) => return Err(span.start),
        }
    }
    Ok(tokens)
}

/// A start tag split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub self_closing: bool,
}

/// Split a lexed start tag into name, attributes, and the self-closing flag.
///
/// Valueless attributes get an empty value. Returns `None` when the attribute
/// list is malformed.
pub fn split_start_tag(slice: &str) -> Option<StartTag> {
    let inner = slice.strip_prefix('<')?.strip_suffix('>')?;
    let (inner, self_closing) = match inner.trim_end().strip_suffix('/') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    let name_end = inner
        .find(|c: char| c.is_ascii_whitespace())
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();

    let mut attributes = Vec::new();
    let mut lexer = AttrToken::lexer(&inner[name_end..]);
    let mut pending: Option<String> = None;
    let mut expecting_value = false;
    while let Some(result) = lexer.next() {
        match result.ok()? {
            AttrToken::Name => {
                if expecting_value {
                    return None;
                }
                if let Some(previous) = pending.take() {
                    attributes.push((previous, String::new()));
                }
                pending = Some(lexer.slice().to_ascii_lowercase());
            }
            AttrToken::Equals => {
                if pending.is_none() || expecting_value {
                    return None;
                }
                expecting_value = true;
            }
            AttrToken::Quoted => {
                if !expecting_value {
                    return None;
                }
                let raw = lexer.slice();
                let value = decode_entities(&raw[1..raw.len() - 1]);
                attributes.push((pending.take()?, value));
                expecting_value = false;
            }
        }
    }
    if expecting_value {
        return None;
    }
    if let Some(previous) = pending {
        attributes.push((previous, String::new()));
    }
    Some(StartTag {
        name,
        attributes,
        self_closing,
    })
}

/// Tag name of a lexed end tag.
pub fn end_tag_name(slice: &str) -> String {
    slice
        .trim_start_matches("</")
        .trim_end_matches('>')
        .trim()
        .to_ascii_lowercase()
}

/// Decode the five predefined entities.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Escape text or attribute values for serialization.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
