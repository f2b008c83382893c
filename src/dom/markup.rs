//! Markup parsing and serialization for [`Document`].
//!
//! Parsing turns pre-rendered server output into live document nodes so the
//! hydration adopter has something to adopt. Serialization is deterministic
//! (attributes sorted, listeners omitted) and backs snapshot assertions.

use super::node::{NodeData, NodeId};
use super::tokenizer::{self, Token};
use super::tree::Document;

/// Elements that never have an end tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

/// Errors from markup parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("unrecognised markup at byte {0}")]
    InvalidToken(usize),
    #[error("malformed attribute list at byte {0}")]
    MalformedTag(usize),
    #[error("expected `</{expected}>` but found `</{found}>` at byte {position}")]
    MismatchedEndTag {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("end tag `</{0}>` without an open element")]
    StrayEndTag(String),
    #[error("text outside of any element at byte {0}")]
    StrayText(usize),
    #[error("element `<{0}>` is never closed")]
    Unclosed(String),
}

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

impl Document {
    /// Parse markup into a new document. Top-level elements become roots.
    pub fn from_markup(input: &str) -> Result<Self, MarkupError> {
        let mut doc = Document::new();
        doc.append_markup(input)?;
        Ok(doc)
    }

    /// Parse markup and append the resulting top-level elements as roots.
    ///
    /// Text inside an element becomes that element's text content, trimmed;
    /// whitespace-only text is dropped.
    pub fn append_markup(&mut self, input: &str) -> Result<Vec<NodeId>, MarkupError> {
        let tokens = tokenizer::tokenize(input).map_err(MarkupError::InvalidToken)?;
        let mut open: Vec<NodeId> = Vec::new();
        let mut top_level = Vec::new();

        for (token, slice, position) in tokens {
            match token {
                Token::Comment | Token::Doctype => {}
                Token::StartTag => {
                    let tag = tokenizer::split_start_tag(slice)
                        .ok_or(MarkupError::MalformedTag(position))?;
                    let mut data = NodeData::new(tag.name.as_str());
                    data.attributes.extend(tag.attributes);
                    let id = match open.last() {
                        Some(&parent) => self.insert_child(parent, data),
                        None => {
                            let id = self.insert(data);
                            top_level.push(id);
                            id
                        }
                    };
                    if !tag.self_closing && !is_void(&tag.name) {
                        open.push(id);
                    }
                }
                Token::EndTag => {
                    let name = tokenizer::end_tag_name(slice);
                    if is_void(&name) {
                        continue;
                    }
                    let current = open
                        .pop()
                        .ok_or_else(|| MarkupError::StrayEndTag(name.clone()))?;
                    let expected = self.get(current).map(|d| d.tag.clone()).unwrap_or_default();
                    if expected != name {
                        return Err(MarkupError::MismatchedEndTag {
                            expected,
                            found: name,
                            position,
                        });
                    }
                }
                Token::Text => {
                    let text = slice.trim();
                    if text.is_empty() {
                        continue;
                    }
                    let &current = open.last().ok_or(MarkupError::StrayText(position))?;
                    let decoded = tokenizer::decode_entities(text);
                    if let Some(data) = self.get_mut(current) {
                        match data.text.as_mut() {
                            Some(existing) => existing.push_str(&decoded),
                            None => data.text = Some(decoded),
                        }
                    }
                }
            }
        }

        if let Some(&unclosed) = open.last() {
            let tag = self.get(unclosed).map(|d| d.tag.clone()).unwrap_or_default();
            return Err(MarkupError::Unclosed(tag));
        }
        Ok(top_level)
    }

    /// Serialize the subtree rooted at `id`.
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    /// Serialize every top-level root, one per line.
    pub fn to_markup_all(&self) -> String {
        self.roots()
            .iter()
            .map(|&root| self.to_markup(root))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let Some(data) = self.get(id) else {
            return;
        };
        out.push('<');
        out.push_str(&data.tag);
        for (name, value) in &data.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&tokenizer::escape(value));
            out.push('"');
        }
        out.push('>');
        if is_void(&data.tag) {
            return;
        }
        if let Some(text) = &data.text {
            out.push_str(&tokenizer::escape(text));
        }
        for &child in self.children_of(id) {
            self.write_markup(child, out);
        }
        out.push_str("</");
        out.push_str(&data.tag);
        out.push('>');
    }
}
