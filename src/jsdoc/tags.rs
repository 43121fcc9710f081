//! Tag extraction from documentation comments.
//!
//! Every `/** ... */` block becomes one [`TagRecord`]: the free text before the first tag is
//! the description, and each `@title text` line starts a [`RawTag`]. Lines that do not start a
//! tag continue the previous one. Blocks opening with `/***` are banners and are skipped.
//!
//! Inline markup such as `{@link plat.App}` is left in the text untouched.

use thiserror::Error;
use winnow::ascii::{multispace0, space0};
use winnow::combinator::{opt, preceded, terminated};
use winnow::error::{ContextError, ErrMode, ParserError};
use winnow::prelude::*;
use winnow::token::{rest, take_till, take_until, take_while};
use winnow::ModalResult;

use docgraph_core::nodes::NodeKind;

/// Errors raised while reading documentation comments.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unterminated documentation comment starting at line {line}")]
    UnterminatedComment { line: usize },
}

// ============================================================================
// Records
// ============================================================================

/// One `@title text` entry. Continuation lines are joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTag {
    pub title: String,
    pub text: String,
}

/// The tags of one documentation comment, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagRecord {
    /// 1-based line of the `/**` opener.
    pub line: usize,
    /// Text before the first tag.
    pub description: String,
    pub tags: Vec<RawTag>,
}

impl TagRecord {
    /// First tag with this title. Titles compare ASCII case-insensitively, so `memberof` and
    /// `memberOf` are the same tag.
    pub fn tag(&self, title: &str) -> Option<&RawTag> {
        self.tags(title).next()
    }

    /// Every tag with this title, in source order.
    pub fn tags<'a, 'b>(&'a self, title: &'b str) -> impl Iterator<Item = &'a RawTag> + 'b
    where
        'a: 'b,
    {
        self.tags
            .iter()
            .filter(move |tag| tag.title.eq_ignore_ascii_case(title))
    }

    pub fn has(&self, title: &str) -> bool {
        self.tag(title).is_some()
    }

    /// Text of the first tag with this title.
    pub fn text(&self, title: &str) -> Option<&str> {
        self.tag(title).map(|tag| tag.text.as_str())
    }

    /// The entity kind this record declares: the first kind tag in source order.
    pub fn kind(&self) -> Option<NodeKind> {
        self.kind_tag().map(|(kind, _)| kind)
    }

    /// The first kind tag together with its kind.
    pub fn kind_tag(&self) -> Option<(NodeKind, &RawTag)> {
        self.tags
            .iter()
            .find_map(|tag| kind_for_title(&tag.title).map(|kind| (kind, tag)))
    }
}

/// Map a tag title to the entity kind it declares.
pub fn kind_for_title(title: &str) -> Option<NodeKind> {
    match title.to_ascii_lowercase().as_str() {
        "namespace" => Some(NodeKind::Namespace),
        "interface" => Some(NodeKind::Interface),
        "class" => Some(NodeKind::Class),
        "method" | "function" => Some(NodeKind::Method),
        "property" => Some(NodeKind::Property),
        "event" => Some(NodeKind::Event),
        _ => None,
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract every documentation comment in `text`, in source order.
pub fn extract_records(text: &str) -> Result<Vec<TagRecord>, ExtractError> {
    let mut input = text;
    let mut line = 1;
    let mut records = Vec::new();

    while let Ok(skipped) = skip_to_opener(&mut input) {
        line += newlines(skipped);
        let start = line;

        // `/**/` is an empty block comment, not documentation.
        if let Some(after) = input.strip_prefix('/') {
            input = after;
            continue;
        }

        let body = comment_body(&mut input)
            .map_err(|_| ExtractError::UnterminatedComment { line: start })?;
        line += newlines(body);

        if body.starts_with('*') {
            continue;
        }
        records.push(parse_block(body, start));
    }

    Ok(records)
}

fn newlines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

fn skip_to_opener<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    terminated(take_until(0.., "/**"), "/**").parse_next(input)
}

fn comment_body<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    terminated(take_until(0.., "*/"), "*/").parse_next(input)
}

/// Parse `@title rest-of-line`.
fn tag_line<'i>(input: &mut &'i str) -> ModalResult<(&'i str, &'i str)> {
    let title = preceded(
        '@',
        take_while(1.., |c: char| c.is_alphanumeric() || c == '_'),
    )
    .parse_next(input)?;
    let text = preceded(space0, rest).parse_next(input)?;
    Ok((title, text))
}

fn parse_block(body: &str, line: usize) -> TagRecord {
    let mut description: Vec<&str> = Vec::new();
    let mut tags: Vec<RawTag> = Vec::new();

    for raw in body.lines() {
        let text = strip_gutter(raw);
        let mut cursor = text;
        match tag_line(&mut cursor) {
            Ok((title, rest)) => tags.push(RawTag {
                title: title.to_string(),
                text: rest.trim_end().to_string(),
            }),
            Err(_) => match tags.last_mut() {
                Some(tag) => {
                    if !tag.text.is_empty() || !text.is_empty() {
                        tag.text.push('\n');
                    }
                    tag.text.push_str(text);
                }
                None => description.push(text),
            },
        }
    }

    for tag in &mut tags {
        let trimmed = tag.text.trim();
        if trimmed.len() != tag.text.len() {
            tag.text = trimmed.to_string();
        }
    }

    TagRecord {
        line,
        description: description.join("\n").trim().to_string(),
        tags,
    }
}

/// Strip leading indentation, one `*` gutter and the single space after it.
fn strip_gutter(line: &str) -> &str {
    let line = line.trim_start();
    let line = line.strip_prefix('*').unwrap_or(line);
    let line = line.strip_prefix(' ').unwrap_or(line);
    line.trim_end()
}

// ============================================================================
// Typed Tag Text
// ============================================================================

/// `{type} name rest` split out of a tag's text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedText {
    pub type_name: Option<String>,
    pub name: Option<String>,
    /// Remaining text, with a leading `- ` separator removed.
    pub rest: String,
}

/// Split a leading `{type}` off a tag's text. Nested braces are kept intact.
pub fn split_type(text: &str) -> (Option<String>, String) {
    let mut input = text.trim();
    let type_name = opt(terminated(braced, multispace0))
        .parse_next(&mut input)
        .unwrap_or(None);
    (type_name.map(str::to_string), input.trim().to_string())
}

/// Parse `{type} name rest`; the type and the name are both optional.
pub fn parse_typed(text: &str) -> TypedText {
    let (type_name, remainder) = split_type(text);
    let mut input = remainder.as_str();
    let name = opt(terminated(
        take_till(1.., |c: char| c.is_whitespace()),
        multispace0::<_, ErrMode<ContextError>>,
    ))
    .parse_next(&mut input)
    .unwrap_or(None);

    let rest = input.trim();
    let rest = rest.strip_prefix("- ").unwrap_or(rest);

    TypedText {
        type_name,
        name: name.map(str::to_string),
        rest: rest.to_string(),
    }
}

/// `{...}` with balanced nesting; yields the trimmed inner text.
fn braced<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    let Some(body) = input.strip_prefix('{') else {
        return Err(ErrMode::from_input(input));
    };
    let mut depth = 1usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    *input = &body[i + 1..];
                    return Ok(body[..i].trim());
                }
            }
            _ => {}
        }
    }
    Err(ErrMode::from_input(input))
}

// ============================================================================
// Tests
// ============================================================================
