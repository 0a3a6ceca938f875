//! Inline markup for scene text lines.
//!
//! A line is CommonMark inline text. Emphasis, strong emphasis and code spans
//! become styled runs; the inline HTML tag `<br>` becomes a line break. Only
//! visible characters cost reveal time.
//!
//! A line is always one paragraph: a leading heading, quote, list, fence,
//! thematic break or link definition marker is escaped and shown verbatim.

use std::borrow::Cow;

use pulldown_cmark::{CowStr, Event, Parser, Tag, TagEnd};
use serde::Serialize;

/// Visual style of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStyle {
    /// Unstyled text.
    #[default]
    Plain,
    /// `*emphasis*`.
    Emphasis,
    /// `**strong**`; wins over emphasis when nested.
    Strong,
    /// `` `code` ``.
    Code,
}

/// One piece of a parsed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Run {
    /// Visible text in a single style.
    Text {
        /// The characters of this run.
        text: String,
        /// How the run is styled.
        style: RunStyle,
    },
    /// A forced line break.
    LineBreak,
}

/// A parsed scene text line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkupLine {
    runs: Vec<Run>,
    visible_chars: usize,
}

impl MarkupLine {
    /// Parses one source line.
    ///
    /// Leading and trailing whitespace is kept verbatim so consecutive lines
    /// join exactly as authored.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let without_leading = source.trim_start();
        let leading = &source[..source.len() - without_leading.len()];
        let body = without_leading.trim_end();
        let trailing = &without_leading[body.len()..];

        let mut builder = RunBuilder::default();
        builder.push_text(leading, RunStyle::Plain);

        let mut emphasis = 0_u32;
        let mut strong = 0_u32;
        for event in Parser::new(&as_paragraph(body)) {
            let style = if strong > 0 {
                RunStyle::Strong
            } else if emphasis > 0 {
                RunStyle::Emphasis
            } else {
                RunStyle::Plain
            };
            match event {
                Event::Text(text) => builder.push_text(&text, style),
                Event::Code(text) => builder.push_text(&text, RunStyle::Code),
                Event::InlineHtml(html) | Event::Html(html) if is_line_break(&html) => {
                    builder.push_break();
                }
                Event::HardBreak => builder.push_break(),
                Event::SoftBreak => builder.push_text(" ", style),
                Event::Start(Tag::Emphasis) => emphasis += 1,
                Event::End(TagEnd::Emphasis) => emphasis = emphasis.saturating_sub(1),
                Event::Start(Tag::Strong) => strong += 1,
                Event::End(TagEnd::Strong) => strong = strong.saturating_sub(1),
                _ => {}
            }
        }

        builder.push_text(trailing, RunStyle::Plain);
        builder.finish()
    }

    /// The parsed runs, in order.
    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Number of characters the reveal has to type for this line.
    #[must_use]
    pub fn visible_chars(&self) -> usize {
        self.visible_chars
    }

    /// The runs visible after `chars` characters have been typed.
    ///
    /// Line breaks appear as soon as every character before them is visible.
    #[must_use]
    pub fn truncated(&self, chars: usize) -> Vec<Run> {
        let mut remaining = chars;
        let mut out = Vec::new();
        for run in &self.runs {
            match run {
                Run::LineBreak => out.push(Run::LineBreak),
                Run::Text { text, style } => {
                    if remaining == 0 {
                        break;
                    }
                    let len = text.chars().count();
                    if remaining < len {
                        out.push(Run::Text {
                            text: text.chars().take(remaining).collect(),
                            style: *style,
                        });
                        break;
                    }
                    out.push(run.clone());
                    remaining -= len;
                }
            }
        }
        out
    }

    /// The line as plain text, with line breaks rendered as `\n`.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.runs
            .iter()
            .map(|run| match run {
                Run::Text { text, .. } => text.as_str(),
                Run::LineBreak => "\n",
            })
            .collect()
    }
}

/// Escapes a block-level opener at the start of `body`.
fn as_paragraph(body: &str) -> Cow<'_, str> {
    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return Cow::Borrowed(body);
    };
    let rest = chars.as_str();
    let opens_item = rest.is_empty() || rest.starts_with([' ', '\t']);
    let escape = match first {
        '#' | '>' | '~' => Some(0),
        '-' | '+' | '*' if opens_item || is_thematic_break(body, first) => Some(0),
        '_' if is_thematic_break(body, first) => Some(0),
        '`' if is_code_fence(body) => Some(0),
        '[' if body.contains("]:") => Some(0),
        '0'..='9' => ordered_list_marker(body),
        _ => None,
    };
    match escape {
        Some(at) => Cow::Owned(format!("{}\\{}", &body[..at], &body[at..])),
        None => Cow::Borrowed(body),
    }
}

fn is_thematic_break(body: &str, marker: char) -> bool {
    body.chars().all(|c| c == marker || c == ' ' || c == '\t')
        && body.chars().filter(|&c| c == marker).count() >= 3
}

fn is_code_fence(body: &str) -> bool {
    let info = body.trim_start_matches('`');
    body.len() - info.len() >= 3 && !info.contains('`')
}

/// Byte offset of the `.` or `)` closing an ordered list marker.
fn ordered_list_marker(body: &str) -> Option<usize> {
    let digits = body.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let after = &body[digits..];
    let mut rest = after.chars();
    match rest.next() {
        Some('.' | ')') => {
            let tail = rest.as_str();
            (tail.is_empty() || tail.starts_with([' ', '\t'])).then_some(digits)
        }
        _ => None,
    }
}

fn is_line_break(html: &CowStr<'_>) -> bool {
    let tag: String = html
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(tag.as_str(), "<br>" | "<br/>")
}

#[derive(Default)]
struct RunBuilder {
    runs: Vec<Run>,
    visible_chars: usize,
}

impl RunBuilder {
    fn push_text(&mut self, text: &str, style: RunStyle) {
        if text.is_empty() {
            return;
        }
        self.visible_chars += text.chars().count();
        if let Some(Run::Text {
            text: last,
            style: last_style,
        }) = self.runs.last_mut()
        {
            if *last_style == style {
                last.push_str(text);
                return;
            }
        }
        self.runs.push(Run::Text {
            text: text.to_owned(),
            style,
        });
    }

    fn push_break(&mut self) {
        self.runs.push(Run::LineBreak);
    }

    fn finish(self) -> MarkupLine {
        MarkupLine {
            runs: self.runs,
            visible_chars: self.visible_chars,
        }
    }
}
