use crossterm::style::{Attribute, Attributes, Color, ContentStyle, StyledContent};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// A run of text sharing one style
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub content: String,
    pub style: ContentStyle,
}

/// One terminal line made of styled spans
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Line {
    pub spans: Vec<Span>,
    /// Code-block content, never re-wrapped
    pub preformatted: bool,
}

impl Span {
    pub fn raw(content: impl Into<String>) -> Self {
        Self::styled(content, ContentStyle::default())
    }

    pub fn styled(content: impl Into<String>, style: ContentStyle) -> Self {
        Self {
            content: content.into(),
            style,
        }
    }
}

impl Line {
    /// Plain text of the line
    pub fn text(&self) -> String {
        self.spans.iter().map(|span| span.content.as_str()).collect()
    }

    fn preformatted(span: Span) -> Self {
        Self {
            spans: vec![span],
            preformatted: true,
        }
    }

    fn is_blank(&self) -> bool {
        self.spans.iter().all(|span| span.content.trim().is_empty())
    }

    /// Render with ANSI styling when `styled`, plain text otherwise
    pub fn render(&self, styled: bool) -> String {
        if !styled {
            return self.text();
        }
        self.spans
            .iter()
            .map(|span| StyledContent::new(span.style, span.content.as_str()).to_string())
            .collect()
    }
}

impl From<Vec<Span>> for Line {
    fn from(spans: Vec<Span>) -> Self {
        Self {
            spans,
            preformatted: false,
        }
    }
}

impl From<Span> for Line {
    fn from(span: Span) -> Self {
        vec![span].into()
    }
}

impl From<&str> for Line {
    fn from(text: &str) -> Self {
        if text.is_empty() {
            Self::default()
        } else {
            Span::raw(text).into()
        }
    }
}

fn style(fg: Option<Color>, bg: Option<Color>, attributes: Attributes) -> ContentStyle {
    ContentStyle {
        foreground_color: fg,
        background_color: bg,
        attributes,
        ..ContentStyle::default()
    }
}

fn heading_style() -> ContentStyle {
    style(Some(Color::Yellow), None, Attribute::Bold.into())
}

fn code_style() -> ContentStyle {
    style(Some(Color::Green), Some(Color::Black), Attributes::default())
}

fn border_style() -> ContentStyle {
    style(Some(Color::DarkGrey), None, Attributes::default())
}

/// Converts markdown text to styled lines
pub fn parse_markdown(text: &str) -> Vec<Line> {
    let parser = Parser::new(text);
    let mut lines: Vec<Line> = Vec::new();
    let mut current_line: Vec<Span> = Vec::new();
    let mut style_stack: Vec<ContentStyle> = Vec::new();
    let mut in_code_block = false;
    let mut code_block_lines: Vec<String> = Vec::new();
    // Next number of each open list; `None` for bullet lists
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { .. } => {
                    style_stack.push(heading_style());
                }
                Tag::Emphasis => {
                    style_stack.push(style(None, None, Attribute::Italic.into()));
                }
                Tag::Strong => {
                    style_stack.push(style(None, None, Attribute::Bold.into()));
                }
                Tag::CodeBlock(_) => {
                    in_code_block = true;
                    if !current_line.is_empty() {
                        lines.push(Line::from(std::mem::take(&mut current_line)));
                    }
                    lines.push(Line::preformatted(Span::styled("┌─ Code ─────────────────────────────────", border_style())));
                }
                Tag::List(start) => {
                    lists.push(start);
                }
                Tag::Item => {
                    if !current_line.is_empty() {
                        lines.push(Line::from(std::mem::take(&mut current_line)));
                    }
                    let indent = "  ".repeat(lists.len().saturating_sub(1));
                    let marker = match lists.last_mut() {
                        Some(Some(number)) => {
                            let marker = format!("{}. ", number);
                            *number += 1;
                            marker
                        }
                        _ => "• ".to_string(),
                    };
                    current_line.push(Span::styled(
                        format!("{}{}", indent, marker),
                        style(Some(Color::Cyan), None, Attributes::default()),
                    ));
                }
                Tag::Paragraph => {
                    if !current_line.is_empty() {
                        lines.push(Line::from(std::mem::take(&mut current_line)));
                    }
                }
                Tag::BlockQuote(_) => {
                    style_stack.push(border_style());
                    current_line.push(Span::styled("│ ", border_style()));
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Heading(_) => {
                    style_stack.pop();
                    if !current_line.is_empty() {
                        lines.push(Line::from(std::mem::take(&mut current_line)));
                    }
                    lines.push(Line::default());
                }
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::BlockQuote => {
                    style_stack.pop();
                }
                TagEnd::CodeBlock => {
                    in_code_block = false;
                    for code_line in code_block_lines.drain(..) {
                        lines.push(Line::preformatted(Span::styled(format!("│ {}", code_line), code_style())));
                    }
                    lines.push(Line::preformatted(Span::styled("└────────────────────────────────────────", border_style())));
                    lines.push(Line::default());
                }
                TagEnd::List(_) => {
                    lists.pop();
                    if lists.is_empty() {
                        lines.push(Line::default());
                    }
                }
                TagEnd::Item => {
                    if !current_line.is_empty() {
                        lines.push(Line::from(std::mem::take(&mut current_line)));
                    }
                }
                TagEnd::Paragraph => {
                    if !current_line.is_empty() {
                        lines.push(Line::from(std::mem::take(&mut current_line)));
                    }
                    // Paragraphs inside list items stay tight
                    if lists.is_empty() {
                        lines.push(Line::default());
                    }
                }
                _ => {}
            },
            Event::Text(text) => {
                if in_code_block {
                    code_block_lines.extend(text.lines().map(|line| line.to_string()));
                } else {
                    let current_style = style_stack.last().copied().unwrap_or_default();
                    for (i, line) in text.lines().enumerate() {
                        if i > 0 {
                            lines.push(Line::from(std::mem::take(&mut current_line)));
                        }
                        if !line.is_empty() {
                            current_line.push(Span::styled(line, current_style));
                        }
                    }
                }
            }
            Event::Code(text) => {
                current_line.push(Span::styled(text.to_string(), code_style()));
            }
            Event::SoftBreak => {
                current_line.push(Span::raw(" "));
            }
            Event::HardBreak => {
                lines.push(Line::from(std::mem::take(&mut current_line)));
            }
            Event::Rule => {
                if !current_line.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_line)));
                }
                lines.push(Line::from(Span::styled("─".repeat(80), border_style())));
                lines.push(Line::default());
            }
            _ => {}
        }
    }

    if !current_line.is_empty() {
        lines.push(Line::from(current_line));
    }

    // Remove trailing empty lines but keep at least one
    while lines.len() > 1 && lines.last().map_or(false, Line::is_blank) {
        lines.pop();
    }

    lines
}

/// A run of non-whitespace text, possibly spanning several styles
struct Word {
    /// Whitespace that preceded the word in the source
    gap: String,
    pieces: Vec<Span>,
}

impl Word {
    fn width(&self) -> usize {
        self.pieces.iter().map(|piece| piece.content.chars().count()).sum()
    }
}

fn split_words(spans: Vec<Span>) -> Vec<Word> {
    let mut words = Vec::new();
    let mut gap = String::new();
    let mut current: Option<Word> = None;

    for span in spans {
        let mut rest = span.content.as_str();
        while !rest.is_empty() {
            let blank = rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len());
            if blank > 0 {
                words.extend(current.take());
                gap.push_str(&rest[..blank]);
                rest = &rest[blank..];
                continue;
            }

            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            current
                .get_or_insert_with(|| Word {
                    gap: std::mem::take(&mut gap),
                    pieces: Vec::new(),
                })
                .pieces
                .push(Span::styled(&rest[..end], span.style));
            rest = &rest[end..];
        }
    }

    words.extend(current);
    words
}

fn push_piece(spans: &mut Vec<Span>, piece: Span) {
    match spans.last_mut() {
        Some(last) if last.style == piece.style => last.content.push_str(&piece.content),
        _ => spans.push(piece),
    }
}

/// Wraps lines to fit within `width` columns, breaking only where the source has whitespace
pub fn wrap_markdown_lines(lines: Vec<Line>, width: usize) -> Vec<Line> {
    // A zero width would never make progress
    if width == 0 {
        return lines;
    }

    let mut wrapped_lines = Vec::new();

    for line in lines {
        let total_len: usize = line.spans.iter().map(|span| span.content.chars().count()).sum();
        if line.preformatted || line.spans.is_empty() || total_len <= width {
            wrapped_lines.push(line);
            continue;
        }

        let mut current_spans: Vec<Span> = Vec::new();
        let mut current_len = 0;
        let mut first = true;

        for word in split_words(line.spans) {
            let word_len = word.width();
            let gap_len = word.gap.chars().count();

            if current_len > 0 && current_len + gap_len + word_len > width {
                wrapped_lines.push(Line::from(std::mem::take(&mut current_spans)));
                current_len = 0;
            } else if (current_len > 0 || first) && !word.gap.is_empty() {
                current_len += gap_len;
                push_piece(&mut current_spans, Span::raw(word.gap));
            }
            first = false;

            current_len += word_len;
            for piece in word.pieces {
                push_piece(&mut current_spans, piece);
            }
        }

        if !current_spans.is_empty() {
            wrapped_lines.push(Line::from(current_spans));
        }
    }

    wrapped_lines
}
