use crate::markdown::{parse_markdown, wrap_markdown_lines};
use crossterm::style::{Color, Stylize};
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};

const DEFAULT_WIDTH: usize = 80;

/// Accent of a panel or line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Tool,
    Success,
    Info,
    Banner,
}

impl Tone {
    fn color(self) -> Color {
        match self {
            Tone::Tool => Color::Cyan,
            Tone::Success => Color::Green,
            Tone::Info => Color::Blue,
            Tone::Banner => Color::Magenta,
        }
    }
}

type Sink = Mutex<Box<dyn Write + Send>>;

/// Line-oriented terminal output shared by the renderer and the commands
pub struct Console {
    out: Sink,
    err: Sink,
    styled: bool,
    width: usize,
}

/// Captured output of a [`Console::buffered`] console
#[derive(Clone, Default)]
pub struct Capture {
    out: Arc<Mutex<Vec<u8>>>,
    err: Arc<Mutex<Vec<u8>>>,
}

struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn read(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
        let bytes = buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn stdout(&self) -> String {
        Self::read(&self.out)
    }

    pub fn stderr(&self) -> String {
        Self::read(&self.err)
    }
}

impl Console {
    pub fn new(out: Box<dyn Write + Send>, err: Box<dyn Write + Send>, styled: bool, width: usize) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
            styled,
            width: width.max(20),
        }
    }

    /// Console on the process streams, styled only when stdout is a terminal
    pub fn stdout() -> Self {
        let styled = io::stdout().is_terminal();
        let width = crossterm::terminal::size()
            .map(|(columns, _)| columns as usize)
            .unwrap_or(DEFAULT_WIDTH);
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()), styled, width)
    }

    /// Unstyled console writing into memory
    pub fn buffered() -> (Self, Capture) {
        let capture = Capture::default();
        let console = Self::new(
            Box::new(SharedBuffer(capture.out.clone())),
            Box::new(SharedBuffer(capture.err.clone())),
            false,
            DEFAULT_WIDTH,
        );
        (console, capture)
    }

    pub fn is_styled(&self) -> bool {
        self.styled
    }

    fn paint(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.styled {
            return text.to_string();
        }
        let styled = text.with(color);
        if bold {
            styled.bold().to_string()
        } else {
            styled.to_string()
        }
    }

    fn write_out(&self, text: &str) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(out, "{}", text)?;
        out.flush()
    }

    fn write_err(&self, text: &str) -> io::Result<()> {
        let mut err = self.err.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(err, "{}", text)?;
        err.flush()
    }

    pub fn line(&self, text: &str) -> io::Result<()> {
        self.write_out(text)
    }

    pub fn blank(&self) -> io::Result<()> {
        self.write_out("")
    }

    /// Start-of-run banner, a titled block with no body
    pub fn banner(&self, text: &str) -> io::Result<()> {
        self.panel(text, None, None, Tone::Banner)
    }

    /// Bold line in the tone's colour
    pub fn emphasis(&self, text: &str, tone: Tone) -> io::Result<()> {
        self.write_out(&self.paint(text, tone.color(), true))
    }

    /// Titled block:
    ///
    /// ```text
    /// ╭─ ⚙  Calling tool: github/list_issues
    /// │ {
    /// │   "repo": "octocat/hello-world"
    /// │ }
    /// ╰─
    /// ```
    pub fn panel(&self, title: &str, subject: Option<&str>, body: Option<&str>, tone: Tone) -> io::Result<()> {
        let color = tone.color();
        let heading = match subject {
            Some(subject) => format!("{} {}", self.paint(title, color, true), subject),
            None => self.paint(title, color, true),
        };

        let mut block = vec![format!("{} {}", self.paint("╭─", color, false), heading)];
        if let Some(body) = body {
            let gutter = self.paint("│", color, false);
            for line in body.lines() {
                if line.is_empty() {
                    block.push(gutter.clone());
                } else {
                    block.push(format!("{} {}", gutter, line));
                }
            }
        }
        block.push(self.paint("╰─", color, false));
        self.write_out(&block.join("\n"))
    }

    /// Minor dimmed line
    pub fn annotation(&self, text: &str) -> io::Result<()> {
        self.write_out(&self.paint(text, Color::DarkGrey, false))
    }

    /// Red labelled error on stdout, part of the transcript
    pub fn error(&self, label: &str, text: &str) -> io::Result<()> {
        let line = format!("{} {}", label, text);
        self.write_out(&self.paint(&line, Color::Red, true))
    }

    /// Final failure message on stderr
    pub fn failure(&self, text: &str) -> io::Result<()> {
        self.write_err(&self.paint(text, Color::Red, true))
    }

    /// Render markdown wrapped to the console width
    pub fn markdown(&self, text: &str) -> io::Result<()> {
        let lines = wrap_markdown_lines(parse_markdown(text), self.width);
        let rendered: Vec<String> = lines.iter().map(|line| line.render(self.styled)).collect();
        self.write_out(&rendered.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_layout() {
        let (console, capture) = Console::buffered();
        console
            .panel("⚙  Calling tool:", Some("github/list_issues"), Some("{\n  \"a\": 1\n}"), Tone::Tool)
            .unwrap();
        assert_eq!(
            capture.stdout(),
            "╭─ ⚙  Calling tool: github/list_issues\n│ {\n│   \"a\": 1\n│ }\n╰─\n"
        );
    }

    #[test]
    fn test_panel_without_body() {
        let (console, capture) = Console::buffered();
        console.panel("Turn complete", None, None, Tone::Info).unwrap();
        assert_eq!(capture.stdout(), "╭─ Turn complete\n╰─\n");
    }

    #[test]
    fn test_streams_are_separate() {
        let (console, capture) = Console::buffered();
        console.error("Session error:", "boom").unwrap();
        console.failure("Error during GitHub stats analysis: boom").unwrap();
        assert_eq!(capture.stdout(), "Session error: boom\n");
        assert_eq!(capture.stderr(), "Error during GitHub stats analysis: boom\n");
    }

    #[test]
    fn test_unstyled_output_is_plain() {
        let (console, capture) = Console::buffered();
        assert!(!console.is_styled());
        console.banner("Starting retrospective analysis...").unwrap();
        console.markdown("# Summary\n\n**3** open PRs").unwrap();
        let out = capture.stdout();
        assert!(!out.contains('\u{1b}'));
        assert!(out.starts_with("╭─ Starting retrospective analysis...\n╰─\nSummary\n"));
        assert!(out.contains("3 open PRs"));
    }

    #[test]
    fn test_styled_output_uses_escapes() {
        let capture = Capture::default();
        let console = Console::new(
            Box::new(SharedBuffer(capture.out.clone())),
            Box::new(SharedBuffer(capture.err.clone())),
            true,
            DEFAULT_WIDTH,
        );
        console.annotation("⏳ fetching").unwrap();
        assert!(capture.stdout().contains('\u{1b}'));
        assert!(capture.stdout().contains("⏳ fetching"));
    }
}
