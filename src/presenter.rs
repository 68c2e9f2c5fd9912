//! Display side of an analysis.
//!
//! A [`Presenter`] owns the two output regions (prompt and answer) and the
//! trigger control. The renderer is its only writer while an analysis runs.

use crate::config::Theme;
use crate::types::{ANALYZING_PLACEHOLDER, Snapshot};
use crossterm::{cursor, queue, terminal};
use std::io::{self, IsTerminal, Stdout, Write};
use termimad::{MadSkin, crossterm::style::Color};
use unicode_width::UnicodeWidthStr;

pub trait Presenter {
    /// An analysis started: disable the trigger and clear previous output
    fn begin(&mut self);

    /// Republish both regions
    fn publish(&mut self, snapshot: &Snapshot);

    /// Replace the answer region with a message (validation or error)
    fn show_message(&mut self, message: &str);

    /// The analysis is over: re-enable the trigger
    fn finish(&mut self);

    /// Whether a new analysis may be triggered
    fn control_enabled(&self) -> bool;

    /// What the two regions currently show
    fn displayed(&self) -> Snapshot;

    fn set_theme(&mut self, _theme: Theme) {}
}

/// Keeps the display state in memory. Useful for embedding and tests.
#[derive(Debug, Clone)]
pub struct MemoryPresenter {
    pub prompt: String,
    pub answer: String,
    pub history: Vec<Snapshot>,
    pub theme: Theme,
    enabled: bool,
}

impl MemoryPresenter {
    pub fn new() -> Self {
        Self {
            prompt: String::new(),
            answer: String::new(),
            history: Vec::new(),
            theme: Theme::default(),
            enabled: true,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.prompt.clone(), self.answer.clone())
    }
}

impl Default for MemoryPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for MemoryPresenter {
    fn begin(&mut self) {
        self.enabled = false;
        self.prompt = ANALYZING_PLACEHOLDER.to_string();
        self.answer.clear();
        self.history.clear();
    }

    fn publish(&mut self, snapshot: &Snapshot) {
        self.prompt = snapshot.prompt.clone();
        self.answer = snapshot.answer.clone();
        self.history.push(snapshot.clone());
    }

    fn show_message(&mut self, message: &str) {
        self.answer = message.to_string();
    }

    fn finish(&mut self) {
        self.enabled = true;
    }

    fn control_enabled(&self) -> bool {
        self.enabled
    }

    fn displayed(&self) -> Snapshot {
        self.snapshot()
    }

    fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }
}

/// Build the markdown skin for the final answer
pub fn create_markdown_skin(theme: Theme) -> MadSkin {
    match theme {
        Theme::Light => {
            let mut skin = MadSkin::default_light();
            skin.headers[0].set_fg(Color::DarkBlue);
            skin.headers[1].set_fg(Color::DarkCyan);
            skin.headers[2].set_fg(Color::DarkGreen);
            skin.code_block.set_fg(Color::DarkMagenta);
            skin.inline_code.set_fg(Color::DarkMagenta);
            skin.bold.set_fg(Color::Black);
            skin
        }
        Theme::Dark => {
            let mut skin = MadSkin::default_dark();
            skin.headers[0].set_fg(Color::Cyan);
            skin.headers[1].set_fg(Color::Blue);
            skin.headers[2].set_fg(Color::Green);
            skin.code_block.set_fg(Color::Yellow);
            skin.inline_code.set_fg(Color::Yellow);
            skin.bold.set_fg(Color::White);
            skin.italic.set_fg(Color::Magenta);
            skin
        }
    }
}

/// Redraws the prompt and answer regions in place on a terminal.
///
/// A growing answer is printed incrementally. When the answer changes in a
/// way that is not a simple append (the marker being stripped, for example)
/// the whole region is cleared and redrawn.
pub struct TerminalPresenter<W: Write = Stdout> {
    out: W,
    skin: MadSkin,
    render_markdown: bool,
    interactive: bool,
    width: Option<u16>,
    prompt: String,
    answer: String,
    rows: u16,
    cursor_hidden: bool,
    enabled: bool,
}

impl TerminalPresenter<Stdout> {
    pub fn new(theme: Theme, render_markdown: bool) -> Self {
        let out = io::stdout();
        let interactive = out.is_terminal();
        Self::with_writer(out, theme, render_markdown, interactive)
    }
}

impl<W: Write> TerminalPresenter<W> {
    /// Draw on `out`. A non-interactive writer only receives the final answer.
    pub fn with_writer(out: W, theme: Theme, render_markdown: bool, interactive: bool) -> Self {
        Self {
            out,
            skin: create_markdown_skin(theme),
            render_markdown,
            interactive,
            width: None,
            prompt: String::new(),
            answer: String::new(),
            rows: 0,
            cursor_hidden: false,
            enabled: true,
        }
    }

    /// Wrap at a fixed column count instead of asking the terminal
    pub fn with_width(mut self, cols: u16) -> Self {
        self.width = Some(cols);
        self
    }

    fn width(&self) -> u16 {
        self.width.unwrap_or_else(terminal_width)
    }

    fn region_text(&self) -> String {
        format!("Prompt: {}\n\n{}", self.prompt, self.answer)
    }

    fn clear_region(&mut self) -> io::Result<()> {
        if self.rows > 1 {
            queue!(self.out, cursor::MoveUp(self.rows - 1))?;
        }
        queue!(
            self.out,
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::FromCursorDown)
        )
    }

    fn redraw(&mut self) -> io::Result<()> {
        self.clear_region()?;
        let text = self.region_text();
        write!(self.out, "{}", text)?;
        self.rows = rendered_rows(&text, self.width());
        self.out.flush()
    }

    fn update(&mut self, prompt: &str, answer: &str) -> io::Result<()> {
        if !self.interactive {
            // Piped output only gets the final answer
            self.prompt = prompt.to_string();
            self.answer = answer.to_string();
            return Ok(());
        }

        let appended = prompt == self.prompt && answer.starts_with(self.answer.as_str());
        if appended && self.rows > 0 {
            let suffix = &answer[self.answer.len()..];
            write!(self.out, "{}", suffix)?;
            self.answer = answer.to_string();
            self.rows = rendered_rows(&self.region_text(), self.width());
            return self.out.flush();
        }

        self.prompt = prompt.to_string();
        self.answer = answer.to_string();
        self.redraw()
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        queue!(self.out, cursor::Hide)?;
        self.cursor_hidden = true;
        Ok(())
    }

    /// Show the cursor again if an analysis left it hidden
    pub fn restore_cursor(&mut self) -> io::Result<()> {
        if self.cursor_hidden {
            queue!(self.out, cursor::Show)?;
            self.cursor_hidden = false;
            self.out.flush()?;
        }
        Ok(())
    }

    fn render_final(&mut self) -> io::Result<()> {
        if !self.interactive {
            writeln!(self.out, "{}", self.answer)?;
            return self.out.flush();
        }

        if self.render_markdown && !self.answer.is_empty() {
            self.clear_region()?;
            writeln!(self.out, "Prompt: {}\n", self.prompt)?;
            let width = usize::from(self.width());
            write!(self.out, "{}", self.skin.text(&self.answer, Some(width)))?;
        } else {
            writeln!(self.out)?;
        }
        self.rows = 0;
        self.restore_cursor()
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn begin(&mut self) {
        self.enabled = false;
        self.prompt = ANALYZING_PLACEHOLDER.to_string();
        self.answer.clear();
        self.rows = 0;

        if self.interactive {
            let result = self.hide_cursor().and_then(|_| self.redraw());
            if let Err(e) = result {
                tracing::warn!("Failed to draw output region: {}", e);
            }
        }
    }

    fn publish(&mut self, snapshot: &Snapshot) {
        if let Err(e) = self.update(&snapshot.prompt, &snapshot.answer) {
            tracing::warn!("Failed to update output region: {}", e);
        }
    }

    fn show_message(&mut self, message: &str) {
        let prompt = self.prompt.clone();
        if let Err(e) = self.update(&prompt, message) {
            tracing::warn!("Failed to update output region: {}", e);
        }
    }

    fn finish(&mut self) {
        if let Err(e) = self.render_final() {
            tracing::warn!("Failed to render final answer: {}", e);
        }
        self.enabled = true;
    }

    fn control_enabled(&self) -> bool {
        self.enabled
    }

    fn displayed(&self) -> Snapshot {
        Snapshot::new(self.prompt.clone(), self.answer.clone())
    }

    fn set_theme(&mut self, theme: Theme) {
        self.skin = create_markdown_skin(theme);
    }
}

impl<W: Write> Drop for TerminalPresenter<W> {
    fn drop(&mut self) {
        let _ = self.restore_cursor();
    }
}

fn terminal_width() -> u16 {
    terminal::size().map(|(cols, _)| cols).unwrap_or(80)
}

/// Number of terminal rows `text` occupies when wrapped at `cols`
fn rendered_rows(text: &str, cols: u16) -> u16 {
    let cols = usize::from(cols.max(1));
    let rows: usize = text
        .split('\n')
        .map(|line| line.width().div_ceil(cols).max(1))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}
