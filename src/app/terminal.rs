use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::style::{Attribute, Color, Colors, Print, ResetColor, SetAttribute, SetColors};
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use crossterm::{execute, queue};
use tracing::info;

use super::{Command, GraphView, KeyAction, Notification, RenderedFrame, Tone, key_action};
use crate::memory::LinkKind;

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, Show, LeaveAlternateScreen);
    }
}

enum Flow {
    Continue,
    Redraw,
    Quit,
}

/// Runs the view in the alternate screen until the user quits. Ticks are
/// only scheduled while the layout is still moving.
pub fn run(view: &mut GraphView) -> Result<()> {
    let tick_interval = Duration::from_millis(view.config().view.tick_interval_ms.max(1));
    let mut stdout = io::stdout();
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(stdout, EnterAlternateScreen, Hide).context("failed to enter alternate screen")?;
    let _guard = TerminalGuard;

    let (width, height) = terminal::size().context("failed to query terminal size")?;
    view.apply(Command::Resize { width, height });

    let mut search: Option<String> = None;
    let mut pending = Some(view.render());
    loop {
        if let Some(frame) = pending.take() {
            write_frame(&mut stdout, &frame).context("failed to draw frame")?;
        }

        let ready = if view.wants_tick() {
            event::poll(tick_interval)?
        } else {
            true
        };
        if !ready {
            pending = view.tick();
            continue;
        }

        match event::read()? {
            Event::Key(key) => match handle_key(view, &mut search, key) {
                Flow::Quit => break,
                Flow::Redraw => pending = Some(view.render()),
                Flow::Continue => {}
            },
            Event::Resize(width, height) => {
                view.apply(Command::Resize { width, height });
                pending = Some(view.render());
            }
            _ => {}
        }
    }

    Ok(())
}

fn handle_key(view: &mut GraphView, search: &mut Option<String>, key: KeyEvent) -> Flow {
    if key.kind != KeyEventKind::Press {
        return Flow::Continue;
    }

    if let Some(query) = search.as_mut() {
        match key.code {
            KeyCode::Esc => *search = None,
            KeyCode::Enter => {
                let query = search.take().unwrap_or_default();
                report(view.apply(Command::Search(query)));
            }
            KeyCode::Backspace => {
                query.pop();
            }
            KeyCode::Char(character) => query.push(character),
            _ => return Flow::Continue,
        }
        view.set_prompt(search.clone());
        return Flow::Redraw;
    }

    match key_action(key) {
        Some(KeyAction::Quit) => Flow::Quit,
        Some(KeyAction::StartSearch) => {
            *search = Some(String::new());
            view.set_prompt(Some(String::new()));
            Flow::Redraw
        }
        Some(KeyAction::Command(command)) => {
            report(view.apply(command));
            Flow::Redraw
        }
        None => Flow::Continue,
    }
}

fn report(notifications: Vec<Notification>) {
    for notification in notifications {
        match notification {
            Notification::Selected(id) => info!(%id, "node selected"),
            Notification::SelectionCleared => info!("selection cleared"),
            Notification::Activated(id) => info!(%id, "node activated"),
        }
    }
}

fn tone_colors(tone: Tone) -> (Colors, bool) {
    let fg = |color| Colors::new(color, Color::Reset);
    match tone {
        Tone::Plain => (fg(Color::Reset), false),
        Tone::Link(kind) => (fg(link_color(kind)), false),
        Tone::Arrow => (fg(Color::White), true),
        Tone::Node => (fg(Color::Reset), false),
        Tone::Branch => (fg(Color::Cyan), true),
        Tone::Pinned => (fg(Color::Yellow), true),
        Tone::Selected => (Colors::new(Color::Black, Color::Cyan), true),
        Tone::Header => (Colors::new(Color::White, Color::DarkBlue), true),
        Tone::Footer => (Colors::new(Color::Grey, Color::DarkGrey), false),
        Tone::Muted => (fg(Color::DarkGrey), false),
        Tone::Error => (Colors::new(Color::White, Color::DarkRed), true),
    }
}

fn link_color(kind: LinkKind) -> Color {
    match kind {
        LinkKind::References | LinkKind::ReferencedBy => Color::DarkGrey,
        LinkKind::Extends => Color::Cyan,
        LinkKind::BuildsUpon => Color::Green,
        LinkKind::Contradicts => Color::Red,
        LinkKind::Implements => Color::Magenta,
        LinkKind::Clarifies => Color::Yellow,
        LinkKind::Supersedes => Color::DarkYellow,
        LinkKind::Unspecified => Color::Grey,
    }
}

/// Queues only the changed cells. Runs of adjacent cells with the same tone
/// share one cursor move and one colour change. Continuation cells are
/// covered by the wide glyph to their left and print nothing.
pub fn write_frame(out: &mut impl Write, frame: &RenderedFrame) -> io::Result<()> {
    if frame.full_redraw {
        queue!(out, ResetColor, Clear(ClearType::All))?;
    }

    let mut cursor: Option<(u16, u16)> = None;
    let mut current: Option<Tone> = None;
    for change in &frame.changes {
        if change.cell.is_continuation() {
            continue;
        }
        if cursor != Some((change.x, change.y)) {
            queue!(out, MoveTo(change.x, change.y))?;
        }
        if current != Some(change.cell.tone) {
            let (colors, bold) = tone_colors(change.cell.tone);
            let weight = if bold {
                Attribute::Bold
            } else {
                Attribute::NormalIntensity
            };
            queue!(out, SetAttribute(Attribute::Reset), SetColors(colors), SetAttribute(weight))?;
            current = Some(change.cell.tone);
        }
        queue!(out, Print(change.cell.glyph))?;
        cursor = Some((change.x.saturating_add(change.cell.columns()), change.y));
    }

    queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
    out.flush()
}
