//! Raw-mode line reading for the shell prompt.
//!
//! The reader exposes a single entry point (`read_line`) and keeps the
//! terminal-state mechanics private: raw mode is entered per call behind
//! an RAII guard, so every return path — including suggestion failures
//! and panics — restores the caller's terminal.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, BufRead, IsTerminal, Write};

/// Result of reading one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A completed line (without the terminating newline).
    Line(String),
    /// End of input on an empty line: the shell should stop.
    Eof,
}

/// Raw mode lifetime guard; terminal attributes are restored on drop.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn acquire() -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enable raw terminal mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Read one line of input, echoing keystrokes and handling editing keys.
///
/// Keystroke rules: printable characters append to the buffer; Backspace
/// and Delete erase the last character; Enter completes the line; Tab
/// queries `suggest` with the buffer typed so far and prints either the
/// suggestion or `fallback`, then redraws the prompt and buffer; Ctrl-D
/// on an empty buffer ends input, and is ignored mid-line.
///
/// When stdin is not a terminal the reader degrades to plain buffered
/// line input, which keeps the shell usable under pipes and in tests.
pub fn read_line(
    prompt: &str,
    suggest: &dyn Fn(&str) -> Option<String>,
    fallback: &str,
) -> Result<ReadOutcome> {
    if !io::stdin().is_terminal() {
        return read_line_buffered(prompt);
    }
    read_line_raw(prompt, suggest, fallback)
}

fn read_line_buffered(prompt: &str) -> Result<ReadOutcome> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(ReadOutcome::Eof);
    }
    Ok(ReadOutcome::Line(
        line.trim_end_matches(['\n', '\r']).to_string(),
    ))
}

fn read_line_raw(
    prompt: &str,
    suggest: &dyn Fn(&str) -> Option<String>,
    fallback: &str,
) -> Result<ReadOutcome> {
    let _guard = RawModeGuard::acquire()?;
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    let mut buffer = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press && key.kind != KeyEventKind::Repeat {
            continue;
        }

        match key.code {
            KeyCode::Enter => {
                write!(stdout, "\r\n")?;
                stdout.flush()?;
                return Ok(ReadOutcome::Line(buffer));
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                // End-of-input only counts on an empty line; mid-line it
                // is treated as noise and reading continues.
                if buffer.is_empty() {
                    write!(stdout, "\r\n")?;
                    stdout.flush()?;
                    return Ok(ReadOutcome::Eof);
                }
            }
            KeyCode::Tab => {
                write!(stdout, "\r\n")?;
                write!(
                    stdout,
                    "{}\r\n",
                    raw_display(&format!("Suggestions for '{buffer}':"))
                )?;
                match suggest(&buffer) {
                    Some(text) => write!(stdout, "{}\r\n", raw_display(&text))?,
                    None => write!(stdout, "{}\r\n", raw_display(fallback))?,
                }
                write!(stdout, "\r\n{prompt}{buffer}")?;
                stdout.flush()?;
            }
            KeyCode::Backspace | KeyCode::Delete => {
                if !buffer.is_empty() {
                    buffer.pop();
                    write!(stdout, "\x08 \x08")?;
                    stdout.flush()?;
                }
            }
            KeyCode::Char(ch) => {
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    || key.modifiers.contains(KeyModifiers::ALT)
                {
                    continue;
                }
                buffer.push(ch);
                write!(stdout, "{ch}")?;
                stdout.flush()?;
            }
            _ => {}
        }
    }
}

/// Normalize bare newlines to CRLF so multi-line text renders correctly
/// while the terminal is in raw mode.
fn raw_display(text: &str) -> String {
    text.replace('\n', "\r\n")
}
