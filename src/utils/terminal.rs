// src/utils/terminal.rs

//! Operator input: single key presses and whole lines.

use std::io::{self, BufRead};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use crate::error::Result;

/// Rows assumed when the terminal size cannot be queried.
const FALLBACK_ROWS: u16 = 24;

/// A key press as seen by the preview engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    /// Any non-character key (Enter, arrows, ...)
    Other,
    /// Input is gone (end of stream, Ctrl-C, Ctrl-D)
    Closed,
}

/// Source of operator input. Both calls block until the operator answers.
pub trait Input {
    fn read_key(&mut self) -> Result<Key>;

    /// Read one line without its terminator; `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>>;
}

/// Height of the terminal in rows, queried once per session.
pub fn viewport_height() -> usize {
    terminal::size()
        .map(|(_, rows)| rows)
        .unwrap_or(FALLBACK_ROWS)
        .max(1) as usize
}

/// Raw mode for the lifetime of the guard.
struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// [`Input`] reading from the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalInput;

impl Input for TerminalInput {
    fn read_key(&mut self) -> Result<Key> {
        let _raw = RawMode::enable()?;
        loop {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                return Ok(match key.code {
                    KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        Key::Closed
                    }
                    KeyCode::Char(c) => Key::Char(c),
                    _ => Key::Other,
                });
            }
        }
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
