use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::collections::VecDeque;
use std::path::Path;

use crate::error::{CurateError, Result};

/// Source of single-key operator commands.
pub trait InputProvider {
    /// Block until the next key is pressed
    fn next_key(&mut self) -> Result<char>;
}

/// Reads keypresses from the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalInput;

impl TerminalInput {
    fn read_key() -> std::io::Result<char> {
        loop {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let KeyCode::Char(c) = key.code {
                    // Raw mode swallows SIGINT, treat Ctrl-C as quit
                    if c == 'c' && key.modifiers.contains(KeyModifiers::CONTROL) {
                        return Ok('q');
                    }
                    return Ok(c);
                }
            }
        }
    }
}

impl InputProvider for TerminalInput {
    fn next_key(&mut self) -> Result<char> {
        let tty = Path::new("/dev/tty");
        enable_raw_mode().map_err(|e| CurateError::io(tty, e))?;
        let key = Self::read_key();
        // raw mode must be left even when reading failed
        disable_raw_mode().map_err(|e| CurateError::io(tty, e))?;
        key.map_err(|e| CurateError::io(tty, e))
    }
}

/// Replays a fixed key sequence, then answers `q` forever.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    keys: VecDeque<char>,
}

impl ScriptedInput {
    pub fn new(keys: impl IntoIterator<Item = char>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

impl InputProvider for ScriptedInput {
    fn next_key(&mut self) -> Result<char> {
        Ok(self.keys.pop_front().unwrap_or('q'))
    }
}
