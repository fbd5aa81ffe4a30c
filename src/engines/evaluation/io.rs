use crate::error::{Result, SageError};
use crate::types::Word;
use std::collections::VecDeque;
use std::io::BufRead;

/// Where `get-int` / `get-char` take their values from.
#[derive(Debug, Clone)]
pub enum Input {
    /// Pre-supplied values; once drained every read yields 0.
    Scripted(VecDeque<Word>),
    /// Falls back to reading lines from stdin.
    Interactive,
}

impl Input {
    pub fn scripted<I: IntoIterator<Item = Word>>(values: I) -> Self {
        Input::Scripted(values.into_iter().collect())
    }

    pub fn empty() -> Self {
        Input::Scripted(VecDeque::new())
    }
}

impl From<Vec<Word>> for Input {
    fn from(values: Vec<Word>) -> Self {
        Input::Scripted(values.into())
    }
}

/// Input source plus a cursor counting consumed values.
#[derive(Debug, Clone)]
pub struct InputCursor {
    input: Input,
    consumed: usize,
}

impl InputCursor {
    pub fn new(input: Input) -> Self {
        Self { input, consumed: 0 }
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn next_int(&mut self) -> Result<Word> {
        match &mut self.input {
            Input::Scripted(values) => Ok(match values.pop_front() {
                Some(value) => {
                    self.consumed += 1;
                    value
                }
                None => 0,
            }),
            Input::Interactive => {
                let line = read_line()?;
                self.consumed += 1;
                line.trim()
                    .parse::<Word>()
                    .map_err(|e| {
                        SageError::Input(format!("{:?} is not an integer: {}", line.trim(), e))
                    })
            }
        }
    }

    /// Next character as a code point. Unreadable input yields 0.
    pub fn next_char(&mut self) -> Result<Word> {
        match &mut self.input {
            Input::Scripted(_) => self.next_int(),
            Input::Interactive => {
                let line = read_line()?;
                self.consumed += 1;
                Ok(line.chars().next().map(|c| c as u32 as Word).unwrap_or(0))
            }
        }
    }
}

fn read_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_input_drains_to_zero() {
        let mut cursor = InputCursor::new(Input::scripted(vec![4, 65]));
        assert_eq!(cursor.next_int().unwrap(), 4);
        assert_eq!(cursor.next_char().unwrap(), 65);
        assert_eq!(cursor.next_int().unwrap(), 0);
        assert_eq!(cursor.next_char().unwrap(), 0);
        assert_eq!(cursor.consumed(), 2);
    }
}
