//! Parser for the whitespace-separated SAGE text format.
//!
//! ```text
//! get stdin.int #0 sav
//! while mov 1 res put stdout.int #0 end
//! fun set 1 add end
//! if call else ref end
//! ```
//!
//! Blocks open with `fun`, `while` or `if` and close with `end`; `if` may
//! carry an `else` branch. `fun` blocks are numbered in the order their
//! keywords appear, starting at 0, and become named functions. `ret` is
//! accepted and ignored.

use crate::error::{Result, SageError};
use crate::types::{Operation, Program};

/// Parses a complete program. Unknown tokens, malformed literals and
/// unbalanced blocks are errors.
pub fn parse(source: &str) -> Result<Program> {
    let tokens: Vec<&str> = source.split_whitespace().collect();
    let mut parser = Parser::new(&tokens);
    let (program, terminator) = parser.block()?;
    match terminator {
        None => Ok(program),
        Some(token) => Err(parser.error_at(parser.pos - 1, token, "no open block to close")),
    }
}

struct Parser<'a> {
    tokens: &'a [&'a str],
    pos: usize,
    next_function_id: i64,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [&'a str]) -> Self {
        Self {
            tokens,
            pos: 0,
            next_function_id: 0,
        }
    }

    /// Reads operations up to `end`, `else` or the end of input. The
    /// terminator is consumed and returned.
    fn block(&mut self) -> Result<(Program, Option<&'a str>)> {
        let mut operations = Vec::new();

        while let Some(token) = self.advance() {
            let operation = match token {
                "end" | "else" => return Ok((operations, Some(token))),
                "fun" => {
                    let name = self.next_function_id;
                    self.next_function_id += 1;
                    let body = self.closed_block(token, &["end"])?.0;
                    Operation::Function {
                        name: Some(name),
                        body,
                    }
                }
                "while" => Operation::WhileLoop(self.closed_block(token, &["end"])?.0),
                "if" => match self.closed_block(token, &["else", "end"])? {
                    (then_body, "else") => {
                        let else_body = self.closed_block("else", &["end"])?.0;
                        Operation::IfElse(then_body, else_body)
                    }
                    (body, _) => Operation::If(body),
                },
                "call" => Operation::Call(None),
                "put" => match self.stream_operand(token)? {
                    "stdout.int" => Operation::PutInt,
                    "stdout.char" => Operation::PutChar,
                    other => {
                        let message = "expected stdout.int or stdout.char";
                        return Err(self.error_at(self.pos - 2, other, message));
                    }
                },
                "get" => match self.stream_operand(token)? {
                    "stdin.int" => Operation::GetInt,
                    "stdin.char" => Operation::GetChar,
                    other => {
                        let message = "expected stdin.int or stdin.char";
                        return Err(self.error_at(self.pos - 2, other, message));
                    }
                },
                "set" => Operation::SetRegister(self.integer(token)?),
                "mov" => {
                    let distance = self.integer(token)?;
                    if distance >= 0 {
                        Operation::MoveRight(distance)
                    } else {
                        let position = self.pos - 1;
                        let magnitude = distance.checked_neg().ok_or_else(|| {
                            self.error_at(position, self.tokens[position], "distance out of range")
                        })?;
                        Operation::MoveLeft(magnitude)
                    }
                }
                "add" => Operation::Add,
                "sub" => Operation::Subtract,
                "mul" => Operation::Multiply,
                "div" => Operation::Divide,
                "deref" => Operation::Dereference(Vec::new()),
                "ref" => Operation::Reference,
                "alloc" => Operation::Allocate,
                "index" => Operation::Index,
                "where" => Operation::Where,
                "gez" => Operation::IsNonNegative,
                "sav" => Operation::Save,
                "res" => Operation::Restore,
                "ret" => continue,
                other => return Err(self.error_at(self.pos - 1, other, "unknown token")),
            };
            operations.push(operation);
        }

        Ok((operations, None))
    }

    /// A nested block that must end with one of `terminators`.
    fn closed_block(&mut self, opener: &str, terminators: &[&str]) -> Result<(Program, &'a str)> {
        let start = self.pos - 1;
        match self.block()? {
            (body, Some(token)) if terminators.contains(&token) => Ok((body, token)),
            (_, Some(token)) => {
                let message = format!("unexpected in `{}` block", opener);
                Err(self.error_at(self.pos - 1, token, &message))
            }
            (_, None) => Err(self.error_at(start, opener, "block is never closed with `end`")),
        }
    }

    /// The `<stream> #0` pair following `put` and `get`.
    fn stream_operand(&mut self, keyword: &str) -> Result<&'a str> {
        let start = self.pos - 1;
        let stream = self
            .advance()
            .ok_or_else(|| self.error_at(start, keyword, "missing stream operand"))?;
        match self.advance() {
            Some("#0") => Ok(stream),
            Some(other) => Err(self.error_at(self.pos - 1, other, "expected `#0`")),
            None => Err(self.error_at(start, keyword, "missing `#0`")),
        }
    }

    fn integer(&mut self, keyword: &str) -> Result<i64> {
        let start = self.pos - 1;
        let token = self
            .advance()
            .ok_or_else(|| self.error_at(start, keyword, "missing integer operand"))?;
        token
            .parse()
            .map_err(|_| self.error_at(self.pos - 1, token, "expected an integer"))
    }

    fn advance(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, position: usize, token: &str, message: &str) -> SageError {
        SageError::Parse {
            token: token.to_string(),
            position,
            message: message.to_string(),
        }
    }
}
