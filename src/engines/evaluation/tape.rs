use crate::types::{Program, Word};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_TAPE_LENGTH: usize = 256;

/// Direction symbol accepted by [`Tape::move_head`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

/// Either a signed step count or a one-cell direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadMove {
    Steps(Word),
    Toward(Direction),
}

impl From<Word> for HeadMove {
    fn from(steps: Word) -> Self {
        HeadMove::Steps(steps)
    }
}

impl From<i64> for HeadMove {
    fn from(steps: i64) -> Self {
        HeadMove::Steps(steps as Word)
    }
}

impl From<Direction> for HeadMove {
    fn from(direction: Direction) -> Self {
        HeadMove::Toward(direction)
    }
}

/// Growable integer memory with a head, a register and run bookkeeping.
///
/// Reads past the end materialise `blank` cells up to the index read; reads
/// at negative indices return `blank` and writes there are dropped. The
/// tape never shrinks.
#[derive(Debug, Clone)]
pub struct Tape {
    cells: Vec<Word>,
    head: Word,
    blank: Word,
    pub register: Word,
    pub steps: u64,
    pub step_budget: u64,
    dereference_stack: Vec<Word>,
    environment: HashMap<Word, Arc<Program>>,
}

impl Tape {
    pub fn new(length: usize, blank: Word) -> Self {
        Self {
            cells: vec![blank; length],
            head: 0,
            blank,
            register: blank,
            steps: 0,
            step_budget: u64::MAX,
            dereference_stack: Vec::new(),
            environment: HashMap::new(),
        }
    }

    pub fn get(&mut self, index: Word) -> Word {
        if index < 0 {
            return self.blank;
        }
        let Ok(index) = usize::try_from(index) else {
            return self.blank;
        };
        if index >= self.cells.len() {
            self.cells.resize(index + 1, self.blank);
        }
        self.cells[index]
    }

    pub fn set(&mut self, index: Word, value: Word) {
        if index < 0 {
            return;
        }
        let Ok(index) = usize::try_from(index) else {
            return;
        };
        if index >= self.cells.len() {
            self.cells.resize(index + 1, self.blank);
        }
        self.cells[index] = value;
    }

    pub fn get_at_head(&mut self) -> Word {
        self.get(self.head)
    }

    pub fn set_at_head(&mut self, value: Word) {
        self.set(self.head, value)
    }

    pub fn move_head(&mut self, movement: impl Into<HeadMove>) {
        let delta = match movement.into() {
            HeadMove::Steps(steps) => steps,
            HeadMove::Toward(Direction::Left) => -1,
            HeadMove::Toward(Direction::Right) => 1,
        };
        self.head = self.head.wrapping_add(delta);
    }

    pub fn set_head(&mut self, position: Word) {
        self.head = position;
    }

    pub fn get_head(&self) -> Word {
        self.head
    }

    pub fn blank(&self) -> Word {
        self.blank
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Word] {
        &self.cells
    }

    /// Appends `slack` blank cells and returns the length before growing.
    pub fn allocate(&mut self, slack: usize) -> Word {
        let previous = self.cells.len();
        self.cells.resize(previous + slack, self.blank);
        previous as Word
    }

    pub fn push_dereference(&mut self, position: Word) {
        self.dereference_stack.push(position);
    }

    pub fn pop_dereference(&mut self) -> Option<Word> {
        self.dereference_stack.pop()
    }

    pub fn dereference_depth(&self) -> usize {
        self.dereference_stack.len()
    }

    /// Binds `body` under `name` unless the name is already bound.
    /// Returns whether the binding was made.
    pub fn define(&mut self, name: Word, body: &Program) -> bool {
        if self.environment.contains_key(&name) {
            return false;
        }
        self.environment.insert(name, Arc::new(body.clone()));
        true
    }

    pub fn lookup(&self, name: Word) -> Option<Arc<Program>> {
        self.environment.get(&name).cloned()
    }

    /// Drops run-scoped state (function bindings) once a run finishes.
    pub fn clear_environment(&mut self) {
        self.environment.clear();
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new(DEFAULT_TAPE_LENGTH, 0)
    }
}

impl PartialEq for Tape {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
            && self.head == other.head
            && self.register == other.register
            && self.blank == other.blank
            && self.dereference_stack == other.dereference_stack
    }
}
