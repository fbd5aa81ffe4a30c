use crate::config::MachineConfig;
use crate::engines::evaluation::io::{Input, InputCursor};
use crate::engines::evaluation::tape::Tape;
use crate::error::{Result, SageError};
use crate::types::{Operation, OutputValue, Word};

pub const DEFAULT_STEP_BUDGET: u64 = 100_000;
pub const DEFAULT_MAX_CELLS: usize = 1 << 20;
pub const DEFAULT_ALLOCATE_SLACK: usize = 32;
/// Cap on nested bodies (loop, branch, dereference and call bodies
/// together) so interpreter recursion stays well inside a worker thread's
/// stack.
pub const DEFAULT_MAX_NESTING: usize = 128;

/// Terminal state of a run, apart from the tape itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub output: Vec<OutputValue>,
    pub input_consumed: usize,
    pub steps: u64,
    pub exhausted: bool,
}

/// Tree-walking interpreter for SAGE programs.
///
/// Every operation, compound or not, costs one step and is charged before it
/// executes. Running out of steps (or touching a cell past `max_cells`) ends
/// the run early with `exhausted = true`; calling an unbound function and
/// nesting bodies or calls deeper than `max_nesting` are fatal and returned
/// as errors.
pub struct Machine {
    step_budget: u64,
    max_cells: usize,
    allocate_slack: usize,
    max_nesting: usize,
    depth: usize,
    input: InputCursor,
    output: Vec<OutputValue>,
}

impl Machine {
    pub fn new(step_budget: u64) -> Self {
        Self {
            step_budget,
            max_cells: DEFAULT_MAX_CELLS,
            allocate_slack: DEFAULT_ALLOCATE_SLACK,
            max_nesting: DEFAULT_MAX_NESTING,
            depth: 0,
            input: InputCursor::new(Input::empty()),
            output: Vec::new(),
        }
    }

    pub fn from_config(config: &MachineConfig) -> Self {
        Self::new(config.step_budget)
            .with_max_cells(config.max_cells)
            .with_allocate_slack(config.allocate_slack)
            .with_max_nesting(config.max_nesting)
    }

    pub fn with_input(mut self, input: Input) -> Self {
        self.input = InputCursor::new(input);
        self
    }

    pub fn with_step_budget(mut self, step_budget: u64) -> Self {
        self.step_budget = step_budget;
        self
    }

    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells;
        self
    }

    pub fn with_allocate_slack(mut self, allocate_slack: usize) -> Self {
        self.allocate_slack = allocate_slack;
        self
    }

    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    /// Runs `program` against `tape`. Function bindings live for this call
    /// only and are dropped before returning.
    pub fn run(&mut self, program: &[Operation], tape: &mut Tape) -> Result<RunOutcome> {
        tape.steps = 0;
        tape.step_budget = self.step_budget;
        self.depth = 0;
        self.output.clear();
        let consumed_before = self.input.consumed();

        let result = self.execute(program, tape);
        tape.clear_environment();
        let output = std::mem::take(&mut self.output);

        let exhausted = match result {
            Ok(()) => false,
            Err(e) if e.is_exhaustion() => {
                log::debug!("Run truncated after {} steps: {}", tape.steps, e);
                true
            }
            Err(e) => return Err(e),
        };

        Ok(RunOutcome {
            output,
            input_consumed: self.input.consumed() - consumed_before,
            steps: tape.steps,
            exhausted,
        })
    }

    /// Runs one body, one nesting level below the current one.
    fn execute(&mut self, program: &[Operation], tape: &mut Tape) -> Result<()> {
        if self.depth >= self.max_nesting {
            return Err(SageError::NestingLimitExceeded { depth: self.depth });
        }
        self.depth += 1;
        let result = program
            .iter()
            .try_for_each(|operation| self.checked_apply(operation, tape));
        self.depth -= 1;
        result
    }

    fn checked_apply(&mut self, operation: &Operation, tape: &mut Tape) -> Result<()> {
        if tape.steps >= tape.step_budget {
            return Err(SageError::StepBudgetExhausted {
                budget: tape.step_budget,
            });
        }
        tape.steps += 1;
        self.apply(operation, tape)
    }

    fn apply(&mut self, operation: &Operation, tape: &mut Tape) -> Result<()> {
        match operation {
            Operation::MoveLeft(n) => tape.move_head(-(*n as Word)),
            Operation::MoveRight(n) => tape.move_head(*n as Word),
            Operation::SetTape(value) => self.store(tape, *value as Word)?,
            Operation::SetRegister(value) => tape.register = *value as Word,
            Operation::Add => {
                let cell = self.load(tape)?;
                tape.register = tape.register.wrapping_add(cell);
            }
            Operation::Subtract => {
                let cell = self.load(tape)?;
                tape.register = tape.register.wrapping_sub(cell);
            }
            Operation::Multiply => {
                let cell = self.load(tape)?;
                tape.register = tape.register.wrapping_mul(cell);
            }
            Operation::Divide => {
                let cell = self.load(tape)?;
                tape.register = floor_div(tape.register, cell);
            }
            Operation::Save => {
                let value = tape.register;
                self.store(tape, value)?;
            }
            Operation::Restore => tape.register = self.load(tape)?,
            Operation::Where => tape.register = tape.get_head(),
            Operation::IsNonNegative => tape.register = (tape.register >= 0) as Word,
            Operation::Index => {
                let cell = self.load(tape)?;
                tape.register = tape.register.wrapping_add(cell);
            }
            Operation::Allocate => {
                if tape.len().saturating_add(self.allocate_slack) > self.max_cells {
                    return Err(SageError::TapeLimitExceeded {
                        index: tape.len() as Word,
                        limit: self.max_cells,
                    });
                }
                tape.register = tape.allocate(self.allocate_slack);
            }
            Operation::GetInt => tape.register = self.input.next_int()?,
            Operation::GetChar => tape.register = self.input.next_char()?,
            Operation::PutInt => self.output.push(OutputValue::Int(tape.register)),
            Operation::PutChar => {
                if let Some(c) = u32::try_from(tape.register).ok().and_then(char::from_u32) {
                    self.output.push(OutputValue::Char(c));
                }
            }
            Operation::WhileLoop(body) => {
                while tape.register != 0 {
                    if body.is_empty() {
                        break;
                    }
                    self.execute(body, tape)?;
                }
            }
            Operation::If(body) => {
                if tape.register != 0 {
                    self.execute(body, tape)?;
                }
            }
            Operation::IfElse(then_body, else_body) => {
                if tape.register != 0 {
                    self.execute(then_body, tape)?;
                } else {
                    self.execute(else_body, tape)?;
                }
            }
            Operation::Dereference(body) if body.is_empty() => {
                let target = self.load(tape)?;
                tape.push_dereference(tape.get_head());
                tape.set_head(target);
            }
            Operation::Dereference(body) => {
                let origin = tape.get_head();
                let target = self.load(tape)?;
                tape.move_head(target.wrapping_sub(origin));
                let result = self.execute(body, tape);
                // Restored on every exit, exhaustion included
                tape.set_head(origin);
                result?;
            }
            Operation::Reference => {
                let position = tape.pop_dereference().unwrap_or(0);
                tape.set_head(position);
            }
            Operation::Function { name, body } => {
                if let Some(name) = name {
                    tape.define(*name as Word, body);
                }
            }
            Operation::Call(name) => {
                let key = name.map(|n| n as Word).unwrap_or(tape.register);
                let body = tape.lookup(key).ok_or(SageError::UndefinedFunction(key))?;
                self.execute(&body, tape)?;
            }
        }
        Ok(())
    }

    fn check_cell(&self, tape: &Tape) -> Result<()> {
        let head = tape.get_head();
        if head >= 0 && head >= self.max_cells as Word {
            return Err(SageError::TapeLimitExceeded {
                index: head,
                limit: self.max_cells,
            });
        }
        Ok(())
    }

    fn load(&self, tape: &mut Tape) -> Result<Word> {
        self.check_cell(tape)?;
        Ok(tape.get_at_head())
    }

    fn store(&self, tape: &mut Tape, value: Word) -> Result<()> {
        self.check_cell(tape)?;
        tape.set_at_head(value);
        Ok(())
    }
}

/// Convenience wrapper: run `program` on `tape` with `step_budget` and no input.
pub fn run(program: &[Operation], tape: &mut Tape, step_budget: u64) -> Result<RunOutcome> {
    Machine::new(step_budget).run(program, tape)
}

/// Floor division; dividing by zero yields 0.
fn floor_div(dividend: Word, divisor: Word) -> Word {
    if divisor == 0 {
        return 0;
    }
    let quotient = dividend.wrapping_div(divisor);
    let remainder = dividend.wrapping_rem(divisor);
    if remainder != 0 && ((remainder < 0) != (divisor < 0)) {
        quotient - 1
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Operation::*;

    #[test]
    fn test_floor_div() {
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(floor_div(7, -2), -4);
        assert_eq!(floor_div(-7, -2), 3);
        assert_eq!(floor_div(5, 0), 0);
        assert_eq!(floor_div(Word::MIN, -1), Word::MIN);
    }

    #[test]
    fn test_save_and_move() {
        let mut tape = Tape::new(8, 0);
        let program = vec![SetRegister(5), Save, MoveRight(1), SetRegister(3), Save];
        let outcome = run(&program, &mut tape, 1000).unwrap();
        assert!(!outcome.exhausted);
        assert_eq!(tape.cells(), &[5, 3, 0, 0, 0, 0, 0, 0]);
        assert_eq!(tape.get_head(), 1);
        assert_eq!(tape.register, 3);
        assert_eq!(outcome.steps, 5);
    }

    #[test]
    fn test_indirect_jump_and_reference() {
        let mut tape = Tape::new(8, 0);
        let program = vec![
            SetTape(5),
            Dereference(vec![]),
            SetRegister(9),
            Save,
            Reference,
            Where,
        ];
        run(&program[..4], &mut tape, 100).unwrap();
        assert_eq!(tape.dereference_depth(), 1);

        let mut tape = Tape::new(8, 0);
        run(&program, &mut tape, 100).unwrap();
        assert_eq!(tape.dereference_depth(), 0);
        assert_eq!(tape.cells()[5], 9);
        assert_eq!(tape.get_head(), 0);
        assert_eq!(tape.register, 0);
    }

    #[test]
    fn test_reference_on_empty_stack_resets_head() {
        let mut tape = Tape::default();
        run(&[MoveRight(4), Reference], &mut tape, 100).unwrap();
        assert_eq!(tape.get_head(), 0);
    }

    #[test]
    fn test_call_by_register() {
        let mut tape = Tape::default();
        let program = vec![
            Function {
                name: Some(3),
                body: vec![SetRegister(11), PutInt],
            },
            SetRegister(3),
            Call(None),
        ];
        let outcome = run(&program, &mut tape, 100).unwrap();
        assert_eq!(outcome.output, vec![OutputValue::Int(11)]);
    }

    #[test]
    fn test_runaway_recursion_is_fatal() {
        let mut tape = Tape::default();
        let program = vec![
            Function {
                name: Some(0),
                body: vec![Call(Some(0))],
            },
            Call(Some(0)),
        ];
        let err = Machine::new(1_000_000)
            .with_max_nesting(16)
            .run(&program, &mut tape)
            .unwrap_err();
        assert!(matches!(err, SageError::NestingLimitExceeded { depth: 16 }));
    }

    #[test]
    fn test_recursion_under_branches_hits_nesting_limit() {
        let body = vec![
            SetRegister(1),
            If(vec![SetRegister(1), If(vec![SetRegister(1), If(vec![Call(Some(0))])])]),
        ];
        let program = vec![
            Function {
                name: Some(0),
                body,
            },
            Call(Some(0)),
        ];
        let err = Machine::new(1_000_000)
            .run(&program, &mut Tape::default())
            .unwrap_err();
        assert!(matches!(
            err,
            SageError::NestingLimitExceeded {
                depth: DEFAULT_MAX_NESTING
            }
        ));
    }

    #[test]
    fn test_machine_reuse_starts_clean() {
        let mut machine = Machine::new(100).with_input(Input::scripted([1]));
        let failed = machine.run(&[GetInt, PutInt, Call(Some(9))], &mut Tape::default());
        assert!(matches!(failed, Err(SageError::UndefinedFunction(9))));

        let outcome = machine
            .run(&[SetRegister(7), PutInt], &mut Tape::default())
            .unwrap();
        assert_eq!(outcome.output, vec![OutputValue::Int(7)]);
        assert_eq!(outcome.input_consumed, 0);
    }

    #[test]
    fn test_cell_limit_truncates_run() {
        let mut tape = Tape::new(4, 0);
        let program = vec![MoveRight(100), SetRegister(1), Save, PutInt];
        let outcome = Machine::new(100).with_max_cells(50).run(&program, &mut tape).unwrap();
        assert!(outcome.exhausted);
        assert!(outcome.output.is_empty());
        assert_eq!(tape.len(), 4);
    }

    #[test]
    fn test_put_char_skips_invalid_code_points() {
        let mut tape = Tape::default();
        let program = vec![SetRegister(72), PutChar, SetRegister(-1), PutChar];
        let outcome = run(&program, &mut tape, 100).unwrap();
        assert_eq!(outcome.output, vec![OutputValue::Char('H')]);
    }
}
