use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine word used for tape cells, the register and the head.
///
/// 128 bits wide; all register arithmetic wraps so evolved programs that
/// multiply repeatedly stay deterministic instead of panicking.
pub type Word = i128;

/// Ordered sequence of operations. Compound operations own nested programs.
pub type Program = Vec<Operation>;

/// A single machine instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    MoveLeft(i64),
    MoveRight(i64),
    SetTape(i64),
    SetRegister(i64),
    Add,
    Subtract,
    Multiply,
    Divide,
    Save,
    Restore,
    Where,
    IsNonNegative,
    Index,
    Allocate,
    GetInt,
    GetChar,
    PutInt,
    PutChar,
    WhileLoop(Program),
    If(Program),
    IfElse(Program, Program),
    /// Non-empty body: scoped relocation. Empty body: indirect jump.
    Dereference(Program),
    Reference,
    Function { name: Option<i64>, body: Program },
    Call(Option<i64>),
}

/// Payload-free discriminant of an [`Operation`], used for catalog lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    MoveLeft,
    MoveRight,
    SetTape,
    SetRegister,
    Add,
    Subtract,
    Multiply,
    Divide,
    Save,
    Restore,
    Where,
    IsNonNegative,
    Index,
    Allocate,
    GetInt,
    GetChar,
    PutInt,
    PutChar,
    WhileLoop,
    If,
    IfElse,
    Dereference,
    Reference,
    Function,
    Call,
}

impl OperationKind {
    pub const ALL: [OperationKind; 25] = [
        OperationKind::MoveLeft,
        OperationKind::MoveRight,
        OperationKind::SetTape,
        OperationKind::SetRegister,
        OperationKind::Add,
        OperationKind::Subtract,
        OperationKind::Multiply,
        OperationKind::Divide,
        OperationKind::Save,
        OperationKind::Restore,
        OperationKind::Where,
        OperationKind::IsNonNegative,
        OperationKind::Index,
        OperationKind::Allocate,
        OperationKind::GetInt,
        OperationKind::GetChar,
        OperationKind::PutInt,
        OperationKind::PutChar,
        OperationKind::WhileLoop,
        OperationKind::If,
        OperationKind::IfElse,
        OperationKind::Dereference,
        OperationKind::Reference,
        OperationKind::Function,
        OperationKind::Call,
    ];

    /// Kinds whose genome form is `[index, literal]`.
    pub fn is_parameterized(self) -> bool {
        matches!(
            self,
            OperationKind::MoveLeft
                | OperationKind::MoveRight
                | OperationKind::SetTape
                | OperationKind::SetRegister
                | OperationKind::Call
        )
    }

    /// Kinds that own one or more nested programs.
    pub fn is_compound(self) -> bool {
        matches!(
            self,
            OperationKind::WhileLoop
                | OperationKind::If
                | OperationKind::IfElse
                | OperationKind::Dereference
                | OperationKind::Function
        )
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::MoveLeft(_) => OperationKind::MoveLeft,
            Operation::MoveRight(_) => OperationKind::MoveRight,
            Operation::SetTape(_) => OperationKind::SetTape,
            Operation::SetRegister(_) => OperationKind::SetRegister,
            Operation::Add => OperationKind::Add,
            Operation::Subtract => OperationKind::Subtract,
            Operation::Multiply => OperationKind::Multiply,
            Operation::Divide => OperationKind::Divide,
            Operation::Save => OperationKind::Save,
            Operation::Restore => OperationKind::Restore,
            Operation::Where => OperationKind::Where,
            Operation::IsNonNegative => OperationKind::IsNonNegative,
            Operation::Index => OperationKind::Index,
            Operation::Allocate => OperationKind::Allocate,
            Operation::GetInt => OperationKind::GetInt,
            Operation::GetChar => OperationKind::GetChar,
            Operation::PutInt => OperationKind::PutInt,
            Operation::PutChar => OperationKind::PutChar,
            Operation::WhileLoop(_) => OperationKind::WhileLoop,
            Operation::If(_) => OperationKind::If,
            Operation::IfElse(_, _) => OperationKind::IfElse,
            Operation::Dereference(_) => OperationKind::Dereference,
            Operation::Reference => OperationKind::Reference,
            Operation::Function { .. } => OperationKind::Function,
            Operation::Call(_) => OperationKind::Call,
        }
    }

    /// Number of operations in this subtree, the operation itself included.
    pub fn node_count(&self) -> usize {
        1 + match self {
            Operation::WhileLoop(body)
            | Operation::If(body)
            | Operation::Dereference(body)
            | Operation::Function { body, .. } => program_size(body),
            Operation::IfElse(then_body, else_body) => {
                program_size(then_body) + program_size(else_body)
            }
            _ => 0,
        }
    }
}

pub fn program_size(program: &[Operation]) -> usize {
    program.iter().map(Operation::node_count).sum()
}

/// Renders a program as `[Op(), Op(arg), ...]`.
pub struct ProgramDisplay<'a>(pub &'a [Operation]);

impl fmt::Display for ProgramDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, op) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", op)?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::MoveLeft(n) => write!(f, "MoveLeft({})", n),
            Operation::MoveRight(n) => write!(f, "MoveRight({})", n),
            Operation::SetTape(v) => write!(f, "SetTape({})", v),
            Operation::SetRegister(v) => write!(f, "SetRegister({})", v),
            Operation::WhileLoop(body) => write!(f, "WhileLoop({})", ProgramDisplay(body)),
            Operation::If(body) => write!(f, "If({})", ProgramDisplay(body)),
            Operation::IfElse(then_body, else_body) => write!(
                f,
                "IfElse({}, {})",
                ProgramDisplay(then_body),
                ProgramDisplay(else_body)
            ),
            Operation::Dereference(body) if body.is_empty() => write!(f, "Dereference()"),
            Operation::Dereference(body) => write!(f, "Dereference({})", ProgramDisplay(body)),
            Operation::Function { name: Some(name), body } => {
                write!(f, "Function({}, {})", name, ProgramDisplay(body))
            }
            Operation::Function { name: None, body } => {
                write!(f, "Function(None, {})", ProgramDisplay(body))
            }
            Operation::Call(Some(name)) => write!(f, "Call({})", name),
            other => write!(f, "{:?}()", other.kind()),
        }
    }
}

/// A value appended to the machine's output sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputValue {
    Int(Word),
    Char(char),
}

impl OutputValue {
    /// Integer view of the value; characters map to their code point.
    pub fn as_word(&self) -> Word {
        match self {
            OutputValue::Int(v) => *v,
            OutputValue::Char(c) => *c as u32 as Word,
        }
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputValue::Int(v) => write!(f, "{}", v),
            OutputValue::Char(c) => write!(f, "{}", c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_count_includes_nested_bodies() {
        let program = vec![
            Operation::Add,
            Operation::WhileLoop(vec![Operation::Save, Operation::If(vec![Operation::Restore])]),
            Operation::IfElse(vec![Operation::PutInt], vec![]),
        ];
        assert_eq!(program_size(&program), 7);
    }

    #[test]
    fn test_display_matches_nested_shape() {
        let op = Operation::IfElse(
            vec![Operation::SetRegister(3)],
            vec![Operation::Dereference(vec![])],
        );
        assert_eq!(op.to_string(), "IfElse([SetRegister(3)], [Dereference()])");
        assert_eq!(Operation::Call(None).to_string(), "Call()");
    }

    #[test]
    fn test_kind_table_is_complete() {
        for kind in OperationKind::ALL {
            assert!(!(kind.is_parameterized() && kind.is_compound()));
        }
    }
}
