use crate::error::{Result, SageError};
use crate::types::{Operation, OperationKind};
use rand::Rng;
use std::collections::HashMap;

/// Ordered list of operation templates that genome indices refer to.
///
/// A flat gene `i` decodes to a clone of `templates[i]`; nested blocks use
/// the template only to pick the operation variant. Catalogs are immutable
/// once built and are shared between genomes behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationCatalog {
    templates: Vec<Operation>,
    first_by_kind: HashMap<OperationKind, usize>,
}

impl OperationCatalog {
    pub fn new(templates: Vec<Operation>) -> Self {
        let mut first_by_kind = HashMap::new();
        for (index, template) in templates.iter().enumerate() {
            // Duplicate kinds resolve to their first occurrence
            first_by_kind.entry(template.kind()).or_insert(index);
        }
        Self {
            templates,
            first_by_kind,
        }
    }

    /// The standard SAGE instruction set.
    pub fn sage() -> Self {
        Self::new(vec![
            Operation::SetRegister(-1),
            Operation::SetRegister(0),
            Operation::SetRegister(1),
            Operation::MoveLeft(1),
            Operation::MoveRight(1),
            Operation::Dereference(vec![]),
            Operation::Function {
                name: None,
                body: vec![],
            },
            Operation::Call(None),
            Operation::Save,
            Operation::Restore,
            Operation::GetChar,
            Operation::PutChar,
            Operation::GetInt,
            Operation::PutInt,
            Operation::If(vec![]),
            Operation::IfElse(vec![], vec![]),
            Operation::WhileLoop(vec![]),
            Operation::Dereference(vec![]),
            Operation::Reference,
            Operation::Allocate,
            Operation::Index,
            Operation::Where,
            Operation::IsNonNegative,
            Operation::Add,
            Operation::Subtract,
            Operation::Multiply,
            Operation::Divide,
        ])
    }

    /// Exactly one template per operation variant.
    pub fn canonical() -> Self {
        Self::new(OperationKind::ALL.iter().map(|kind| template_for(*kind)).collect())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, index: i64) -> Option<&Operation> {
        usize::try_from(index).ok().and_then(|i| self.templates.get(i))
    }

    /// Resolves a gene to its template, rejecting out-of-range indices.
    pub fn resolve(&self, index: i64) -> Result<&Operation> {
        self.get(index).ok_or_else(|| {
            SageError::MalformedGenome(format!(
                "operation index {} is out of range for a catalog of {}",
                index,
                self.templates.len()
            ))
        })
    }

    /// Index of the first template of `kind`.
    pub fn index_of(&self, kind: OperationKind) -> Option<usize> {
        self.first_by_kind.get(&kind).copied()
    }

    /// Whether every variant appears at most once, which is what makes
    /// encoding an exact inverse of decoding.
    pub fn has_unique_kinds(&self) -> bool {
        self.first_by_kind.len() == self.templates.len()
    }

    /// Uniformly drawn template index.
    pub fn random_index<R: Rng>(&self, rng: &mut R) -> i64 {
        if self.templates.is_empty() {
            return 0;
        }
        rng.gen_range(0..self.templates.len()) as i64
    }

    /// Largest valid template index.
    pub fn max_index(&self) -> i64 {
        self.templates.len().saturating_sub(1) as i64
    }
}

impl Default for OperationCatalog {
    fn default() -> Self {
        Self::sage()
    }
}

fn template_for(kind: OperationKind) -> Operation {
    match kind {
        OperationKind::MoveLeft => Operation::MoveLeft(1),
        OperationKind::MoveRight => Operation::MoveRight(1),
        OperationKind::SetTape => Operation::SetTape(0),
        OperationKind::SetRegister => Operation::SetRegister(0),
        OperationKind::Add => Operation::Add,
        OperationKind::Subtract => Operation::Subtract,
        OperationKind::Multiply => Operation::Multiply,
        OperationKind::Divide => Operation::Divide,
        OperationKind::Save => Operation::Save,
        OperationKind::Restore => Operation::Restore,
        OperationKind::Where => Operation::Where,
        OperationKind::IsNonNegative => Operation::IsNonNegative,
        OperationKind::Index => Operation::Index,
        OperationKind::Allocate => Operation::Allocate,
        OperationKind::GetInt => Operation::GetInt,
        OperationKind::GetChar => Operation::GetChar,
        OperationKind::PutInt => Operation::PutInt,
        OperationKind::PutChar => Operation::PutChar,
        OperationKind::WhileLoop => Operation::WhileLoop(vec![]),
        OperationKind::If => Operation::If(vec![]),
        OperationKind::IfElse => Operation::IfElse(vec![], vec![]),
        OperationKind::Dereference => Operation::Dereference(vec![]),
        OperationKind::Reference => Operation::Reference,
        OperationKind::Function => Operation::Function {
            name: None,
            body: vec![],
        },
        OperationKind::Call => Operation::Call(None),
    }
}
