//! Translation between nested genomes and executable program trees.
//!
//! Block shapes, keyed by the variant of the template the head gene names:
//!
//! - `[idx, literal]` for move, set-tape, set-register and call
//! - `[idx, ...body]` for while, if and dereference
//! - `[idx, name, ...body]` for function
//! - `[idx, [then...], [else...]]` for if-else
//!
//! A block whose head is itself a block, or whose head names a plain leaf,
//! has no wrapper and is decoded as the concatenation of its parts.

use crate::engines::generation::genome::Gene;
use crate::error::{Result, SageError};
use crate::functions::registry::OperationCatalog;
use crate::types::{Operation, OperationKind, Program};

/// Nesting cap for decode/encode; deeper input is rejected rather than
/// recursed into.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// How a nested block is read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockForm<'a> {
    Empty,
    /// Head is a block: decode it and the remainder as plain sequences.
    Splice { head: &'a [Gene], rest: &'a [Gene] },
    /// Head names a leaf without parameters: decode every gene in order.
    Flatten(&'a [Gene]),
    Parameterized { kind: OperationKind, literal: Option<&'a Gene> },
    Body { kind: OperationKind, body: &'a [Gene] },
    Function { name: Option<&'a Gene>, body: &'a [Gene] },
    IfElse { then_body: &'a Gene, else_body: &'a Gene },
}

pub fn classify<'a>(block: &'a [Gene], catalog: &OperationCatalog) -> Result<BlockForm<'a>> {
    let (head, rest) = match block.split_first() {
        None => return Ok(BlockForm::Empty),
        Some((Gene::Block(inner), rest)) => {
            return Ok(BlockForm::Splice { head: inner, rest })
        }
        Some((Gene::Op(index), rest)) => (*index, rest),
    };

    let kind = catalog.resolve(head)?.kind();
    let form = match kind {
        kind if kind.is_parameterized() => BlockForm::Parameterized {
            kind,
            literal: rest.first(),
        },
        OperationKind::WhileLoop | OperationKind::If | OperationKind::Dereference => {
            BlockForm::Body { kind, body: rest }
        }
        OperationKind::Function => BlockForm::Function {
            name: rest.first(),
            body: rest.get(1..).unwrap_or(&[]),
        },
        OperationKind::IfElse => match rest {
            [then_body, else_body] => BlockForm::IfElse {
                then_body,
                else_body,
            },
            _ => {
                return Err(SageError::MalformedGenome(format!(
                    "if-else block needs exactly two branches, found {}",
                    rest.len()
                )))
            }
        },
        _ => BlockForm::Flatten(block),
    };
    Ok(form)
}

/// Decodes `genes` with the default nesting cap.
pub fn decode(genes: &[Gene], catalog: &OperationCatalog) -> Result<Program> {
    decode_with_depth(genes, catalog, DEFAULT_MAX_DEPTH)
}

pub fn decode_with_depth(
    genes: &[Gene],
    catalog: &OperationCatalog,
    max_depth: usize,
) -> Result<Program> {
    let mut program = Vec::with_capacity(genes.len());
    Decoder { catalog, max_depth }.sequence(genes, 0, &mut program)?;
    Ok(program)
}

struct Decoder<'c> {
    catalog: &'c OperationCatalog,
    max_depth: usize,
}

impl Decoder<'_> {
    fn sequence(&self, genes: &[Gene], depth: usize, out: &mut Program) -> Result<()> {
        if depth > self.max_depth {
            return Err(SageError::MalformedGenome(format!(
                "nesting deeper than {} levels",
                self.max_depth
            )));
        }
        for gene in genes {
            match gene {
                Gene::Op(index) => out.push(self.catalog.resolve(*index)?.clone()),
                Gene::Block(block) => self.block(block, depth + 1, out)?,
            }
        }
        Ok(())
    }

    fn body(&self, genes: &[Gene], depth: usize) -> Result<Program> {
        let mut program = Vec::with_capacity(genes.len());
        self.sequence(genes, depth, &mut program)?;
        Ok(program)
    }

    fn branch(&self, gene: &Gene, depth: usize) -> Result<Program> {
        match gene {
            Gene::Block(genes) => self.body(genes, depth),
            Gene::Op(value) => Err(SageError::MalformedGenome(format!(
                "if-else branch must be a block, found {}",
                value
            ))),
        }
    }

    fn block(&self, block: &[Gene], depth: usize, out: &mut Program) -> Result<()> {
        match classify(block, self.catalog)? {
            BlockForm::Empty => {}
            BlockForm::Splice { head, rest } => {
                self.sequence(head, depth, out)?;
                self.sequence(rest, depth, out)?;
            }
            BlockForm::Flatten(genes) => self.sequence(genes, depth, out)?,
            BlockForm::Parameterized { kind, literal } => {
                out.push(parameterized(kind, literal)?);
            }
            BlockForm::Body { kind, body } => {
                let body = self.body(body, depth)?;
                out.push(match kind {
                    OperationKind::WhileLoop => Operation::WhileLoop(body),
                    OperationKind::If => Operation::If(body),
                    _ => Operation::Dereference(body),
                });
            }
            BlockForm::Function { name, body } => {
                let name = match name {
                    Some(Gene::Op(name)) => *name,
                    Some(Gene::Block(_)) => {
                        return Err(SageError::MalformedGenome(
                            "function name must be a literal".to_string(),
                        ))
                    }
                    None => {
                        return Err(SageError::MalformedGenome(
                            "function block without a name".to_string(),
                        ))
                    }
                };
                out.push(Operation::Function {
                    name: Some(name),
                    body: self.body(body, depth)?,
                });
            }
            BlockForm::IfElse {
                then_body,
                else_body,
            } => {
                out.push(Operation::IfElse(
                    self.branch(then_body, depth + 1)?,
                    self.branch(else_body, depth + 1)?,
                ));
            }
        }
        Ok(())
    }
}

fn parameterized(kind: OperationKind, literal: Option<&Gene>) -> Result<Operation> {
    let value = match literal {
        Some(Gene::Op(value)) => Some(*value),
        Some(Gene::Block(_)) => {
            return Err(SageError::MalformedGenome(format!(
                "{:?} literal must be a flat value",
                kind
            )))
        }
        None => None,
    };
    let required = || {
        value.ok_or_else(|| {
            SageError::MalformedGenome(format!("{:?} block without a literal", kind))
        })
    };
    Ok(match kind {
        OperationKind::MoveLeft => Operation::MoveLeft(required()?),
        OperationKind::MoveRight => Operation::MoveRight(required()?),
        OperationKind::SetTape => Operation::SetTape(required()?),
        OperationKind::SetRegister => Operation::SetRegister(required()?),
        OperationKind::Call => Operation::Call(value),
        other => {
            return Err(SageError::MalformedGenome(format!(
                "{:?} takes no literal",
                other
            )))
        }
    })
}

/// Encodes `program` against `catalog`, using the first template of each
/// variant when the catalog holds duplicates.
pub fn encode(program: &[Operation], catalog: &OperationCatalog) -> Result<Vec<Gene>> {
    encode_with_depth(program, catalog, 0)
}

fn encode_with_depth(
    program: &[Operation],
    catalog: &OperationCatalog,
    depth: usize,
) -> Result<Vec<Gene>> {
    if depth > DEFAULT_MAX_DEPTH {
        return Err(SageError::Unencodable(format!(
            "program nested deeper than {} levels",
            DEFAULT_MAX_DEPTH
        )));
    }
    program
        .iter()
        .map(|op| encode_operation(op, catalog, depth))
        .collect()
}

fn encode_operation(op: &Operation, catalog: &OperationCatalog, depth: usize) -> Result<Gene> {
    let index = catalog
        .index_of(op.kind())
        .ok_or_else(|| SageError::Unencodable(format!("no {:?} template in catalog", op.kind())))?
        as i64;

    let with_body = |prefix: Vec<Gene>, body: &[Operation]| -> Result<Gene> {
        let mut block = prefix;
        block.extend(encode_with_depth(body, catalog, depth + 1)?);
        Ok(Gene::Block(block))
    };

    match op {
        Operation::MoveLeft(v)
        | Operation::MoveRight(v)
        | Operation::SetTape(v)
        | Operation::SetRegister(v)
        | Operation::Call(Some(v)) => Ok(Gene::Block(vec![Gene::Op(index), Gene::Op(*v)])),
        Operation::WhileLoop(body) | Operation::If(body) | Operation::Dereference(body) => {
            with_body(vec![Gene::Op(index)], body)
        }
        Operation::Function {
            name: Some(name),
            body,
        } => with_body(vec![Gene::Op(index), Gene::Op(*name)], body),
        Operation::Function { name: None, body } if body.is_empty() => Ok(Gene::Op(index)),
        Operation::Function { name: None, .. } => Err(SageError::Unencodable(
            "function with a body but no name".to_string(),
        )),
        Operation::IfElse(then_body, else_body) => Ok(Gene::Block(vec![
            Gene::Op(index),
            Gene::Block(encode_with_depth(then_body, catalog, depth + 2)?),
            Gene::Block(encode_with_depth(else_body, catalog, depth + 2)?),
        ])),
        _ => Ok(Gene::Op(index)),
    }
}
