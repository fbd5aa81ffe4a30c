//! Genome representation for genetic programming
//!
//! A genome is a nested sequence of genes. A flat gene is an index into an
//! [`OperationCatalog`] (or, inside a block, a literal such as a move
//! distance or a function name); a block gene wraps a compound operation:
//!
//! ```text
//! [2, 4, [16, 8, [0, 42]], 13]
//! ```
//!
//! decodes against the SAGE catalog to
//!
//! ```text
//! SetRegister(1), MoveRight(1), WhileLoop([Save, SetRegister(42)]), PutInt
//! ```
//!
//! The genetic operators in [`super::operators`] edit this structure
//! directly and never need the decoded program; any nested sequence
//! decodes to a valid program or to a `MalformedGenome` error.

use crate::engines::generation::codec;
use crate::engines::generation::fitness::FitnessHook;
use crate::engines::generation::operators;
use crate::error::Result;
use crate::functions::registry::OperationCatalog;
use crate::types::{Operation, Program};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Gene {
    Op(i64),
    Block(Vec<Gene>),
}

impl Gene {
    pub fn is_block(&self) -> bool {
        matches!(self, Gene::Block(_))
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gene::Op(value) => write!(f, "{}", value),
            Gene::Block(genes) => write_genes(f, genes),
        }
    }
}

fn write_genes(f: &mut fmt::Formatter<'_>, genes: &[Gene]) -> fmt::Result {
    write!(f, "[")?;
    for (i, gene) in genes.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", gene)?;
    }
    write!(f, "]")
}

/// Counts flat genes at every depth; block wrappers are free.
pub fn gene_count(genes: &[Gene]) -> usize {
    genes
        .iter()
        .map(|gene| match gene {
            Gene::Op(_) => 1,
            Gene::Block(inner) => gene_count(inner),
        })
        .sum()
}

/// Draws up to `budget` flat genes. After each gene a nested block is
/// opened with probability 1/2 while `depth < max_depth`; nested blocks
/// draw from the remaining budget.
pub fn random_genes<R: Rng>(
    catalog: &OperationCatalog,
    budget: usize,
    depth: usize,
    max_depth: usize,
    rng: &mut R,
) -> Vec<Gene> {
    let mut genes = Vec::new();
    let mut total = 0;
    while total < budget {
        genes.push(Gene::Op(catalog.random_index(rng)));
        total += 1;
        if total >= budget {
            break;
        }
        if depth < max_depth && rng.gen_bool(0.5) {
            let block = random_genes(catalog, budget - total, depth + 1, max_depth, rng);
            total += gene_count(&block);
            genes.push(Gene::Block(block));
        }
    }
    genes
}

/// A genome bound to its catalog, with an optional fitness hook and a
/// memoized score.
#[derive(Clone)]
pub struct Genome {
    catalog: Arc<OperationCatalog>,
    genes: Vec<Gene>,
    fitness_hook: Option<Arc<dyn FitnessHook>>,
    fitness: Option<f64>,
}

pub const DEFAULT_RANDOM_DEPTH: usize = 5;

impl Genome {
    pub fn new(catalog: Arc<OperationCatalog>, genes: Vec<Gene>) -> Self {
        Self {
            catalog,
            genes,
            fitness_hook: None,
            fitness: None,
        }
    }

    /// Random genome of exactly `length` flat genes.
    pub fn random<R: Rng>(catalog: Arc<OperationCatalog>, length: usize, rng: &mut R) -> Self {
        Self::random_with_depth(catalog, length, DEFAULT_RANDOM_DEPTH, rng)
    }

    pub fn random_with_depth<R: Rng>(
        catalog: Arc<OperationCatalog>,
        length: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> Self {
        let genes = random_genes(&catalog, length, 0, max_depth, rng);
        Self::new(catalog, genes)
    }

    /// Encodes an existing program tree.
    pub fn from_program(program: &[Operation], catalog: Arc<OperationCatalog>) -> Result<Self> {
        let genes = codec::encode(program, &catalog)?;
        Ok(Self::new(catalog, genes))
    }

    pub fn to_program(&self) -> Result<Program> {
        codec::decode(&self.genes, &self.catalog)
    }

    pub fn to_program_with_depth(&self, max_depth: usize) -> Result<Program> {
        codec::decode_with_depth(&self.genes, &self.catalog, max_depth)
    }

    pub fn with_fitness_hook(mut self, hook: Arc<dyn FitnessHook>) -> Self {
        self.set_fitness_hook(hook);
        self
    }

    pub fn set_fitness_hook(&mut self, hook: Arc<dyn FitnessHook>) {
        self.fitness_hook = Some(hook);
        self.fitness = None;
    }

    pub fn fitness_hook(&self) -> Option<&Arc<dyn FitnessHook>> {
        self.fitness_hook.as_ref()
    }

    pub fn catalog(&self) -> &Arc<OperationCatalog> {
        &self.catalog
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn get_size(&self) -> usize {
        gene_count(&self.genes)
    }

    /// Score memoized by the last call to `fitness`, if still valid.
    pub fn cached_fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub(crate) fn store_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    /// Sibling genome sharing this genome's catalog and hook, unscored.
    pub fn offspring(&self, genes: Vec<Gene>) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            genes,
            fitness_hook: self.fitness_hook.clone(),
            fitness: None,
        }
    }

    /// Point or structural mutation, chosen by a fair coin.
    pub fn mutate<R: Rng>(&mut self, mutation_rate: f64, rng: &mut R) -> &mut Self {
        self.fitness = None;
        operators::mutate(&mut self.genes, mutation_rate, &self.catalog, rng);
        self
    }

    pub fn insert_random_gene<R: Rng>(&mut self, rng: &mut R) -> &mut Self {
        self.fitness = None;
        operators::insert_random_gene(&mut self.genes, &self.catalog, rng, 0);
        self
    }

    pub fn remove_random_gene<R: Rng>(&mut self, rng: &mut R) -> &mut Self {
        self.fitness = None;
        operators::remove_random_gene(&mut self.genes, rng, 0);
        self
    }

    pub fn swap_random_gene<R: Rng>(&mut self, rng: &mut R) -> &mut Self {
        self.fitness = None;
        operators::swap_random_gene(&mut self.genes, &self.catalog, rng, 0);
        self
    }

    pub fn modify_random_gene<R: Rng>(&mut self, rng: &mut R) -> &mut Self {
        self.fitness = None;
        operators::modify_random_gene(&mut self.genes, &self.catalog, rng, 0);
        self
    }

    /// One-point crossover on the top level.
    pub fn crossover<R: Rng>(&self, other: &Genome, rng: &mut R) -> (Genome, Genome) {
        let (first, second) = operators::crossover(&self.genes, &other.genes, rng);
        (self.offspring(first), self.offspring(second))
    }

    /// Position-aligned recombination; the longer parent's tail is dropped.
    pub fn crossover_splits<R: Rng>(&self, other: &Genome, rng: &mut R) -> Genome {
        self.offspring(operators::crossover_splits(&self.genes, &other.genes, rng, 0))
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_genes(f, &self.genes)
    }
}

impl fmt::Debug for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Genome")
            .field("genes", &self.genes)
            .field("fitness", &self.fitness)
            .field("has_hook", &self.fitness_hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_size_counts_leaves_only() {
        let genes = vec![
            Gene::Op(1),
            Gene::Block(vec![Gene::Op(16), Gene::Block(vec![Gene::Op(2), Gene::Op(3)])]),
            Gene::Block(vec![]),
        ];
        assert_eq!(gene_count(&genes), 4);
    }

    #[test]
    fn test_random_genome_hits_requested_size() {
        let catalog = Arc::new(OperationCatalog::sage());
        let mut rng = StdRng::seed_from_u64(7);
        for length in [1, 10, 100] {
            let genome = Genome::random(Arc::clone(&catalog), length, &mut rng);
            assert_eq!(genome.get_size(), length);
        }
    }

    #[test]
    fn test_genome_display_is_nested_list() {
        let genome = Genome::new(
            Arc::new(OperationCatalog::sage()),
            vec![Gene::Op(1), Gene::Block(vec![Gene::Op(16), Gene::Op(8)])],
        );
        assert_eq!(genome.to_string(), "[1, [16, 8]]");
        assert_eq!(serde_json::to_string(genome.genes()).unwrap(), "[1,[16,8]]");
    }

    #[test]
    fn test_genes_deserialize_from_nested_json() {
        let genes: Vec<Gene> = serde_json::from_str("[3, [14, 2, [16]], 9]").unwrap();
        assert_eq!(genes.len(), 3);
        assert!(genes[1].is_block());
        assert_eq!(gene_count(&genes), 5);
    }
}
