use crate::engines::generation::genome::{Gene, Genome};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EliteGenome {
    pub genes: Vec<Gene>,
    pub fitness: f64,
    pub size: usize,
    pub generation: usize,
    pub canonical_string: String, // For deduplication
}

impl EliteGenome {
    pub fn from_genome(genome: &Genome, fitness: f64, generation: usize) -> Self {
        Self {
            genes: genome.genes().to_vec(),
            fitness,
            size: genome.get_size(),
            generation,
            canonical_string: get_canonical_genome_string(genome.genes()),
        }
    }
}

/// Best distinct genomes seen across a run, best first.
pub struct HallOfFame {
    genomes: Vec<EliteGenome>,
    max_size: usize,
    seen_signatures: HashSet<String>,
}

impl HallOfFame {
    pub fn new(max_size: usize) -> Self {
        Self {
            genomes: Vec::new(),
            max_size,
            seen_signatures: HashSet::new(),
        }
    }

    /// Attempt to add a genome to the Hall of Fame
    pub fn try_add(&mut self, elite: EliteGenome) -> bool {
        if self.seen_signatures.contains(&elite.canonical_string) {
            return false;
        }
        if self.genomes.len() >= self.max_size
            && self
                .genomes
                .last()
                .is_some_and(|worst| worst.fitness >= elite.fitness)
        {
            return false;
        }

        self.seen_signatures.insert(elite.canonical_string.clone());
        self.genomes.push(elite);

        // Stable: earlier entries win ties
        self.genomes.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        while self.genomes.len() > self.max_size {
            if let Some(removed) = self.genomes.pop() {
                self.seen_signatures.remove(&removed.canonical_string);
            }
        }

        true
    }

    pub fn get_all(&self) -> &[EliteGenome] {
        &self.genomes
    }

    pub fn best(&self) -> Option<&EliteGenome> {
        self.genomes.first()
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }
}

/// Generate canonical string for deduplication
pub fn get_canonical_genome_string(genes: &[Gene]) -> String {
    serde_json::to_string(genes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elite(genes: Vec<i64>, fitness: f64) -> EliteGenome {
        let genes: Vec<Gene> = genes.into_iter().map(Gene::Op).collect();
        EliteGenome {
            canonical_string: get_canonical_genome_string(&genes),
            size: genes.len(),
            genes,
            fitness,
            generation: 0,
        }
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut hall = HallOfFame::new(3);
        assert!(hall.try_add(elite(vec![1, 2], 1.0)));
        assert!(!hall.try_add(elite(vec![1, 2], 5.0)));
        assert_eq!(hall.len(), 1);
    }

    #[test]
    fn test_keeps_best_when_full() {
        let mut hall = HallOfFame::new(2);
        hall.try_add(elite(vec![1], 1.0));
        hall.try_add(elite(vec![2], 3.0));
        assert!(!hall.try_add(elite(vec![3], 0.5)));
        assert!(hall.try_add(elite(vec![4], 2.0)));
        let fitnesses: Vec<f64> = hall.get_all().iter().map(|e| e.fitness).collect();
        assert_eq!(fitnesses, vec![3.0, 2.0]);

        // Evicted signature may come back
        assert!(hall.try_add(elite(vec![1], 10.0)));
        assert_eq!(hall.best().map(|e| e.fitness), Some(10.0));
    }
}
