// src/engines/metrics/sorting.rs
use crate::config::MachineConfig;
use crate::engines::evaluation::io::Input;
use crate::engines::generation::fitness::FitnessHook;
use crate::engines::generation::genome::Genome;
use crate::error::Result;
use crate::types::{OutputValue, Word};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SORTING_MAX_LEN: usize = 8;
pub const SORTING_MAX_VALUE: Word = 100;
pub const SORTEDNESS_SAMPLES: usize = 100;
pub const SORTEDNESS_WEIGHT: f64 = 50.0;
pub const DEFAULT_MIN_SIZE: usize = 100;

/// Rewards programs that read `[len, x1, .., xlen]` and print the values
/// in ascending order. Lists of length `1..=8` are drawn from a fixed
/// seed, so repeated scoring of the same genome is deterministic.
#[derive(Debug, Clone)]
pub struct SortingTask {
    pub machine: MachineConfig,
    pub seed: u64,
    /// Genomes smaller than this score 0 without being run.
    pub min_size: usize,
}

impl Default for SortingTask {
    fn default() -> Self {
        Self {
            machine: MachineConfig::default(),
            seed: 0,
            min_size: DEFAULT_MIN_SIZE,
        }
    }
}

impl SortingTask {
    pub fn new(machine: MachineConfig, seed: u64) -> Self {
        Self {
            machine,
            seed,
            ..Self::default()
        }
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    /// The lists a genome is tested on, shortest first.
    pub fn cases(&self) -> Vec<Vec<Word>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (1..=SORTING_MAX_LEN)
            .map(|len| {
                (0..len)
                    .map(|_| rng.gen_range(0..=SORTING_MAX_VALUE))
                    .collect()
            })
            .collect()
    }

    /// Sum of weighted sortedness over all cases, or 0 as soon as one
    /// output is not exactly the sorted input.
    pub fn raw_score(&self, genome: &Genome) -> Result<f64> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
        let mut total = 0.0;

        for mut case in self.cases() {
            let mut input = vec![case.len() as Word];
            input.extend_from_slice(&case);

            let evaluation = genome.evaluate_with(&self.machine, Input::scripted(input))?;
            let sortedness = how_sorted(&evaluation.output, SORTEDNESS_SAMPLES, &mut rng);
            total += sortedness * SORTEDNESS_WEIGHT;

            case.sort_unstable();
            let expected: Vec<OutputValue> = case.into_iter().map(OutputValue::Int).collect();
            if evaluation.output != expected {
                return Ok(0.0);
            }
        }

        Ok(total)
    }
}

impl FitnessHook for SortingTask {
    fn score(&self, genome: &Genome) -> Result<f64> {
        let size = genome.get_size();
        if size < self.min_size {
            return Ok(0.0);
        }
        Ok(self.raw_score(genome)? / size as f64)
    }
}

/// Estimates sortedness by sampling `samples` ordered index pairs: a pair
/// in order counts +1, a pair mixing integers and characters counts -1.
/// Lists of length 0 or 1 are fully sorted.
pub fn how_sorted<R: Rng>(values: &[OutputValue], samples: usize, rng: &mut R) -> f64 {
    if values.len() <= 1 || samples == 0 {
        return 1.0;
    }

    let mut count: i64 = 0;
    for _ in 0..samples {
        let i = rng.gen_range(0..values.len());
        let mut j = rng.gen_range(0..values.len() - 1);
        if j >= i {
            j += 1;
        }
        let (lo, hi) = (i.min(j), i.max(j));
        match (values[lo], values[hi]) {
            (OutputValue::Int(a), OutputValue::Int(b)) if a <= b => count += 1,
            (OutputValue::Char(a), OutputValue::Char(b)) if a <= b => count += 1,
            (OutputValue::Int(_), OutputValue::Int(_))
            | (OutputValue::Char(_), OutputValue::Char(_)) => {}
            _ => count -= 1,
        }
    }

    count as f64 / samples as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[Word]) -> Vec<OutputValue> {
        values.iter().copied().map(OutputValue::Int).collect()
    }

    #[test]
    fn test_how_sorted_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(how_sorted(&ints(&[]), 100, &mut rng), 1.0);
        assert_eq!(how_sorted(&ints(&[4]), 100, &mut rng), 1.0);
        assert_eq!(how_sorted(&ints(&[1, 2, 2, 9]), 100, &mut rng), 1.0);
        assert_eq!(how_sorted(&ints(&[9, 5, 1]), 100, &mut rng), 0.0);
    }

    #[test]
    fn test_how_sorted_penalises_mixed_output() {
        let mut rng = StdRng::seed_from_u64(2);
        let mixed = vec![OutputValue::Int(1), OutputValue::Char('a')];
        assert_eq!(how_sorted(&mixed, 10, &mut rng), -1.0);
    }

    #[test]
    fn test_cases_are_deterministic() {
        let task = SortingTask::new(MachineConfig::default(), 17);
        let cases = task.cases();
        assert_eq!(cases, task.cases());
        assert_eq!(cases.len(), SORTING_MAX_LEN);
        for (i, case) in cases.iter().enumerate() {
            assert_eq!(case.len(), i + 1);
            assert!(case.iter().all(|v| (0..=SORTING_MAX_VALUE).contains(v)));
        }
    }
}
