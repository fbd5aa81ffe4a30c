use crate::config::MachineConfig;
use crate::engines::evaluation::io::Input;
use crate::engines::evaluation::machine::Machine;
use crate::engines::evaluation::tape::Tape;
use crate::engines::generation::genome::Genome;
use crate::error::{Result, SageError};
use crate::types::{OutputValue, Word};
use rayon::prelude::*;

/// Score given to genomes whose evaluation failed or produced a
/// non-finite value.
pub const MIN_FITNESS: f64 = f64::MIN;

/// Scores a genome. Errors returned here never reach the search loop;
/// [`Genome::fitness`] maps them to [`MIN_FITNESS`].
pub trait FitnessHook: Send + Sync {
    fn score(&self, genome: &Genome) -> Result<f64>;
}

impl<F> FitnessHook for F
where
    F: Fn(&Genome) -> Result<f64> + Send + Sync,
{
    fn score(&self, genome: &Genome) -> Result<f64> {
        self(genome)
    }
}

/// Terminal machine state after evaluating a genome.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub tape: Tape,
    pub output: Vec<OutputValue>,
    pub input_consumed: usize,
    pub steps: u64,
    pub exhausted: bool,
}

impl Evaluation {
    pub fn head(&self) -> Word {
        self.tape.get_head()
    }

    pub fn register(&self) -> Word {
        self.tape.register
    }

    /// Output with characters widened to their code points.
    pub fn output_words(&self) -> Vec<Word> {
        self.output.iter().map(OutputValue::as_word).collect()
    }
}

impl Genome {
    /// Decodes and runs on a fresh default tape.
    pub fn evaluate(&self, input: Input, step_budget: u64) -> Result<Evaluation> {
        let config = MachineConfig {
            step_budget,
            ..MachineConfig::default()
        };
        self.evaluate_with(&config, input)
    }

    pub fn evaluate_with(&self, config: &MachineConfig, input: Input) -> Result<Evaluation> {
        let program = self.to_program_with_depth(config.max_depth)?;
        let mut tape = Tape::new(config.tape_length, config.blank_word());
        let outcome = Machine::from_config(config)
            .with_input(input)
            .run(&program, &mut tape)?;

        Ok(Evaluation {
            tape,
            output: outcome.output,
            input_consumed: outcome.input_consumed,
            steps: outcome.steps,
            exhausted: outcome.exhausted,
        })
    }

    /// Memoized score from the attached hook. Only a missing hook is an
    /// error; evaluation failures score [`MIN_FITNESS`].
    pub fn fitness(&mut self) -> Result<f64> {
        if let Some(fitness) = self.cached_fitness() {
            return Ok(fitness);
        }
        let hook = self
            .fitness_hook()
            .cloned()
            .ok_or(SageError::MissingFitnessHook)?;
        let fitness = bounded_score(hook.score(self));
        self.store_fitness(fitness);
        Ok(fitness)
    }
}

fn bounded_score(result: Result<f64>) -> f64 {
    match result {
        Ok(score) if score.is_finite() => score,
        Ok(score) => {
            log::trace!("Non-finite fitness {} mapped to minimum", score);
            MIN_FITNESS
        }
        Err(e) => {
            log::trace!("Evaluation failed, scoring minimum: {}", e);
            MIN_FITNESS
        }
    }
}

/// Scores every genome in parallel, then stable-sorts best first so ties
/// keep their original order.
pub fn rank_population(population: &mut [Genome]) {
    population.par_iter_mut().for_each(|genome| {
        if genome.fitness().is_err() {
            genome.store_fitness(MIN_FITNESS);
        }
    });
    population.sort_by(|a, b| {
        let fa = a.cached_fitness().unwrap_or(MIN_FITNESS);
        let fb = b.cached_fitness().unwrap_or(MIN_FITNESS);
        fb.total_cmp(&fa)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::genome::Gene;
    use crate::functions::registry::OperationCatalog;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn genome(genes: Vec<Gene>) -> Genome {
        Genome::new(Arc::new(OperationCatalog::sage()), genes)
    }

    #[test]
    fn test_fitness_is_memoized_until_mutation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let hook = move |g: &Genome| -> Result<f64> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(g.get_size() as f64)
        };
        let mut g = genome(vec![Gene::Op(1), Gene::Op(2)]).with_fitness_hook(Arc::new(hook));

        assert_eq!(g.fitness().unwrap(), 2.0);
        assert_eq!(g.fitness().unwrap(), 2.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mut rng = StdRng::seed_from_u64(9);
        g.insert_random_gene(&mut rng);
        assert!(g.cached_fitness().is_none());
        g.fitness().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_errors_map_to_minimum() {
        let hook = |g: &Genome| -> Result<f64> {
            let evaluation = g.evaluate(Input::empty(), 100)?;
            Ok(evaluation.register() as f64)
        };
        // Call(7) with nothing bound
        let mut g = genome(vec![Gene::Block(vec![Gene::Op(7), Gene::Op(7)])])
            .with_fitness_hook(Arc::new(hook));
        assert_eq!(g.fitness().unwrap(), MIN_FITNESS);

        let mut malformed = genome(vec![Gene::Op(99)]).with_fitness_hook(Arc::new(hook));
        assert_eq!(malformed.fitness().unwrap(), MIN_FITNESS);
    }

    /// Function 0 calls itself from under `levels` nested `If`s, then is
    /// called once.
    fn recursive_under_ifs(levels: usize) -> Vec<Gene> {
        let mut body = Gene::Block(vec![Gene::Op(7), Gene::Op(0)]);
        for _ in 0..levels {
            body = Gene::Block(vec![Gene::Op(14), Gene::Op(2), body]);
        }
        vec![
            Gene::Block(vec![Gene::Op(6), Gene::Op(0), Gene::Op(2), body]),
            Gene::Block(vec![Gene::Op(7), Gene::Op(0)]),
        ]
    }

    #[test]
    fn test_unbounded_recursion_scores_minimum_in_parallel() {
        let hook: Arc<dyn FitnessHook> = Arc::new(|g: &Genome| -> Result<f64> {
            g.evaluate(Input::empty(), 1_000_000)?;
            Ok(1.0)
        });
        let shallow = vec![
            Gene::Block(vec![
                Gene::Op(6),
                Gene::Op(0),
                Gene::Op(2),
                Gene::Block(vec![
                    Gene::Op(14),
                    Gene::Op(2),
                    Gene::Block(vec![
                        Gene::Op(14),
                        Gene::Op(2),
                        Gene::Block(vec![
                            Gene::Op(14),
                            Gene::Block(vec![Gene::Op(7), Gene::Op(0)]),
                        ]),
                    ]),
                ]),
            ]),
            Gene::Block(vec![Gene::Op(7), Gene::Op(0)]),
        ];
        let mut population: Vec<Genome> = [shallow, recursive_under_ifs(24)]
            .into_iter()
            .map(|genes| genome(genes).with_fitness_hook(Arc::clone(&hook)))
            .chain(std::iter::once(
                genome(vec![Gene::Op(2)]).with_fitness_hook(Arc::clone(&hook)),
            ))
            .collect();

        rank_population(&mut population);
        assert_eq!(population[0].cached_fitness(), Some(1.0));
        assert_eq!(population[1].cached_fitness(), Some(MIN_FITNESS));
        assert_eq!(population[2].cached_fitness(), Some(MIN_FITNESS));
    }

    #[test]
    fn test_missing_hook_is_reported() {
        let mut g = genome(vec![Gene::Op(1)]);
        assert!(matches!(g.fitness(), Err(SageError::MissingFitnessHook)));
    }

    #[test]
    fn test_rank_population_is_stable() {
        let hook: Arc<dyn FitnessHook> = Arc::new(|g: &Genome| -> Result<f64> {
            Ok((g.get_size() % 2) as f64)
        });
        let mut population: Vec<Genome> = (1..=6)
            .map(|n| genome(vec![Gene::Op(0); n]).with_fitness_hook(Arc::clone(&hook)))
            .collect();
        rank_population(&mut population);
        let sizes: Vec<usize> = population.iter().map(Genome::get_size).collect();
        assert_eq!(sizes, vec![1, 3, 5, 2, 4, 6]);
    }
}
