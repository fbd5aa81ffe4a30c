use crate::config::EvolutionConfig;
use crate::engines::generation::{
    fitness::{rank_population, FitnessHook, MIN_FITNESS},
    genome::Genome,
    hall_of_fame::{EliteGenome, HallOfFame},
    operators::tournament_selection,
};
use crate::error::{Result, SageError};
use crate::functions::registry::OperationCatalog;
use crate::types::{Operation, Program};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(
        &mut self,
        generation: usize,
        best_fitness: f64,
        best_size: usize,
        hall_of_fame_size: usize,
    );
}

/// Best genome of a finished run.
#[derive(Debug, Clone)]
pub struct EvolutionResult {
    pub best: Genome,
    pub best_fitness: f64,
    pub initial_size: usize,
    pub final_size: usize,
    pub elites: Vec<EliteGenome>,
}

impl EvolutionResult {
    pub fn best_program(&self) -> Result<Program> {
        self.best.to_program()
    }
}

/// Truncation-selection search: each generation keeps the best
/// `survivor_fraction` of the population and refills it with mutated
/// copies of the survivors.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    catalog: Arc<OperationCatalog>,
    hook: Arc<dyn FitnessHook>,
    hall_of_fame: HallOfFame,
    rng: StdRng,
}

impl EvolutionEngine {
    pub fn new(
        config: EvolutionConfig,
        catalog: Arc<OperationCatalog>,
        hook: Arc<dyn FitnessHook>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let hall_of_fame = HallOfFame::new(config.hall_of_fame_size);

        Self {
            config,
            catalog,
            hook,
            hall_of_fame,
            rng,
        }
    }

    /// Optimizes an existing program: every initial genome is its encoding.
    pub fn run_from_program<C: ProgressCallback>(
        &mut self,
        program: &[Operation],
        callback: C,
    ) -> Result<EvolutionResult> {
        let seed = Genome::from_program(program, Arc::clone(&self.catalog))?
            .with_fitness_hook(Arc::clone(&self.hook));
        let population = vec![seed; self.config.population_size];
        self.run(population, callback)
    }

    /// Searches from random genomes of `genome_length` flat genes.
    pub fn run_random<C: ProgressCallback>(&mut self, callback: C) -> Result<EvolutionResult> {
        let population = (0..self.config.population_size)
            .map(|_| {
                Genome::random_with_depth(
                    Arc::clone(&self.catalog),
                    self.config.genome_length,
                    self.config.max_random_depth,
                    &mut self.rng,
                )
                .with_fitness_hook(Arc::clone(&self.hook))
            })
            .collect();
        self.run(population, callback)
    }

    /// Run the evolution process over an initial population
    pub fn run<C: ProgressCallback>(
        &mut self,
        mut population: Vec<Genome>,
        mut callback: C,
    ) -> Result<EvolutionResult> {
        if population.is_empty() {
            return Err(SageError::Configuration(
                "Initial population is empty".to_string(),
            ));
        }
        for genome in population.iter_mut() {
            if genome.fitness_hook().is_none() {
                genome.set_fitness_hook(Arc::clone(&self.hook));
            }
        }

        let initial_size = population[0].get_size();
        rank_population(&mut population);
        self.record(&population, 0);
        log::info!(
            "Initial best fitness {:.4} at size {}",
            best_fitness(&population),
            initial_size
        );

        for generation in 0..self.config.generations {
            callback.on_generation_start(generation);

            population = self.next_generation(population);
            rank_population(&mut population);
            self.record(&population, generation + 1);

            callback.on_generation_complete(
                generation,
                best_fitness(&population),
                population[0].get_size(),
                self.hall_of_fame.len(),
            );
        }

        let best = population.swap_remove(0);
        Ok(EvolutionResult {
            best_fitness: best.cached_fitness().unwrap_or(MIN_FITNESS),
            final_size: best.get_size(),
            initial_size,
            best,
            elites: self.hall_of_fame.get_all().to_vec(),
        })
    }

    /// Truncates a ranked population to its survivors and refills it.
    /// Offspring are themselves used as parents once every survivor has
    /// had its turn.
    fn next_generation(&mut self, mut population: Vec<Genome>) -> Vec<Genome> {
        let survivors = self.config.survivor_count().min(population.len());
        population.truncate(survivors);

        let mut parent = 0;
        while population.len() < self.config.population_size {
            let current = population[parent].clone();
            for _ in 0..self.config.offspring_per_survivor {
                if population.len() >= self.config.population_size {
                    break;
                }
                let child = self.breed(&current, &population[..survivors]);
                population.push(child);
            }
            parent += 1;
        }

        population
    }

    fn breed(&mut self, parent: &Genome, mates: &[Genome]) -> Genome {
        let mut child = if self.rng.gen::<f64>() < self.config.crossover_rate {
            let mate = tournament_selection(mates, self.config.tournament_size, &mut self.rng);
            parent.crossover_splits(mate, &mut self.rng)
        } else {
            parent.offspring(parent.genes().to_vec())
        };
        child.mutate(self.config.mutation_rate, &mut self.rng);
        child
    }

    fn record(&mut self, population: &[Genome], generation: usize) {
        for genome in population {
            let Some(fitness) = genome.cached_fitness() else {
                continue;
            };
            if fitness > MIN_FITNESS {
                self.hall_of_fame
                    .try_add(EliteGenome::from_genome(genome, fitness, generation));
            }
        }
    }
}

fn best_fitness(ranked: &[Genome]) -> f64 {
    ranked
        .first()
        .and_then(Genome::cached_fitness)
        .unwrap_or(MIN_FITNESS)
}
