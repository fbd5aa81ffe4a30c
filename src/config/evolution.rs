use super::traits::ConfigSection;
use crate::error::SageError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    pub survivor_fraction: f64,
    pub offspring_per_survivor: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub tournament_size: usize,
    pub genome_length: usize,
    pub max_random_depth: usize,
    pub hall_of_fame_size: usize,
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 100,
            survivor_fraction: 0.1,
            offspring_per_survivor: 10,
            mutation_rate: 0.01,
            crossover_rate: 0.0,
            tournament_size: 3,
            genome_length: 100,
            max_random_depth: 5,
            hall_of_fame_size: 10,
            seed: None,
        }
    }
}

impl EvolutionConfig {
    /// Number of genomes kept from one generation to the next.
    pub fn survivor_count(&self) -> usize {
        ((self.population_size as f64 * self.survivor_fraction) as usize).max(1)
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), SageError> {
        if self.population_size < 2 {
            return Err(SageError::Configuration(
                "Population size must be at least 2".to_string(),
            ));
        }
        if self.survivor_fraction <= 0.0 || self.survivor_fraction > 1.0 {
            return Err(SageError::Configuration(
                "Survivor fraction must be in (0, 1]".to_string(),
            ));
        }
        if self.mutation_rate < 0.0 || self.mutation_rate > 1.0 {
            return Err(SageError::Configuration(
                "Mutation rate must be between 0 and 1".to_string(),
            ));
        }
        if self.crossover_rate < 0.0 || self.crossover_rate > 1.0 {
            return Err(SageError::Configuration(
                "Crossover rate must be between 0 and 1".to_string(),
            ));
        }
        if self.tournament_size == 0 {
            return Err(SageError::Configuration(
                "Tournament size must be at least 1".to_string(),
            ));
        }
        if self.offspring_per_survivor == 0 {
            return Err(SageError::Configuration(
                "Each survivor must produce at least one offspring".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_each_bad_field() {
        let cases: Vec<(fn(&mut EvolutionConfig), &str)> = vec![
            (|c| c.population_size = 1, "Population size"),
            (|c| c.survivor_fraction = 0.0, "Survivor fraction"),
            (|c| c.mutation_rate = -0.1, "Mutation rate"),
            (|c| c.crossover_rate = 2.0, "Crossover rate"),
            (|c| c.tournament_size = 0, "Tournament size"),
            (|c| c.offspring_per_survivor = 0, "Each survivor"),
        ];
        for (breaks, prefix) in cases {
            let mut config = EvolutionConfig::default();
            breaks(&mut config);
            match config.validate() {
                Err(SageError::Configuration(message)) => {
                    assert!(message.starts_with(prefix), "{}", message)
                }
                other => panic!("{} accepted: {:?}", prefix, other),
            }
        }
        assert!(EvolutionConfig::default().validate().is_ok());
    }
}
