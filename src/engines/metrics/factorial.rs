// src/engines/metrics/factorial.rs
use crate::config::MachineConfig;
use crate::engines::evaluation::io::Input;
use crate::engines::generation::fitness::FitnessHook;
use crate::engines::generation::genome::Genome;
use crate::error::Result;
use crate::types::{OutputValue, Word};

pub const FACTORIAL_STEP_BUDGET: u64 = 5000;
pub const FACTORIAL_CASES: u32 = 15;

/// Rewards programs that read `n` and print exactly `n!`, for every `n`
/// in `0..cases`. Any wrong case zeroes the score; a passing program
/// scores `cases / size`.
#[derive(Debug, Clone)]
pub struct FactorialTask {
    pub machine: MachineConfig,
    pub cases: u32,
}

impl Default for FactorialTask {
    fn default() -> Self {
        Self {
            machine: MachineConfig {
                step_budget: FACTORIAL_STEP_BUDGET,
                ..MachineConfig::default()
            },
            cases: FACTORIAL_CASES,
        }
    }
}

impl FactorialTask {
    pub fn new(machine: MachineConfig) -> Self {
        Self {
            machine,
            ..Self::default()
        }
    }

    /// Number of cases the genome gets right before its first failure.
    pub fn passed_cases(&self, genome: &Genome) -> Result<u32> {
        for n in 0..self.cases {
            let evaluation = genome.evaluate_with(&self.machine, Input::scripted([Word::from(n)]))?;
            if evaluation.output != [OutputValue::Int(factorial(n))] {
                return Ok(0);
            }
        }
        Ok(self.cases)
    }
}

impl FitnessHook for FactorialTask {
    fn score(&self, genome: &Genome) -> Result<f64> {
        let passed = self.passed_cases(genome)?;
        Ok(passed as f64 / genome.get_size() as f64)
    }
}

pub fn factorial(n: u32) -> Word {
    (1..=Word::from(n)).product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factorial_values() {
        assert_eq!(factorial(0), 1);
        assert_eq!(factorial(5), 120);
        assert_eq!(factorial(14), 87_178_291_200);
    }
}
