pub mod codec;
pub mod evolution_engine;
pub mod fitness;
pub mod genome;
pub mod hall_of_fame;
pub mod operators;
pub mod progress;

pub use evolution_engine::{EvolutionEngine, EvolutionResult, ProgressCallback};
pub use fitness::{rank_population, Evaluation, FitnessHook, MIN_FITNESS};
pub use genome::{Gene, Genome};
pub use hall_of_fame::{EliteGenome, HallOfFame};
pub use progress::ConsoleProgressCallback;
