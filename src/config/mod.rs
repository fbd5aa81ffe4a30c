pub mod traits;
pub mod machine;
pub mod evolution;
pub mod manager;

pub use manager::{ConfigManager, SageConfig};
pub use machine::MachineConfig;
pub use evolution::EvolutionConfig;
pub use traits::ConfigSection;
