pub mod factorial;
pub mod sorting;

pub use factorial::FactorialTask;
pub use sorting::{how_sorted, SortingTask};
