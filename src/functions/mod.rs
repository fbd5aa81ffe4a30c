pub mod registry;

pub use registry::OperationCatalog;
