mod error;
mod loader;
mod parser;

pub use error::CatalogError;
pub use loader::{LoadHandle, ProgressFn, TleLoader, TleSource};
pub use parser::{parse_catalog, ElementCatalog, OrbitalElementSet, ParseOutcome};
