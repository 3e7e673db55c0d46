// Data loading
// Population CSV and locus catalog JSON readers

pub mod io;

pub use io::{load_catalogs_json, load_population_csv, read_population_csv};
