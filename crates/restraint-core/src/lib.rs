pub mod cache;
pub mod config;
pub mod genome;
pub mod grid;
pub mod multicell;
pub mod population;
pub mod queue;
pub mod results;
pub mod rng;

pub use cache::{SampleCache, SampleLoadError};
pub use config::{ConfigError, MulticellConfig};
pub use genome::GenomeModel;
pub use grid::GridTopology;
pub use multicell::{Cell, Multicell, StepOutcome};
pub use population::{EvolveError, Organism, Population};
pub use queue::{Event, TimeQueue};
pub use results::RunResults;
