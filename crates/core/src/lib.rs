//! Pedigree and genetic-inheritance analysis for reptile breeding.
//!
//! Given a population linked by dam/sire references and per-animal trait
//! records, the engine classifies how two candidate breeders are related and
//! computes offspring odds across independent loci.
//!
//! ```
//! use herp_breeding_core::genetics::{Animal, Genotype, Locus, Provenance};
//! use herp_breeding_core::{EngineConfig, PopulationSnapshot};
//!
//! let dam = Animal::new("dam", "ball-python")
//!     .with_genotype(Genotype::new().with_het("albino", 100.0, Provenance::GeneticTest));
//! let sire = Animal::new("sire", "ball-python")
//!     .with_genotype(Genotype::new().with_visual("albino"));
//!
//! let snapshot = PopulationSnapshot::new(
//!     "ball-python",
//!     vec![dam, sire],
//!     vec![Locus::recessive("albino")],
//!     EngineConfig::default(),
//! )
//! .unwrap();
//!
//! let report = snapshot.analyze("dam", "sire").unwrap();
//! assert_eq!(report.cross.cells.len(), 2);
//! assert!(report.advisory.is_none());
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod genetics;
pub mod report;
pub mod repository;

pub use config::EngineConfig;
pub use engine::{BreedingEngine, PopulationSnapshot};
pub use error::{EngineError, Result};
pub use report::{AdvisorySeverity, BreedingReport, InbreedingAdvisory};
pub use repository::{AnimalRepository, InMemoryRepository};
