// Genetics module
// Genotype model, pedigree graph, relationship classifier, cross calculator

pub mod cross;
pub mod genotype;
pub mod locus;
pub mod pedigree;
pub mod relationship;

pub use cross::{CrossCalculator, CrossCell, CrossOutcome, LocusCell, LocusOutcome};
pub use genotype::{expressed_traits, AllelicState, Genotype, HetTrait, Provenance};
pub use locus::{Dominance, Locus, LocusCatalog, PolygenicOdds};
pub use pedigree::{Ancestor, Animal, Pedigree, DEFAULT_MAX_GENERATIONS};
pub use relationship::{classify, RelationshipKind, RelationshipResult};
