use indexmap::IndexMap;
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::genetics::cross::CrossCalculator;
use crate::genetics::locus::{Locus, LocusCatalog};
use crate::genetics::pedigree::{Animal, Pedigree};
use crate::genetics::relationship::classify;
use crate::report::{assemble, BreedingReport};
use crate::repository::AnimalRepository;

/// Immutable view of one species' population and locus catalog.
///
/// All analysis happens here, synchronously. A snapshot is `Sync`, so many
/// pairs can be analysed against it in parallel.
#[derive(Debug, Clone)]
pub struct PopulationSnapshot {
    pedigree: Pedigree,
    catalog: LocusCatalog,
    config: EngineConfig,
}

impl PopulationSnapshot {
    /// # Errors
    /// Returns an error for duplicate animal ids or an invalid catalog.
    pub fn new(
        species_id: &str,
        animals: Vec<Animal>,
        loci: Vec<Locus>,
        config: EngineConfig,
    ) -> Result<Self> {
        let catalog = LocusCatalog::new(species_id, loci)?;
        let pedigree = Pedigree::from_animals(animals)?;
        Ok(Self {
            pedigree,
            catalog,
            config,
        })
    }

    pub fn pedigree(&self) -> &Pedigree {
        &self.pedigree
    }

    pub fn catalog(&self) -> &LocusCatalog {
        &self.catalog
    }

    /// Relationship check plus cross odds for `a` x `b`.
    pub fn analyze(&self, a: &str, b: &str) -> Result<BreedingReport> {
        let relationship = classify(&self.pedigree, a, b, self.config.max_generations)?;
        let animal_a = self.pedigree.animal_by_id(a)?;
        let animal_b = self.pedigree.animal_by_id(b)?;
        let cross = CrossCalculator::new(&self.catalog, self.config.probability_tolerance)
            .cross(animal_a, animal_b)?;
        Ok(assemble(a, b, relationship, cross, &self.config))
    }

    /// Analyse independent pairs in parallel. Results keep input order; one
    /// failing pair does not affect the others.
    pub fn analyze_many(&self, pairs: &[(String, String)]) -> Vec<Result<BreedingReport>> {
        pairs
            .par_iter()
            .map(|(a, b)| self.analyze(a, b))
            .collect()
    }

    /// Ancestor records of `id`, nearest first.
    pub fn ancestry(&self, id: &str, max_generations: usize) -> Result<Vec<Animal>> {
        self.pedigree
            .ancestors_of(id, max_generations)?
            .into_iter()
            .map(|anc| self.pedigree.animal_by_id(&anc.id).cloned())
            .collect()
    }
}

/// Entry point for callers: fetches data through an [`AnimalRepository`]
/// and runs analyses on a fresh snapshot.
pub struct BreedingEngine<R> {
    repository: R,
    config: EngineConfig,
}

impl<R: AnimalRepository> BreedingEngine<R> {
    pub fn new(repository: R, config: EngineConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Fetch a species' population and catalog once.
    pub async fn snapshot(&self, species_id: &str) -> Result<PopulationSnapshot> {
        let animals = self.repository.fetch_population(species_id).await?;
        let loci = self.repository.fetch_locus_catalog(species_id).await?;
        log::debug!(
            "Snapshot for '{}': {} animals, {} loci",
            species_id,
            animals.len(),
            loci.len()
        );
        PopulationSnapshot::new(species_id, animals, loci, self.config.clone())
    }

    /// Classify the pair and compute cross odds.
    ///
    /// # Errors
    /// Propagates repository failures unchanged; see
    /// [`crate::genetics::classify`] and [`CrossCalculator::cross`] for the
    /// analysis errors.
    pub async fn analyze_cross(&self, a: &str, b: &str) -> Result<BreedingReport> {
        let species = self.pair_species(a, b).await?;
        self.snapshot(&species).await?.analyze(a, b)
    }

    /// Ancestor records of `animal_id` for pedigree display.
    pub async fn ancestry(&self, animal_id: &str, max_generations: usize) -> Result<Vec<Animal>> {
        let animal = self.repository.fetch_animal(animal_id).await?;
        self.snapshot(&animal.species_id)
            .await?
            .ancestry(animal_id, max_generations)
    }

    /// Analyse many pairs, fetching each species' data once.
    ///
    /// Returns one result per input pair, in input order.
    pub async fn analyze_batch(&self, pairs: &[(String, String)]) -> Vec<Result<BreedingReport>> {
        let mut results: Vec<Option<Result<BreedingReport>>> = pairs.iter().map(|_| None).collect();
        let mut by_species: IndexMap<String, Vec<usize>> = IndexMap::new();

        for (i, (a, b)) in pairs.iter().enumerate() {
            match self.pair_species(a, b).await {
                Ok(species) => by_species.entry(species).or_default().push(i),
                Err(e) => results[i] = Some(Err(e)),
            }
        }

        for (species, indices) in by_species {
            match self.snapshot(&species).await {
                Ok(snapshot) => {
                    let group: Vec<(String, String)> =
                        indices.iter().map(|&i| pairs[i].clone()).collect();
                    for (i, report) in indices.into_iter().zip(snapshot.analyze_many(&group)) {
                        results[i] = Some(report);
                    }
                }
                Err(e) => {
                    log::warn!("Could not load species '{}': {}", species, e);
                    for i in indices {
                        results[i] = Some(Err(e.clone()));
                    }
                }
            }
        }

        results.into_iter().flatten().collect()
    }

    async fn pair_species(&self, a: &str, b: &str) -> Result<String> {
        let animal_a = self.repository.fetch_animal(a).await?;
        let animal_b = self.repository.fetch_animal(b).await?;
        if animal_a.species_id != animal_b.species_id {
            return Err(EngineError::SpeciesMismatch {
                left: animal_a.species_id,
                right: animal_b.species_id,
            });
        }
        if animal_a.id == animal_b.id {
            return Err(EngineError::InvalidPair(animal_a.id));
        }
        Ok(animal_a.species_id)
    }
}
