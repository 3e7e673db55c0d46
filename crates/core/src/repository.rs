use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::{EngineError, Result};
use crate::genetics::locus::{Locus, LocusCatalog};
use crate::genetics::pedigree::Animal;

/// Source of animals and locus catalogs.
///
/// Implementations wrap whatever storage the application uses. Transport or
/// storage failures should surface as [`EngineError::DataUnavailable`], the
/// only error callers may retry.
#[async_trait]
pub trait AnimalRepository: Send + Sync {
    /// A single animal by id.
    ///
    /// Implementors return [`EngineError::AnimalNotFound`] for unknown ids.
    async fn fetch_animal(&self, animal_id: &str) -> Result<Animal>;

    /// Every animal of a species.
    async fn fetch_population(&self, species_id: &str) -> Result<Vec<Animal>>;

    /// Loci tracked for a species. An empty list means no traits are tracked.
    async fn fetch_locus_catalog(&self, species_id: &str) -> Result<Vec<Locus>>;
}

/// Repository over data already held in memory.
///
/// Used by the CLI after loading files, and by tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    animals: IndexMap<String, Animal>,
    catalogs: HashMap<String, Vec<Locus>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a population and its catalogs.
    ///
    /// # Errors
    /// Returns an error on duplicate animal ids.
    pub fn from_parts(animals: Vec<Animal>, catalogs: Vec<LocusCatalog>) -> Result<Self> {
        let mut repo = Self::new();
        for animal in animals {
            repo.insert_animal(animal)?;
        }
        for catalog in catalogs {
            repo.insert_catalog(catalog);
        }
        Ok(repo)
    }

    /// # Errors
    /// Returns an error if the id is already present.
    pub fn insert_animal(&mut self, animal: Animal) -> Result<()> {
        if self.animals.contains_key(&animal.id) {
            return Err(EngineError::Pedigree(format!(
                "Duplicate animal ID: '{}'",
                animal.id
            )));
        }
        self.animals.insert(animal.id.clone(), animal);
        Ok(())
    }

    /// Replace the catalog for the catalog's species.
    pub fn insert_catalog(&mut self, catalog: LocusCatalog) {
        let species = catalog.species_id().to_string();
        self.catalogs.insert(species, catalog.iter().cloned().collect());
    }

    pub fn n_animals(&self) -> usize {
        self.animals.len()
    }
}

#[async_trait]
impl AnimalRepository for InMemoryRepository {
    async fn fetch_animal(&self, animal_id: &str) -> Result<Animal> {
        self.animals
            .get(animal_id)
            .cloned()
            .ok_or_else(|| EngineError::AnimalNotFound(animal_id.to_string()))
    }

    async fn fetch_population(&self, species_id: &str) -> Result<Vec<Animal>> {
        Ok(self
            .animals
            .values()
            .filter(|a| a.species_id == species_id)
            .cloned()
            .collect())
    }

    async fn fetch_locus_catalog(&self, species_id: &str) -> Result<Vec<Locus>> {
        Ok(self.catalogs.get(species_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> InMemoryRepository {
        InMemoryRepository::from_parts(
            vec![
                Animal::new("bp1", "ball-python"),
                Animal::new("cs1", "corn-snake"),
                Animal::new("bp2", "ball-python"),
            ],
            vec![LocusCatalog::new("ball-python", vec![Locus::recessive("albino")]).unwrap()],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_population_by_species() {
        let repo = repo();
        let pop = repo.fetch_population("ball-python").await.unwrap();
        let ids: Vec<&str> = pop.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["bp1", "bp2"]);
    }

    #[tokio::test]
    async fn test_fetch_missing_animal() {
        let result = repo().fetch_animal("nope").await;
        assert!(matches!(result, Err(EngineError::AnimalNotFound(_))));
    }

    #[tokio::test]
    async fn test_catalog_lookup() {
        let repo = repo();
        assert_eq!(repo.fetch_locus_catalog("ball-python").await.unwrap().len(), 1);
        assert!(repo.fetch_locus_catalog("corn-snake").await.unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_insert() {
        let mut repo = repo();
        assert!(repo.insert_animal(Animal::new("bp1", "ball-python")).is_err());
        assert_eq!(repo.n_animals(), 3);
    }
}
