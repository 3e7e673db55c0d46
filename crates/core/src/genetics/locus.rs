use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Inheritance odds for a polygenic / incompletely Mendelian trait.
///
/// Each field is the probability that an offspring is visual, given how many
/// of its parents are visual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygenicOdds {
    pub both_visual: f64,
    pub one_visual: f64,
    pub neither_visual: f64,
}

impl PolygenicOdds {
    pub fn new(both_visual: f64, one_visual: f64, neither_visual: f64) -> Self {
        Self {
            both_visual,
            one_visual,
            neither_visual,
        }
    }

    fn validate(&self, locus: &str) -> Result<()> {
        for (label, p) in [
            ("both_visual", self.both_visual),
            ("one_visual", self.one_visual),
            ("neither_visual", self.neither_visual),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(EngineError::InvalidCatalog(format!(
                    "Locus '{}': {} odds {} outside [0, 1]",
                    locus, label, p
                )));
            }
        }
        Ok(())
    }
}

/// How a locus maps allele copies to a visible phenotype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dominance {
    /// One copy is visual.
    Dominant,
    /// Two copies are required to be visual; one copy is a hidden carrier.
    Recessive,
    /// One copy and two copies ("super") are distinct visual forms.
    CoDominant,
    /// Not cleanly Mendelian; offspring odds come from configuration.
    PolygenicIncomplete(PolygenicOdds),
}

impl Dominance {
    pub fn label(&self) -> &'static str {
        match self {
            Dominance::Dominant => "dominant",
            Dominance::Recessive => "recessive",
            Dominance::CoDominant => "co-dominant",
            Dominance::PolygenicIncomplete(_) => "polygenic",
        }
    }
}

/// A single independently segregating genetic factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locus {
    pub name: String,
    pub dominance: Dominance,
}

impl Locus {
    pub fn new(name: &str, dominance: Dominance) -> Self {
        Self {
            name: name.to_string(),
            dominance,
        }
    }

    pub fn recessive(name: &str) -> Self {
        Self::new(name, Dominance::Recessive)
    }

    pub fn dominant(name: &str) -> Self {
        Self::new(name, Dominance::Dominant)
    }

    pub fn co_dominant(name: &str) -> Self {
        Self::new(name, Dominance::CoDominant)
    }

    pub fn polygenic(name: &str, odds: PolygenicOdds) -> Self {
        Self::new(name, Dominance::PolygenicIncomplete(odds))
    }
}

#[derive(Serialize, Deserialize)]
struct CatalogRecord {
    species_id: String,
    loci: Vec<Locus>,
}

/// The closed set of loci tracked for one species.
///
/// Loci keep their insertion order, which fixes the order of per-locus
/// tables and combined offspring descriptions in cross outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CatalogRecord", into = "CatalogRecord")]
pub struct LocusCatalog {
    species_id: String,
    loci: IndexMap<String, Locus>,
}

impl LocusCatalog {
    /// Build a catalog for `species_id`.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidCatalog`] on duplicate locus names or
    /// polygenic odds outside `[0, 1]`.
    pub fn new(species_id: &str, loci: Vec<Locus>) -> Result<Self> {
        let mut map = IndexMap::with_capacity(loci.len());
        for locus in loci {
            if let Dominance::PolygenicIncomplete(odds) = &locus.dominance {
                odds.validate(&locus.name)?;
            }
            if map.contains_key(&locus.name) {
                return Err(EngineError::InvalidCatalog(format!(
                    "Duplicate locus '{}' for species '{}'",
                    locus.name, species_id
                )));
            }
            map.insert(locus.name.clone(), locus);
        }
        Ok(Self {
            species_id: species_id.to_string(),
            loci: map,
        })
    }

    pub fn species_id(&self) -> &str {
        &self.species_id
    }

    pub fn len(&self) -> usize {
        self.loci.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.loci.contains_key(name)
    }

    /// Look up a locus by name.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownLocus`] if the name is not in the catalog.
    pub fn get(&self, name: &str) -> Result<&Locus> {
        self.loci
            .get(name)
            .ok_or_else(|| EngineError::UnknownLocus(name.to_string()))
    }

    /// Catalog position of a locus, used for stable ordering.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.loci.get_index_of(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locus> {
        self.loci.values()
    }
}

impl TryFrom<CatalogRecord> for LocusCatalog {
    type Error = EngineError;

    fn try_from(record: CatalogRecord) -> Result<Self> {
        LocusCatalog::new(&record.species_id, record.loci)
    }
}

impl From<LocusCatalog> for CatalogRecord {
    fn from(catalog: LocusCatalog) -> Self {
        CatalogRecord {
            species_id: catalog.species_id,
            loci: catalog.loci.into_values().collect(),
        }
    }
}
