use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

use super::locus::{Dominance, LocusCatalog};

/// Where a het claim came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// One parent was visual for the trait.
    VisualParent,
    /// Confirmed by a lab test.
    GeneticTest,
    /// Inferred from cross odds (e.g. "66% possible het").
    BreedingOdds,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provenance::VisualParent => "visual-parent",
            Provenance::GeneticTest => "genetic-test",
            Provenance::BreedingOdds => "breeding-odds",
        };
        f.write_str(s)
    }
}

impl FromStr for Provenance {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "visual-parent" => Ok(Provenance::VisualParent),
            "genetic-test" => Ok(Provenance::GeneticTest),
            "breeding-odds" => Ok(Provenance::BreedingOdds),
            other => Err(EngineError::Data(format!(
                "Unknown het provenance '{}'",
                other
            ))),
        }
    }
}

/// A (possibly uncertain) claim that an animal carries one copy of a trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HetTrait {
    pub locus: String,
    /// Probability of carrying, in percent (0-100).
    pub percent: f64,
    pub provenance: Provenance,
}

impl HetTrait {
    /// Create a het claim, rejecting percentages outside `[0, 100]`.
    pub fn new(locus: &str, percent: f64, provenance: Provenance) -> Result<Self> {
        let het = Self {
            locus: locus.to_string(),
            percent,
            provenance,
        };
        het.check_range()?;
        Ok(het)
    }

    fn check_range(&self) -> Result<()> {
        if (0.0..=100.0).contains(&self.percent) {
            Ok(())
        } else {
            Err(EngineError::InvalidProbability {
                locus: self.locus.clone(),
                percent: self.percent,
            })
        }
    }

    /// Only a full 100% claim counts as a confirmed carrier.
    pub fn is_certain(&self) -> bool {
        self.percent >= 100.0
    }

    /// Carrier probability as a fraction in `[0, 1]`.
    pub fn probability(&self) -> f64 {
        self.percent / 100.0
    }
}

/// Allelic state of one animal at one locus, as far as it is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AllelicState {
    /// No copies.
    Normal,
    /// One copy with the given probability, otherwise none.
    Het(f64),
    /// Two copies.
    Visual,
}

/// An animal's recorded trait state across loci.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Genotype {
    #[serde(default)]
    pub visual_traits: BTreeSet<String>,
    #[serde(default)]
    pub het_traits: Vec<HetTrait>,
}

impl Genotype {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visual(mut self, locus: &str) -> Self {
        self.visual_traits.insert(locus.to_string());
        self
    }

    /// Add a het claim. The percentage is range-checked by [`Genotype::validate`].
    pub fn with_het(mut self, locus: &str, percent: f64, provenance: Provenance) -> Self {
        self.het_traits.push(HetTrait {
            locus: locus.to_string(),
            percent,
            provenance,
        });
        self
    }

    /// Whether no trait is recorded at all.
    pub fn is_empty(&self) -> bool {
        self.visual_traits.is_empty() && self.het_traits.is_empty()
    }

    /// Every locus name this genotype mentions.
    pub fn loci(&self) -> BTreeSet<&str> {
        self.visual_traits
            .iter()
            .map(String::as_str)
            .chain(self.het_traits.iter().map(|h| h.locus.as_str()))
            .collect()
    }

    /// Resolve the allelic state at `locus`.
    ///
    /// A visual entry wins over het entries. With several het claims for the
    /// same locus the most confident one is used.
    pub fn state(&self, locus: &str) -> AllelicState {
        if self.visual_traits.contains(locus) {
            return AllelicState::Visual;
        }
        self.het_traits
            .iter()
            .filter(|h| h.locus == locus)
            .map(HetTrait::probability)
            .fold(None, |best: Option<f64>, p| Some(best.map_or(p, |b| b.max(p))))
            .map_or(AllelicState::Normal, AllelicState::Het)
    }

    /// Check every referenced locus against `catalog` and every het
    /// percentage against `[0, 100]`.
    pub fn validate(&self, catalog: &LocusCatalog) -> Result<()> {
        for name in self.loci() {
            catalog.get(name)?;
        }
        for het in &self.het_traits {
            het.check_range()?;
        }
        Ok(())
    }
}

/// Traits an animal visibly expresses, given the dominance rules of `catalog`.
///
/// Uncertain het claims never count as expressed, even for dominant or
/// co-dominant loci.
///
/// # Errors
/// Returns [`EngineError::UnknownLocus`] if the genotype references a locus
/// outside the catalog.
pub fn expressed_traits(genotype: &Genotype, catalog: &LocusCatalog) -> Result<BTreeSet<String>> {
    let mut expressed = BTreeSet::new();
    for name in genotype.loci() {
        let locus = catalog.get(name)?;
        let shows = match (locus.dominance, genotype.state(name)) {
            (_, AllelicState::Visual) => true,
            (Dominance::Dominant | Dominance::CoDominant, AllelicState::Het(p)) => p >= 1.0,
            _ => false,
        };
        if shows {
            expressed.insert(name.to_string());
        }
    }
    Ok(expressed)
}
