//! Offspring odds for a pairing, one Punnett grid per locus, composed across
//! loci under independent assortment.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

use super::genotype::{AllelicState, Genotype, HetTrait, Provenance};
use super::locus::{Dominance, Locus, LocusCatalog, PolygenicOdds};
use super::pedigree::Animal;

/// Default tolerance for the sum-to-one check.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// One allele passed on in a gamete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Allele {
    Normal,
    Mutant,
}

/// One row of a per-locus table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusCell {
    pub genotype: String,
    pub phenotype: String,
    /// Offspring shows the trait.
    pub visual: bool,
    /// Offspring carries at least one copy. Always `false` for polygenic loci.
    pub carrier: bool,
    pub probability: f64,
}

/// Offspring distribution at a single locus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusOutcome {
    pub locus: String,
    pub dominance: Dominance,
    pub cells: Vec<LocusCell>,
    pub rationale: String,
}

impl LocusOutcome {
    /// Probability that an offspring which does not show the trait still
    /// carries it, e.g. 2/3 for a het x het recessive pairing.
    ///
    /// `None` when every offspring is visual.
    pub fn het_odds(&self) -> Option<f64> {
        let hidden: f64 = self
            .cells
            .iter()
            .filter(|c| !c.visual)
            .map(|c| c.probability)
            .sum();
        if hidden <= 0.0 {
            return None;
        }
        let carriers: f64 = self
            .cells
            .iter()
            .filter(|c| !c.visual && c.carrier)
            .map(|c| c.probability)
            .sum();
        Some(carriers / hidden)
    }

    /// The het claim to record on a normal-looking hatchling from this
    /// pairing, if it can carry the trait at all.
    pub fn possible_het(&self) -> Option<HetTrait> {
        let odds = self.het_odds().filter(|&p| p > 0.0)?;
        Some(HetTrait {
            locus: self.locus.clone(),
            percent: (odds * 100.0).min(100.0),
            provenance: Provenance::BreedingOdds,
        })
    }
}

/// One whole-offspring outcome across all tracked loci.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossCell {
    pub genotype: String,
    pub phenotype: String,
    pub probability: f64,
    pub rationale: String,
    /// Loci the offspring visibly expresses.
    pub visual: Vec<String>,
    /// Loci carried without being visible (recessive hets).
    pub het: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossOutcome {
    pub cells: Vec<CrossCell>,
    /// Per-locus marginal tables, in catalog order.
    pub loci: Vec<LocusOutcome>,
    /// Neither parent carries or expresses any tracked locus.
    pub empty: bool,
}

impl CrossOutcome {
    pub fn total_probability(&self) -> f64 {
        self.cells.iter().map(|c| c.probability).sum()
    }

    pub fn locus(&self, name: &str) -> Option<&LocusOutcome> {
        self.loci.iter().find(|l| l.locus == name)
    }

    /// See [`LocusOutcome::het_odds`].
    pub fn het_odds(&self, locus: &str) -> Option<f64> {
        self.locus(locus).and_then(LocusOutcome::het_odds)
    }

    fn no_tracked_traits() -> Self {
        Self {
            cells: vec![CrossCell {
                genotype: "normal".to_string(),
                phenotype: "normal".to_string(),
                probability: 1.0,
                rationale: "Neither parent carries or expresses a tracked trait".to_string(),
                visual: Vec::new(),
                het: Vec::new(),
            }],
            loci: Vec::new(),
            empty: true,
        }
    }
}

/// Punnett-square engine bound to one species' locus catalog.
#[derive(Debug, Clone)]
pub struct CrossCalculator<'a> {
    catalog: &'a LocusCatalog,
    tolerance: f64,
}

impl<'a> CrossCalculator<'a> {
    pub fn new(catalog: &'a LocusCatalog, tolerance: f64) -> Self {
        Self { catalog, tolerance }
    }

    /// Offspring distribution for `a` x `b`.
    ///
    /// Every locus either parent mentions is tracked; the result enumerates
    /// the full cross product of the per-locus tables. Swapping the parents
    /// yields the same cells.
    ///
    /// # Errors
    /// - [`EngineError::SpeciesMismatch`] if the parents (or the catalog)
    ///   belong to different species.
    /// - [`EngineError::UnknownLocus`] if a trait is outside the catalog.
    /// - [`EngineError::InvalidProbability`] for het percentages outside 0-100.
    pub fn cross(&self, a: &Animal, b: &Animal) -> Result<CrossOutcome> {
        if a.species_id != b.species_id {
            return Err(EngineError::SpeciesMismatch {
                left: a.species_id.clone(),
                right: b.species_id.clone(),
            });
        }
        if a.species_id != self.catalog.species_id() {
            return Err(EngineError::SpeciesMismatch {
                left: a.species_id.clone(),
                right: self.catalog.species_id().to_string(),
            });
        }
        self.cross_genotypes(&a.genotype, &b.genotype)
    }

    /// Same as [`CrossCalculator::cross`] for bare genotypes already known to
    /// belong to the catalog's species.
    pub fn cross_genotypes(&self, a: &Genotype, b: &Genotype) -> Result<CrossOutcome> {
        a.validate(self.catalog)?;
        b.validate(self.catalog)?;

        let mut tracked: Vec<&Locus> = a
            .loci()
            .union(&b.loci())
            .map(|name| self.catalog.get(name))
            .collect::<Result<_>>()?;
        tracked.sort_by_key(|locus| self.catalog.position(&locus.name));

        if tracked.is_empty() {
            return Ok(CrossOutcome::no_tracked_traits());
        }

        let loci: Vec<LocusOutcome> = tracked
            .iter()
            .map(|locus| resolve_locus(locus, a.state(&locus.name), b.state(&locus.name)))
            .collect();

        let cells = combine(&loci);
        let outcome = CrossOutcome {
            cells,
            loci,
            empty: false,
        };
        self.check_total(&outcome);
        Ok(outcome)
    }

    fn check_total(&self, outcome: &CrossOutcome) {
        let total = outcome.total_probability();
        let ok = (total - 1.0).abs() <= self.tolerance
            && outcome
                .cells
                .iter()
                .all(|c| (0.0..=1.0).contains(&c.probability));
        if !ok {
            log::error!(
                "Cross probabilities sum to {} over {} cells",
                total,
                outcome.cells.len()
            );
        }
        debug_assert!(ok, "cross outcome sums to {}", total);
    }
}

fn resolve_locus(locus: &Locus, a: AllelicState, b: AllelicState) -> LocusOutcome {
    match locus.dominance {
        Dominance::PolygenicIncomplete(odds) => polygenic_locus(locus, odds, a, b),
        _ => mendelian_locus(locus, a, b),
    }
}

/// Gametes a parent can pass on, with probabilities.
///
/// An uncertain het passes the mutant allele with probability `p / 2`, so
/// doubt about the parent scales the offspring mass instead of being dropped.
fn gametes(state: AllelicState) -> Vec<(Allele, f64)> {
    match state {
        AllelicState::Normal => vec![(Allele::Normal, 1.0)],
        AllelicState::Visual => vec![(Allele::Mutant, 1.0)],
        AllelicState::Het(p) => {
            let t = p * 0.5;
            [(Allele::Mutant, t), (Allele::Normal, 1.0 - t)]
                .into_iter()
                .filter(|&(_, q)| q > 0.0)
                .collect()
        }
    }
}

fn mendelian_locus(locus: &Locus, a: AllelicState, b: AllelicState) -> LocusOutcome {
    let ga = gametes(a);
    let gb = gametes(b);

    // by_copies[k] = probability of k mutant copies.
    let mut by_copies = [0.0f64; 3];
    for &(allele_a, pa) in &ga {
        for &(allele_b, pb) in &gb {
            let copies = [allele_a, allele_b]
                .iter()
                .filter(|&&x| x == Allele::Mutant)
                .count();
            by_copies[copies] += pa * pb;
        }
    }

    let name = &locus.name;
    let cells: Vec<LocusCell> = (0..=2usize)
        .rev()
        .filter(|&k| by_copies[k] > 0.0)
        .map(|k| {
            let (genotype, phenotype, visual) = mendelian_labels(locus.dominance, name, k);
            LocusCell {
                genotype,
                phenotype,
                visual,
                carrier: k > 0,
                probability: by_copies[k],
            }
        })
        .collect();

    let mut dims = [ga.len(), gb.len()];
    dims.sort_unstable_by(|x, y| y.cmp(x));
    let rationale = format!(
        "{} ({}): {}; {}x{} grid",
        name,
        locus.dominance.label(),
        parent_pair(a, b),
        dims[0],
        dims[1]
    );

    LocusOutcome {
        locus: name.clone(),
        dominance: locus.dominance,
        cells,
        rationale,
    }
}

fn mendelian_labels(dominance: Dominance, name: &str, copies: usize) -> (String, String, bool) {
    let normal = || ("normal".to_string(), "normal".to_string(), false);
    match (dominance, copies) {
        (_, 0) => normal(),
        (Dominance::Recessive, 1) => (format!("het {}", name), "normal".to_string(), false),
        (Dominance::Recessive, _) => (format!("visual {}", name), name.to_string(), true),
        (Dominance::CoDominant, 1) => (name.to_string(), name.to_string(), true),
        (Dominance::CoDominant, _) => (format!("super {}", name), format!("super {}", name), true),
        (_, 1) => (format!("het {}", name), name.to_string(), true),
        _ => (format!("homozygous {}", name), name.to_string(), true),
    }
}

fn polygenic_locus(
    locus: &Locus,
    odds: PolygenicOdds,
    a: AllelicState,
    b: AllelicState,
) -> LocusOutcome {
    // Weight that a parent counts as visual for this trait.
    let weight = |state: AllelicState| match state {
        AllelicState::Visual => 1.0,
        AllelicState::Het(p) => p,
        AllelicState::Normal => 0.0,
    };
    let (wa, wb) = (weight(a), weight(b));

    let visual = (wa * wb * odds.both_visual
        + (wa * (1.0 - wb) + (1.0 - wa) * wb) * odds.one_visual
        + (1.0 - wa) * (1.0 - wb) * odds.neither_visual)
        .clamp(0.0, 1.0);

    let name = &locus.name;
    let cells: Vec<LocusCell> = [
        (name.to_string(), name.to_string(), true, visual),
        ("normal".to_string(), "normal".to_string(), false, 1.0 - visual),
    ]
    .into_iter()
    .filter(|&(_, _, _, p)| p > 0.0)
    .map(|(genotype, phenotype, visual, probability)| LocusCell {
        genotype,
        phenotype,
        visual,
        carrier: false,
        probability,
    })
    .collect();

    let rationale = format!(
        "{} (polygenic): {}; configured odds both {} / one {} / neither {}",
        name,
        parent_pair(a, b),
        percent(odds.both_visual),
        percent(odds.one_visual),
        percent(odds.neither_visual)
    );

    LocusOutcome {
        locus: name.clone(),
        dominance: locus.dominance,
        cells,
        rationale,
    }
}

/// Order-independent description of the two parents' states.
fn parent_pair(a: AllelicState, b: AllelicState) -> String {
    let mut pair = [describe_state(a), describe_state(b)];
    pair.sort();
    format!("{} x {}", pair[0], pair[1])
}

fn describe_state(state: AllelicState) -> String {
    match state {
        AllelicState::Normal => "normal".to_string(),
        AllelicState::Visual => "visual".to_string(),
        AllelicState::Het(p) => format!("het {}", percent(p)),
    }
}

fn percent(p: f64) -> String {
    let pct = p * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{}%", pct.round())
    } else {
        format!("{:.1}%", pct)
    }
}

/// Cross product of the per-locus tables.
fn combine(loci: &[LocusOutcome]) -> Vec<CrossCell> {
    // Index tuples over each locus' cells, odometer style.
    let mut combos: Vec<Vec<usize>> = vec![Vec::new()];
    for locus in loci {
        combos = combos
            .into_iter()
            .flat_map(|prefix| {
                (0..locus.cells.len()).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect();
    }

    combos
        .into_iter()
        .map(|combo| {
            let parts: Vec<(&LocusOutcome, &LocusCell)> = loci
                .iter()
                .zip(combo)
                .map(|(locus, i)| (locus, &locus.cells[i]))
                .collect();
            compose_cell(&parts)
        })
        .collect()
}

fn compose_cell(parts: &[(&LocusOutcome, &LocusCell)]) -> CrossCell {
    let probability = parts.iter().map(|(_, c)| c.probability).product::<f64>();

    let join = |labels: Vec<&str>| {
        let shown: Vec<&str> = labels.into_iter().filter(|l| *l != "normal").collect();
        if shown.is_empty() {
            "normal".to_string()
        } else {
            shown.join(" ")
        }
    };
    let genotype = join(parts.iter().map(|(_, c)| c.genotype.as_str()).collect());
    let phenotype = join(parts.iter().map(|(_, c)| c.phenotype.as_str()).collect());

    let visual: BTreeSet<&str> = parts
        .iter()
        .filter(|(_, c)| c.visual)
        .map(|(l, _)| l.locus.as_str())
        .collect();
    let het: BTreeSet<&str> = parts
        .iter()
        .filter(|(_, c)| c.carrier && !c.visual)
        .map(|(l, _)| l.locus.as_str())
        .collect();

    let rationale = parts
        .iter()
        .map(|(l, c)| format!("{} -> {} {}", l.rationale, c.genotype, percent(c.probability)))
        .collect::<Vec<_>>()
        .join("; ");

    CrossCell {
        genotype,
        phenotype,
        probability,
        rationale,
        visual: visual.into_iter().map(str::to_string).collect(),
        het: het.into_iter().map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn catalog() -> LocusCatalog {
        LocusCatalog::new(
            "ball-python",
            vec![
                Locus::recessive("albino"),
                Locus::recessive("pied"),
                Locus::co_dominant("pastel"),
                Locus::dominant("pinstripe"),
                Locus::polygenic("yellowbelly", PolygenicOdds::new(0.75, 0.5, 0.0)),
            ],
        )
        .unwrap()
    }

    fn cross(a: Genotype, b: Genotype) -> CrossOutcome {
        let catalog = catalog();
        CrossCalculator::new(&catalog, PROBABILITY_TOLERANCE)
            .cross_genotypes(&a, &b)
            .unwrap()
    }

    fn het(locus: &str, percent: f64) -> Genotype {
        Genotype::new().with_het(locus, percent, Provenance::GeneticTest)
    }

    #[test]
    fn test_het_x_het_recessive() {
        let out = cross(het("albino", 100.0), het("albino", 100.0));
        let table = out.locus("albino").unwrap();
        let probs: Vec<f64> = table.cells.iter().map(|c| c.probability).collect();
        assert_eq!(probs, vec![0.25, 0.5, 0.25]);
        assert!(table.rationale.contains("2x2 grid"));
        assert_relative_eq!(out.het_odds("albino").unwrap(), 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_visual_x_normal_collapses() {
        let out = cross(Genotype::new().with_visual("albino"), Genotype::new());
        assert_eq!(out.cells.len(), 1);
        assert_eq!(out.cells[0].genotype, "het albino");
        assert_eq!(out.cells[0].phenotype, "normal");
        assert_eq!(out.cells[0].het, vec!["albino"]);
        assert!(out.loci[0].rationale.contains("1x1 grid"));
    }

    #[test]
    fn test_co_dominant_labels() {
        let pastel = Genotype::new().with_het("pastel", 100.0, Provenance::VisualParent);
        let out = cross(pastel.clone(), pastel);
        let labels: Vec<&str> = out.cells.iter().map(|c| c.phenotype.as_str()).collect();
        assert_eq!(labels, vec!["super pastel", "pastel", "normal"]);
        assert_relative_eq!(out.total_probability(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_dominant_single_copy_visual() {
        let out = cross(het("pinstripe", 100.0), Genotype::new());
        let table = out.locus("pinstripe").unwrap();
        assert_eq!(table.cells.len(), 2);
        assert!(table.cells[0].visual);
        assert_relative_eq!(table.cells[0].probability, 0.5);
        assert_eq!(out.het_odds("pinstripe"), Some(0.0));
        assert!(table.possible_het().is_none());
    }

    #[test]
    fn test_polygenic_uses_configured_odds() {
        let out = cross(Genotype::new().with_visual("yellowbelly"), Genotype::new());
        let table = out.locus("yellowbelly").unwrap();
        assert!(table.cells[0].visual);
        assert_relative_eq!(table.cells[0].probability, 0.5);
        assert!(table.rationale.contains("configured odds"));

        let both = cross(
            Genotype::new().with_visual("yellowbelly"),
            Genotype::new().with_visual("yellowbelly"),
        );
        assert_relative_eq!(both.cells[0].probability, 0.75);
    }

    #[test]
    fn test_possible_het_from_breeding_odds() {
        let out = cross(het("pied", 100.0), het("pied", 100.0));
        let claim = out.locus("pied").unwrap().possible_het().unwrap();
        assert_eq!(claim.provenance, Provenance::BreedingOdds);
        assert!(!claim.is_certain());
        assert_relative_eq!(claim.percent, 200.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_cross() {
        let out = cross(Genotype::new(), Genotype::new());
        assert!(out.empty);
        assert_eq!(out.cells.len(), 1);
        assert_eq!(out.cells[0].probability, 1.0);
        assert!(out.loci.is_empty());
    }

    #[test]
    fn test_unknown_locus() {
        let catalog = catalog();
        let calc = CrossCalculator::new(&catalog, PROBABILITY_TOLERANCE);
        let clown = Genotype::new().with_visual("clown");
        let result = calc.cross_genotypes(&clown, &Genotype::new());
        assert!(matches!(result, Err(EngineError::UnknownLocus(_))));
    }

    #[test]
    fn test_species_mismatch() {
        let catalog = catalog();
        let calc = CrossCalculator::new(&catalog, PROBABILITY_TOLERANCE);
        let a = Animal::new("a", "ball-python");
        let b = Animal::new("b", "corn-snake");
        assert!(matches!(calc.cross(&a, &b), Err(EngineError::SpeciesMismatch { .. })));

        let c = Animal::new("c", "corn-snake");
        assert!(matches!(calc.cross(&b, &c), Err(EngineError::SpeciesMismatch { .. })));
    }

    #[test]
    fn test_loci_follow_catalog_order() {
        let a = Genotype::new()
            .with_visual("pastel")
            .with_het("albino", 100.0, Provenance::GeneticTest);
        let out = cross(a, Genotype::new());
        let names: Vec<&str> = out.loci.iter().map(|l| l.locus.as_str()).collect();
        assert_eq!(names, vec!["albino", "pastel"]);
        assert_eq!(out.cells.len(), 2);
        assert_eq!(out.cells[0].genotype, "het albino pastel");
        assert_eq!(out.cells[0].phenotype, "pastel");
    }

    #[test]
    fn test_percent_formatting() {
        assert_eq!(percent(0.5), "50%");
        assert_eq!(percent(2.0 / 3.0), "66.7%");
        assert_eq!(percent(1.0), "100%");
    }
}
