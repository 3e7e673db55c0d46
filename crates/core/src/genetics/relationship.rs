use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

use super::pedigree::{Animal, Pedigree};

/// Biological relationship between two candidate breeders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Unrelated,
    ParentOffspring,
    FullSiblings,
    HalfSiblings,
    /// Shares an ancestor within the search depth, or one animal is a more
    /// distant ancestor of the other.
    Related,
    /// Not classified. [`classify`] never produces this; it exists for
    /// callers that record pairs they could not analyse.
    Unknown,
}

impl RelationshipKind {
    pub fn label(&self) -> &'static str {
        match self {
            RelationshipKind::Unrelated => "unrelated",
            RelationshipKind::ParentOffspring => "parent/offspring",
            RelationshipKind::FullSiblings => "full siblings",
            RelationshipKind::HalfSiblings => "half siblings",
            RelationshipKind::Related => "related",
            RelationshipKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipResult {
    pub kind: RelationshipKind,
    /// Shared ancestors, nearest first from the first animal's side.
    pub common_ancestors: Vec<String>,
    /// Coefficient of relationship in `[0, 1]`; zero exactly when unrelated.
    pub coefficient_of_relationship: f64,
}

impl RelationshipResult {
    fn new(kind: RelationshipKind, common_ancestors: Vec<String>, coefficient: f64) -> Self {
        Self {
            kind,
            common_ancestors,
            coefficient_of_relationship: coefficient,
        }
    }

    pub fn unrelated() -> Self {
        Self::new(RelationshipKind::Unrelated, Vec::new(), 0.0)
    }

    pub fn is_related(&self) -> bool {
        self.coefficient_of_relationship > 0.0
    }
}

/// Classify the relationship between animals `a` and `b`.
///
/// Checks run in order and the first match wins:
///
/// 1. different species → [`EngineError::SpeciesMismatch`]
/// 2. same animal → [`EngineError::InvalidPair`]
/// 3. one is the other's dam or sire → parent/offspring, r = 0.5
/// 4. same dam and same sire → full siblings, r = 0.5; exactly one shared
///    parent → half siblings, r = 0.25
/// 5. shared ancestry within `max_generations` → related, r summed by path
///    counting
/// 6. otherwise unrelated, r = 0
///
/// Missing parent records are never evidence of relation.
///
/// # Errors
/// Returns [`EngineError::AnimalNotFound`] if either id is not in the
/// pedigree, plus the errors listed above.
pub fn classify(
    pedigree: &Pedigree,
    a: &str,
    b: &str,
    max_generations: usize,
) -> Result<RelationshipResult> {
    let animal_a = pedigree.animal_by_id(a)?;
    let animal_b = pedigree.animal_by_id(b)?;

    if animal_a.species_id != animal_b.species_id {
        return Err(EngineError::SpeciesMismatch {
            left: animal_a.species_id.clone(),
            right: animal_b.species_id.clone(),
        });
    }
    if animal_a.id == animal_b.id {
        return Err(EngineError::InvalidPair(animal_a.id.clone()));
    }

    if animal_a.is_child_of(&animal_b.id) || animal_b.is_child_of(&animal_a.id) {
        return Ok(RelationshipResult::new(
            RelationshipKind::ParentOffspring,
            Vec::new(),
            0.5,
        ));
    }

    if let Some(result) = sibling_check(animal_a, animal_b) {
        return Ok(result);
    }

    Ok(extended_relation(pedigree, a, b, max_generations))
}

fn sibling_check(a: &Animal, b: &Animal) -> Option<RelationshipResult> {
    let shared = |x: &Option<String>, y: &Option<String>| match (x, y) {
        (Some(x), Some(y)) if x == y => Some(x.clone()),
        _ => None,
    };
    let dam = shared(&a.dam_id, &b.dam_id);
    let sire = shared(&a.sire_id, &b.sire_id);

    match (dam, sire) {
        (Some(d), Some(s)) => Some(RelationshipResult::new(
            RelationshipKind::FullSiblings,
            vec![d, s],
            0.5,
        )),
        (Some(p), None) | (None, Some(p)) => Some(RelationshipResult::new(
            RelationshipKind::HalfSiblings,
            vec![p],
            0.25,
        )),
        (None, None) => None,
    }
}

/// Path-counting relationship over the bounded ancestor sets.
///
/// For every ancestor X shared by both sides (each animal counts as its own
/// generation-0 ancestor, so direct lineage is covered), every pair of upward
/// paths A→X and B→X that meet only at X contributes 0.5^(gA + gB). The sum
/// is evaluated with the tabular recursion in [`PathSum`], not by listing
/// paths.
fn extended_relation(
    pedigree: &Pedigree,
    a: &str,
    b: &str,
    max_generations: usize,
) -> RelationshipResult {
    // Both ids were resolved by the caller.
    let (ia, ib) = match (pedigree.animal_index(a), pedigree.animal_index(b)) {
        (Some(ia), Some(ib)) => (ia, ib),
        _ => return RelationshipResult::unrelated(),
    };

    let mut side_a = vec![(ia, 0usize)];
    side_a.extend(pedigree.ancestor_indices(ia, max_generations));
    let side_b: HashMap<usize, usize> = std::iter::once((ib, 0usize))
        .chain(pedigree.ancestor_indices(ib, max_generations))
        .collect();

    let common: Vec<(usize, usize, usize)> = side_a
        .iter()
        .filter_map(|&(idx, ga)| side_b.get(&idx).map(|&gb| (idx, ga, gb)))
        .collect();

    if common.is_empty() {
        return RelationshipResult::unrelated();
    }

    let mut coefficient = PathSum::new(pedigree, max_generations).relation(ia, 0, ib, 0);
    if coefficient <= 0.0 {
        // Only cyclic records lack a birth order to meet on; fall back to
        // the nearest shared ancestor.
        log::warn!(
            "'{}' x '{}': cyclic pedigree, using nearest shared ancestor",
            a,
            b
        );
        coefficient = common
            .iter()
            .map(|&(_, ga, gb)| 0.5f64.powi((ga + gb) as i32))
            .fold(0.0, f64::max);
    }

    let common_ancestors: Vec<String> = common
        .iter()
        .map(|&(idx, _, _)| pedigree.animal(idx).id.clone())
        .collect();

    log::debug!(
        "'{}' x '{}': {} common ancestors, r = {}",
        a,
        b,
        common_ancestors.len(),
        coefficient
    );

    RelationshipResult::new(
        RelationshipKind::Related,
        common_ancestors,
        coefficient.min(1.0),
    )
}

/// Memoised additive-relationship recursion over the bounded ancestor graph.
///
/// `relation(x, gx, y, gy)` is 1 when both walks stand on the same animal.
/// Otherwise the walk on the younger animal steps to its dam and sire, each
/// worth one half; ancestors of the older animal can never reach the younger
/// one, so meeting points are never stepped over. `gx` and `gy` count the
/// steps taken from each starting animal, capped at `max_generations`.
struct PathSum<'a> {
    pedigree: &'a Pedigree,
    rank: Vec<usize>,
    max_generations: usize,
    memo: HashMap<(usize, usize, usize, usize), f64>,
}

impl<'a> PathSum<'a> {
    fn new(pedigree: &'a Pedigree, max_generations: usize) -> Self {
        Self {
            pedigree,
            rank: pedigree.birth_order(),
            max_generations,
            memo: HashMap::new(),
        }
    }

    fn relation(&mut self, x: usize, gx: usize, y: usize, gy: usize) -> f64 {
        if x == y {
            return 1.0;
        }
        if let Some(&value) = self.memo.get(&(x, gx, y, gy)) {
            return value;
        }

        let value = if self.rank[x] > self.rank[y] {
            self.step_up(x, gx, |sum, parent| sum.relation(parent, gx + 1, y, gy))
        } else {
            self.step_up(y, gy, |sum, parent| sum.relation(x, gx, parent, gy + 1))
        };

        self.memo.insert((x, gx, y, gy), value);
        value
    }

    /// Half the relation through each known parent of `node`, or 0 once the
    /// walk has used up its generations.
    fn step_up<F>(&mut self, node: usize, steps: usize, mut through: F) -> f64
    where
        F: FnMut(&mut Self, usize) -> f64,
    {
        if steps >= self.max_generations {
            return 0.0;
        }
        let parents = [self.pedigree.dam(node), self.pedigree.sire(node)];
        let mut total = 0.0;
        for parent in parents.into_iter().flatten() {
            total += 0.5 * through(self, parent);
        }
        total
    }
}
