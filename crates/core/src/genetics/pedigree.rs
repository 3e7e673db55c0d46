use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

use super::genotype::Genotype;

/// Generations searched when the caller does not say otherwise.
pub const DEFAULT_MAX_GENERATIONS: usize = 3;

/// An animal as supplied by the data layer.
///
/// Parent references are ids only; the referenced animals may be missing
/// from the population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: String,
    pub species_id: String,
    #[serde(default)]
    pub dam_id: Option<String>,
    #[serde(default)]
    pub sire_id: Option<String>,
    #[serde(default)]
    pub genotype: Genotype,
}

impl Animal {
    pub fn new(id: &str, species_id: &str) -> Self {
        Self {
            id: id.to_string(),
            species_id: species_id.to_string(),
            dam_id: None,
            sire_id: None,
            genotype: Genotype::default(),
        }
    }

    pub fn with_dam(mut self, dam_id: &str) -> Self {
        self.dam_id = Some(dam_id.to_string());
        self
    }

    pub fn with_sire(mut self, sire_id: &str) -> Self {
        self.sire_id = Some(sire_id.to_string());
        self
    }

    pub fn with_genotype(mut self, genotype: Genotype) -> Self {
        self.genotype = genotype;
        self
    }

    /// Whether `other_id` is recorded as this animal's dam or sire.
    pub fn is_child_of(&self, other_id: &str) -> bool {
        self.dam_id.as_deref() == Some(other_id) || self.sire_id.as_deref() == Some(other_id)
    }
}

/// An ancestor found by [`Pedigree::ancestors_of`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ancestor {
    pub id: String,
    /// 1 = parent, 2 = grandparent, ...
    pub generation: usize,
}

#[derive(Debug, Clone)]
struct PedigreeRecord {
    animal: Animal,
    /// Index of the dam in the records vector, or `None` if unknown.
    dam: Option<usize>,
    /// Index of the sire in the records vector, or `None` if unknown.
    sire: Option<usize>,
}

/// In-memory ancestor index over a population snapshot.
///
/// Animals are stored in an arena and addressed by contiguous 0-based
/// indices. Parent references that do not resolve to an animal in the
/// population, or that point at the animal itself, are stored as `None`.
#[derive(Debug, Clone, Default)]
pub struct Pedigree {
    records: Vec<PedigreeRecord>,
    id_to_index: HashMap<String, usize>,
}

impl Pedigree {
    /// Create an empty pedigree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of animals in the pedigree.
    pub fn n_animals(&self) -> usize {
        self.records.len()
    }

    /// Look up the 0-based index of an animal by its id.
    pub fn animal_index(&self, id: &str) -> Option<usize> {
        self.id_to_index.get(id).copied()
    }

    /// Animal stored at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn animal(&self, index: usize) -> &Animal {
        &self.records[index].animal
    }

    /// Look up an animal by id.
    ///
    /// # Errors
    /// Returns [`EngineError::AnimalNotFound`] if the id is not in the pedigree.
    pub fn animal_by_id(&self, id: &str) -> Result<&Animal> {
        self.animal_index(id)
            .map(|i| self.animal(i))
            .ok_or_else(|| EngineError::AnimalNotFound(id.to_string()))
    }

    /// Dam index for the animal at `index`, or `None` if unknown.
    pub fn dam(&self, index: usize) -> Option<usize> {
        self.records[index].dam
    }

    /// Sire index for the animal at `index`, or `None` if unknown.
    pub fn sire(&self, index: usize) -> Option<usize> {
        self.records[index].sire
    }

    /// Add an animal to the pedigree.
    ///
    /// Parents are resolved only if they were added before this animal. Use
    /// [`Pedigree::from_animals`] when input order is arbitrary.
    ///
    /// # Errors
    /// Returns an error if the animal id already exists.
    pub fn add_animal(&mut self, animal: Animal) -> Result<()> {
        if self.id_to_index.contains_key(&animal.id) {
            return Err(EngineError::Pedigree(format!(
                "Duplicate animal ID: '{}'",
                animal.id
            )));
        }

        let index = self.records.len();
        let dam = self.resolve_parent(&animal, animal.dam_id.as_deref(), "dam");
        let sire = self.resolve_parent(&animal, animal.sire_id.as_deref(), "sire");

        self.id_to_index.insert(animal.id.clone(), index);
        self.records.push(PedigreeRecord { animal, dam, sire });
        Ok(())
    }

    /// Build a pedigree from a population in any order.
    ///
    /// # Errors
    /// Returns an error if duplicate animal ids are found.
    pub fn from_animals<I>(animals: I) -> Result<Self>
    where
        I: IntoIterator<Item = Animal>,
    {
        let mut ped = Self::new();

        // First pass: register all animals so parent lookups can succeed
        // regardless of input order.
        for animal in animals {
            if ped.id_to_index.contains_key(&animal.id) {
                return Err(EngineError::Pedigree(format!(
                    "Duplicate animal ID: '{}'",
                    animal.id
                )));
            }
            ped.id_to_index.insert(animal.id.clone(), ped.records.len());
            ped.records.push(PedigreeRecord {
                animal,
                dam: None,
                sire: None,
            });
        }

        // Second pass: resolve parent indices.
        for i in 0..ped.records.len() {
            let animal = &ped.records[i].animal;
            let dam = ped.resolve_parent(animal, animal.dam_id.as_deref(), "dam");
            let sire = ped.resolve_parent(animal, animal.sire_id.as_deref(), "sire");
            ped.records[i].dam = dam;
            ped.records[i].sire = sire;
        }

        Ok(ped)
    }

    fn resolve_parent(&self, animal: &Animal, parent: Option<&str>, role: &str) -> Option<usize> {
        let parent = parent?;
        if parent == animal.id {
            log::warn!("Animal '{}' is listed as its own {}; ignoring", animal.id, role);
            return None;
        }
        self.animal_index(parent)
    }

    /// Ancestors of `id` up to `max_generations`, nearest first.
    ///
    /// The walk is depth-first, dam before sire at every level. An ancestor
    /// reached again at the same or a more distant generation is not
    /// re-descended, so malformed cyclic data terminates. Each ancestor is
    /// reported once, at its nearest generation; ties keep the dam-first
    /// discovery order of the path that reached it at that generation. The
    /// animal itself is never part of its ancestor set.
    ///
    /// # Errors
    /// Returns [`EngineError::AnimalNotFound`] if `id` is not in the pedigree.
    pub fn ancestors_of(&self, id: &str, max_generations: usize) -> Result<Vec<Ancestor>> {
        let start = self
            .animal_index(id)
            .ok_or_else(|| EngineError::AnimalNotFound(id.to_string()))?;
        Ok(self
            .ancestor_indices(start, max_generations)
            .into_iter()
            .map(|(index, generation)| Ancestor {
                id: self.records[index].animal.id.clone(),
                generation,
            })
            .collect())
    }

    /// Index-level form of [`Pedigree::ancestors_of`]: `(index, generation)`
    /// pairs, nearest first.
    pub fn ancestor_indices(&self, start: usize, max_generations: usize) -> Vec<(usize, usize)> {
        // index -> (nearest generation, discovery sequence)
        let mut seen: HashMap<usize, (usize, usize)> = HashMap::new();
        let mut stack: Vec<(usize, usize)> = Vec::new();
        let mut sequence = 0usize;

        if max_generations > 0 {
            self.push_parents(start, 1, &mut stack);
        }

        while let Some((node, generation)) = stack.pop() {
            if node == start {
                continue;
            }
            match seen.get(&node) {
                Some(&(nearest, _)) if nearest <= generation => continue,
                // First visit, or reached again closer: the new path decides
                // where it sorts among its generation.
                _ => {
                    seen.insert(node, (generation, sequence));
                    sequence += 1;
                }
            }
            if generation < max_generations {
                self.push_parents(node, generation + 1, &mut stack);
            }
        }

        let mut found: Vec<(usize, usize, usize)> = seen
            .into_iter()
            .map(|(node, (generation, seq))| (node, generation, seq))
            .collect();
        found.sort_by_key(|&(_, generation, seq)| (generation, seq));

        log::debug!(
            "Collected {} ancestors of '{}' within {} generations",
            found.len(),
            self.records[start].animal.id,
            max_generations
        );

        found
            .into_iter()
            .map(|(node, generation, _)| (node, generation))
            .collect()
    }

    /// Push parents so that the dam is popped first.
    fn push_parents(&self, node: usize, generation: usize, stack: &mut Vec<(usize, usize)>) {
        let rec = &self.records[node];
        if let Some(s) = rec.sire {
            stack.push((s, generation));
        }
        if let Some(d) = rec.dam {
            stack.push((d, generation));
        }
    }

    /// Rank of every animal, parents ranked before their offspring.
    ///
    /// Animals on or below a parentage cycle have no such rank; they follow
    /// every other animal, in index order.
    pub fn birth_order(&self) -> Vec<usize> {
        let n = self.records.len();
        let (order, _) = self.parents_first();
        let mut rank = vec![usize::MAX; n];
        let mut next = 0usize;
        for node in order.into_iter().chain(0..n) {
            if rank[node] == usize::MAX {
                rank[node] = next;
                next += 1;
            }
        }
        rank
    }

    /// Kahn's algorithm over parent -> offspring edges.
    ///
    /// Returns the processed animals in order plus the remaining in-degrees.
    /// Animals left with a non-zero in-degree sit on or below a cycle.
    fn parents_first(&self) -> (Vec<usize>, Vec<u32>) {
        let n = self.records.len();
        let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0u32; n];

        for (i, rec) in self.records.iter().enumerate() {
            for parent in [rec.dam, rec.sire].into_iter().flatten() {
                children_of[parent].push(i);
                in_degree[i] += 1;
            }
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(node) = queue.pop() {
            order.push(node);
            for &child in &children_of[node] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    queue.push(child);
                }
            }
        }

        (order, in_degree)
    }

    /// Validate the raw parent references for consistency.
    ///
    /// Checks:
    /// - No animal lists itself as dam or sire.
    /// - No animal is its own ancestor (cycle detection).
    ///
    /// Analyses never call this; traversal tolerates both problems. It is
    /// meant for data-quality reporting.
    ///
    /// # Errors
    /// Returns an error describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        for rec in &self.records {
            let animal = &rec.animal;
            if animal.dam_id.as_deref() == Some(animal.id.as_str()) {
                return Err(EngineError::Pedigree(format!(
                    "Animal '{}' is listed as its own dam",
                    animal.id
                )));
            }
            if animal.sire_id.as_deref() == Some(animal.id.as_str()) {
                return Err(EngineError::Pedigree(format!(
                    "Animal '{}' is listed as its own sire",
                    animal.id
                )));
            }
        }

        // If not every animal can be processed parents-first, there is a cycle.
        let n = self.records.len();
        let (order, in_degree) = self.parents_first();

        if order.len() != n {
            let stuck: Vec<&str> = (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.records[i].animal.id.as_str())
                .collect();
            return Err(EngineError::Pedigree(format!(
                "Pedigree contains a cycle involving: {}",
                stuck.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animal(id: &str, dam: Option<&str>, sire: Option<&str>) -> Animal {
        let mut a = Animal::new(id, "ball-python");
        a.dam_id = dam.map(str::to_string);
        a.sire_id = sire.map(str::to_string);
        a
    }

    /// Three-generation pedigree:
    ///
    /// ```text
    ///   GD1  GS1   GD2  GS2
    ///     \  /       \  /
    ///      D          S
    ///       \        /
    ///          X
    /// ```
    fn three_generations() -> Pedigree {
        Pedigree::from_animals(vec![
            animal("X", Some("D"), Some("S")),
            animal("D", Some("GD1"), Some("GS1")),
            animal("S", Some("GD2"), Some("GS2")),
            animal("GD1", None, None),
            animal("GS1", None, None),
            animal("GD2", None, None),
            animal("GS2", None, None),
        ])
        .unwrap()
    }

    fn ids(ancestors: &[Ancestor]) -> Vec<&str> {
        ancestors.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_from_animals_resolves_any_order() {
        let ped = three_generations();
        assert_eq!(ped.n_animals(), 7);
        let x = ped.animal_index("X").unwrap();
        assert_eq!(ped.dam(x), ped.animal_index("D"));
        assert_eq!(ped.sire(x), ped.animal_index("S"));
        assert_eq!(ped.dam(ped.animal_index("GD1").unwrap()), None);
    }

    #[test]
    fn test_ancestors_dam_first_by_generation() {
        let ped = three_generations();
        let anc = ped.ancestors_of("X", 3).unwrap();
        assert_eq!(ids(&anc), vec!["D", "S", "GD1", "GS1", "GD2", "GS2"]);
        assert_eq!(anc[0].generation, 1);
        assert_eq!(anc[5].generation, 2);
    }

    #[test]
    fn test_ancestors_generation_bound() {
        let ped = three_generations();
        assert_eq!(ids(&ped.ancestors_of("X", 1).unwrap()), vec!["D", "S"]);
        assert!(ped.ancestors_of("X", 0).unwrap().is_empty());
    }

    #[test]
    fn test_missing_parent_ends_branch() {
        let ped = Pedigree::from_animals(vec![
            animal("A", Some("ghost"), Some("S")),
            animal("S", None, None),
        ])
        .unwrap();
        assert_eq!(ped.dam(0), None);
        assert_eq!(ids(&ped.ancestors_of("A", 3).unwrap()), vec!["S"]);
    }

    #[test]
    fn test_nearest_generation_reported_once() {
        // P is both A's sire and A's maternal grandsire.
        let ped = Pedigree::from_animals(vec![
            animal("A", Some("D"), Some("P")),
            animal("D", None, Some("P")),
            animal("P", None, None),
        ])
        .unwrap();
        let anc = ped.ancestors_of("A", 3).unwrap();
        assert_eq!(
            anc,
            vec![
                Ancestor { id: "D".into(), generation: 1 },
                Ancestor { id: "P".into(), generation: 1 },
            ]
        );
    }

    #[test]
    fn test_cycle_terminates() {
        // B and C are each other's parents; A descends from B.
        let ped = Pedigree::from_animals(vec![
            animal("A", Some("B"), None),
            animal("B", Some("C"), None),
            animal("C", None, Some("B")),
        ])
        .unwrap();
        let anc = ped.ancestors_of("A", 10).unwrap();
        assert_eq!(ids(&anc), vec!["B", "C"]);

        let rank = ped.birth_order();
        let mut sorted = rank.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn test_cycle_through_self_excluded() {
        let ped = Pedigree::from_animals(vec![
            animal("A", Some("B"), None),
            animal("B", None, Some("A")),
        ])
        .unwrap();
        assert_eq!(ids(&ped.ancestors_of("A", 5).unwrap()), vec!["B"]);
    }

    #[test]
    fn test_self_reference_dropped() {
        let ped = Pedigree::from_animals(vec![animal("A", Some("A"), None)]).unwrap();
        assert_eq!(ped.dam(0), None);
        assert!(ped.ancestors_of("A", 3).unwrap().is_empty());

        let msg = format!("{}", ped.validate().unwrap_err());
        assert!(msg.contains("own dam"), "Error was: {}", msg);
    }

    #[test]
    fn test_validate_detects_cycle() {
        let ped = Pedigree::from_animals(vec![
            animal("B", Some("C"), None),
            animal("C", None, Some("B")),
        ])
        .unwrap();
        let msg = format!("{}", ped.validate().unwrap_err());
        assert!(msg.contains("cycle"), "Error was: {}", msg);
        assert!(three_generations().validate().is_ok());
    }

    #[test]
    fn test_closer_path_reorders_within_generation() {
        // SD is the sire's dam, and also reached first as the dam's dam's dam.
        let ped = Pedigree::from_animals(vec![
            animal("X", Some("D"), Some("S")),
            animal("D", Some("DD"), Some("DS")),
            animal("S", Some("SD"), Some("SS")),
            animal("DD", Some("SD"), None),
            animal("DS", None, None),
            animal("SD", None, None),
            animal("SS", None, None),
        ])
        .unwrap();
        let anc = ped.ancestors_of("X", 3).unwrap();
        assert_eq!(ids(&anc), vec!["D", "S", "DD", "DS", "SD", "SS"]);
        assert!(anc.iter().skip(2).all(|a| a.generation == 2));
    }

    #[test]
    fn test_birth_order_parents_first() {
        let ped = three_generations();
        let rank = ped.birth_order();
        for i in 0..ped.n_animals() {
            for parent in [ped.dam(i), ped.sire(i)].into_iter().flatten() {
                assert!(rank[parent] < rank[i]);
            }
        }
    }

    #[test]
    fn test_duplicate_animal_id() {
        let result = Pedigree::from_animals(vec![animal("1", None, None), animal("1", None, None)]);
        let msg = format!("{}", result.unwrap_err());
        assert!(msg.contains("Duplicate"), "Error was: {}", msg);
    }

    #[test]
    fn test_add_animal_incremental() {
        let mut ped = Pedigree::new();
        ped.add_animal(animal("S1", None, None)).unwrap();
        ped.add_animal(animal("D1", None, None)).unwrap();
        ped.add_animal(animal("O1", Some("D1"), Some("S1"))).unwrap();

        let idx = ped.animal_index("O1").unwrap();
        assert_eq!(ped.sire(idx), Some(0));
        assert_eq!(ped.dam(idx), Some(1));
        assert!(ped.add_animal(animal("O1", None, None)).is_err());
    }

    #[test]
    fn test_unknown_animal() {
        let ped = three_generations();
        assert!(matches!(
            ped.ancestors_of("nobody", 3),
            Err(EngineError::AnimalNotFound(_))
        ));
    }
}
