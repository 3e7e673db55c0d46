use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::genetics::genotype::{Genotype, HetTrait, Provenance};
use crate::genetics::locus::LocusCatalog;
use crate::genetics::pedigree::Animal;

/// Read a population from a CSV file.
///
/// Expected columns (header required, case-insensitive): `animal`, `species`,
/// `dam`, `sire`, and optionally `visual` and `het`.
///
/// - Unknown parents are coded as `"0"`, `""`, or `"NA"`.
/// - `visual` lists locus names separated by `;`.
/// - `het` lists `locus:percent[:provenance]` entries separated by `;`. A
///   missing provenance defaults to `visual-parent` for 100% and
///   `breeding-odds` otherwise.
///
/// # Errors
/// Returns an error if the file cannot be read, required columns are missing,
/// or a trait entry is malformed.
///
/// # Examples
/// ```no_run
/// use herp_breeding_core::data::load_population_csv;
///
/// let animals = load_population_csv("collection.csv").unwrap();
/// println!("{} animals", animals.len());
/// ```
pub fn load_population_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Animal>> {
    let file = File::open(path.as_ref())?;
    read_population_csv(BufReader::new(file))
}

/// Same as [`load_population_csv`] for any reader.
pub fn read_population_csv<R: Read>(input: R) -> Result<Vec<Animal>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let required = |name: &str| {
        column(name).ok_or_else(|| EngineError::Data(format!("CSV missing '{}' column", name)))
    };

    let animal_col = required("animal")?;
    let species_col = required("species")?;
    let dam_col = required("dam")?;
    let sire_col = required("sire")?;
    let visual_col = column("visual");
    let het_col = column("het");

    let mut animals = Vec::new();

    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let field = |col: usize| record.get(col).unwrap_or("");

        let id = field(animal_col);
        if id.is_empty() {
            return Err(EngineError::Data(format!("Row {}: empty animal id", row + 1)));
        }

        let mut genotype = Genotype::new();
        if let Some(col) = visual_col {
            for locus in split_list(field(col)) {
                genotype = genotype.with_visual(locus);
            }
        }
        if let Some(col) = het_col {
            for entry in split_list(field(col)) {
                genotype.het_traits.push(parse_het(entry)?);
            }
        }

        animals.push(Animal {
            id: id.to_string(),
            species_id: field(species_col).to_string(),
            dam_id: parse_parent(field(dam_col)),
            sire_id: parse_parent(field(sire_col)),
            genotype,
        });
    }

    log::debug!("Read {} animals from CSV", animals.len());
    Ok(animals)
}

/// Read locus catalogs from a JSON file holding an array of
/// `{"species_id": ..., "loci": [...]}` objects.
///
/// # Errors
/// Returns an error if the file cannot be read or any catalog is invalid.
pub fn load_catalogs_json<P: AsRef<Path>>(path: P) -> Result<Vec<LocusCatalog>> {
    let file = File::open(path.as_ref())?;
    let catalogs: Vec<LocusCatalog> = serde_json::from_reader(BufReader::new(file))?;
    Ok(catalogs)
}

/// Parse a parent string, returning `None` for unknown parents.
///
/// Unknown parents are coded as `"0"`, `""`, `"NA"`, or `"na"`.
fn parse_parent(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "0" || trimmed.eq_ignore_ascii_case("na") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(';').map(str::trim).filter(|x| !x.is_empty())
}

fn parse_het(entry: &str) -> Result<HetTrait> {
    let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
    let (locus, percent, provenance) = match parts.as_slice() {
        [locus, percent] => (*locus, *percent, None),
        [locus, percent, provenance] => (*locus, *percent, Some(*provenance)),
        _ => {
            return Err(EngineError::Data(format!(
                "Het entry '{}' must be locus:percent[:provenance]",
                entry
            )))
        }
    };
    let percent: f64 = percent
        .trim_end_matches('%')
        .parse()
        .map_err(|_| EngineError::Data(format!("Het entry '{}': bad percentage", entry)))?;
    let provenance = match provenance {
        Some(p) => p.parse::<Provenance>()?,
        None if percent >= 100.0 => Provenance::VisualParent,
        None => Provenance::BreedingOdds,
    };
    HetTrait::new(locus, percent, provenance)
}
