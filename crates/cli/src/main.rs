use clap::{Parser, Subcommand};
use anyhow::{Context, Result};

use herp_breeding_core as core;
use core::data::{load_catalogs_json, load_population_csv};
use core::genetics::Pedigree;
use core::{BreedingEngine, BreedingReport, EngineConfig, InMemoryRepository};

#[derive(Parser)]
#[command(name = "herpbreed")]
#[command(version)]
#[command(about = "Relationship checks and offspring odds for reptile pairings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a candidate pair and compute its cross odds
    Analyze {
        /// Path to population CSV (columns: animal, species, dam, sire, visual, het)
        #[arg(short, long)]
        animals: String,

        /// Path to JSON locus catalogs (array of {species_id, loci})
        #[arg(short, long)]
        catalog: String,

        /// First animal id
        animal_a: String,

        /// Second animal id
        animal_b: String,

        /// Generations searched for shared ancestry
        #[arg(long, default_value = "3")]
        max_generations: usize,

        /// Allowed deviation of the outcome total from 1
        #[arg(long, default_value = "1e-6")]
        tolerance: f64,

        /// Coefficient of relationship at which the advisory becomes moderate
        #[arg(long, default_value = "0.125")]
        moderate_threshold: f64,

        /// Coefficient of relationship at which the advisory becomes high
        #[arg(long, default_value = "0.25")]
        high_threshold: f64,

        /// Output format: "text" (default) or "json"
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List the recorded ancestors of an animal, nearest first
    Ancestry {
        /// Path to population CSV
        #[arg(short, long)]
        animals: String,

        /// Animal id
        id: String,

        /// Generations to walk
        #[arg(long, default_value = "3")]
        max_generations: usize,
    },

    /// Check a population file for self-parenting and cyclic records
    Validate {
        /// Path to population CSV
        #[arg(short, long)]
        animals: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            animals,
            catalog,
            animal_a,
            animal_b,
            max_generations,
            tolerance,
            moderate_threshold,
            high_threshold,
            format,
        } => {
            let config = EngineConfig::new()
                .max_generations(max_generations)
                .probability_tolerance(tolerance)
                .moderate_threshold(moderate_threshold)
                .high_threshold(high_threshold);
            cmd_analyze(&animals, &catalog, &animal_a, &animal_b, config, &format).await
        }
        Commands::Ancestry {
            animals,
            id,
            max_generations,
        } => cmd_ancestry(&animals, &id, max_generations).await,
        Commands::Validate { animals } => cmd_validate(&animals),
    }
}

fn load_repository(animals_path: &str, catalog_path: Option<&str>) -> Result<InMemoryRepository> {
    let animals = load_population_csv(animals_path)
        .with_context(|| format!("Failed to load animals from '{}'", animals_path))?;
    eprintln!("Loaded {} animals from '{}'", animals.len(), animals_path);

    let catalogs = match catalog_path {
        Some(path) => {
            let catalogs = load_catalogs_json(path)
                .with_context(|| format!("Failed to load locus catalogs from '{}'", path))?;
            eprintln!("Loaded {} locus catalogs from '{}'", catalogs.len(), path);
            catalogs
        }
        None => Vec::new(),
    };

    InMemoryRepository::from_parts(animals, catalogs).context("Failed to index population")
}

async fn cmd_analyze(
    animals_path: &str,
    catalog_path: &str,
    animal_a: &str,
    animal_b: &str,
    config: EngineConfig,
    output_format: &str,
) -> Result<()> {
    config.validate().context("Invalid engine settings")?;
    let repository = load_repository(animals_path, Some(catalog_path))?;
    let engine = BreedingEngine::new(repository, config);

    let report = engine
        .analyze_cross(animal_a, animal_b)
        .await
        .with_context(|| format!("Failed to analyze '{}' x '{}'", animal_a, animal_b))?;

    match output_format.to_lowercase().as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => print_text(&report),
        other => anyhow::bail!("Unknown format '{}'. Use 'text' (default) or 'json'.", other),
    }

    Ok(())
}

fn print_text(report: &BreedingReport) {
    let rel = &report.relationship;
    println!("Pairing: {} x {}", report.animal_a, report.animal_b);
    println!("Relationship: {}", rel.kind.label());
    println!("Coefficient of relationship: {:.4}", rel.coefficient_of_relationship);
    if !rel.common_ancestors.is_empty() {
        println!("Common ancestors: {}", rel.common_ancestors.join(", "));
    }
    if let Some(adv) = &report.advisory {
        println!(
            "Advisory ({:?}): {} (projected F = {:.4})",
            adv.severity, adv.message, adv.projected_inbreeding
        );
    }

    println!();
    if report.cross.empty {
        println!("No tracked traits on either parent; all offspring normal.");
        return;
    }
    println!("{:>8}  {:<40} {}", "Odds", "Genotype", "Phenotype");
    for cell in &report.cross.cells {
        println!(
            "{:>7.2}%  {:<40} {}",
            100.0 * cell.probability,
            cell.genotype,
            cell.phenotype
        );
    }

    for locus in &report.cross.loci {
        if let Some(het) = locus.possible_het() {
            println!(
                "Normal-looking offspring: {:.1}% possible het {}",
                het.percent, het.locus
            );
        }
    }
}

async fn cmd_ancestry(animals_path: &str, id: &str, max_generations: usize) -> Result<()> {
    let repository = load_repository(animals_path, None)?;
    let engine = BreedingEngine::new(repository, EngineConfig::default());

    let ancestors = engine
        .ancestry(id, max_generations)
        .await
        .with_context(|| format!("Failed to walk ancestry of '{}'", id))?;

    if ancestors.is_empty() {
        println!("'{}' has no recorded ancestors", id);
        return Ok(());
    }

    println!("Ancestors of '{}' ({} found):", id, ancestors.len());
    for animal in &ancestors {
        println!(
            "  {:<16} dam: {:<16} sire: {}",
            animal.id,
            animal.dam_id.as_deref().unwrap_or("-"),
            animal.sire_id.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn cmd_validate(animals_path: &str) -> Result<()> {
    let animals = load_population_csv(animals_path)
        .with_context(|| format!("Failed to load animals from '{}'", animals_path))?;
    let n = animals.len();

    let pedigree = Pedigree::from_animals(animals).context("Failed to build pedigree")?;
    pedigree.validate().context("Pedigree check failed")?;

    println!("Pedigree OK: {} animals", n);
    Ok(())
}
