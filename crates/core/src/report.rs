use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::genetics::cross::CrossOutcome;
use crate::genetics::relationship::RelationshipResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorySeverity {
    Low,
    Moderate,
    High,
}

/// Informational inbreeding warning. Never blocks a pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InbreedingAdvisory {
    pub coefficient_of_relationship: f64,
    /// Expected inbreeding coefficient (F) of the offspring, r / 2.
    pub projected_inbreeding: f64,
    pub severity: AdvisorySeverity,
    pub message: String,
}

/// Relationship check and cross odds for one candidate pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedingReport {
    pub animal_a: String,
    pub animal_b: String,
    pub relationship: RelationshipResult,
    pub cross: CrossOutcome,
    pub advisory: Option<InbreedingAdvisory>,
}

impl BreedingReport {
    pub fn has_advisory(&self) -> bool {
        self.advisory.is_some()
    }
}

/// Pair a relationship result with a cross outcome.
///
/// An advisory is attached whenever the coefficient of relationship is
/// positive.
pub fn assemble(
    animal_a: &str,
    animal_b: &str,
    relationship: RelationshipResult,
    cross: CrossOutcome,
    config: &EngineConfig,
) -> BreedingReport {
    let advisory = advisory_for(&relationship, config);
    if let Some(adv) = &advisory {
        log::info!("'{}' x '{}': {}", animal_a, animal_b, adv.message);
    }
    BreedingReport {
        animal_a: animal_a.to_string(),
        animal_b: animal_b.to_string(),
        relationship,
        cross,
        advisory,
    }
}

fn advisory_for(
    relationship: &RelationshipResult,
    config: &EngineConfig,
) -> Option<InbreedingAdvisory> {
    let r = relationship.coefficient_of_relationship;
    if r <= 0.0 {
        return None;
    }
    let severity = if r >= config.high_threshold {
        AdvisorySeverity::High
    } else if r >= config.moderate_threshold {
        AdvisorySeverity::Moderate
    } else {
        AdvisorySeverity::Low
    };
    let projected = r / 2.0;
    let message = format!(
        "Pairing is {} (r = {:.4}); offspring inbreeding F = {:.4}",
        relationship.kind.label(),
        r,
        projected
    );
    Some(InbreedingAdvisory {
        coefficient_of_relationship: r,
        projected_inbreeding: projected,
        severity,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::relationship::RelationshipKind;

    fn outcome() -> CrossOutcome {
        CrossOutcome {
            cells: Vec::new(),
            loci: Vec::new(),
            empty: true,
        }
    }

    fn relationship(kind: RelationshipKind, r: f64) -> RelationshipResult {
        RelationshipResult {
            kind,
            common_ancestors: Vec::new(),
            coefficient_of_relationship: r,
        }
    }

    #[test]
    fn test_no_advisory_when_unrelated() {
        let config = EngineConfig::default();
        let report = assemble("a", "b", RelationshipResult::unrelated(), outcome(), &config);
        assert!(!report.has_advisory());
    }

    #[test]
    fn test_advisory_severity_levels() {
        let config = EngineConfig::default();
        let cases = [
            (RelationshipKind::Related, 0.0625, AdvisorySeverity::Low),
            (RelationshipKind::Related, 0.125, AdvisorySeverity::Moderate),
            (RelationshipKind::HalfSiblings, 0.25, AdvisorySeverity::High),
            (RelationshipKind::ParentOffspring, 0.5, AdvisorySeverity::High),
        ];
        for (kind, r, expected) in cases {
            let report = assemble("a", "b", relationship(kind, r), outcome(), &config);
            let adv = report.advisory.unwrap();
            assert_eq!(adv.severity, expected, "r = {}", r);
            assert_eq!(adv.projected_inbreeding, r / 2.0);
        }
    }

    #[test]
    fn test_cross_passed_through() {
        let report = assemble(
            "a",
            "b",
            relationship(RelationshipKind::FullSiblings, 0.5),
            outcome(),
            &EngineConfig::default(),
        );
        assert!(report.cross.empty);
        assert!(report.advisory.unwrap().message.contains("full siblings"));
    }
}
