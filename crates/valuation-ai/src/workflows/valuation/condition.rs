use super::config::ConditionConfig;
use super::domain::{ConditionAdjustment, ConditionAssessment};

/// Translates a structured condition assessment into a market-perception
/// multiplier and a cost-to-cure estimate. Penalties combine
/// multiplicatively so many minor issues cannot out-penalize one severe
/// issue, and the multiplier never drops below the configured floor.
pub struct ConditionAdjuster {
    config: ConditionConfig,
}

impl ConditionAdjuster {
    pub fn new(config: ConditionConfig) -> Self {
        Self { config }
    }

    /// Absence of an assessment yields the neutral adjustment, flagged
    /// unassessed so reconciliation can lower confidence.
    pub fn adjust(
        &self,
        assessment: Option<&ConditionAssessment>,
        building_age_years: i32,
    ) -> ConditionAdjustment {
        let Some(assessment) = assessment else {
            return ConditionAdjustment::unassessed();
        };

        let raw_multiplier = assessment
            .issues
            .iter()
            .map(|issue| 1.0 - issue.severity.clamp(0.0, 1.0))
            .product::<f64>();
        let multiplier = raw_multiplier.clamp(self.config.multiplier_floor, 1.0);

        let age_complexity =
            1.0 + self.config.age_complexity_per_year * building_age_years.max(0) as f64;
        let cost_to_cure = assessment
            .issues
            .iter()
            .map(|issue| issue.cost_midpoint())
            .sum::<f64>()
            * self.config.regional_cost_index
            * age_complexity;

        ConditionAdjustment {
            multiplier,
            cost_to_cure,
            assessed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::valuation::domain::{ConditionIssue, ConditionSystem, SystemRating};
    use std::collections::BTreeMap;

    fn issue(system: ConditionSystem, severity: f64, low: f64, high: f64) -> ConditionIssue {
        ConditionIssue {
            system,
            severity,
            repair_cost_low: low,
            repair_cost_high: high,
            note: "flagged during inspection".to_string(),
        }
    }

    fn assessment(issues: Vec<ConditionIssue>) -> ConditionAssessment {
        ConditionAssessment {
            ratings: BTreeMap::new(),
            issues,
        }
    }

    #[test]
    fn severe_issues_clamp_to_the_floor() {
        // Structural 0.6 and electrical 0.2 multiply to 0.32, below the
        // default floor of 0.5.
        let assessment = assessment(vec![
            issue(ConditionSystem::Structural, 0.6, 20_000.0, 40_000.0),
            issue(ConditionSystem::Electrical, 0.2, 4_000.0, 8_000.0),
        ]);

        let adjustment =
            ConditionAdjuster::new(ConditionConfig::default()).adjust(Some(&assessment), 0);

        assert_eq!(adjustment.multiplier, 0.5);
        assert!(adjustment.assessed);
    }

    #[test]
    fn minor_issues_stay_above_the_floor() {
        let assessment = assessment(vec![
            issue(ConditionSystem::Hvac, 0.05, 500.0, 1_500.0),
            issue(ConditionSystem::Roof, 0.10, 2_000.0, 6_000.0),
        ]);

        let adjustment =
            ConditionAdjuster::new(ConditionConfig::default()).adjust(Some(&assessment), 0);

        assert!((adjustment.multiplier - 0.95 * 0.90).abs() < 1e-9);
    }

    #[test]
    fn multiplier_is_non_increasing_in_severity() {
        let adjuster = ConditionAdjuster::new(ConditionConfig::default());
        let mut previous = f64::MAX;
        for step in 0..=10 {
            let severity = step as f64 / 10.0;
            let adjustment = adjuster.adjust(
                Some(&assessment(vec![issue(
                    ConditionSystem::Plumbing,
                    severity,
                    1_000.0,
                    2_000.0,
                )])),
                0,
            );
            assert!(adjustment.multiplier <= previous);
            assert!(adjustment.multiplier >= 0.5);
            previous = adjustment.multiplier;
        }
    }

    #[test]
    fn cost_to_cure_applies_regional_index_and_age_complexity() {
        let config = ConditionConfig {
            regional_cost_index: 1.3,
            ..ConditionConfig::default()
        };
        let assessment = assessment(vec![
            issue(ConditionSystem::Roof, 0.1, 8_000.0, 12_000.0),
            issue(ConditionSystem::Plumbing, 0.1, 1_000.0, 3_000.0),
        ]);

        let adjustment = ConditionAdjuster::new(config).adjust(Some(&assessment), 20);

        // Midpoints 10k + 2k, urban index 1.3, 20-year complexity 1.2.
        assert!((adjustment.cost_to_cure - 12_000.0 * 1.3 * 1.2).abs() < 1e-6);
    }

    #[test]
    fn missing_assessment_is_neutral_and_flagged() {
        let adjustment = ConditionAdjuster::new(ConditionConfig::default()).adjust(None, 15);

        assert_eq!(adjustment.multiplier, 1.0);
        assert_eq!(adjustment.cost_to_cure, 0.0);
        assert!(!adjustment.assessed);
    }

    #[test]
    fn clean_assessment_is_neutral_but_assessed() {
        let clean = ConditionAssessment {
            ratings: BTreeMap::from([(ConditionSystem::Structural, SystemRating::Sound)]),
            issues: Vec::new(),
        };

        let adjustment =
            ConditionAdjuster::new(ConditionConfig::default()).adjust(Some(&clean), 10);

        assert_eq!(adjustment.multiplier, 1.0);
        assert_eq!(adjustment.cost_to_cure, 0.0);
        assert!(adjustment.assessed);
        assert_eq!(clean.aggregate_score(), 1.0);
    }
}
