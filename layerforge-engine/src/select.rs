//! `LayerSelector` (spec.md §4.6): maps detected `Issue`s to a minimal,
//! dependency-closed ordered layer list with a confidence score. Grounded
//! on the teacher's `detectors::registry::DetectorRegistry::recommend`-style
//! aggregation, which folds many detectors' findings into one ranked
//! suggestion rather than acting on each in isolation.

use layerforge_core::{dependency_closure, LayerId};

use crate::detect::{Issue, IssueDetector, Severity};

/// `{layers, evidence, confidence, impact_estimate}` (spec.md §3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Recommendation {
    pub layers: Vec<LayerId>,
    pub evidence: Vec<Issue>,
    pub confidence: f64,
    pub impact_estimate: usize,
    pub reasoning: Vec<String>,
}

pub struct LayerSelector<'d> {
    detector: &'d IssueDetector,
}

impl<'d> LayerSelector<'d> {
    pub fn new(detector: &'d IssueDetector) -> Self {
        Self { detector }
    }

    /// Scan `code`, union the issues' layers, close under dependencies,
    /// and score a confidence (spec.md §4.6 steps 1-5).
    pub fn recommend(&self, code: &str) -> Recommendation {
        let issues = self.detector.scan(code);

        let requested: std::collections::BTreeSet<LayerId> =
            issues.iter().map(|issue| issue.layer).collect();
        let (mut closure, auto_added) = dependency_closure(&requested);
        // Step 2: L1 is always included once any layer is included.
        if !closure.is_empty() {
            closure.insert(LayerId::Configuration);
        }

        let total_issues = issues.len();
        let high_severity = issues.iter().filter(|i| i.severity == Severity::High).count();
        let confidence = if total_issues == 0 {
            0.5
        } else {
            (0.6 + 0.3 * (high_severity as f64 / total_issues as f64)).clamp(0.0, 0.9)
        };

        let impact_estimate = issues.iter().map(|issue| issue.occurrences).sum();

        let mut reasoning: Vec<String> = issues
            .iter()
            .map(|issue| {
                format!(
                    "layer {} included: {} ({} occurrence(s))",
                    issue.layer.as_u8(),
                    issue.description,
                    issue.occurrences
                )
            })
            .collect();
        if auto_added.contains(&LayerId::Configuration) || closure.contains(&LayerId::Configuration) {
            if !requested.contains(&LayerId::Configuration) {
                reasoning.push("layer 1 included: always retained alongside any other layer".to_string());
            }
        }
        for dep in &auto_added {
            if *dep != LayerId::Configuration {
                reasoning.push(format!(
                    "layer {} included: dependency of a requested layer",
                    dep.as_u8()
                ));
            }
        }

        Recommendation {
            layers: closure.into_iter().collect(),
            evidence: issues,
            confidence,
            impact_estimate,
            reasoning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entities_recommend_layers_one_and_two() {
        let detector = IssueDetector::new();
        let selector = LayerSelector::new(&detector);
        let rec = selector.recommend(r#"const m = &quot;Hi&quot;;"#);
        assert_eq!(rec.layers, vec![LayerId::Configuration, LayerId::Patterns]);
        assert!(rec.confidence >= 0.6);
        assert!(rec
            .evidence
            .iter()
            .any(|issue| issue.layer == LayerId::Patterns && issue.description.contains("entit")));
    }

    #[test]
    fn no_issues_yields_default_confidence_and_empty_layers() {
        let detector = IssueDetector::new();
        let selector = LayerSelector::new(&detector);
        let rec = selector.recommend("const x: number = 1;\n");
        assert!(rec.layers.is_empty());
        assert_eq!(rec.confidence, 0.5);
    }

    #[test]
    fn map_without_key_closes_under_dependencies() {
        let detector = IssueDetector::new();
        let selector = LayerSelector::new(&detector);
        let code = "function L({items}){return (<ul>{items.map(i => <li>{i.name}</li>)}</ul>);}";
        let rec = selector.recommend(code);
        assert_eq!(
            rec.layers,
            vec![LayerId::Configuration, LayerId::Patterns, LayerId::Components]
        );
    }
}
