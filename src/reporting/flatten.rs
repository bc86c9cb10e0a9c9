use crate::models::{FlatRow, PolicyViolationReport};

pub const POLICY_ACTION_PREFIX: &str = "Security-";
pub const CONDITION_SEPARATOR: &str = " | ";

/// Flatten one policy-violation report into one row per
/// (component, violation, constraint), in source order.
///
/// A violation without constraints contributes no rows. The conditions of a
/// constraint are joined into a single field.
pub fn flatten_report(
    report: &PolicyViolationReport,
    application: &str,
    organization: &str,
) -> Vec<FlatRow> {
    let mut rows = Vec::new();

    for component in &report.components {
        for violation in &component.violations {
            // `as` truncates toward zero
            let threat = violation.policy_threat_level as i64;
            let policy_action = format!("{}{}", POLICY_ACTION_PREFIX, threat);

            for constraint in &violation.constraints {
                let condition = constraint
                    .conditions
                    .iter()
                    .map(|c| c.condition_summary.as_str())
                    .collect::<Vec<_>>()
                    .join(CONDITION_SEPARATOR);

                rows.push(FlatRow {
                    application: application.to_string(),
                    organization: organization.to_string(),
                    policy: violation.policy_name.clone(),
                    format: component.format().to_string(),
                    component: component.display_name.clone(),
                    threat,
                    policy_action: policy_action.clone(),
                    constraint_name: constraint.constraint_name.clone(),
                    condition,
                    cve: String::new(),
                });
            }
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Component, ComponentIdentifier, Condition, Constraint, Violation};

    fn constraint(name: &str, summaries: &[&str]) -> Constraint {
        Constraint {
            constraint_name: name.to_string(),
            conditions: summaries
                .iter()
                .map(|s| Condition { condition_summary: s.to_string() })
                .collect(),
        }
    }

    fn component(name: &str, format: &str, violations: Vec<Violation>) -> Component {
        Component {
            display_name: name.to_string(),
            component_identifier: ComponentIdentifier { format: format.to_string() },
            violations,
        }
    }

    #[test]
    fn test_single_constraint_row() {
        let report = PolicyViolationReport {
            components: vec![component(
                "libX",
                "pypi",
                vec![Violation {
                    policy_name: "Security-Medium".into(),
                    policy_threat_level: 7.0,
                    constraints: vec![constraint("Medium risk CVSS score", &["a", "b"])],
                }],
            )],
        };

        let rows = flatten_report(&report, "pub-1", "Acme");
        assert_eq!(
            rows,
            vec![FlatRow {
                application: "pub-1".into(),
                organization: "Acme".into(),
                policy: "Security-Medium".into(),
                format: "pypi".into(),
                component: "libX".into(),
                threat: 7,
                policy_action: "Security-7".into(),
                constraint_name: "Medium risk CVSS score".into(),
                condition: "a | b".into(),
                cve: String::new(),
            }]
        );
    }

    #[test]
    fn test_threat_level_truncates() {
        let report = PolicyViolationReport {
            components: vec![component(
                "c",
                "maven",
                vec![Violation {
                    policy_name: "p".into(),
                    policy_threat_level: 9.8,
                    constraints: vec![constraint("k", &[])],
                }],
            )],
        };
        let rows = flatten_report(&report, "a", "o");
        assert_eq!(rows[0].threat, 9);
        assert_eq!(rows[0].policy_action, "Security-9");
        assert_eq!(rows[0].condition, "");
    }

    #[test]
    fn test_violation_without_constraints_yields_nothing() {
        let report = PolicyViolationReport {
            components: vec![
                component(
                    "c1",
                    "npm",
                    vec![Violation {
                        policy_name: "License".into(),
                        policy_threat_level: 3.0,
                        constraints: vec![],
                    }],
                ),
                component("c2", "npm", vec![]),
            ],
        };
        assert!(flatten_report(&report, "a", "o").is_empty());
    }

    #[test]
    fn test_source_order_preserved() {
        let report = PolicyViolationReport {
            components: vec![
                component(
                    "first",
                    "npm",
                    vec![
                        Violation {
                            policy_name: "p1".into(),
                            policy_threat_level: 1.0,
                            constraints: vec![constraint("k1", &["x"]), constraint("k2", &["y"])],
                        },
                        Violation {
                            policy_name: "p2".into(),
                            policy_threat_level: 2.0,
                            constraints: vec![constraint("k3", &["z"])],
                        },
                    ],
                ),
                component(
                    "second",
                    "maven",
                    vec![Violation {
                        policy_name: "p3".into(),
                        policy_threat_level: 3.0,
                        constraints: vec![constraint("k4", &["w"])],
                    }],
                ),
            ],
        };

        let names: Vec<_> = flatten_report(&report, "a", "o")
            .into_iter()
            .map(|r| (r.component, r.policy, r.constraint_name))
            .collect();
        assert_eq!(
            names,
            vec![
                ("first".to_string(), "p1".to_string(), "k1".to_string()),
                ("first".to_string(), "p1".to_string(), "k2".to_string()),
                ("first".to_string(), "p2".to_string(), "k3".to_string()),
                ("second".to_string(), "p3".to_string(), "k4".to_string()),
            ]
        );
    }
}
