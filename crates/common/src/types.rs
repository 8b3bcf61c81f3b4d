//! Target model shared between the config layer and the collaborator engines.

use std::collections::BTreeMap;

/// Label under which a target's scrape address is stored.
pub const ADDRESS_LABEL: &str = "__address__";

/// A set of label name/value pairs describing one target.
pub type LabelSet = BTreeMap<String, String>;

/// A group of targets that share a common set of labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetGroup {
    /// Per-target label sets. Each entry describes one target.
    pub targets: Vec<LabelSet>,
    /// Labels applied to every target in the group. Per-target labels win
    /// on collision.
    pub labels: LabelSet,
}

impl TargetGroup {
    /// Resolve the group into one label set per target, folding the group
    /// labels under each target's own labels.
    pub fn resolve(&self) -> Vec<LabelSet> {
        self.targets
            .iter()
            .map(|target| {
                let mut resolved = self.labels.clone();
                for (name, value) in target {
                    resolved.insert(name.clone(), value.clone());
                }
                resolved
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> LabelSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn resolve_folds_group_labels_under_targets() {
        let group = TargetGroup {
            targets: vec![
                labels(&[(ADDRESS_LABEL, "a:1")]),
                labels(&[(ADDRESS_LABEL, "b:2"), ("env", "prod")]),
            ],
            labels: labels(&[("env", "dev"), ("dc", "eu")]),
        };

        let resolved = group.resolve();
        assert_eq!(resolved.len(), 2);
        assert_eq!(
            resolved[0],
            labels(&[(ADDRESS_LABEL, "a:1"), ("env", "dev"), ("dc", "eu")])
        );
        // Per-target labels win over group labels.
        assert_eq!(
            resolved[1],
            labels(&[(ADDRESS_LABEL, "b:2"), ("env", "prod"), ("dc", "eu")])
        );
    }
}
