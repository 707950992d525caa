//! Schema validation orchestration.

use crate::model::entity::EntityModel;
use std::collections::BTreeMap;

/// Run full schema validation in a staged, deterministic order.
pub(crate) fn validate_schema(models: &[&'static EntityModel]) -> Vec<String> {
    // Phase 1: per-entity declaration checks.
    let mut issues: Vec<String> = models.iter().flat_map(|m| m.validate()).collect();

    // Phase 2: schema-wide invariants.
    validate_entity_naming(models, &mut issues);
    validate_relation_targets(models, &mut issues);

    issues
}

fn validate_entity_naming(models: &[&'static EntityModel], issues: &mut Vec<String>) {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();

    for (i, model) in models.iter().enumerate() {
        if let Some(prev) = seen.insert(model.entity_type, i) {
            issues.push(format!(
                "duplicate entity type name '{}' (registrations #{prev} and #{i})",
                model.entity_type
            ));
        }
    }
}

fn validate_relation_targets(models: &[&'static EntityModel], issues: &mut Vec<String>) {
    let registered = |name: &str| models.iter().any(|m| m.entity_type == name);

    for model in models {
        for field in model.fields.iter().filter(|f| f.kind.is_relation()) {
            for target in field.targets.iter().filter(|t| !registered(**t)) {
                issues.push(format!(
                    "relation '{}.{}' targets unregistered entity type '{target}'",
                    model.entity_type, field.attr
                ));
            }
        }
    }
}
