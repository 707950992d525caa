use super::*;
use crate::{
    model::field::{FieldKind, FieldModel},
    test_support::{self, Asset, Project, Sequence, Shot, Task},
};

static ORPHAN: EntityModel = EntityModel {
    entity_type: "Orphan",
    fields: &[
        FieldModel::PRIMARY_ID,
        FieldModel::relation("owner", FieldKind::Entity, &["Ghost"]),
        FieldModel::relation("links", FieldKind::MultiEntity, &["Project", "Phantom"]),
    ],
};

static PROJECT_AGAIN: EntityModel = EntityModel {
    entity_type: "Project",
    fields: &[FieldModel::PRIMARY_ID],
};

static HEADLESS: EntityModel = EntityModel {
    entity_type: "Headless",
    fields: &[FieldModel::new("code", FieldKind::Text)],
};

#[test]
fn registered_entities_are_looked_up_by_type_name() {
    let schema = test_support::schema();

    assert_eq!(schema.len(), 5);
    assert!(schema.contains("Shot"));
    assert!(!schema.contains("shot"));
    assert_eq!(schema.entity("Task"), Some(Task::MODEL));
    assert_eq!(schema.entity("Version"), None);

    let names: Vec<_> = schema.models().map(|m| m.entity_type).collect();
    assert_eq!(names, ["Asset", "Project", "Sequence", "Shot", "Task"]);
}

#[test]
fn empty_builders_produce_empty_schemas() {
    let schema = Schema::builder().build().unwrap();

    assert!(schema.is_empty());
    assert_eq!(format!("{schema:?}"), "{}");
}

#[test]
fn relation_targets_must_be_registered() {
    let err = Schema::builder()
        .register::<Project>()
        .register::<Asset>()
        .build()
        .unwrap_err();

    assert_eq!(
        err.issues(),
        ["relation 'Asset.shots' targets unregistered entity type 'Shot'"]
    );
}

#[test]
fn duplicate_type_names_are_rejected() {
    let err = Schema::builder()
        .register::<Project>()
        .register_model(&PROJECT_AGAIN)
        .build()
        .unwrap_err();

    assert_eq!(
        err.issues(),
        ["duplicate entity type name 'Project' (registrations #0 and #1)"]
    );
}

#[test]
fn every_issue_is_reported_at_once() {
    let err = Schema::builder()
        .register::<Project>()
        .register_model(&ORPHAN)
        .register_model(&HEADLESS)
        .build()
        .unwrap_err();

    let issues = err.issues();
    assert_eq!(issues.len(), 3, "{issues:?}");
    assert!(issues[0].contains("'Headless' must declare the primary 'id'"));
    assert!(issues.iter().any(|i| i.contains("'Orphan.owner'") && i.contains("'Ghost'")));
    assert!(issues.iter().any(|i| i.contains("'Orphan.links'") && i.contains("'Phantom'")));

    let message = err.to_string();
    assert!(message.starts_with("invalid schema: "));
    assert_eq!(message.matches("; ").count(), 2);
}

#[test]
fn registration_order_does_not_matter() {
    let forward = test_support::schema();
    let backward = Schema::builder()
        .register::<Task>()
        .register::<Shot>()
        .register::<Sequence>()
        .register::<Asset>()
        .register::<Project>()
        .build()
        .unwrap();

    assert_eq!(forward, backward);
}
