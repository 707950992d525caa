use super::*;
use crate::{
    test_support::{Asset, Project, Sequence, Shot, Task},
    traits::EntityKind,
};

fn field(model: &'static EntityModel, attr: &str) -> &'static FieldModel {
    model.field(attr).unwrap()
}

fn loaded_shot(values: Vec<(&str, Value)>) -> Record {
    Record::loaded(
        Shot::MODEL,
        1,
        values.into_iter().map(|(attr, v)| (field(Shot::MODEL, attr), v)),
    )
}

// ---- construction ----

#[test]
fn new_records_start_with_kind_defaults() {
    let shot = Shot::new();

    assert_eq!(shot.id(), None);
    assert_eq!(shot.code().unwrap(), None);
    assert_eq!(shot.status().unwrap().as_deref(), Some("wtg"));
    assert_eq!(shot.tasks().unwrap(), Some(Vec::new()));
    assert_eq!(shot.project().unwrap(), None);
    assert!(!shot.record().is_committed());
}

#[test]
fn new_records_snapshot_their_defaults() {
    let record = Record::new(Project::MODEL);

    let attrs: Vec<_> = record.modified_values().iter().map(|(f, _)| f.attr).collect();

    assert!(attrs.is_empty());
    assert_eq!(
        record
            .available_values()
            .iter()
            .map(|(f, _)| f.attr)
            .collect::<Vec<_>>(),
        ["name", "archived"]
    );
}

#[test]
fn loaded_records_only_expose_fetched_fields() {
    let record = loaded_shot(vec![("code", Value::from("sh010"))]);

    assert_eq!(record.id(), Some(1));
    assert_eq!(record.get("code").unwrap(), Value::from("sh010"));
    assert!(record.is_available("code"));
    assert!(!record.is_available("status"));
    assert_eq!(
        record.get("status").unwrap_err(),
        EntityError::MissingField {
            entity_type: "Shot",
            field: "status",
        }
    );
    assert!(!record.is_modified());
}

#[test]
fn unknown_attributes_are_rejected() {
    let record = Record::new(Task::MODEL);

    assert!(matches!(
        record.get("nope"),
        Err(EntityError::UnknownField { field, .. }) if field == "nope"
    ));
    assert!(record.set("nope", Value::Null).is_err());
    assert!(!record.is_available("nope"));
}

// ---- aliases ----

#[test]
fn aliases_read_through_when_the_target_matches() {
    let asset = EntityRef::new("Asset", 3);
    let record = loaded_shot(vec![("entity", Value::Entity(asset.clone()))]);
    let shot = Shot::from_record(record);

    assert_eq!(shot.asset().unwrap(), Some(asset));
    assert_eq!(shot.sequence().unwrap(), None);
    assert!(shot.record().is_available("asset"));
}

#[test]
fn aliases_follow_the_availability_of_their_relation() {
    let shot = Shot::from_record(loaded_shot(vec![]));

    assert!(matches!(
        shot.asset(),
        Err(EntityError::MissingField { field: "entity", .. })
    ));
}

#[test]
fn aliases_and_the_primary_field_are_read_only() {
    let record = Record::new(Shot::MODEL);

    assert_eq!(
        record.set("asset", Value::Null).unwrap_err(),
        EntityError::ReadOnlyField {
            entity_type: "Shot",
            field: "asset",
        }
    );
    assert!(matches!(
        record.set("id", Value::Int(5)),
        Err(EntityError::ReadOnlyField { field: "id", .. })
    ));
}

// ---- writes ----

#[test]
fn set_checks_the_value_kind() {
    let shot = Shot::new();

    let err = shot.record().set("cut_in", Value::from("ten")).unwrap_err();
    assert_eq!(
        err,
        EntityError::InvalidValue {
            entity_type: "Shot",
            field: "cut_in",
            kind: FieldKind::Number,
            value: "text",
        }
    );
    assert_eq!(
        err.to_string(),
        "field 'cut_in' of 'Shot' (number) cannot hold a text value"
    );
    assert_eq!(shot.cut_in().unwrap(), None);
}

#[test]
fn set_checks_relation_targets() {
    let shot = Shot::new();

    let err = shot
        .set_entity(EntityRef::new("Project", 1))
        .unwrap_err();
    assert!(matches!(err, EntityError::InvalidTarget { ref target, .. } if target == "Project"));

    let err = shot
        .set_assets(vec![EntityRef::new("Asset", 1), EntityRef::new("Task", 2)])
        .unwrap_err();
    assert!(matches!(err, EntityError::InvalidTarget { ref target, .. } if target == "Task"));

    shot.set_entity(EntityRef::new("Sequence", 1)).unwrap();
    assert_eq!(shot.sequence().unwrap(), Some(EntityRef::new("Sequence", 1)));
}

#[test]
fn clearing_a_multi_relation_yields_an_empty_list() {
    let shot = Shot::new();
    shot.set_tasks(vec![EntityRef::new("Task", 1)]).unwrap();

    shot.set_tasks(None).unwrap();

    assert_eq!(shot.tasks().unwrap(), Some(Vec::new()));
}

#[test]
fn setting_an_unqueried_field_makes_it_available() {
    let record = loaded_shot(vec![("code", Value::from("sh010"))]);

    record.set("description", Value::from("wide")).unwrap();

    assert_eq!(record.get("description").unwrap(), Value::from("wide"));
    let modified: Vec<_> = record.modified_values().iter().map(|(f, _)| f.attr).collect();
    assert_eq!(modified, ["description"]);
}

#[test]
fn modified_values_track_differences_from_the_snapshot() {
    let shot = Shot::from_record(loaded_shot(vec![
        ("code", Value::from("sh010")),
        ("cut_in", Value::Int(1001)),
    ]));

    shot.set_code("sh011".to_string()).unwrap();
    shot.set_cut_in(1001).unwrap();

    let modified = shot.record().modified_values();
    assert_eq!(modified.len(), 1);
    assert_eq!(modified[0].0.attr, "code");
    assert_eq!(modified[0].1, Value::from("sh011"));

    // Writing the original value back clears the modification.
    shot.set_code("sh010".to_string()).unwrap();
    assert!(!shot.record().is_modified());
}

#[test]
fn float_fields_compare_loosely_with_integers() {
    let record = loaded_shot(vec![("frame_rate", Value::Int(24))]);

    record.set("frame_rate", Value::Float(24.0)).unwrap();

    assert!(!record.is_modified());
}

#[test]
fn with_setters_chain() {
    let asset = Asset::new()
        .with_code("hero".to_string())
        .and_then(|a| a.with_project(EntityRef::new("Project", 1)))
        .unwrap();

    assert_eq!(asset.code().unwrap().as_deref(), Some("hero"));
    assert_eq!(asset.project().unwrap().map(|p| p.id), Some(1));
}

// ---- identity ----

#[test]
fn clones_share_state() {
    let a = Sequence::new();
    let b = a.clone();

    b.set_code("sq02".to_string()).unwrap();

    assert_eq!(a.code().unwrap().as_deref(), Some("sq02"));
    assert!(a.same_instance(&b));
    assert!(!a.same_instance(&Sequence::new()));
}

#[test]
fn references_require_an_identity() {
    let project = Project::new();

    assert_eq!(
        project.to_ref().unwrap_err(),
        EntityError::RelationshipNotCommitted {
            entity_type: "Project",
        }
    );

    let loaded = Record::loaded(Project::MODEL, 4, []);
    assert_eq!(loaded.to_ref().unwrap(), EntityRef::new("Project", 4));
}

// ---- synchronization ----

#[test]
fn reconcile_assigns_identity_and_snapshots() {
    let shot = Shot::new();
    shot.set_code("sh040".to_string()).unwrap();
    assert!(shot.record().is_modified());

    shot.record().reconcile(
        Some(40),
        [(field(Shot::MODEL, "cut_in"), Value::Int(1))],
    );

    assert_eq!(shot.id(), Some(40));
    assert_eq!(shot.cut_in().unwrap(), Some(1));
    assert_eq!(shot.code().unwrap().as_deref(), Some("sh040"));
    assert!(!shot.record().is_modified());
}

#[test]
fn reconcile_ignores_the_primary_field_in_values() {
    let record = loaded_shot(vec![]);

    record.reconcile(None, [(field(Shot::MODEL, "id"), Value::Int(9))]);

    assert_eq!(record.id(), Some(1));
}

#[test]
fn refresh_keeps_local_edits() {
    let record = loaded_shot(vec![
        ("code", Value::from("sh010")),
        ("description", Value::from("old")),
    ]);
    record.set("code", Value::from("local")).unwrap();

    record.refresh([
        (field(Shot::MODEL, "code"), Value::from("remote")),
        (field(Shot::MODEL, "description"), Value::from("new")),
        (field(Shot::MODEL, "cut_in"), Value::Int(7)),
    ]);

    assert_eq!(record.get("code").unwrap(), Value::from("local"));
    assert_eq!(record.get("description").unwrap(), Value::from("new"));
    assert_eq!(record.get("cut_in").unwrap(), Value::Int(7));
}

#[test]
fn unit_of_work_flags() {
    let record = Record::new(Task::MODEL);

    record.set_pending_delete(true);
    assert!(record.is_pending_delete());

    record.mark_deleted();
    assert!(!record.is_pending_delete());
    assert!(record.is_deleted());
    assert!(!record.is_pending_add());
}

#[test]
fn debug_lists_available_fields() {
    let record = Record::loaded(
        Project::MODEL,
        2,
        [(field(Project::MODEL, "name"), Value::from("Demo"))],
    );

    let out = format!("{record:?}");

    assert!(out.starts_with("Project {"));
    assert!(out.contains("name"));
    assert!(!out.contains("archived"));
}
