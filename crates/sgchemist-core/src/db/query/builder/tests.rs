use super::*;
use crate::{
    db::query::{QueryError, predicate::Predicate},
    test_support::{Asset, Project, Sequence, Shot, Task},
    traits::EntityKind,
};

#[test]
fn descriptors_use_remote_names() {
    assert_eq!(Shot::CODE.name(), "code");
    assert_eq!(Shot::STATUS.name(), "sg_status_list");
    assert_eq!(Shot::CUT_IN.name(), "sg_cut_in");
    assert_eq!(Shot::CODE.model().attr, "code");
    assert!(!Shot::CODE.path().is_relative());
}

#[test]
fn aliases_resolve_to_the_aliased_field() {
    assert_eq!(Shot::ASSET.name(), "entity");
    assert_eq!(Shot::SEQUENCE.path().leaf_name(), "entity");
    assert_eq!(Shot::ASSET.model().attr, "asset");
}

#[test]
fn traversal_builds_dotted_names() {
    let field = Shot::PROJECT.f(&Project::NAME).unwrap();

    assert_eq!(field.name(), "project.Project.name");
    assert!(field.path().is_relative());
    assert_eq!(field.path().root().entity_type, "Shot");
    assert_eq!(field.path().owner().entity_type, "Project");
    assert_eq!(field.path().hops().len(), 1);
}

#[test]
fn traversal_chains_compose() {
    let asset_project = Asset::PROJECT.f(&Project::NAME).unwrap();
    let field = Shot::ENTITY.f(&asset_project).unwrap();

    assert_eq!(field.name(), "entity.Asset.project.Project.name");
    assert_eq!(field.path().hops().len(), 2);
    assert_eq!(field.path().kind(), Project::NAME.path().kind());
}

#[test]
fn traversal_through_an_alias_uses_the_aliased_name() {
    let field = Shot::SEQUENCE.f(&Sequence::CODE).unwrap();

    assert_eq!(field.name(), "entity.Sequence.code");
    assert_eq!(field.path().hops()[0].relation_name(), "entity");
}

#[test]
fn traversal_into_a_non_target_is_rejected() {
    let err = Shot::PROJECT.f(&Asset::CODE).unwrap_err();

    assert_eq!(
        err,
        QueryError::InvalidTarget {
            field: "project".to_string(),
            target: "Asset".to_string(),
        }
    );
}

#[test]
fn join_requires_a_relation() {
    let code = FieldPath::of(Shot::MODEL, "code").unwrap();
    let name = FieldPath::of(Project::MODEL, "name").unwrap();

    assert!(matches!(code.join(&name), Err(QueryError::NotARelation { .. })));
}

#[test]
fn unknown_attributes_are_rejected() {
    let err = FieldPath::of(Task::MODEL, "nope").unwrap_err();

    assert_eq!(
        err,
        QueryError::UnknownField {
            entity_type: "Task",
            field: "nope".to_string(),
        }
    );
}

#[test]
fn traversed_fields_keep_their_operators() {
    let pred = Shot::PROJECT.f(&Project::NAME).unwrap().contains("demo");

    let Predicate::Compare(cmp) = pred else {
        panic!("expected a leaf");
    };
    assert_eq!(cmp.field.name(), "project.Project.name");
    assert_eq!(cmp.field.root().entity_type, Shot::ENTITY_TYPE);
}

#[test]
fn display_matches_remote_name() {
    let field = Task::ENTITY.f(&Shot::CODE).unwrap();

    assert_eq!(field.path().to_string(), "entity.Shot.code");
    assert_eq!(format!("{field:?}"), "Field(\"entity.Shot.code\")");
}
