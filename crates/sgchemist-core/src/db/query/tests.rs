use super::*;
use crate::test_support::{Asset, Project, Sequence, Shot, Task};
use serde_json::json;

fn attrs(query: &QueryData) -> Vec<&'static str> {
    query.fields.iter().map(|f| f.attr).collect()
}

#[test]
fn select_projects_every_stored_field() {
    let query = select::<Asset>();
    let data = query.data();

    assert_eq!(attrs(data), ["id", "code", "description", "project", "shots"]);
    assert_eq!(data.limit, None);
    assert_eq!(data.page, None);
    assert!(!data.retired_only);
    assert!(data.include_archived_projects);
    assert!(data.predicate.is_none());
}

#[test]
fn select_skips_aliases() {
    let fields = attrs(select::<Shot>().data());

    assert!(fields.contains(&"entity"));
    assert!(!fields.contains(&"asset"));
    assert!(!fields.contains(&"sequence"));
}

#[test]
fn only_keeps_the_primary_field_first() {
    let query = select::<Shot>()
        .only([Shot::STATUS.path(), Shot::CODE.path()])
        .unwrap();

    assert_eq!(attrs(query.data()), ["id", "status", "code"]);
}

#[test]
fn only_maps_aliases_and_dedups() {
    let query = select::<Shot>()
        .only([Shot::ASSET, Shot::SEQUENCE, Shot::ENTITY])
        .unwrap();

    assert_eq!(attrs(query.data()), ["id", "entity"]);
}

#[test]
fn only_rejects_relation_paths_and_foreign_fields() {
    let relative = Shot::PROJECT.f(&Project::NAME).unwrap();
    let err = select::<Shot>().only([relative]).unwrap_err();
    assert!(matches!(err, QueryError::RelativeField { .. }));

    let err = select::<Shot>().only([Asset::CODE.path()]).unwrap_err();
    assert_eq!(
        err,
        QueryError::ForeignField {
            field: "code".to_string(),
            expected: "Shot",
            found: "Asset",
        }
    );
}

#[test]
fn builder_methods_leave_the_receiver_untouched() {
    let base = select::<Shot>();
    let narrowed = base.limit(5).page(2).retired_only().reject_archived_projects();

    assert_eq!(base.data().limit, None);
    assert_eq!(base.data().page, None);
    assert!(!base.data().retired_only);
    assert!(base.data().include_archived_projects);

    assert_eq!(narrowed.data().limit, Some(5));
    assert_eq!(narrowed.data().page, Some(2));
    assert!(narrowed.data().retired_only);
    assert!(!narrowed.data().include_archived_projects);
}

#[test]
fn filter_ands_onto_the_current_predicate() {
    let a = Shot::CODE.eq("sh010");
    let b = Shot::CUT_IN.gt(1000);
    let c = Shot::STATUS.eq("ip") | Shot::STATUS.eq("fin");

    let query = select::<Shot>()
        .filter(a.clone())
        .and_then(|q| q.filter(b.clone()))
        .and_then(|q| q.filter(c.clone()))
        .unwrap();

    assert_eq!(query.data().predicate, Some(Predicate::All(vec![a, b, c])));
}

#[test]
fn filter_rejects_predicates_of_other_entities() {
    let err = select::<Shot>().filter(Asset::CODE.eq("hero")).unwrap_err();

    assert!(matches!(err, QueryError::ForeignField { found: "Asset", .. }));
}

#[test]
fn filter_accepts_relation_paths_rooted_at_the_entity() {
    let pred = Shot::PROJECT.f(&Project::NAME).unwrap().eq("Demo");

    assert!(select::<Shot>().filter(pred).is_ok());
}

#[test]
fn order_by_appends() {
    let query = select::<Shot>()
        .order_by(Shot::CODE, OrderDirection::Asc)
        .and_then(|q| q.order_by(Shot::CUT_IN, OrderDirection::Desc))
        .unwrap();

    let order: Vec<_> = query
        .data()
        .order
        .iter()
        .map(|o| (o.field.name(), o.direction))
        .collect();
    assert_eq!(
        order,
        [
            ("code".to_string(), OrderDirection::Asc),
            ("sg_cut_in".to_string(), OrderDirection::Desc),
        ]
    );
    assert!(select::<Shot>().order_by(Task::CONTENT, OrderDirection::Asc).is_err());
}

#[test]
fn filter_presets_accumulate() {
    let query = select::<Shot>()
        .filter_preset("LATEST", [("latest_by", json!("ENTITIES_CREATED_AT"))])
        .filter_preset("NONE", Vec::<(String, Json)>::new());

    let presets = &query.data().filter_presets;
    assert_eq!(presets.len(), 2);
    assert_eq!(
        serde_json::to_value(&presets[0]).unwrap(),
        json!({ "preset_name": "LATEST", "latest_by": "ENTITIES_CREATED_AT" })
    );
}

#[test]
fn load_requires_one_hop_through_a_queried_relation() {
    let project_name = Shot::PROJECT.f(&Project::NAME).unwrap();

    let query = select::<Shot>().load([&project_name, &project_name]).unwrap();
    assert_eq!(query.data().loading_fields, [project_name.path().clone()]);

    let err = select::<Shot>()
        .only([Shot::CODE])
        .and_then(|q| q.load([&project_name]))
        .unwrap_err();
    assert!(matches!(err, QueryError::RelationNotQueried { .. }));

    let direct = select::<Shot>().load([Shot::CODE]).unwrap_err();
    assert!(matches!(direct, QueryError::RelationNotQueried { .. }));

    let two_hops = Shot::ENTITY
        .f(&Asset::PROJECT.f(&Project::NAME).unwrap())
        .unwrap();
    assert!(select::<Shot>().load([two_hops]).is_err());
}

#[test]
fn load_through_an_alias_checks_the_aliased_relation() {
    let code = Shot::SEQUENCE.f(&Sequence::CODE).unwrap();

    let query = select::<Shot>().load([&code]).unwrap();
    assert_eq!(query.data().loading_fields[0].name(), "entity.Sequence.code");
}

#[test]
fn load_all_loads_every_target_field() {
    let query = select::<Shot>().load_all::<Project, _>(&Shot::PROJECT).unwrap();

    let names: Vec<_> = query.data().loading_fields.iter().map(FieldPath::name).collect();
    assert_eq!(names, ["project.Project.name", "project.Project.archived"]);
}

#[test]
fn load_all_rejects_non_targets() {
    let err = select::<Shot>().load_all::<Task, _>(&Shot::PROJECT).unwrap_err();

    assert!(matches!(err, QueryError::InvalidTarget { .. }));
}

// ---- summarize ----

#[test]
fn summarize_starts_empty_and_includes_archived_projects() {
    let query = summarize::<Shot>();
    let data = query.data();

    assert_eq!(data.model, Shot::MODEL);
    assert!(data.predicate.is_none());
    assert!(data.summaries.is_empty());
    assert!(data.grouping.is_empty());
    assert!(data.include_archived_projects);
}

#[test]
fn summarize_builders_leave_the_receiver_untouched() {
    let base = summarize::<Shot>();
    let built = base
        .fields([Shot::CUT_IN.sum(), Shot::CODE.record_count()])
        .and_then(|q| q.filter(Shot::STATUS.eq("ip")))
        .and_then(|q| q.group_by(Shot::PROJECT.group_exact()))
        .and_then(|q| q.group_by(Shot::DUE.group_month().desc()))
        .unwrap()
        .reject_archived_projects();

    assert!(base.data().summaries.is_empty());
    assert!(base.data().include_archived_projects);

    let data = built.data();
    assert_eq!(
        data.summaries
            .iter()
            .map(|s| (s.field.name(), s.summary))
            .collect::<Vec<_>>(),
        [
            ("sg_cut_in".to_string(), SummaryType::Sum),
            ("code".to_string(), SummaryType::RecordCount),
        ]
    );
    assert_eq!(data.grouping.len(), 2);
    assert_eq!(data.grouping[0].grouping, GroupingType::Exact);
    assert_eq!(data.grouping[0].direction, OrderDirection::Asc);
    assert_eq!(data.grouping[1].grouping, GroupingType::Month);
    assert_eq!(data.grouping[1].direction, OrderDirection::Desc);
    assert!(data.predicate.is_some());
    assert!(!data.include_archived_projects);
}

#[test]
fn summarize_accepts_relation_paths_but_not_foreign_fields() {
    let through = Shot::PROJECT.f(&Project::NAME).unwrap();
    let query = summarize::<Shot>()
        .group_by(through.group_first_letter())
        .unwrap();
    assert_eq!(query.data().grouping[0].field.name(), "project.Project.name");

    let err = summarize::<Shot>().fields([Asset::CODE.count()]).unwrap_err();
    assert!(matches!(err, QueryError::ForeignField { expected: "Shot", found: "Asset", .. }));

    let err = summarize::<Shot>()
        .group_by(Task::ENTITY.group_entity_type())
        .unwrap_err();
    assert!(matches!(err, QueryError::ForeignField { found: "Task", .. }));

    let err = summarize::<Shot>().filter(Asset::CODE.eq("x")).unwrap_err();
    assert!(matches!(err, QueryError::ForeignField { .. }));
}
