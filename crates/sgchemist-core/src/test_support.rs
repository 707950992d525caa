//! Shared test-only entity declarations for core tests.

use crate::{
    db::{MockEngine, wire::Row},
    schema::Schema,
};
use serde_json::Value as Json;

crate::entity! {
    pub struct Project = "Project" {
        name: Text,
        archived: Checkbox = "archived",
    }
}

crate::entity! {
    pub struct Asset = "Asset" {
        code: Text in_relation "name",
        description: Text,
        project: Entity["Project"],
        shots: MultiEntity["Shot"],
    }
}

crate::entity! {
    pub struct Sequence = "Sequence" {
        code: Text in_relation "name",
        project: Entity["Project"],
    }
}

crate::entity! {
    /// Shot used across core tests; covers every field kind.
    pub struct Shot = "Shot" {
        code: Text in_relation "name",
        status: Status = "sg_status_list",
        description: Text,
        cut_in: Number = "sg_cut_in",
        cut_duration: Duration,
        frame_rate: Float = "sg_frame_rate",
        completion: Percent = "sg_completion",
        due: Date = "sg_due_date",
        updated_at: DateTime,
        thumbnail: Image = "image",
        tags: List = "sg_tags",
        omit: Checkbox = "sg_omit",
        link: Url = "sg_link",
        data: Serializable = "sg_data",
        project: Entity["Project"],
        entity: Entity["Asset", "Sequence"],
        asset: Entity["Asset"] alias entity,
        sequence: Entity["Sequence"] alias entity,
        tasks: MultiEntity["Task"],
        assets: MultiEntity["Asset"],
    }
}

crate::entity! {
    pub struct Task = "Task" {
        content: Text in_relation "name",
        status: Status = "sg_status_list",
        duration: Duration,
        entity: Entity["Shot", "Asset"],
    }
}

/// Schema holding every test entity.
pub fn schema() -> Schema {
    Schema::builder()
        .register::<Project>()
        .register::<Asset>()
        .register::<Sequence>()
        .register::<Shot>()
        .register::<Task>()
        .build()
        .expect("test schema is valid")
}

/// Build a wire row from `json!` object syntax.
pub fn row(json: Json) -> Row {
    match json {
        Json::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Mock engine seeded with one project, two assets, one sequence and
/// three shots.
///
/// | Shot | code    | status | cut_in | entity      | project |
/// |------|---------|--------|--------|-------------|---------|
/// | 1    | sh010   | ip     | 1001   | Asset 1     | 1       |
/// | 2    | sh020   | fin    | 1010   | Sequence 1  | 1       |
/// | 3    | sh030   | wtg    | null   | null        | null    |
pub fn seeded(schema: &Schema) -> MockEngine {
    use serde_json::json;

    let engine = MockEngine::new(schema);
    let seed = |entity_type: &str, data: Json| {
        engine
            .insert(entity_type, row(data))
            .expect("seed row is valid");
    };

    seed("Project", json!({ "name": "Demo", "archived": false }));
    seed(
        "Asset",
        json!({ "code": "hero", "project": { "type": "Project", "id": 1 } }),
    );
    seed(
        "Asset",
        json!({ "code": "prop", "project": { "type": "Project", "id": 1 } }),
    );
    seed(
        "Sequence",
        json!({ "code": "sq01", "project": { "type": "Project", "id": 1 } }),
    );
    seed(
        "Shot",
        json!({
            "code": "sh010",
            "sg_status_list": "ip",
            "sg_cut_in": 1001,
            "entity": { "type": "Asset", "id": 1 },
            "project": { "type": "Project", "id": 1 },
            "assets": [{ "type": "Asset", "id": 1 }, { "type": "Asset", "id": 2 }],
        }),
    );
    seed(
        "Shot",
        json!({
            "code": "sh020",
            "sg_status_list": "fin",
            "sg_cut_in": 1010,
            "entity": { "type": "Sequence", "id": 1 },
            "project": { "type": "Project", "id": 1 },
        }),
    );
    seed("Shot", json!({ "code": "sh030" }));

    engine
}
