#![allow(dead_code)]

use sgchemist::{
    prelude::*,
    serde_json::{Value as Json, json},
};

sgchemist::entity! {
    pub struct Project = "Project" {
        name: Text,
        archived: Checkbox,
    }
}

sgchemist::entity! {
    pub struct Asset = "Asset" {
        code: Text in_relation "name",
        project: Entity["Project"],
    }
}

sgchemist::entity! {
    /// Shot linked either to an asset or to another shot.
    pub struct Shot = "Shot" {
        code: Text in_relation "name",
        status: Status = "sg_status_list",
        cut_in: Number = "sg_cut_in",
        due: Date = "sg_due_date",
        project: Entity["Project"],
        entity: Entity["Asset", "Shot"],
        asset: Entity["Asset"] alias entity,
        assets: MultiEntity["Asset"],
    }
}

sgchemist::entity! {
    /// Redeclares the `Shot` type name.
    pub struct ShotAgain = "Shot" {
        code: Text,
    }
}

pub fn schema() -> Schema {
    Schema::builder()
        .register::<Project>()
        .register::<Asset>()
        .register::<Shot>()
        .build()
        .expect("schema is valid")
}

pub fn row(json: Json) -> Row {
    json.as_object().cloned().expect("row is an object")
}

/// Mock engine holding one project, one asset and two shots.
pub fn engine(schema: &Schema) -> MockEngine {
    let engine = MockEngine::new(schema);
    let rows = [
        ("Project", json!({ "name": "Demo", "archived": false })),
        ("Asset", json!({ "code": "hero", "project": { "type": "Project", "id": 1 } })),
        (
            "Shot",
            json!({
                "code": "sh010",
                "sg_cut_in": 1001,
                "project": { "type": "Project", "id": 1 },
                "entity": { "type": "Asset", "id": 1 },
            }),
        ),
        (
            "Shot",
            json!({
                "code": "sh020",
                "sg_status_list": "ip",
                "project": { "type": "Project", "id": 1 },
            }),
        ),
    ];

    for (entity_type, data) in rows {
        engine.insert(entity_type, row(data)).expect("seed row is valid");
    }

    engine
}
