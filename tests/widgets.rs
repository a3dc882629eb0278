use graph_lower::{
    convert_workflow, widgets::filter_control_tokens, EmptyRegistry, StaticRegistry,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn registry() -> StaticRegistry {
    StaticRegistry::load_from_file("tests/fixtures/registry.json").unwrap()
}

#[test]
fn control_tokens_are_dropped_only_after_numbers() {
    let values = vec![json!(42), json!("fixed")];
    assert_eq!(filter_control_tokens(&values), vec![json!(42)]);

    let values = vec![json!(7), json!("randomize"), json!("euler")];
    assert_eq!(
        filter_control_tokens(&values),
        vec![json!(7), json!("euler")]
    );

    // A standalone token is a legitimate combo value.
    let values = vec![json!("fixed")];
    assert_eq!(filter_control_tokens(&values), vec![json!("fixed")]);

    let values = vec![json!("mode"), json!("increment")];
    assert_eq!(
        filter_control_tokens(&values),
        vec![json!("mode"), json!("increment")]
    );
}

#[test]
fn seed_with_control_token_maps_to_seed_alone() {
    let registry = StaticRegistry::from_json(
        r#"{ "nodes": { "Seeder": {
            "inputs": [{ "name": "seed", "kind": "widget" }],
            "output_node": true
        } } }"#,
    )
    .unwrap();
    let doc = json!({
        "nodes": [
            {
                "id": 1,
                "type": "Seeder",
                "mode": 0,
                "inputs": [],
                "outputs": [],
                "widgets_values": [42, "fixed"]
            }
        ],
        "links": []
    });
    let program = convert_workflow(&doc, &registry).unwrap();
    assert_eq!(program["1"]["inputs"], json!({ "seed": 42 }));
}

#[test]
fn map_shaped_widget_values_are_used_directly() {
    let registry = StaticRegistry::from_json(
        r#"{ "nodes": { "VideoCombine": {
            "inputs": [
                { "name": "frame_rate", "kind": "widget" },
                { "name": "format", "kind": "widget" }
            ],
            "output_node": true
        } } }"#,
    )
    .unwrap();
    let doc = json!({
        "nodes": [
            {
                "id": 1,
                "type": "VideoCombine",
                "mode": 0,
                "inputs": [],
                "outputs": [],
                "widgets_values": {
                    "frame_rate": 24,
                    "format": "video/h264-mp4",
                    "videopreview": { "hidden": false, "params": {} }
                }
            }
        ],
        "links": []
    });
    let program = convert_workflow(&doc, &registry).unwrap();
    assert_eq!(
        program["1"]["inputs"],
        json!({ "frame_rate": 24, "format": "video/h264-mp4" })
    );
}

#[test]
fn self_describing_dict_widgets_name_themselves() {
    let doc = json!({
        "nodes": [
            {
                "id": 1,
                "type": "PowerLoraLoader",
                "mode": 0,
                "inputs": [],
                "outputs": [{ "name": "MODEL", "links": [1] }],
                "widgets_values": [
                    { "type": "PowerLoraLoaderHeaderWidget" },
                    { "lora": "detail.safetensors", "on": true, "strength": 0.8, "strengthTwo": null },
                    { "lora": "style.safetensors", "on": false, "strength": 1.0, "strengthTwo": 0.5 },
                    ""
                ]
            },
            {
                "id": 2,
                "type": "PreviewImage",
                "mode": 0,
                "inputs": [{ "name": "images", "link": 1 }],
                "outputs": []
            }
        ],
        "links": [[1, 1, 0, 2, 0, "MODEL"]]
    });
    let program = convert_workflow(&doc, &registry()).unwrap();
    let inputs = &program["1"]["inputs"];

    assert_eq!(
        inputs["PowerLoraLoaderHeaderWidget"],
        json!({ "type": "PowerLoraLoaderHeaderWidget" })
    );
    // Unset companion strength stripped from the first entry only.
    assert_eq!(
        inputs["lora_1"],
        json!({ "lora": "detail.safetensors", "on": true, "strength": 0.8 })
    );
    assert_eq!(
        inputs["lora_2"],
        json!({ "lora": "style.safetensors", "on": false, "strength": 1.0, "strengthTwo": 0.5 })
    );
    assert_eq!(inputs["➕ Add Lora"], json!(""));
}

#[test]
fn unknown_types_infer_names_from_declared_inputs() {
    let doc = json!({
        "nodes": [
            {
                "id": 1,
                "type": "MysteryResize",
                "mode": 0,
                "inputs": [
                    { "name": "image", "link": 1 },
                    { "name": "width", "link": null, "widget": { "name": "width" } },
                    { "name": "height", "link": null, "widget": { "name": "height" } }
                ],
                "outputs": [{ "name": "IMAGE", "links": [2] }],
                "widgets_values": [640, 480]
            },
            {
                "id": 2,
                "type": "PreviewImage",
                "mode": 0,
                "inputs": [{ "name": "images", "link": 2 }],
                "outputs": []
            },
            {
                "id": 3,
                "type": "LoadImage",
                "mode": 0,
                "inputs": [],
                "outputs": [{ "name": "IMAGE", "links": [1] }],
                "widgets_values": ["example.png"]
            }
        ],
        "links": [
            [1, 3, 0, 1, 0, "IMAGE"],
            [2, 1, 0, 2, 0, "IMAGE"]
        ]
    });
    let program = convert_workflow(&doc, &registry()).unwrap();

    assert_eq!(program["1"]["inputs"]["width"], json!(640));
    assert_eq!(program["1"]["inputs"]["height"], json!(480));
    assert_eq!(program["1"]["inputs"]["image"], json!(["3", 0]));
}

#[test]
fn unmapped_widget_values_never_fail_the_conversion() {
    let doc = json!({
        "nodes": [
            {
                "id": 1,
                "type": "TotallyUnknown",
                "mode": 0,
                "inputs": [],
                "outputs": [{ "name": "OUT", "links": [1] }],
                "widgets_values": [1, 2, 3]
            },
            {
                "id": 2,
                "type": "PreviewImage",
                "mode": 0,
                "inputs": [{ "name": "images", "link": 1 }],
                "outputs": []
            }
        ],
        "links": [[1, 1, 0, 2, 0, "OUT"]]
    });
    let program = convert_workflow(&doc, &registry()).unwrap();

    assert_eq!(program["1"]["inputs"], json!({}));
    assert_eq!(program["2"]["inputs"]["images"], json!(["1", 0]));
}

#[test]
fn connected_names_are_not_overwritten_by_stored_widgets() {
    let registry = StaticRegistry::from_json(
        r#"{ "nodes": {
            "TextBox": {
                "inputs": [{ "name": "text", "kind": "widget" }]
            },
            "Stamper": {
                "inputs": [
                    { "name": "text", "kind": "widget" },
                    { "name": "image", "kind": "connection" }
                ],
                "output_node": true
            }
        } }"#,
    )
    .unwrap();
    let doc = json!({
        "nodes": [
            {
                "id": 1,
                "type": "TextBox",
                "mode": 0,
                "inputs": [],
                "outputs": [{ "name": "STRING", "links": [1] }],
                "widgets_values": ["live value"]
            },
            {
                "id": 2,
                "type": "Stamper",
                "mode": 0,
                "inputs": [{ "name": "text", "link": 1, "widget": { "name": "text" } }],
                "outputs": [],
                "widgets_values": ["stale value"]
            }
        ],
        "links": [[1, 1, 0, 2, 0, "STRING"]]
    });
    let program = convert_workflow(&doc, &registry).unwrap();

    assert_eq!(program["2"]["inputs"]["text"], json!(["1", 0]));
}

#[test]
fn empty_registry_keeps_connections_for_known_shapes() {
    let doc = json!({
        "nodes": [
            {
                "id": 1,
                "type": "Loader",
                "mode": 0,
                "inputs": [],
                "outputs": [{ "name": "OUT", "links": [1] }]
            },
            {
                "id": 2,
                "type": "Sink",
                "mode": 0,
                "inputs": [{ "name": "value", "link": 1 }],
                "outputs": [{ "name": "OUT", "links": [] }]
            }
        ],
        "links": [[1, 1, 0, 2, 0, "OUT"]]
    });
    // Sink has no connected outputs and no registry flag; with no registry
    // entries at all the whole chain collapses.
    let program = convert_workflow(&doc, &EmptyRegistry).unwrap();
    assert!(program.get("2").is_none());
    assert!(program.get("1").is_some());
}
