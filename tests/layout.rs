use std::collections::HashSet;
use std::path::Path;

use eframe::egui::{pos2, vec2};
use token_cloud::cloud::collision::total_overlap_area;
use token_cloud::cloud::{BoxSeparation, NodeSnapshot, document_centers};
use token_cloud::{
    BoundingBox, CollisionMode, CollisionStrategy, Document, Frame, LayoutConfig, LayoutError,
    Node, SimulationStatus, Surface, WordCloud, parse_documents,
};

fn cloud_for(documents: &[Document], config: &LayoutConfig) -> WordCloud {
    let mut cloud = WordCloud::new();
    cloud.initial_render(900.0, 600.0).expect("valid surface");
    cloud.update(documents, config).expect("valid documents");
    cloud
}

fn measure(frame: &mut Frame<'_>) {
    measure_scaled(frame, 1.0);
}

fn measure_scaled(frame: &mut Frame<'_>, scale: f32) {
    let measured = frame
        .nodes()
        .filter_map(|(key, node)| {
            let token = node.as_token()?;
            let font_size = frame.font_size(key)?;
            let size = vec2(
                token.token.chars().count() as f32 * font_size * 0.6,
                font_size * 1.2,
            );
            Some((key, BoundingBox::anchored(token.position, size * scale)))
        })
        .collect::<Vec<_>>();
    for (key, bounding_box) in measured {
        frame.supply_bounding_box(key, bounding_box);
    }
}

fn corpus() -> Vec<Document> {
    vec![
        Document::new(
            "systems",
            "Systems",
            [("kernel", 0.9), ("memory", 0.7), ("thread", 0.4), ("cache", 0.3)],
        ),
        Document::new(
            "web",
            "Web",
            [("http", 0.8), ("cache", 0.6), ("thread", 0.2), ("json", 0.5)],
        ),
        Document::new(
            "data",
            "Data",
            [("json", 0.7), ("memory", 0.1), ("index", 0.9), ("query", 0.6)],
        ),
    ]
}

fn boxes_of(nodes: &[Node]) -> Vec<BoundingBox> {
    nodes.iter().filter_map(Node::bounding_box).collect()
}

#[test]
fn document_centers_match_document_count() {
    let surface = Surface::new(900.0, 600.0).unwrap();
    for count in 1..=8 {
        assert_eq!(document_centers(count, surface, 1.0 / 3.0).len(), count);
    }
    assert_eq!(document_centers(1, surface, 0.25), vec![pos2(450.0, 300.0)]);
    assert!(document_centers(0, surface, 1.0 / 3.0).is_empty());
}

#[test]
fn tokens_collapse_to_one_node_per_distinct_token() {
    let documents = corpus();
    let cloud = cloud_for(&documents, &LayoutConfig::default());
    let graph = cloud.state().unwrap().graph();

    let distinct = documents
        .iter()
        .flat_map(|document| document.tokens.iter().map(|(token, _)| token.as_str()))
        .collect::<HashSet<_>>();
    assert_eq!(graph.token_count(), distinct.len());
    assert_eq!(graph.document_count(), documents.len());
    assert_eq!(graph.edges.len(), 12);
}

#[test]
fn frequency_sums_scores_and_edges_keep_per_document_weights() {
    let documents = vec![
        Document::new("doc1", "doc1", [("a", 3.0), ("b", 5.0)]),
        Document::new("doc2", "doc2", [("b", 2.0)]),
    ];
    let cloud = cloud_for(&documents, &LayoutConfig::default());
    let graph = cloud.state().unwrap().graph();

    assert_eq!(graph.frequency.get("a"), Some(3.0));
    assert_eq!(graph.frequency.get("b"), Some(7.0));

    let edges = graph
        .edges
        .iter()
        .map(|edge| {
            let source = graph.node(edge.source).unwrap().label().to_owned();
            let target = graph.node(edge.target).unwrap().label().to_owned();
            (source, target, edge.weight)
        })
        .collect::<Vec<_>>();
    assert_eq!(
        edges,
        vec![
            ("doc1".to_owned(), "a".to_owned(), 3.0),
            ("doc1".to_owned(), "b".to_owned(), 5.0),
            ("doc2".to_owned(), "b".to_owned(), 2.0),
        ]
    );
}

#[test]
fn font_size_never_shrinks_as_frequency_grows() {
    let cloud = cloud_for(&corpus(), &LayoutConfig::default());
    let state = cloud.state().unwrap();
    let graph = state.graph();

    let mut sized = graph
        .keys()
        .filter_map(|key| {
            let node = graph.node(key)?;
            let frequency = graph.frequency.get(node.as_token()?.token.as_str())?;
            Some((frequency, state.font_size(key)?))
        })
        .collect::<Vec<_>>();
    sized.sort_by(|a, b| a.0.total_cmp(&b.0));

    for pair in sized.windows(2) {
        assert!(pair[1].1 >= pair[0].1, "{pair:?}");
    }
    assert_eq!(sized.first().map(|entry| entry.1), Some(12.0));
    assert_eq!(sized.last().map(|entry| entry.1), Some(32.0));
}

#[test]
fn collapsed_domains_fall_back_to_the_midpoint() {
    let documents = vec![
        Document::new("d1", "d1", [("same", 2.0), ("also", 2.0)]),
        Document::new("d2", "d2", [("again", 2.0)]),
    ];
    let cloud = cloud_for(&documents, &LayoutConfig::default());
    let state = cloud.state().unwrap();

    for key in state.graph().keys().skip(2) {
        assert_eq!(state.font_size(key), Some(22.0));
    }
    assert_eq!(state.scales().edge_strength.apply(2.0), 10.5);
    assert_eq!(state.scales().token_charge(2.0), -3000.0);
}

#[test]
fn document_nodes_never_move() {
    let mut cloud = cloud_for(&corpus(), &LayoutConfig::default());
    let anchors = |cloud: &WordCloud| {
        cloud
            .state()
            .unwrap()
            .graph()
            .nodes
            .iter()
            .filter(|node| node.is_fixed())
            .map(Node::position)
            .collect::<Vec<_>>()
    };
    let before = anchors(&cloud);

    let report = cloud.run(measure);

    assert_eq!(report.status, SimulationStatus::Converged);
    assert_eq!(anchors(&cloud), before);
}

#[test]
fn repeated_update_rebuilds_an_equivalent_graph() {
    let documents = corpus();
    let config = LayoutConfig::default();
    let mut cloud = cloud_for(&documents, &config);
    cloud.run(measure);

    let structure = |cloud: &WordCloud| {
        let graph = cloud.state().unwrap().graph();
        let labels = graph
            .nodes
            .iter()
            .map(|node| (node.is_fixed(), node.label().to_owned()))
            .collect::<Vec<_>>();
        let edges = graph
            .edges
            .iter()
            .map(|edge| (edge.source, edge.target, edge.weight))
            .collect::<Vec<_>>();
        (labels, edges)
    };
    let first = structure(&cloud);

    cloud.update(&documents, &config).unwrap();
    assert_eq!(cloud.status(), SimulationStatus::Running);
    assert_eq!(cloud.state().unwrap().simulation().step(), 0);
    assert_eq!(structure(&cloud), first);
}

#[test]
fn collision_pass_strictly_reduces_overlap() {
    let mut cloud = cloud_for(&corpus(), &LayoutConfig::default());
    // Tokens still sit next to their first document, so oversized labels
    // pile up.
    cloud.render(|frame| measure_scaled(frame, 4.0));
    let nodes = cloud.state().unwrap().graph().nodes.clone();
    assert!(total_overlap_area(&boxes_of(&nodes)) > 0.0);

    for strength in [0.1, 0.5, 1.0] {
        let strategy = BoxSeparation::new(strength);
        let mut nodes = nodes.clone();
        for _ in 0..5 {
            let before = total_overlap_area(&boxes_of(&nodes));
            if before == 0.0 {
                break;
            }
            strategy.resolve(&mut nodes);
            let after = total_overlap_area(&boxes_of(&nodes));
            assert!(after < before, "strength {strength}: {after} >= {before}");
        }

        let fixed = nodes.iter().zip(&cloud.state().unwrap().graph().nodes);
        for (moved, original) in fixed.filter(|(node, _)| node.is_fixed()) {
            assert_eq!(moved, original);
        }
    }
}

#[test]
fn collision_runs_inside_ticks_when_enabled() {
    let config = LayoutConfig {
        collision: CollisionMode::BoundingBox { strength: 0.5 },
        ..LayoutConfig::default()
    };
    let mut cloud = cloud_for(&corpus(), &config);

    // No boxes yet: the first tick has nothing to resolve.
    assert_eq!(cloud.tick(measure).collisions_resolved, 0);

    let mut resolved = 0;
    for _ in 0..20 {
        resolved += cloud.tick(measure).collisions_resolved;
    }
    assert!(resolved > 0);
}

#[test]
fn zero_documents_are_a_supported_layout() {
    let mut cloud = cloud_for(&[], &LayoutConfig::default());
    let mut calls = 0;
    let report = cloud.run(|_: &mut Frame<'_>| calls += 1);

    assert_eq!(report.status, SimulationStatus::Converged);
    assert_eq!(report.step, 0);
    assert_eq!(calls, 0);
    let snapshot = cloud.state().unwrap().snapshot();
    assert!(snapshot.nodes.is_empty());
    assert!(snapshot.edges.is_empty());
}

#[test]
fn empty_document_keeps_its_anchor() {
    let documents = vec![
        Document::new("lonely", "lonely", Vec::<(String, f32)>::new()),
        Document::new("busy", "busy", [("token", 1.0)]),
    ];
    let cloud = cloud_for(&documents, &LayoutConfig::default());
    let snapshot = cloud.state().unwrap().snapshot();

    assert_eq!(snapshot.nodes.len(), 3);
    assert!(matches!(&snapshot.nodes[0], NodeSnapshot::Document { name, .. } if name == "lonely"));
    assert_eq!(snapshot.edges.len(), 1);
    assert_eq!(snapshot.edges[0].source, 1);
}

#[test]
fn step_cap_is_reported_not_an_error() {
    let config = LayoutConfig {
        max_steps: 10,
        ..LayoutConfig::default()
    };
    let mut cloud = cloud_for(&corpus(), &config);
    let report = cloud.run(measure);

    assert_eq!(report.status, SimulationStatus::Capped);
    assert_eq!(report.step, 10);
    assert_eq!(cloud.tick(measure).step, 10);
}

#[test]
fn malformed_documents_fail_fast_with_their_index() {
    let raw = r#"[
        {"id": "ok", "tokens": [["fine", 1]]},
        {"id": "bad", "tokens": [["broken", "not a number"]]},
        {"id": "never", "tokens": "nope"}
    ]"#;
    match parse_documents(raw) {
        Err(LayoutError::InvalidScore { index, token }) => {
            assert_eq!(index, 1);
            assert_eq!(token, "broken");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let mut cloud = cloud_for(&corpus(), &LayoutConfig::default());
    let invalid = vec![Document::new("inf", "inf", [("x", f32::INFINITY)])];
    assert!(matches!(
        cloud.update(&invalid, &LayoutConfig::default()),
        Err(LayoutError::InvalidScore { index: 0, .. })
    ));
    assert_eq!(cloud.status(), SimulationStatus::Idle);
}

#[test]
fn bundled_sample_lays_out_with_collisions() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join("sample.json");
    let raw = std::fs::read_to_string(path).expect("sample read failed");
    let documents = parse_documents(&raw).expect("sample parse failed");

    let config = LayoutConfig {
        collision: CollisionMode::BoundingBox { strength: 0.5 },
        ..LayoutConfig::default()
    };
    let mut cloud = cloud_for(&documents, &config);
    cloud.render(measure);
    let report = cloud.run(measure);
    assert_eq!(report.status, SimulationStatus::Converged);

    let snapshot = cloud.state().unwrap().snapshot();
    assert_eq!(snapshot.nodes.len(), documents.len() + cloud.state().unwrap().graph().token_count());
    for node in &snapshot.nodes {
        let (x, y) = match node {
            NodeSnapshot::Document { x, y, .. } | NodeSnapshot::Token { x, y, .. } => (*x, *y),
        };
        assert!(x.is_finite() && y.is_finite());
    }

    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("\"bounding_box\""));
}
