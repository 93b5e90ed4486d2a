use archcanvas_core::grouping::merge_nodes;
use archcanvas_core::settings::{Direction, EngineSettings};
use archcanvas_core::storage::DiagramDir;
use archcanvas_core::{Diagram, Edge, Error, Node, NodeType};
use pretty_assertions::assert_eq;

fn sample() -> Diagram {
    Diagram::new(
        vec![
            Node::leaf("node-1", NodeType::Gateway, "Edge"),
            Node::leaf("node-2", NodeType::Service, "Orders"),
        ],
        vec![Edge::new("edge-node-1-node-2", "node-1", "node-2").with_label("routes")],
    )
}

#[test]
fn diagrams_roundtrip_through_the_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DiagramDir::new(tmp.path());

    let mut diagram = sample();
    merge_nodes(&mut diagram, "node-2", "node-1").unwrap();
    dir.write("shop", &diagram).unwrap();
    dir.write("blog", &sample()).unwrap();

    assert_eq!(dir.list().unwrap(), vec!["blog", "shop"]);
    assert_eq!(dir.read("shop").unwrap(), diagram);
    assert!(!tmp.path().join(".shop.canvas.json.tmp").exists());
}

#[test]
fn missing_diagram_is_reported_by_name() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DiagramDir::new(tmp.path().join("not-yet"));
    assert_eq!(dir.list().unwrap(), Vec::<String>::new());
    assert!(matches!(dir.read("nope"), Err(Error::DiagramNotFound(name)) if name == "nope"));
    dir.delete("nope").unwrap();
}

#[test]
fn settings_default_when_missing_or_broken() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DiagramDir::new(tmp.path());
    assert_eq!(dir.read_settings(), EngineSettings::default());

    std::fs::write(tmp.path().join("settings.json"), "{ not json").unwrap();
    assert_eq!(dir.read_settings(), EngineSettings::default());

    let custom = EngineSettings {
        overlap_threshold: 0.3,
        direction: Direction::LeftRight,
        ..EngineSettings::default()
    };
    dir.write_settings(&custom).unwrap();
    assert_eq!(dir.read_settings(), custom);
}

#[test]
fn names_that_leave_the_directory_are_refused() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DiagramDir::new(tmp.path().join("data"));
    for name in ["../escape", "a/b", "a\\b", "..", ""] {
        assert!(
            matches!(dir.write(name, &sample()), Err(Error::InvalidName(_))),
            "{name:?} accepted"
        );
        assert!(matches!(dir.read(name), Err(Error::InvalidName(_))));
        assert!(matches!(dir.delete(name), Err(Error::InvalidName(_))));
    }
    assert!(!tmp.path().join("escape.canvas.json").exists());
    dir.write("shop.v2", &sample()).unwrap();
    assert_eq!(dir.list().unwrap(), vec!["shop.v2"]);
}
