use std::collections::BTreeMap;

use crate::tree::from_flat;
use crate::tree::from_node;
use crate::ConfigValue;
use crate::Error;
use crate::KeyValue;
use crate::RegistryNode;

fn tree(entries: Vec<(&str, ConfigValue)>) -> ConfigValue {
    ConfigValue::Tree(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<BTreeMap<_, _>>(),
    )
}

#[test]
fn test_from_flat_single_level() {
    let pairs = vec![
        KeyValue::new("/good/a", "1"),
        KeyValue::new("/good/b", "Yeah, it works!!!"),
    ];

    let actual = from_flat("good", &pairs).expect("build subtree");
    let expected = tree(vec![
        ("a", ConfigValue::leaf("1")),
        ("b", ConfigValue::leaf("Yeah, it works!!!")),
    ]);
    assert_eq!(expected, actual);
}

#[test]
fn test_from_flat_nested_levels() {
    let pairs = vec![
        KeyValue::new("/app/db/host", "localhost"),
        KeyValue::new("/app/db/pool/size", "10"),
        KeyValue::new("/app/name", "demo"),
    ];

    let actual = from_flat("/app", &pairs).expect("build subtree");
    let expected = tree(vec![
        (
            "db",
            tree(vec![
                ("host", ConfigValue::leaf("localhost")),
                ("pool", tree(vec![("size", ConfigValue::leaf("10"))])),
            ]),
        ),
        ("name", ConfigValue::leaf("demo")),
    ]);
    assert_eq!(expected, actual);
}

#[test]
fn test_from_flat_root_prefix_stripped() {
    // Result paths are relative to the query root, leading slash and all.
    let pairs = vec![KeyValue::new("/a/b/c", "v")];
    let actual = from_flat("/a/b", &pairs).expect("build subtree");
    assert_eq!(tree(vec![("c", ConfigValue::leaf("v"))]), actual);
}

#[test]
fn test_from_flat_prefix_is_segment_aligned() {
    // "a/bc" is not under "a/b"
    let pairs = vec![KeyValue::new("/a/b/y", "w"), KeyValue::new("/a/bc/x", "v")];
    let actual = from_flat("a/b", &pairs).expect("build subtree");
    assert_eq!(tree(vec![("y", ConfigValue::leaf("w"))]), actual);
}

#[test]
fn test_from_flat_empty_is_an_error() {
    let result = from_flat("ghost", &[]);
    match result {
        Err(Error::EmptyResult(key)) => assert_eq!(key, "ghost"),
        other => panic!("expected EmptyResult, got {other:?}"),
    }
}

#[test]
fn test_from_flat_root_leaf() {
    // The queried key itself holds a value: the result is that leaf.
    let pairs = vec![KeyValue::new("/flag", "on")];
    let actual = from_flat("flag", &pairs).expect("build subtree");
    assert_eq!(ConfigValue::leaf("on"), actual);
}

#[test]
fn test_from_flat_overwrite_is_idempotent() {
    let pairs = vec![KeyValue::new("/k/a", "old"), KeyValue::new("/k/a", "new")];
    let actual = from_flat("k", &pairs).expect("build subtree");
    assert_eq!(tree(vec![("a", ConfigValue::leaf("new"))]), actual);
}

#[test]
fn test_from_node_leaf() {
    let node = RegistryNode {
        key: "/flag".to_string(),
        value: Some("on".to_string()),
        children: vec![],
    };
    assert_eq!(ConfigValue::leaf("on"), from_node("flag", &node));
}

#[test]
fn test_from_node_directory() {
    let node = RegistryNode {
        key: "/good".to_string(),
        value: None,
        children: vec![
            RegistryNode {
                key: "/good/a".to_string(),
                value: Some("1".to_string()),
                children: vec![],
            },
            RegistryNode {
                key: "/good/sub".to_string(),
                value: None,
                children: vec![RegistryNode {
                    key: "/good/sub/b".to_string(),
                    value: Some("2".to_string()),
                    children: vec![],
                }],
            },
        ],
    };

    let expected = tree(vec![
        ("a", ConfigValue::leaf("1")),
        ("sub", tree(vec![("b", ConfigValue::leaf("2"))])),
    ]);
    assert_eq!(expected, from_node("good", &node));
}

#[test]
fn test_from_node_skips_self_child() {
    // An empty directory comes back listing itself as its only child.
    let node = RegistryNode {
        key: "/empty".to_string(),
        value: None,
        children: vec![RegistryNode {
            key: "/empty".to_string(),
            value: None,
            children: vec![],
        }],
    };
    assert_eq!(ConfigValue::tree(), from_node("empty", &node));
}
