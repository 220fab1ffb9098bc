//! Property: snapshot round-trip
//!
//! Serializing any filesystem to its `{ cwd, root }` JSON snapshot and
//! deserializing it back reproduces an identical tree: same node kinds,
//! names, content, permissions, modification times, and cwd.

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use vshell::{FileMode, Node, Vfs};

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9._-]{0,8}"
}

fn arb_mode() -> impl Strategy<Value = FileMode> {
    (0u16..=0o777).prop_map(FileMode)
}

fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..2_000_000_000i64).prop_map(|secs| {
        DateTime::from_timestamp(secs, 0).expect("timestamp in range")
    })
}

/// Strategy for an arbitrary file node.
fn arb_file() -> impl Strategy<Value = Node> {
    (arb_name(), "[ -~]{0,40}", arb_mode(), arb_timestamp()).prop_map(
        |(name, content, mode, ts)| {
            let mut node = Node::file(&name, &content);
            node.permissions = mode;
            node.modified = ts;
            node
        },
    )
}

/// Strategy for an arbitrary subtree, a few levels deep.
fn arb_node() -> impl Strategy<Value = Node> {
    arb_file().prop_recursive(3, 24, 4, |inner| {
        (
            arb_name(),
            arb_mode(),
            arb_timestamp(),
            proptest::collection::vec(inner, 0..4),
        )
            .prop_map(|(name, mode, ts, kids)| {
                let mut dir = Node::dir(&name);
                dir.permissions = mode;
                dir.modified = ts;
                for kid in kids {
                    dir.insert_child(kid);
                }
                dir
            })
    })
}

/// Strategy for a whole filesystem value.
fn arb_vfs() -> impl Strategy<Value = Vfs> {
    (
        proptest::collection::vec(arb_node(), 0..4),
        proptest::collection::vec("[a-z]{1,5}", 0..3),
    )
        .prop_map(|(kids, cwd_segs)| {
            let mut root = Node::dir("/").owned_by("root", "root");
            for kid in kids {
                root.insert_child(kid);
            }
            let cwd = if cwd_segs.is_empty() {
                String::from("/")
            } else {
                format!("/{}", cwd_segs.join("/"))
            };
            Vfs::new(root, cwd)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any filesystem survives the JSON round trip unchanged.
    #[test]
    fn vfs_json_round_trip(vfs in arb_vfs()) {
        let json = vfs.to_json().expect("filesystem should serialize");
        let back = Vfs::from_json(&json).expect("snapshot should deserialize");
        prop_assert_eq!(&back.cwd, &vfs.cwd);
        prop_assert_eq!(&back.root, &vfs.root);
    }

    /// Any single node survives the JSON round trip unchanged.
    #[test]
    fn node_json_round_trip(node in arb_node()) {
        let json = serde_json::to_string(&node).expect("node should serialize");
        let back: Node = serde_json::from_str(&json).expect("node should deserialize");
        prop_assert_eq!(node, back);
    }

    /// The wire shape carries the `type` discriminant on every node.
    #[test]
    fn snapshot_is_tagged(vfs in arb_vfs()) {
        let json = vfs.to_json().expect("filesystem should serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        prop_assert_eq!(value["root"]["type"].as_str(), Some("directory"));
        prop_assert!(value["cwd"].is_string());
    }
}

#[test]
fn seed_round_trips() {
    let vfs = Vfs::seed();
    let json = vfs.to_json().unwrap();
    let back = Vfs::from_json(&json).unwrap();
    assert_eq!(back, vfs);
    assert_eq!(back.cwd, "/home/student");
    assert_eq!(
        back.read_file("/home/student/f1").unwrap(),
        "This is file f1."
    );
}

#[test]
fn snapshot_keeps_child_order() {
    let mut vfs = Vfs::seed();
    for name in ["zz", "aa", "mm"] {
        vfs.make_dir(name).unwrap();
    }
    let back = Vfs::from_json(&vfs.to_json().unwrap()).unwrap();
    let names: Vec<&str> = back
        .lookup("/home/student")
        .unwrap()
        .children()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(names, ["f1", "f2.txt", "zz", "aa", "mm"]);
}
