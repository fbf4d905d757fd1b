//! End-to-end tests for the tree operations through the public API.

use treefs_core::{FsError, NodeKind, TreeFs, ROOT_INUMBER};

/// Collects the `<kind> <path>` pairs of a tree dump, dropping the inumbers.
fn dump(fs: &TreeFs) -> Vec<String> {
    let mut out = Vec::new();
    fs.print_tree(&mut out).expect("print into a Vec");
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| {
            let (_, rest) = line.split_once(' ').unwrap();
            rest.to_string()
        })
        .collect()
}

#[test]
fn test_create_lookup_delete_round_trip() {
    let fs = TreeFs::new();

    fs.create("/a", NodeKind::Directory).unwrap();
    let inumber = fs.lookup("/a").unwrap();
    assert!(inumber >= 1);

    fs.delete("/a").unwrap();
    assert_eq!(
        fs.lookup("/a"),
        Err(FsError::NotFound {
            path: "/a".to_string()
        })
    );
}

#[test]
fn test_create_collision() {
    let fs = TreeFs::new();
    fs.create("/a", NodeKind::Directory).unwrap();
    assert!(matches!(
        fs.create("/a", NodeKind::File),
        Err(FsError::AlreadyExists { .. })
    ));
}

#[test]
fn test_delete_refuses_non_empty_directory() {
    let fs = TreeFs::new();
    fs.create("/a", NodeKind::Directory).unwrap();
    fs.create("/a/b", NodeKind::File).unwrap();

    assert!(matches!(
        fs.delete("/a"),
        Err(FsError::DirectoryNotEmpty { .. })
    ));
    fs.delete("/a/b").unwrap();
    fs.delete("/a").unwrap();
    assert!(fs.lookup("/a").is_err());
}

#[test]
fn test_rename_across_directories() {
    let fs = TreeFs::new();
    fs.create("/a", NodeKind::Directory).unwrap();
    fs.create("/b", NodeKind::Directory).unwrap();
    fs.create("/a/x", NodeKind::File).unwrap();
    let x = fs.lookup("/a/x").unwrap();

    fs.rename("/a/x", "/b/y").unwrap();

    assert!(fs.lookup("/a/x").is_err());
    assert_eq!(fs.lookup("/b/y").unwrap(), x);
}

#[test]
fn test_rename_preserves_subtree_and_inumbers() {
    let fs = TreeFs::new();
    fs.create("/a", NodeKind::Directory).unwrap();
    fs.create("/a/sub", NodeKind::Directory).unwrap();
    fs.create("/a/sub/leaf", NodeKind::File).unwrap();
    fs.create("/b", NodeKind::Directory).unwrap();
    let sub = fs.lookup("/a/sub").unwrap();
    let leaf = fs.lookup("/a/sub/leaf").unwrap();

    fs.rename("/a/sub", "/b/moved").unwrap();

    assert_eq!(fs.lookup("/b/moved").unwrap(), sub);
    assert_eq!(fs.lookup("/b/moved/leaf").unwrap(), leaf);
    assert!(fs.lookup("/a/sub").is_err());
}

#[test]
fn test_rename_within_directory() {
    let fs = TreeFs::new();
    fs.create("/a", NodeKind::Directory).unwrap();
    fs.create("/a/old", NodeKind::File).unwrap();
    let inumber = fs.lookup("/a/old").unwrap();

    fs.rename("/a/old", "/a/new").unwrap();

    assert!(fs.lookup("/a/old").is_err());
    assert_eq!(fs.lookup("/a/new").unwrap(), inumber);
}

#[test]
fn test_rename_rejects_cycle() {
    let fs = TreeFs::new();
    fs.create("/a", NodeKind::Directory).unwrap();
    fs.create("/a/b", NodeKind::Directory).unwrap();

    // directly into itself, and deeper down
    assert!(matches!(
        fs.rename("/a", "/a/inside"),
        Err(FsError::RenameCycle { .. })
    ));
    assert!(matches!(
        fs.rename("/a", "/a/b/inside"),
        Err(FsError::RenameCycle { .. })
    ));
    // the tree is untouched
    assert!(fs.lookup("/a/b").is_ok());
}

#[test]
fn test_rename_up_the_tree_is_fine() {
    let fs = TreeFs::new();
    fs.create("/a", NodeKind::Directory).unwrap();
    fs.create("/a/b", NodeKind::Directory).unwrap();
    fs.create("/a/b/x", NodeKind::File).unwrap();

    fs.rename("/a/b/x", "/x").unwrap();
    assert!(fs.lookup("/x").is_ok());
    assert!(fs.lookup("/a/b/x").is_err());
}

#[test]
fn test_rename_target_collision() {
    let fs = TreeFs::new();
    fs.create("/a", NodeKind::Directory).unwrap();
    fs.create("/b", NodeKind::Directory).unwrap();
    fs.create("/a/x", NodeKind::File).unwrap();
    fs.create("/b/y", NodeKind::File).unwrap();

    assert!(matches!(
        fs.rename("/a/x", "/b/y"),
        Err(FsError::AlreadyExists { .. })
    ));
    // source untouched
    assert!(fs.lookup("/a/x").is_ok());
}

#[test]
fn test_rename_missing_source() {
    let fs = TreeFs::new();
    fs.create("/a", NodeKind::Directory).unwrap();
    assert!(matches!(
        fs.rename("/a/ghost", "/a/real"),
        Err(FsError::NotFound { .. })
    ));
}

#[test]
fn test_parent_must_be_directory() {
    let fs = TreeFs::new();
    fs.create("/f", NodeKind::File).unwrap();
    assert!(matches!(
        fs.create("/f/child", NodeKind::File),
        Err(FsError::NotFound { .. }) | Err(FsError::NotADirectory { .. })
    ));
    assert!(matches!(
        fs.delete("/f/child"),
        Err(FsError::NotFound { .. }) | Err(FsError::NotADirectory { .. })
    ));
}

#[test]
fn test_table_exhaustion() {
    let fs = TreeFs::new();
    let capacity = fs.table().capacity();
    // fill every slot but the root's with a chain of nested directories,
    // which keeps each directory well under its entry limit
    let mut path = String::new();
    for i in 1..capacity {
        path.push_str(&format!("/d{i}"));
        fs.create(&path, NodeKind::Directory).unwrap();
    }
    assert_eq!(
        fs.create(&format!("{path}/overflow"), NodeKind::File),
        Err(FsError::TableFull)
    );
    // freeing one slot makes creation possible again
    fs.delete(&path).unwrap();
    let (parent, _) = path.rsplit_once('/').unwrap();
    fs.create(&format!("{parent}/again"), NodeKind::File).unwrap();
}

#[test]
fn test_directory_entry_exhaustion() {
    let fs = TreeFs::with_capacity(64);
    fs.create("/d", NodeKind::Directory).unwrap();
    for i in 0..treefs_core::limits::MAX_DIR_ENTRIES {
        fs.create(&format!("/d/n{i}"), NodeKind::File).unwrap();
    }
    assert!(matches!(
        fs.create("/d/overflow", NodeKind::File),
        Err(FsError::DirectoryFull { .. })
    ));
    // the failed create must not leak its pre-allocated inode
    let used_before = fs.table().in_use();
    assert!(fs.create("/d/overflow2", NodeKind::File).is_err());
    assert_eq!(fs.table().in_use(), used_before);
}

#[test]
fn test_occupancy_restored_after_create_delete() {
    let fs = TreeFs::new();
    fs.create("/keep", NodeKind::Directory).unwrap();
    let before = fs.table().in_use();

    fs.create("/keep/tmp", NodeKind::Directory).unwrap();
    fs.create("/keep/tmp2", NodeKind::File).unwrap();
    fs.delete("/keep/tmp2").unwrap();
    fs.delete("/keep/tmp").unwrap();

    assert_eq!(fs.table().in_use(), before);
}

#[test]
fn test_lookup_root() {
    let fs = TreeFs::new();
    assert_eq!(fs.lookup("/").unwrap(), ROOT_INUMBER);
    assert_eq!(fs.lookup("").unwrap(), ROOT_INUMBER);
}

#[test]
fn test_trailing_slash_names_same_node() {
    let fs = TreeFs::new();
    fs.create("/a", NodeKind::Directory).unwrap();
    assert_eq!(fs.lookup("/a/").unwrap(), fs.lookup("/a").unwrap());
    fs.create("/a/b/", NodeKind::File).unwrap();
    assert!(fs.lookup("/a/b").is_ok());
}

#[test]
fn test_invalid_names_rejected() {
    let fs = TreeFs::new();
    assert!(matches!(
        fs.create("/", NodeKind::Directory),
        Err(FsError::InvalidName { .. })
    ));
    assert!(matches!(fs.delete("/"), Err(FsError::InvalidName { .. })));
    let long = "x".repeat(treefs_core::limits::MAX_FILE_NAME + 1);
    assert!(matches!(
        fs.create(&format!("/{long}"), NodeKind::File),
        Err(FsError::InvalidName { .. })
    ));
}

#[test]
fn test_dump_lists_nodes_in_preorder() {
    let fs = TreeFs::new();
    fs.create("/a", NodeKind::Directory).unwrap();
    fs.create("/a/x", NodeKind::File).unwrap();
    fs.create("/b", NodeKind::File).unwrap();

    let lines = dump(&fs);
    assert_eq!(lines[0], "d /");
    let a = lines.iter().position(|l| l == "d /a").unwrap();
    let x = lines.iter().position(|l| l == "f /a/x").unwrap();
    assert!(a < x, "children follow their parent");
    assert!(lines.contains(&"f /b".to_string()));
    assert_eq!(lines.len(), 4);
}

#[test]
fn test_inumbers_recycled_after_delete() {
    let fs = TreeFs::new();
    fs.create("/one", NodeKind::File).unwrap();
    let first = fs.lookup("/one").unwrap();
    fs.delete("/one").unwrap();
    fs.create("/two", NodeKind::File).unwrap();
    assert_eq!(fs.lookup("/two").unwrap(), first);
}
