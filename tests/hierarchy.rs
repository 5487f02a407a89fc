#![allow(unused)]

#[macro_use]
mod common;

use std::sync::Arc;

use common::RamDisk;
use sectorfs::{FileSystem, FsError, NUM_DIR_ENTRIES};

const DISK_SECTORS: usize = 128;

fn fresh_fs() -> FileSystem<RamDisk> {
    FileSystem::format(Arc::new(RamDisk::new(DISK_SECTORS))).unwrap()
}

#[test]
fn nested_directories_and_listing() {
    let mut fs = fresh_fs();
    fs.mkdir("/d").unwrap();
    fs.mkdir("/d/e").unwrap();
    fs.create("/d/e/f", 100).unwrap();
    fs.create("/d/g", 50).unwrap();

    assert_eq!(fs.list("/", false).unwrap(), "d/\n");
    assert_eq!(fs.list("/d", false).unwrap(), "e/\ng\n");
    assert_eq!(fs.list("/d/e", false).unwrap(), "f\n");
    assert_eq!(fs.list("/", true).unwrap(), "d/\n  e/\n    f\n  g\n");
}

#[test]
fn recursive_remove_empties_in_place() {
    let mut fs = fresh_fs();
    fs.mkdir("/d").unwrap();
    let free_after_mkdir = fs.free_sectors().unwrap();
    let snapshot_after_mkdir = fs.free_map_snapshot().unwrap();

    fs.mkdir("/d/e").unwrap();
    fs.create("/d/e/f", 100).unwrap();
    fs.create("/d/g", 50).unwrap();

    fs.remove("/d", true).unwrap();

    // everything under /d is gone, bit for bit; /d itself survives, empty
    assert_eq!(fs.free_sectors().unwrap(), free_after_mkdir);
    assert_eq!(fs.free_map_snapshot().unwrap(), snapshot_after_mkdir);
    assert_eq!(fs.list("/d", false).unwrap(), "");
    assert_eq!(fs.list("/", false).unwrap(), "d/\n");
}

#[test]
fn non_recursive_remove_spares_directories() {
    let mut fs = fresh_fs();
    fs.mkdir("/d").unwrap();
    fs.create("/d/f", 10).unwrap();
    let snapshot = fs.free_map_snapshot().unwrap();

    // no regular file named /d exists, so nothing happens
    assert_eq!(fs.remove("/d", false), Err(FsError::NotFound));
    assert_eq!(fs.free_map_snapshot().unwrap(), snapshot);
    assert_eq!(fs.list("/d", false).unwrap(), "f\n");
}

#[test]
fn recursive_remove_falls_back_for_files() {
    let mut fs = fresh_fs();
    let free_before = fs.free_sectors().unwrap();
    fs.create("/f", 10).unwrap();
    fs.remove("/f", true).unwrap();
    assert_eq!(fs.free_sectors().unwrap(), free_before);
    assert_eq!(fs.list("/", false).unwrap(), "");
}

#[test]
fn missing_intermediate_directory_fails_creation() {
    let mut fs = fresh_fs();
    fs.mkdir("/a").unwrap();
    let snapshot = fs.free_map_snapshot().unwrap();

    // /a/b does not exist; the file must not land in /a
    assert_eq!(fs.create("/a/b/f", 10), Err(FsError::NotFound));
    assert_eq!(fs.free_map_snapshot().unwrap(), snapshot);
    assert_eq!(fs.list("/a", false).unwrap(), "");
}

#[test]
fn file_and_directory_share_a_name() {
    let mut fs = fresh_fs();
    fs.create("/n", 5).unwrap();
    fs.mkdir("/n").unwrap();
    assert_eq!(fs.list("/", false).unwrap(), "n\nn/\n");

    // non-recursive remove takes the file and spares the directory
    fs.remove("/n", false).unwrap();
    assert_eq!(fs.list("/", false).unwrap(), "n/\n");
    assert!(fs.list("/n", false).unwrap().is_empty());
}

#[test]
fn over_long_paths_are_not_found() {
    let mut fs = fresh_fs();
    let snapshot = fs.free_map_snapshot().unwrap();
    let long_path = format!("/{}", "a".repeat(300));

    assert_eq!(fs.create(&long_path, 10), Err(FsError::NotFound));
    assert_eq!(fs.open(&long_path), Err(FsError::NotFound));
    assert_eq!(fs.free_map_snapshot().unwrap(), snapshot);
}

#[test]
fn slashes_collapse() {
    let mut fs = fresh_fs();
    fs.mkdir("/t").unwrap();
    fs.create("/t/x", 10).unwrap();

    // doubled and trailing separators name the same entries
    assert_eq!(fs.list("//t/", false).unwrap(), "x\n");
    assert!(fs.open("/t//x").is_ok());
    assert_eq!(fs.mkdir("/t/"), Err(FsError::AlreadyExists));
}

#[test]
fn relative_paths_are_rejected() {
    let mut fs = fresh_fs();
    assert_eq!(fs.create("x", 10), Err(FsError::InvalidPath));
    assert_eq!(fs.list("", false), Err(FsError::InvalidPath));
}

#[test]
fn root_is_not_a_file() {
    let mut fs = fresh_fs();
    assert_eq!(fs.remove("/", false), Err(FsError::NotFound));
    assert_eq!(fs.mkdir("/"), Err(FsError::AlreadyExists));
}

#[test]
fn directory_table_fills_at_64_entries() {
    // plenty of room: 64 empty files cost one header sector each
    let mut fs = fresh_fs();
    fs.mkdir("/full").unwrap();
    for i in 0..NUM_DIR_ENTRIES {
        fs.create(&format!("/full/f{i}"), 0).unwrap();
    }
    let snapshot = fs.free_map_snapshot().unwrap();
    assert_eq!(
        fs.create("/full/extra", 0),
        Err(FsError::DirectoryFull)
    );
    assert_eq!(fs.free_map_snapshot().unwrap(), snapshot);

    // freeing one slot lets the next create through
    fs.remove("/full/f0", false).unwrap();
    fs.create("/full/extra", 0).unwrap();
}

#[test]
fn long_names_are_rejected() {
    let mut fs = fresh_fs();
    assert_eq!(fs.create("/ninechars", 0), Ok(()));
    assert_eq!(fs.create("/ten__chars", 0), Err(FsError::InvalidFileName));
}

#[test]
fn deep_nesting_resolves_and_reclaims() {
    let mut fs = fresh_fs();
    let free_before = fs.free_sectors().unwrap();
    fs.mkdir("/a").unwrap();
    let free_after_a = fs.free_sectors().unwrap();
    fs.mkdir("/a/b").unwrap();
    fs.mkdir("/a/b/c").unwrap();
    fs.create("/a/b/c/leaf", 200).unwrap();

    let id = fs.open("/a/b/c/leaf").unwrap();
    let payload = b"down in the tree";
    assert_eq!(fs.write(id, payload).unwrap(), payload.len());
    fs.seek(id, 0).unwrap();
    let mut back = vec![0u8; payload.len()];
    fs.read(id, &mut back).unwrap();
    assert_eq!(&back, payload);
    fs.close(id).unwrap();

    fs.remove("/a", true).unwrap();
    assert_eq!(fs.free_sectors().unwrap(), free_after_a);
    log!("tree reclaimed, {} sectors free", free_after_a);
}
