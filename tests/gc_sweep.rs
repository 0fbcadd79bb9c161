mod common;

use blobfs::{Config, Objects};
use chrono::TimeDelta;
use test_log::test;

#[test]
fn blob_fs_gc_sweep() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    fs.push("p", "data".as_bytes(), None)?;
    assert_eq!(1, common::file_count(&folder.path().join("blob")));

    fs.remove("", None, TimeDelta::milliseconds(-1))?;
    fs.blob_gc()?;

    assert_eq!(0, common::file_count(&folder.path().join("blob")));
    assert!(fs.pull_or_none("p").is_none());

    // the store keeps working after a full sweep
    fs.push("p", "data".as_bytes(), None)?;
    assert!(fs.pull("p").is_ok());

    Ok(())
}

#[test]
fn blob_fs_gc_keeps_referenced_blobs() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    fs.push("keep", "alive".as_bytes(), None)?;
    fs.blob_gc()?;

    assert_eq!(1, common::file_count(&folder.path().join("blob")));
    assert!(fs.pull("keep").is_ok());

    Ok(())
}

#[test]
fn blob_fs_gc_reclaims_replaced_blobs() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    fs.push("p", "old content".as_bytes(), None)?;
    fs.push("p", "new content".as_bytes(), None)?;

    // the replaced blob lost its only reference
    assert_eq!(2, common::file_count(&folder.path().join("blob")));
    fs.blob_gc()?;
    assert_eq!(1, common::file_count(&folder.path().join("blob")));

    assert!(fs.pull("p").is_ok());

    Ok(())
}
