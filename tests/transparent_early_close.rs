mod common;

use blobfs::{Config, Objects};
use test_log::test;

#[test]
fn transparent_early_close_commits_nothing() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    let tee = fs.transparent("p", "payload".as_bytes(), None);

    // closing before reading anything cancels persistence
    let _ = tee.close();

    assert!(matches!(fs.pull("p"), Err(blobfs::Error::NotFound)));

    // nothing became addressable, nothing survives a sweep
    fs.blob_gc()?;
    assert_eq!(0, common::file_count(&folder.path().join("blob")));

    // the path is usable afterwards
    fs.push("p", "direct".as_bytes(), None)?;
    assert!(fs.pull("p").is_ok());

    Ok(())
}
