use blobfs::{Config, Objects};
use std::io::Read;
use test_log::test;

#[test]
fn blob_fs_reload_recovers_refcounts() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;

    {
        let fs = Config::new(folder.path()).open()?;
        fs.push("a/b", "hello world".as_bytes(), None)?;
    }

    let fs = Config::new(folder.path()).open()?;

    let mut buf = String::new();
    fs.pull("a/b")?.read_to_string(&mut buf)?;
    assert_eq!("hello world", buf);

    // a sweep right after reopening must not reap referenced blobs
    fs.blob_gc()?;
    buf.clear();
    fs.pull("a/b")?.read_to_string(&mut buf)?;
    assert_eq!("hello world", buf);

    // replacing the entry after a restart swaps refcounts cleanly
    fs.push("a/b", "fresh content".as_bytes(), None)?;
    fs.blob_gc()?;

    buf.clear();
    fs.pull("a/b")?.read_to_string(&mut buf)?;
    assert_eq!("fresh content", buf);

    Ok(())
}

#[test]
fn blob_fs_reload_sweeps_orphans() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;

    {
        let fs = Config::new(folder.path()).open()?;
        fs.push("a", "kept".as_bytes(), None)?;
        fs.push("b", "orphaned".as_bytes(), None)?;

        // drop b's meta entry but leave the blob behind
        std::fs::remove_file(folder.path().join("meta").join("b").join(".meta"))?;
    }

    let fs = Config::new(folder.path()).open()?;
    fs.blob_gc()?;

    let mut buf = String::new();
    fs.pull("a")?.read_to_string(&mut buf)?;
    assert_eq!("kept", buf);

    Ok(())
}
