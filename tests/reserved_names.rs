use blobfs::{Config, Objects};
use std::io::Read;
use test_log::test;

#[test]
fn blob_fs_reserved_name_escape() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    fs.push("a/.meta", "X".as_bytes(), None)?;
    fs.push("a/.blob", "Y".as_bytes(), None)?;

    let mut buf = String::new();
    fs.pull("a/.meta")?.read_to_string(&mut buf)?;
    assert_eq!("X", buf);

    buf.clear();
    fs.pull("a/.blob")?.read_to_string(&mut buf)?;
    assert_eq!("Y", buf);

    // escaped on disk, away from the reserved entry file
    let meta = folder.path().join("meta");
    assert!(meta.join("a").join("@.meta").join(".meta").try_exists()?);
    assert!(meta.join("a").join("@.blob").join(".meta").try_exists()?);

    Ok(())
}
