use blobfs::{Config, Objects};
use std::io::Read;
use test_log::test;

#[test]
fn transparent_roundtrip() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    let mut tee = fs.transparent("p", "payload".as_bytes(), None);

    let mut buf = String::new();
    tee.read_to_string(&mut buf)?;
    assert_eq!("payload", buf);

    tee.close()?;

    buf.clear();
    fs.pull("p")?.read_to_string(&mut buf)?;
    assert_eq!("payload", buf);

    Ok(())
}

#[test]
fn transparent_carries_extras() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    let extras = [("origin".to_string(), "upstream".to_string())]
        .into_iter()
        .collect();
    let mut tee = fs.transparent("p", "payload".as_bytes(), Some(extras));

    let mut buf = Vec::new();
    tee.read_to_end(&mut buf)?;
    tee.close()?;

    let content = fs.pull("p")?;
    assert_eq!(Some(&"upstream".to_string()), content.extras.get("origin"));

    Ok(())
}

#[test]
fn transparent_drop_after_full_read_commits() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    {
        let mut tee = fs.transparent("p", "payload".as_bytes(), None);
        let mut buf = String::new();
        tee.read_to_string(&mut buf)?;
        // dropped without an explicit close
    }

    let mut buf = String::new();
    fs.pull("p")?.read_to_string(&mut buf)?;
    assert_eq!("payload", buf);

    Ok(())
}
