use blobfs::{Config, Objects};
use test_log::test;

#[test]
fn cleanup_refreshes_timestamp_only() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    fs.push("p", "content".as_bytes(), None)?;
    let before = fs.pull("p")?;

    std::thread::sleep(std::time::Duration::from_millis(10));
    fs.cleanup("p")?;

    let after = fs.pull("p")?;
    assert!(after.create_at > before.create_at);
    assert_eq!(before.etag, after.etag);

    Ok(())
}

#[test]
fn cleanup_missing_entry_fails() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    assert!(matches!(fs.cleanup("nope"), Err(blobfs::Error::NotFound)));

    Ok(())
}

#[test]
fn cleanup_shields_entry_from_ttl_remove() -> blobfs::Result<()> {
    use chrono::TimeDelta;

    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    fs.push("refreshed", "content".as_bytes(), None)?;
    fs.push("stale", "content".as_bytes(), None)?;

    std::thread::sleep(std::time::Duration::from_millis(500));
    fs.cleanup("refreshed")?;

    // everything older than 250ms expires; the refreshed entry survives
    fs.remove("", None, TimeDelta::milliseconds(250))?;

    assert!(fs.pull("refreshed").is_ok());
    assert!(fs.pull_or_none("stale").is_none());

    Ok(())
}
