mod common;

use blobfs::{Config, Objects};
use std::io::Read;
use test_log::test;

#[test]
fn concurrent_pushes_dedup() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    let workers = (0..8)
        .map(|idx| {
            let fs = fs.clone();

            std::thread::spawn(move || -> blobfs::Result<()> {
                for round in 0..10 {
                    fs.push(
                        &format!("worker-{idx}/item-{round}"),
                        "identical payload".as_bytes(),
                        None,
                    )?;
                }
                Ok(())
            })
        })
        .collect::<Vec<_>>();

    for worker in workers {
        worker.join().expect("worker should not panic")?;
    }

    // 80 paths, one blob
    assert_eq!(1, common::file_count(&folder.path().join("blob")));

    for idx in 0..8 {
        let mut buf = String::new();
        fs.pull(&format!("worker-{idx}/item-0"))?
            .read_to_string(&mut buf)?;
        assert_eq!("identical payload", buf);
    }

    Ok(())
}

#[test]
fn concurrent_push_and_gc() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    let writers = (0..4)
        .map(|idx| {
            let fs = fs.clone();

            std::thread::spawn(move || -> blobfs::Result<()> {
                for round in 0..20 {
                    let payload = format!("payload {idx} {round}");
                    fs.push(&format!("w{idx}/r{round}"), payload.as_bytes(), None)?;
                }
                Ok(())
            })
        })
        .collect::<Vec<_>>();

    let collector = {
        let fs = fs.clone();

        std::thread::spawn(move || -> blobfs::Result<()> {
            for _ in 0..10 {
                fs.blob_gc()?;
            }
            Ok(())
        })
    };

    for writer in writers {
        writer.join().expect("writer should not panic")?;
    }
    collector.join().expect("collector should not panic")?;

    // every committed entry must still resolve
    for idx in 0..4 {
        for round in 0..20 {
            let mut buf = String::new();
            fs.pull(&format!("w{idx}/r{round}"))?.read_to_string(&mut buf)?;
            assert_eq!(format!("payload {idx} {round}"), buf);
        }
    }

    Ok(())
}

#[test]
fn concurrent_readers_share_path() -> blobfs::Result<()> {
    let folder = tempfile::tempdir()?;
    let fs = Config::new(folder.path()).open()?;

    fs.push("shared", "hello world".as_bytes(), None)?;

    let readers = (0..8)
        .map(|_| {
            let fs = fs.clone();

            std::thread::spawn(move || -> blobfs::Result<()> {
                for _ in 0..50 {
                    let mut buf = String::new();
                    fs.pull("shared")?.read_to_string(&mut buf)?;
                    assert_eq!("hello world", buf);
                }
                Ok(())
            })
        })
        .collect::<Vec<_>>();

    for reader in readers {
        reader.join().expect("reader should not panic")?;
    }

    Ok(())
}
