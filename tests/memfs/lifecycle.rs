use std::io::Read;

use heapfs::channel::stream::FileInput;
use heapfs::channel::FileChannel;
use heapfs::{Error, OpenOptions};

use super::common::Fixture;

#[test]
fn closing_fails_subsequent_operations() {
    let fixture = Fixture::new();
    fixture.mkdir("/d");

    fixture.fs.close();
    assert!(!fixture.fs.is_open());

    assert!(matches!(
        fixture.view().create_directory(&fixture.path("/e"), &[]),
        Err(Error::ClosedFileSystem)
    ));
    assert!(matches!(
        fixture.view().check_access(&fixture.path("/d")),
        Err(Error::ClosedFileSystem)
    ));
    assert!(matches!(fixture.fs.new_watch_service(), Err(Error::ClosedFileSystem)));
}

#[test]
fn close_is_idempotent() {
    let fixture = Fixture::new();
    fixture.fs.close();
    fixture.fs.close();
    assert!(!fixture.fs.is_open());
}

#[test]
fn closing_the_file_system_closes_open_channels() {
    let fixture = Fixture::new();
    let channel = FileChannel::open(
        fixture.view(),
        &fixture.path("/f"),
        OpenOptions::WRITE | OpenOptions::CREATE,
        &[],
    )
    .expect("open");

    fixture.fs.close();
    assert!(!channel.is_open());
    assert!(matches!(channel.write(b"x"), Err(Error::ClosedChannel)));
}

#[test]
fn closing_the_file_system_closes_streams() {
    let fixture = Fixture::new();
    fixture.write_file("/f", b"data");
    let mut input = FileInput::open(fixture.view(), &fixture.path("/f")).expect("open");

    fixture.fs.close();
    let mut buf = Vec::new();
    assert!(input.read_to_end(&mut buf).is_err());
}

#[test]
fn channels_cannot_open_on_a_closed_file_system() {
    let fixture = Fixture::new();
    fixture.fs.close();
    let err = FileChannel::open(
        fixture.view(),
        &fixture.path("/f"),
        OpenOptions::WRITE | OpenOptions::CREATE,
        &[],
    )
    .expect_err("closed");
    assert!(matches!(err, Error::ClosedFileSystem));
}

#[test]
fn individually_closed_resources_are_forgotten() {
    let fixture = Fixture::new();
    fixture.write_file("/f", b"data");
    let input = FileInput::open(fixture.view(), &fixture.path("/f")).expect("open");
    input.close();
    input.close();
    // Closing the file system afterwards must not double-release the handle.
    fixture.fs.close();
}
