use heapfs::{Config, DeleteMode, Error, Features, OpenOptions};

use super::common::Fixture;

#[test]
fn hard_links_share_content_both_ways() {
    let fixture = Fixture::new();
    fixture.write_file("/a", b"hello");
    fixture.view().link(&fixture.path("/b"), fixture.view(), &fixture.path("/a")).expect("link");

    fixture.append_file("/b", b" world");
    assert_eq!(fixture.read_file("/a"), b"hello world");

    fixture.view().delete_file(&fixture.path("/a"), DeleteMode::Any).expect("delete original");
    assert_eq!(fixture.read_file("/b"), b"hello world");
}

#[test]
fn link_counts_track_entries() {
    let fixture = Fixture::new();
    fixture.write_file("/a", b"x");

    let file = fixture
        .view()
        .get_or_create_regular_file(&fixture.path("/a"), OpenOptions::READ, &[])
        .expect("open");
    assert_eq!(file.links(), 1);

    fixture.view().link(&fixture.path("/b"), fixture.view(), &fixture.path("/a")).expect("link");
    assert_eq!(file.links(), 2);

    fixture.view().delete_file(&fixture.path("/a"), DeleteMode::Any).expect("delete");
    assert_eq!(file.links(), 1);
    fixture.view().delete_file(&fixture.path("/b"), DeleteMode::Any).expect("delete");
    assert_eq!(file.links(), 0);
}

#[test]
fn both_links_observe_the_same_file_key() {
    let fixture = Fixture::new();
    fixture.write_file("/a", b"x");
    fixture.view().link(&fixture.path("/b"), fixture.view(), &fixture.path("/a")).expect("link");

    let a = fixture.view().get_attribute(&fixture.path("/a"), "fileKey", true).expect("attr");
    let b = fixture.view().get_attribute(&fixture.path("/b"), "fileKey", true).expect("attr");
    assert_eq!(a, b);
}

#[test]
fn linking_directories_or_symlinks_is_rejected() {
    let fixture = Fixture::new();
    fixture.mkdir("/d");
    fixture.symlink("/l", "/d");

    for source in ["/d", "/l"] {
        let err = fixture
            .view()
            .link(&fixture.path("/copy"), fixture.view(), &fixture.path(source))
            .expect_err("only regular files can be hard-linked");
        assert!(matches!(err, Error::UnsupportedOperation(_)));
    }
}

#[test]
fn link_requires_feature_and_absence() {
    let fixture = Fixture::new();
    fixture.write_file("/a", b"x");
    fixture.write_file("/b", b"y");

    assert!(matches!(
        fixture.view().link(&fixture.path("/b"), fixture.view(), &fixture.path("/a")),
        Err(Error::FileAlreadyExists(_))
    ));

    let gated = Fixture::with_config(
        Config::unix().set_working_directory("/").set_features(Features::all() - Features::LINKS),
    );
    gated.write_file("/a", b"x");
    assert!(matches!(
        gated.view().link(&gated.path("/b"), gated.view(), &gated.path("/a")),
        Err(Error::UnsupportedOperation(_))
    ));
}

#[test]
fn link_to_missing_file_fails() {
    let fixture = Fixture::new();
    assert!(matches!(
        fixture.view().link(&fixture.path("/b"), fixture.view(), &fixture.path("/a")),
        Err(Error::NoSuchFile(_))
    ));
}
