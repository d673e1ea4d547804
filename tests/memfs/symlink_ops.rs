use heapfs::{Config, Error, Features};

use super::common::Fixture;

#[test]
fn symlinks_read_back_their_target() {
    let fixture = Fixture::new();
    fixture.mkdir("/target");
    fixture.symlink("/alias", "/target");

    let target = fixture.view().read_symbolic_link(&fixture.path("/alias")).expect("is a link");
    assert_eq!(target, fixture.path("/target"));
}

#[test]
fn read_symbolic_link_rejects_non_links() {
    let fixture = Fixture::new();
    fixture.mkdir("/d");
    assert!(matches!(
        fixture.view().read_symbolic_link(&fixture.path("/d")),
        Err(Error::NotLink(_))
    ));
    assert!(matches!(
        fixture.view().read_symbolic_link(&fixture.path("/missing")),
        Err(Error::NoSuchFile(_))
    ));
}

#[test]
fn reads_resolve_through_symlinks() {
    let fixture = Fixture::new();
    fixture.mkdir("/real");
    fixture.write_file("/real/f", b"via link");
    fixture.symlink("/l", "/real");

    assert_eq!(fixture.read_file("/l/f"), b"via link");
}

#[test]
fn writes_through_dangling_symlinks_create_the_target() {
    let fixture = Fixture::new();
    fixture.symlink("/l", "/target");
    fixture.write_file("/l", b"created");
    assert_eq!(fixture.read_file("/target"), b"created");
}

#[test]
fn symlink_cycles_fail_with_the_depth_error() {
    let fixture = Fixture::new();
    fixture.symlink("/l1", "/l2");
    fixture.symlink("/l2", "/l1");

    match fixture.view().check_access(&fixture.path("/l1")) {
        Err(Error::TooManySymbolicLinks(path)) => assert_eq!(path, "/l1"),
        other => panic!("expected a symlink depth error, got {other:?}"),
    }

    // Without following, the link file itself is visible.
    let target = fixture.view().read_symbolic_link(&fixture.path("/l1")).expect("link exists");
    assert_eq!(target, fixture.path("/l2"));
}

#[test]
fn long_chains_resolve_up_to_the_cap() {
    let fixture = Fixture::new();
    fixture.write_file("/end", b"deep");
    // 40 links in a row are fine; the 41st is not.
    fixture.symlink("/c0", "/end");
    for i in 1..=40 {
        fixture.symlink(&format!("/c{i}"), &format!("/c{}", i - 1));
    }

    assert_eq!(fixture.read_file("/c39"), b"deep");
    assert!(matches!(
        fixture.view().check_access(&fixture.path("/c40")),
        Err(Error::TooManySymbolicLinks(_))
    ));
}

#[test]
fn symlink_feature_can_be_disabled() {
    let fixture = Fixture::with_config(
        Config::unix()
            .set_working_directory("/")
            .set_features(Features::all() - Features::SYMBOLIC_LINKS),
    );
    let err = fixture
        .view()
        .create_symbolic_link(&fixture.path("/l"), &fixture.path("/t"), &[])
        .expect_err("feature disabled");
    assert!(matches!(err, Error::UnsupportedOperation(_)));
}

#[test]
fn delete_removes_the_link_not_the_target() {
    let fixture = Fixture::new();
    fixture.write_file("/real", b"stay");
    fixture.symlink("/l", "/real");

    fixture.view().delete_file(&fixture.path("/l"), heapfs::DeleteMode::Any).expect("delete link");
    assert_eq!(fixture.read_file("/real"), b"stay");
    assert!(matches!(
        fixture.view().check_access(&fixture.path("/l")),
        Err(Error::NoSuchFile(_))
    ));
}
