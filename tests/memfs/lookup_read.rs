use heapfs::{Config, Error, FsPath, Name};

use super::common::Fixture;

#[test]
fn the_configured_working_directory_is_created() {
    // The unix preset works in /work, created at construction.
    let fixture = Fixture::with_config(Config::unix());
    fixture.view().check_access(&fixture.path("/work")).expect("exists at startup");

    fixture.write_file("f", b"relative");
    assert_eq!(fixture.read_file("/work/f"), b"relative");
}

#[test]
fn check_access_follows_the_tree() {
    let fixture = Fixture::new();
    fixture.mkdir("/a");
    fixture.write_file("/a/f", b"data");

    fixture.view().check_access(&fixture.path("/a/f")).expect("exists");
    assert!(matches!(
        fixture.view().check_access(&fixture.path("/a/g")),
        Err(Error::NoSuchFile(_))
    ));
    assert!(matches!(
        fixture.view().check_access(&fixture.path("/b/f")),
        Err(Error::NoSuchFile(_))
    ));
}

#[test]
fn relative_paths_resolve_against_the_working_directory() {
    let fixture = Fixture::new();
    fixture.mkdir("/a");
    fixture.write_file("/a/f", b"data");

    let relative = fixture.path("a/f");
    fixture.view().check_access(&relative).expect("resolves relative to /");
    assert_eq!(fixture.read_file("a/f"), b"data");
}

#[test]
fn to_real_path_canonicalises() {
    let fixture = Fixture::new();
    fixture.mkdir("/a");
    fixture.mkdir("/a/b");

    let service = fixture.view().store().service().clone();
    let real = fixture
        .view()
        .to_real_path(&fixture.path("/a/./b/../b"), true)
        .expect("resolves");
    assert_eq!(service.to_string(&real), "/a/b");

    let relative = fixture.view().to_real_path(&fixture.path("a/b"), true).expect("resolves");
    assert_eq!(service.to_string(&relative), "/a/b");

    let root = fixture.view().to_real_path(&fixture.path("/"), true).expect("resolves");
    assert_eq!(service.to_string(&root), "/");
}

#[test]
fn to_real_path_resolves_symlinks() {
    let fixture = Fixture::new();
    fixture.mkdir("/target");
    fixture.symlink("/alias", "/target");

    let service = fixture.view().store().service().clone();
    let followed = fixture.view().to_real_path(&fixture.path("/alias"), true).expect("resolves");
    assert_eq!(service.to_string(&followed), "/target");

    let unfollowed =
        fixture.view().to_real_path(&fixture.path("/alias"), false).expect("resolves");
    assert_eq!(service.to_string(&unfollowed), "/alias");
}

#[test]
fn empty_path_does_not_exist() {
    let fixture = Fixture::new();
    let empty = FsPath::empty();
    assert!(matches!(fixture.view().check_access(&empty), Err(Error::NoSuchFile(_))));
}

#[test]
fn directory_stream_lists_in_display_order() {
    let fixture = Fixture::new();
    fixture.mkdir("/d");
    fixture.write_file("/d/b", b"");
    fixture.write_file("/d/a", b"");
    fixture.mkdir("/d/c");

    let stream = fixture.view().new_directory_stream(&fixture.path("/d")).expect("opens");
    let names: Vec<String> = stream
        .map(|path| path.file_name().map(Name::display).unwrap_or_default().to_owned())
        .collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[test]
fn directory_stream_requires_a_directory() {
    let fixture = Fixture::new();
    fixture.write_file("/f", b"");
    assert!(matches!(
        fixture.view().new_directory_stream(&fixture.path("/f")),
        Err(Error::NotDirectory(_))
    ));
}
