use heapfs::{Config, Error};

use super::common::Fixture;

fn windows() -> Fixture {
    Fixture::with_config(Config::windows().set_working_directory("C:\\"))
}

#[test]
fn case_insensitive_lookup_preserves_display_form() {
    let fixture = windows();
    fixture.mkdir("C:\\foo");

    // Opening by another case reaches the same file.
    fixture.view().check_access(&fixture.path("C:\\FOO")).expect("same file");
    assert_eq!(fixture.path("C:\\foo"), fixture.path("C:\\FOO"));

    // The stored display form is the one used at creation.
    let service = fixture.view().store().service().clone();
    let real = fixture.view().to_real_path(&fixture.path("C:\\FOO"), true).expect("resolves");
    assert_eq!(service.to_string(&real), "C:\\foo");
}

#[test]
fn unix_lookup_is_case_sensitive() {
    let fixture = Fixture::new();
    fixture.mkdir("/foo");
    assert!(matches!(
        fixture.view().check_access(&fixture.path("/FOO")),
        Err(Error::NoSuchFile(_))
    ));
}

#[test]
fn uris_round_trip_through_the_instance() {
    let fixture = Fixture::new();
    let path = fixture.path("/a/b/c");
    let uri = fixture.fs.to_uri(&path).expect("absolute path");
    assert_eq!(uri, "heapfs://test/a/b/c");
    assert_eq!(fixture.fs.from_uri(&uri).expect("parses"), path);
}

#[test]
fn windows_uris_carry_the_drive() {
    let fixture = windows();
    let path = fixture.path("C:\\a\\b");
    let uri = fixture.fs.to_uri(&path).expect("absolute path");
    assert_eq!(uri, "heapfs://test/C:/a/b");
    assert_eq!(fixture.fs.from_uri(&uri).expect("parses"), path);
}

#[test]
fn parse_round_trips_absolute_paths() {
    let fixture = Fixture::new();
    let service = fixture.view().store().service().clone();
    for raw in ["/", "/a", "/a/b/c"] {
        let path = fixture.path(raw);
        assert_eq!(service.to_string(&path), raw);
        assert_eq!(fixture.path(&service.to_string(&path)), path);
    }
}

#[test]
fn nul_bytes_are_invalid_on_unix() {
    let fixture = Fixture::new();
    assert!(matches!(fixture.fs.path("/a\0b"), Err(Error::InvalidPath(_))));
}

#[test]
fn reserved_characters_are_invalid_on_windows() {
    let fixture = windows();
    assert!(matches!(fixture.fs.path("C:\\a|b"), Err(Error::InvalidPath(_))));
}
