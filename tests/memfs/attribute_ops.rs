use heapfs::{AttrValue, Config, Error, FileTime};

use super::common::Fixture;

fn posix_fixture() -> Fixture {
    Fixture::with_config(
        Config::unix()
            .set_working_directory("/")
            .set_attribute_views(&["basic", "posix", "user"]),
    )
}

#[test]
fn basic_attributes_reflect_the_file() {
    let fixture = Fixture::new();
    fixture.write_file("/f", b"12345");

    let view = fixture.view();
    assert_eq!(
        view.get_attribute(&fixture.path("/f"), "size", true).expect("attr"),
        AttrValue::Int(5)
    );
    assert_eq!(
        view.get_attribute(&fixture.path("/f"), "isRegularFile", true).expect("attr"),
        AttrValue::Bool(true)
    );
    assert_eq!(
        view.get_attribute(&fixture.path("/f"), "basic:isDirectory", true).expect("attr"),
        AttrValue::Bool(false)
    );
}

#[test]
fn file_times_can_be_set() {
    let fixture = Fixture::new();
    fixture.write_file("/f", b"");

    let stamp = AttrValue::Time(FileTime::new(1234, 5));
    fixture
        .view()
        .set_attribute(&fixture.path("/f"), "lastModifiedTime", stamp.clone(), true)
        .expect("set");
    assert_eq!(
        fixture.view().get_attribute(&fixture.path("/f"), "lastModifiedTime", true).expect("get"),
        stamp
    );
}

#[test]
fn posix_view_reads_through_inheritance() {
    let fixture = posix_fixture();
    fixture.write_file("/f", b"x");

    let all = fixture.view().read_attributes(&fixture.path("/f"), "posix:*", true).expect("bulk");
    let keys: Vec<&str> = all.iter().map(|(k, _)| k.as_str()).collect();
    for expected in ["permissions", "group", "owner", "size", "fileKey", "isDirectory"] {
        assert!(keys.contains(&expected), "missing {expected}");
    }
}

#[test]
fn default_attribute_values_apply_at_creation() {
    let fixture = Fixture::with_config(
        Config::unix()
            .set_working_directory("/")
            .set_attribute_views(&["basic", "posix"])
            .set_default_attribute_value("posix:permissions", AttrValue::String("rwxr-x---".into())),
    );
    fixture.write_file("/f", b"");
    assert_eq!(
        fixture.view().get_attribute(&fixture.path("/f"), "posix:permissions", true).expect("get"),
        AttrValue::String("rwxr-x---".into())
    );
}

#[test]
fn user_attributes_round_trip_bytes() {
    let fixture = posix_fixture();
    fixture.write_file("/f", b"");

    fixture
        .view()
        .set_attribute(
            &fixture.path("/f"),
            "user:checksum",
            AttrValue::Bytes(vec![0xde, 0xad]),
            true,
        )
        .expect("set");
    let listed =
        fixture.view().read_attributes(&fixture.path("/f"), "user:*", true).expect("bulk");
    assert_eq!(listed, vec![("checksum".to_owned(), AttrValue::Bytes(vec![0xde, 0xad]))]);
}

#[test]
fn comma_lists_read_selected_attributes() {
    let fixture = Fixture::new();
    fixture.write_file("/f", b"ab");
    let some = fixture
        .view()
        .read_attributes(&fixture.path("/f"), "basic:size,isRegularFile", true)
        .expect("bulk");
    assert_eq!(some.len(), 2);
    assert_eq!(some[0], ("size".to_owned(), AttrValue::Int(2)));
}

#[test]
fn malformed_specs_and_unknown_views_fail() {
    let fixture = Fixture::new();
    fixture.write_file("/f", b"");

    assert!(matches!(
        fixture.view().get_attribute(&fixture.path("/f"), "bogus:attr", true),
        Err(Error::UnsupportedOperation(_))
    ));
    assert!(matches!(
        fixture.view().get_attribute(&fixture.path("/f"), ":attr", true),
        Err(Error::IllegalArgument(_))
    ));
    assert!(matches!(
        fixture.view().get_attribute(&fixture.path("/f"), "basic:a:b", true),
        Err(Error::IllegalArgument(_))
    ));
}

#[test]
fn nofollow_reads_the_link_itself() {
    let fixture = Fixture::new();
    fixture.write_file("/real", b"content");
    fixture.symlink("/l", "/real");

    assert_eq!(
        fixture.view().get_attribute(&fixture.path("/l"), "isSymbolicLink", false).expect("attr"),
        AttrValue::Bool(true)
    );
    assert_eq!(
        fixture.view().get_attribute(&fixture.path("/l"), "isSymbolicLink", true).expect("attr"),
        AttrValue::Bool(false)
    );
}
