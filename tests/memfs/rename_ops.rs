use heapfs::{CopyOptions, Error};

use super::common::Fixture;

fn move_options() -> CopyOptions {
    CopyOptions { atomic_move: true, ..CopyOptions::default() }
}

#[test]
fn moves_relink_files_in_place() {
    let fixture = Fixture::new();
    fixture.mkdir("/a");
    fixture.mkdir("/b");
    fixture.write_file("/a/f", b"payload");

    fixture
        .view()
        .copy(&fixture.path("/a/f"), fixture.view(), &fixture.path("/b/g"), move_options(), true)
        .expect("move");

    assert_eq!(fixture.read_file("/b/g"), b"payload");
    assert!(matches!(
        fixture.view().check_access(&fixture.path("/a/f")),
        Err(Error::NoSuchFile(_))
    ));
}

#[test]
fn moving_keeps_the_file_identity() {
    let fixture = Fixture::new();
    fixture.write_file("/f", b"id");
    let before = fixture.view().get_attribute(&fixture.path("/f"), "fileKey", true).expect("attr");

    fixture
        .view()
        .copy(&fixture.path("/f"), fixture.view(), &fixture.path("/g"), move_options(), true)
        .expect("move");
    let after = fixture.view().get_attribute(&fixture.path("/g"), "fileKey", true).expect("attr");
    assert_eq!(before, after);
}

#[test]
fn moving_a_directory_carries_its_subtree() {
    let fixture = Fixture::new();
    fixture.mkdir("/dir");
    fixture.mkdir("/dir/sub");
    fixture.write_file("/dir/sub/f", b"deep");

    fixture
        .view()
        .copy(&fixture.path("/dir"), fixture.view(), &fixture.path("/moved"), move_options(), true)
        .expect("move");

    assert_eq!(fixture.read_file("/moved/sub/f"), b"deep");
    let real = fixture.view().to_real_path(&fixture.path("/moved/sub/.."), true).expect("resolve");
    assert_eq!(fixture.view().store().service().to_string(&real), "/moved");
}

#[test]
fn moving_a_directory_into_itself_fails() {
    let fixture = Fixture::new();
    fixture.mkdir("/a");
    fixture.mkdir("/a/b");

    let err = fixture
        .view()
        .copy(&fixture.path("/a"), fixture.view(), &fixture.path("/a/b/c"), move_options(), true)
        .expect_err("cycle");
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn move_replaces_only_when_asked() {
    let fixture = Fixture::new();
    fixture.write_file("/src", b"new");
    fixture.write_file("/dst", b"old");

    assert!(matches!(
        fixture.view().copy(
            &fixture.path("/src"),
            fixture.view(),
            &fixture.path("/dst"),
            move_options(),
            true
        ),
        Err(Error::FileAlreadyExists(_))
    ));

    let mut options = move_options();
    options.replace_existing = true;
    fixture
        .view()
        .copy(&fixture.path("/src"), fixture.view(), &fixture.path("/dst"), options, true)
        .expect("replace");
    assert_eq!(fixture.read_file("/dst"), b"new");
}

#[test]
fn replace_refuses_non_empty_directories() {
    let fixture = Fixture::new();
    fixture.write_file("/src", b"x");
    fixture.mkdir("/dst");
    fixture.write_file("/dst/occupied", b"y");

    let mut options = move_options();
    options.replace_existing = true;
    let err = fixture
        .view()
        .copy(&fixture.path("/src"), fixture.view(), &fixture.path("/dst"), options, true)
        .expect_err("directory not empty");
    assert!(matches!(err, Error::DirectoryNotEmpty(_)));
}

#[test]
fn moves_take_the_symlink_itself() {
    let fixture = Fixture::new();
    fixture.write_file("/real", b"data");
    fixture.symlink("/l", "/real");

    fixture
        .view()
        .copy(&fixture.path("/l"), fixture.view(), &fixture.path("/l2"), move_options(), true)
        .expect("move link");

    let target = fixture.view().read_symbolic_link(&fixture.path("/l2")).expect("still a link");
    assert_eq!(target, fixture.path("/real"));
}

#[test]
fn copy_duplicates_content_and_identity() {
    let fixture = Fixture::new();
    fixture.write_file("/src", b"copy me");

    fixture
        .view()
        .copy(
            &fixture.path("/src"),
            fixture.view(),
            &fixture.path("/dst"),
            CopyOptions::default(),
            false,
        )
        .expect("copy");

    assert_eq!(fixture.read_file("/dst"), b"copy me");
    // Writes to the copy do not reach the original.
    fixture.append_file("/dst", b" too");
    assert_eq!(fixture.read_file("/src"), b"copy me");

    let src = fixture.view().get_attribute(&fixture.path("/src"), "fileKey", true).expect("attr");
    let dst = fixture.view().get_attribute(&fixture.path("/dst"), "fileKey", true).expect("attr");
    assert_ne!(src, dst);
}

#[test]
fn copy_follows_symlinks_by_default() {
    let fixture = Fixture::new();
    fixture.write_file("/real", b"data");
    fixture.symlink("/l", "/real");

    fixture
        .view()
        .copy(
            &fixture.path("/l"),
            fixture.view(),
            &fixture.path("/copied"),
            CopyOptions::default(),
            false,
        )
        .expect("copy");

    // The copy is a regular file, not a link.
    assert!(matches!(
        fixture.view().read_symbolic_link(&fixture.path("/copied")),
        Err(Error::NotLink(_))
    ));
    assert_eq!(fixture.read_file("/copied"), b"data");
}

#[test]
fn atomic_move_is_rejected_for_copies() {
    let fixture = Fixture::new();
    fixture.write_file("/src", b"x");
    let err = fixture
        .view()
        .copy(&fixture.path("/src"), fixture.view(), &fixture.path("/dst"), move_options(), false)
        .expect_err("atomic copy");
    assert!(matches!(err, Error::UnsupportedOperation(_)));
}

#[test]
fn views_over_one_store_cooperate() {
    let fixture = Fixture::new();
    fixture.mkdir("/inbox");
    fixture.write_file("/f", b"payload");

    // A second view whose working directory is /inbox; the relative
    // destination resolves there.
    let inbox = fixture.fs.view_at(&fixture.path("/inbox")).expect("view");
    fixture
        .view()
        .copy(&fixture.path("/f"), &inbox, &fixture.path("dropped"), CopyOptions::default(), false)
        .expect("cross-view copy");
    assert_eq!(fixture.read_file("/inbox/dropped"), b"payload");
}

#[test]
fn cross_instance_operations_are_rejected() {
    let first = Fixture::new();
    let second = Fixture::new();
    first.write_file("/f", b"x");

    assert!(matches!(
        first.view().copy(
            &first.path("/f"),
            second.view(),
            &second.path("/f"),
            CopyOptions::default(),
            false
        ),
        Err(Error::ProviderMismatch)
    ));
    assert!(matches!(
        second.view().link(&second.path("/l"), first.view(), &first.path("/f")),
        Err(Error::ProviderMismatch)
    ));
}

#[test]
fn copy_to_the_same_file_is_a_no_op() {
    let fixture = Fixture::new();
    fixture.write_file("/f", b"same");
    fixture
        .view()
        .copy(
            &fixture.path("/f"),
            fixture.view(),
            &fixture.path("/f"),
            CopyOptions::default(),
            false,
        )
        .expect("no-op");
    assert_eq!(fixture.read_file("/f"), b"same");
}
