use std::time::Duration;

use heapfs::{Config, DeleteMode, Error, EventKind, Name, PollingWatchService, WatchKey};

use super::common::Fixture;

fn fast_fixture() -> Fixture {
    Fixture::with_config(
        Config::unix()
            .set_working_directory("/")
            .set_watch_poll_interval(Duration::from_millis(20)),
    )
}

fn await_key(service: &PollingWatchService) -> std::sync::Arc<WatchKey> {
    service
        .poll_timeout(Duration::from_secs(5))
        .expect("service open")
        .expect("a key is signalled within the timeout")
}

fn event_names(key: &WatchKey, kind: EventKind) -> Vec<String> {
    key.poll_events()
        .into_iter()
        .filter(|e| e.kind == kind)
        .map(|e| {
            e.context
                .expect("change events carry a name")
                .file_name()
                .map(Name::display)
                .expect("single name context")
                .to_owned()
        })
        .collect()
}

#[test]
fn creations_and_deletions_are_reported() {
    let fixture = fast_fixture();
    fixture.mkdir("/dir");

    let service = fixture.fs.new_watch_service().expect("open service");
    let key = service
        .register(&fixture.path("/dir"), &[EventKind::Create, EventKind::Delete])
        .expect("register");

    fixture.write_file("/dir/x", b"");
    let signalled = await_key(&service);
    assert!(std::sync::Arc::ptr_eq(&signalled, &key));
    assert_eq!(event_names(&signalled, EventKind::Create), ["x"]);
    assert!(signalled.reset());

    fixture.view().delete_file(&fixture.path("/dir/x"), DeleteMode::Any).expect("delete");
    let signalled = await_key(&service);
    assert_eq!(event_names(&signalled, EventKind::Delete), ["x"]);

    service.close();
}

#[test]
fn modifications_are_reported_on_mtime_change() {
    let fixture = fast_fixture();
    fixture.mkdir("/dir");
    fixture.write_file("/dir/f", b"v1");

    let service = fixture.fs.new_watch_service().expect("open service");
    let key =
        service.register(&fixture.path("/dir"), &[EventKind::Modify]).expect("register");

    fixture.write_file("/dir/f", b"v2 with different mtime");
    let signalled = await_key(&service);
    assert!(std::sync::Arc::ptr_eq(&signalled, &key));
    assert_eq!(event_names(&signalled, EventKind::Modify), ["f"]);

    service.close();
}

#[test]
fn unsubscribed_kinds_are_not_reported() {
    let fixture = fast_fixture();
    fixture.mkdir("/dir");

    let service = fixture.fs.new_watch_service().expect("open service");
    let key = service.register(&fixture.path("/dir"), &[EventKind::Delete]).expect("register");

    fixture.write_file("/dir/x", b"");
    assert!(service.poll_timeout(Duration::from_millis(200)).expect("open").is_none());
    assert!(key.poll_events().is_empty());

    service.close();
}

#[test]
fn each_key_signals_once_until_reset() {
    let fixture = fast_fixture();
    fixture.mkdir("/dir");

    let service = fixture.fs.new_watch_service().expect("open service");
    let key = service.register(&fixture.path("/dir"), &[EventKind::Create]).expect("register");

    fixture.write_file("/dir/a", b"");
    let signalled = await_key(&service);
    // More changes accrue events but do not re-enqueue the key.
    fixture.write_file("/dir/b", b"");
    std::thread::sleep(Duration::from_millis(100));
    assert!(service.poll().expect("open").is_none());

    let mut names = event_names(&signalled, EventKind::Create);
    // Depending on poll timing both creations may land in one batch.
    if names.len() == 1 {
        assert!(signalled.reset());
        let signalled = await_key(&service);
        names.extend(event_names(&signalled, EventKind::Create));
    }
    names.sort();
    assert_eq!(names, ["a", "b"]);
    assert!(key.reset());

    service.close();
}

#[test]
fn vanished_directories_cancel_their_keys() {
    let fixture = fast_fixture();
    fixture.mkdir("/dir");

    let service = fixture.fs.new_watch_service().expect("open service");
    let key = service.register(&fixture.path("/dir"), &[EventKind::Create]).expect("register");

    fixture.view().delete_file(&fixture.path("/dir"), DeleteMode::Any).expect("delete watched");
    std::thread::sleep(Duration::from_millis(200));
    assert!(!key.is_valid());
    assert!(!key.reset());

    service.close();
}

#[test]
fn registering_a_non_directory_fails() {
    let fixture = fast_fixture();
    fixture.write_file("/f", b"");

    let service = fixture.fs.new_watch_service().expect("open service");
    assert!(matches!(
        service.register(&fixture.path("/f"), &[EventKind::Create]),
        Err(Error::NotDirectory(_))
    ));
    assert!(matches!(
        service.register(&fixture.path("/dir"), &[]),
        Err(Error::IllegalArgument(_))
    ));

    service.close();
}

#[test]
fn closing_wakes_blocked_takers() {
    let fixture = fast_fixture();
    fixture.mkdir("/dir");

    let service = std::sync::Arc::new(fixture.fs.new_watch_service().expect("open service"));
    service.register(&fixture.path("/dir"), &[EventKind::Create]).expect("register");

    let taker = {
        let service = service.clone();
        std::thread::spawn(move || service.take())
    };
    std::thread::sleep(Duration::from_millis(100));
    service.close();

    let result = taker.join().expect("taker thread finishes");
    assert!(matches!(result, Err(Error::ClosedWatchService)));

    // Closed-service behaviour is sticky and idempotent.
    service.close();
    assert!(matches!(service.poll(), Err(Error::ClosedWatchService)));
    assert!(matches!(
        service.register(&fixture.path("/dir"), &[EventKind::Create]),
        Err(Error::ClosedWatchService)
    ));
}

#[test]
fn closing_the_file_system_closes_the_service() {
    let fixture = fast_fixture();
    fixture.mkdir("/dir");
    let service = fixture.fs.new_watch_service().expect("open service");
    service.register(&fixture.path("/dir"), &[EventKind::Create]).expect("register");

    fixture.fs.close();
    assert!(!service.is_open());
    assert!(matches!(service.take(), Err(Error::ClosedWatchService)));
}
