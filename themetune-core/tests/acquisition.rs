mod support;

use std::{
    fs,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use tempfile::TempDir;
use themetune_core::{
    AcquisitionReport, MappingStore, Result, ThemeAcquisition,
    domain::{LibraryEntity, ResolutionConfiguration},
    ports::ConfigurationPersistence,
};

use support::{FailingCatalog, Script, ScriptedSource, StaticCatalog, memory_store, series_in};

fn acquisition(
    entities: Vec<LibraryEntity>,
    source: Arc<ScriptedSource>,
    store: Arc<MappingStore>,
) -> ThemeAcquisition {
    ThemeAcquisition::new(Arc::new(StaticCatalog::new(entities)), store, source)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_more_than_three_fetches_in_flight() {
    let root = TempDir::new().unwrap();
    let entities: Vec<_> = (0..10)
        .map(|i| series_in(&root, &format!("Show {i}"), Some(&format!("{}", 1000 + i))))
        .collect();
    let source = Arc::new(
        ScriptedSource::new(Script::Audio(b"ID3theme")).with_delay(Duration::from_millis(40)),
    );
    let (store, persistence) = memory_store(ResolutionConfiguration::default());

    let report = acquisition(entities.clone(), source.clone(), store.clone())
        .acquire_all()
        .await
        .unwrap();

    assert!(source.peak_concurrency() <= 3, "peak was {}", source.peak_concurrency());
    assert_eq!(report.attempted, 10);
    assert_eq!(report.downloaded, 10);
    assert_eq!(store.len(), 10);
    assert_eq!(persistence.saved().mappings.len(), 10);
    for entity in &entities {
        let target = entity.path.join("theme.mp3");
        assert_eq!(fs::read(&target).unwrap(), b"ID3theme");
        assert_eq!(store.lookup(entity.id), Some(target));
    }
}

#[tokio::test]
async fn fetches_start_in_catalog_order() {
    let root = TempDir::new().unwrap();
    let entities: Vec<_> = (0..6)
        .map(|i| series_in(&root, &format!("Show {i}"), Some(&format!("{i}"))))
        .collect();
    let source = Arc::new(ScriptedSource::new(Script::NotFound));
    let (store, _) = memory_store(ResolutionConfiguration::default());

    ThemeAcquisition::new_with_concurrency(
        Arc::new(StaticCatalog::new(entities)),
        store,
        source.clone(),
        1,
    )
    .acquire_all()
    .await
    .unwrap();

    assert_eq!(source.calls(), vec!["0", "1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn not_found_writes_nothing_while_success_writes_one_file() {
    let root = TempDir::new().unwrap();
    let missing = series_in(&root, "Obscure", Some("404"));
    let present = series_in(&root, "Lost", Some("73739"));
    let source = Arc::new(
        ScriptedSource::new(Script::NotFound).with("73739", Script::Audio(b"ID3lost")),
    );
    let (store, persistence) = memory_store(ResolutionConfiguration::default());

    let report = acquisition(vec![missing.clone(), present.clone()], source, store.clone())
        .acquire_all()
        .await
        .unwrap();

    assert_eq!(
        report,
        AcquisitionReport {
            attempted: 2,
            downloaded: 1,
            not_available: 1,
            ..Default::default()
        }
    );
    assert_eq!(fs::read_dir(&missing.path).unwrap().count(), 0);
    assert_eq!(store.lookup(missing.id), None);

    let files: Vec<_> = fs::read_dir(&present.path).unwrap().collect();
    assert_eq!(files.len(), 1);
    assert_eq!(store.lookup(present.id), Some(present.path.join("theme.mp3")));
    assert_eq!(persistence.saved().mappings.len(), 1);
}

#[tokio::test]
async fn custom_path_downloads_are_named_after_tvdb_id() {
    let root = TempDir::new().unwrap();
    let custom = root.path().join("themes");
    let entity = series_in(&root, "Lost", Some("73739"));
    let source = Arc::new(ScriptedSource::new(Script::Audio(b"ID3lost")));
    let (store, _) = memory_store(ResolutionConfiguration {
        custom_theme_songs_path: custom.to_string_lossy().into_owned(),
        ..Default::default()
    });

    let report = acquisition(vec![entity.clone()], source, store.clone())
        .acquire_all()
        .await
        .unwrap();

    let expected = custom.join("73739.mp3");
    assert_eq!(report.downloaded, 1);
    assert_eq!(fs::read(&expected).unwrap(), b"ID3lost");
    assert_eq!(store.lookup(entity.id), Some(expected));
    assert_eq!(fs::read_dir(&entity.path).unwrap().count(), 0);
}

#[tokio::test]
async fn unusable_custom_path_downloads_into_series_folder() {
    let root = TempDir::new().unwrap();
    let blocker = root.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();
    let entity = series_in(&root, "Lost", Some("73739"));
    let source = Arc::new(ScriptedSource::new(Script::Audio(b"ID3lost")));
    let (store, _) = memory_store(ResolutionConfiguration {
        custom_theme_songs_path: blocker.join("themes").to_string_lossy().into_owned(),
        ..Default::default()
    });

    let report = acquisition(vec![entity.clone()], source, store.clone())
        .acquire_all()
        .await
        .unwrap();

    let expected = entity.path.join("theme.mp3");
    assert_eq!(report.downloaded, 1);
    assert_eq!(fs::read(&expected).unwrap(), b"ID3lost");
    assert_eq!(store.lookup(entity.id), Some(expected));
}

/// Save that waits until another task on the runtime releases it.
#[derive(Default)]
struct HandshakePersistence {
    saving: AtomicBool,
    released: AtomicBool,
    saw_release: AtomicBool,
}

impl ConfigurationPersistence for HandshakePersistence {
    fn load(&self) -> Result<ResolutionConfiguration> {
        Ok(ResolutionConfiguration::default())
    }

    fn save(&self, _config: &ResolutionConfiguration) -> Result<()> {
        self.saving.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if self.released.load(Ordering::SeqCst) {
                self.saw_release.store(true, Ordering::SeqCst);
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }
}

// Single-threaded runtime: the releasing task can only run if the save is
// not holding the runtime thread.
#[tokio::test]
async fn registration_leaves_the_runtime_thread_free() {
    let root = TempDir::new().unwrap();
    let entity = series_in(&root, "Lost", Some("73739"));
    let persistence = Arc::new(HandshakePersistence::default());
    let store = Arc::new(MappingStore::open(persistence.clone()).unwrap());
    let source = Arc::new(ScriptedSource::new(Script::Audio(b"ID3")));

    let releaser = {
        let persistence = Arc::clone(&persistence);
        tokio::spawn(async move {
            while !persistence.saving.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            persistence.released.store(true, Ordering::SeqCst);
        })
    };

    let report = acquisition(vec![entity.clone()], source, store.clone())
        .acquire_all()
        .await
        .unwrap();
    releaser.await.unwrap();

    assert_eq!(report.downloaded, 1);
    assert!(persistence.saw_release.load(Ordering::SeqCst));
    assert_eq!(store.lookup(entity.id), Some(entity.path.join("theme.mp3")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_failing_entity_never_stops_the_others() {
    let root = TempDir::new().unwrap();
    let entities = vec![
        series_in(&root, "Server Error", Some("500")),
        series_in(&root, "Offline", Some("1")),
        series_in(&root, "Exploding", Some("2")),
        series_in(&root, "Truncated", Some("3")),
        series_in(&root, "Fine", Some("4")),
    ];
    let source = Arc::new(
        ScriptedSource::new(Script::Audio(b"ID3ok"))
            .with("500", Script::Status(500))
            .with("1", Script::Transport)
            .with("2", Script::Panic)
            .with("3", Script::BrokenBody),
    );
    let (store, _) = memory_store(ResolutionConfiguration::default());

    let report = acquisition(entities.clone(), source, store.clone())
        .acquire_all()
        .await
        .unwrap();

    assert_eq!(
        report,
        AcquisitionReport {
            attempted: 5,
            downloaded: 1,
            not_available: 0,
            http_errors: 1,
            transport_errors: 1,
            failed: 2,
        }
    );
    assert_eq!(store.len(), 1);
    assert_eq!(store.lookup(entities[4].id), Some(entities[4].path.join("theme.mp3")));
    assert_eq!(fs::read_dir(&entities[3].path).unwrap().count(), 0);
}

#[tokio::test]
async fn entities_with_theme_songs_or_without_tvdb_are_skipped() {
    let root = TempDir::new().unwrap();
    let has_theme = series_in(&root, "Has Theme", Some("10")).with_theme_song_count(1);
    let no_tvdb = series_in(&root, "No Tvdb", None);
    let source = Arc::new(ScriptedSource::new(Script::Audio(b"ID3")));
    let (store, _) = memory_store(ResolutionConfiguration::default());

    let report = acquisition(vec![has_theme, no_tvdb], source.clone(), store)
        .acquire_all()
        .await
        .unwrap();

    assert_eq!(report.attempted, 0);
    assert!(source.calls().is_empty());
}

#[tokio::test]
async fn registration_failure_is_counted_as_failed() {
    let root = TempDir::new().unwrap();
    let entity = series_in(&root, "Lost", Some("73739"));
    let source = Arc::new(ScriptedSource::new(Script::Audio(b"ID3")));
    let (store, persistence) = memory_store(ResolutionConfiguration::default());
    persistence.set_fail_saves(true);

    let report = acquisition(vec![entity.clone()], source, store.clone())
        .acquire_all()
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(store.lookup(entity.id), None);
}

#[tokio::test]
async fn catalog_failure_is_returned() {
    let (store, _) = memory_store(ResolutionConfiguration::default());
    let source = Arc::new(ScriptedSource::new(Script::NotFound));

    let result = ThemeAcquisition::new(Arc::new(FailingCatalog), store, source)
        .acquire_all()
        .await;

    assert!(result.is_err());
}
