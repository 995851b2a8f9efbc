#![allow(dead_code)]

use std::{
    collections::HashMap,
    io,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use parking_lot::Mutex;
use reqwest::StatusCode;
use tempfile::TempDir;

use themetune_core::{
    MappingStore, Result, ThemeError,
    acquisition::{FetchOutcome, ThemeSource},
    domain::{
        EntityId, EntityQuery, LibraryEntity, MetadataProvider, ResolutionConfiguration,
    },
    ports::{LibraryCatalog, MemoryConfigurationPersistence},
};

pub struct StaticCatalog {
    entities: Vec<LibraryEntity>,
}

impl StaticCatalog {
    pub fn new(entities: Vec<LibraryEntity>) -> Self {
        Self { entities }
    }
}

#[async_trait]
impl LibraryCatalog for StaticCatalog {
    async fn list_entities(&self, query: &EntityQuery) -> Result<Vec<LibraryEntity>> {
        Ok(self
            .entities
            .iter()
            .filter(|entity| query.matches(entity))
            .cloned()
            .collect())
    }

    async fn entity(&self, id: EntityId) -> Result<Option<LibraryEntity>> {
        Ok(self.entities.iter().find(|entity| entity.id == id).cloned())
    }
}

pub struct FailingCatalog;

#[async_trait]
impl LibraryCatalog for FailingCatalog {
    async fn list_entities(&self, _query: &EntityQuery) -> Result<Vec<LibraryEntity>> {
        Err(ThemeError::Internal("catalog offline".into()))
    }

    async fn entity(&self, _id: EntityId) -> Result<Option<LibraryEntity>> {
        Ok(None)
    }
}

#[derive(Debug, Clone)]
pub enum Script {
    Audio(&'static [u8]),
    NotFound,
    Status(u16),
    Transport,
    BrokenBody,
    Panic,
}

/// In-process theme source that answers from a script and records how many
/// fetches overlap.
pub struct ScriptedSource {
    scripts: HashMap<String, Script>,
    fallback: Script,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new(fallback: Script) -> Self {
        Self {
            scripts: HashMap::new(),
            fallback,
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, provider_id: &str, script: Script) -> Self {
        self.scripts.insert(provider_id.to_string(), script);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ThemeSource for ScriptedSource {
    fn source_url(&self, provider_id: &str) -> String {
        format!("scripted://{provider_id}.mp3")
    }

    async fn fetch(&self, provider_id: &str) -> FetchOutcome {
        self.calls.lock().push(provider_id.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let script = self
            .scripts
            .get(provider_id)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());

        match script {
            Script::Audio(bytes) => FetchOutcome::Found(
                stream::iter(vec![Ok(Bytes::from_static(bytes))]).boxed(),
            ),
            Script::NotFound => FetchOutcome::NotFound,
            Script::Status(code) => {
                FetchOutcome::HttpStatus(StatusCode::from_u16(code).unwrap())
            }
            Script::Transport => FetchOutcome::Transport("connection refused".into()),
            Script::BrokenBody => FetchOutcome::Found(
                stream::iter(vec![
                    Ok(Bytes::from_static(b"ID3")),
                    Err(ThemeError::Io(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "reset mid-body",
                    ))),
                ])
                .boxed(),
            ),
            Script::Panic => panic!("scripted source exploded for {provider_id}"),
        }
    }
}

pub fn memory_store(
    record: ResolutionConfiguration,
) -> (Arc<MappingStore>, Arc<MemoryConfigurationPersistence>) {
    let persistence = Arc::new(MemoryConfigurationPersistence::new(record));
    let store = Arc::new(MappingStore::open(persistence.clone()).unwrap());
    (store, persistence)
}

/// Series with its own folder under `root`.
pub fn series_in(root: &TempDir, name: &str, tvdb: Option<&str>) -> LibraryEntity {
    let dir = root.path().join("tv").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    let entity = LibraryEntity::series(EntityId::new(), name, dir);
    match tvdb {
        Some(id) => entity.with_provider_id(MetadataProvider::Tvdb, id),
        None => entity,
    }
}
