//! Testing utilities for the Lira workspace
//!
//! Demo project fixtures, fake remotes, writers and observers.

#![allow(missing_docs)]

use async_trait::async_trait;
use lira_core::{BackupLocator, ChangeOrchestrator, FileWriter, ProgressionObserver, WriteError};
use lira_patch::{PatchConfig, PatchGenerator, RemoteError, RemoteGenerator};
use lira_progression::{MemoryStore, ProgressionState, ProgressionStore};
use lira_routing::{FileEntry, FileKind, InMemoryCatalog};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const APP_JS: &str = "// Frontend logic\nclass App {\n    init() {\n        console.log(\"Lira frontend ready\");\n    }\n}\n";
pub const STYLE_CSS: &str = ":root {\n    --primary: #6a5acd;\n}\nbody {\n    margin: 0;\n}\n";
pub const SERVER_PY: &str = "from flask import Flask\n\napp = Flask(__name__)\n\ndef health():\n    return {\"status\": \"ok\"}\n";
pub const IMAGE_PY: &str = "def generate_image(prompt):\n    return None\n";
pub const STT_PY: &str = "def transcribe(audio):\n    return \"\"\n";
pub const MEMORY_PY: &str = "class MemoryManager:\n    def __init__(self):\n        self.files = {}\n";
pub const ROUTER_PY: &str = "def route(request):\n    return \"lira_core/file_router.py\"\n";
pub const PROJECT_MAP: &str = "{\n  \"files\": []\n}\n";

/// The eight files of the demo project
pub fn demo_files() -> Vec<FileEntry> {
    vec![
        FileEntry::new("frontend/app.js", "Chat, voice and input handling", APP_JS, FileKind::Frontend),
        FileEntry::new("frontend/style.css", "Theme, base layout and responsiveness", STYLE_CSS, FileKind::Frontend),
        FileEntry::new("backend/server.py", "HTTP routes and sessions", SERVER_PY, FileKind::Backend),
        FileEntry::new("backend/image_generator.py", "Image generation providers", IMAGE_PY, FileKind::Backend),
        FileEntry::new("backend/stt_engine.py", "Audio to text", STT_PY, FileKind::Backend),
        FileEntry::new("lira_core/memory_manager.py", "How Lira understands its own project", MEMORY_PY, FileKind::Core),
        FileEntry::new("lira_core/file_router.py", "Picks the file a request should change", ROUTER_PY, FileKind::Core),
        FileEntry::new("project_map.json", "Metadata listing the main files", PROJECT_MAP, FileKind::Config),
    ]
}

pub fn demo_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new(demo_files())
}

/// Remote that always answers with the same text
#[derive(Debug)]
pub struct StaticRemote {
    reply: String,
    calls: AtomicUsize,
}

impl StaticRemote {
    pub fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteGenerator for StaticRemote {
    async fn generate(&self, _prompt: &str) -> Result<String, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Remote that always fails
#[derive(Debug)]
pub struct FailingRemote(pub RemoteError);

#[async_trait]
impl RemoteGenerator for FailingRemote {
    async fn generate(&self, _prompt: &str) -> Result<String, RemoteError> {
        Err(self.0.clone())
    }
}

/// Remote that answers after a delay
#[derive(Debug)]
pub struct SlowRemote {
    pub delay: Duration,
    pub reply: String,
}

impl SlowRemote {
    pub fn new(delay: Duration, reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            delay,
            reply: reply.into(),
        })
    }
}

#[async_trait]
impl RemoteGenerator for SlowRemote {
    async fn generate(&self, _prompt: &str) -> Result<String, RemoteError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }
}

/// Writer that keeps every write in memory
#[derive(Debug, Default)]
pub struct RecordingWriter {
    writes: Mutex<Vec<(String, String)>>,
}

impl RecordingWriter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().clone()
    }
}

impl FileWriter for RecordingWriter {
    fn write(&self, path: &str, content: &str) -> Result<Option<BackupLocator>, WriteError> {
        self.writes.lock().push((path.to_string(), content.to_string()));
        Ok(None)
    }

    fn restore(&self, _path: &str, _backup: &BackupLocator) -> Result<String, WriteError> {
        Err(WriteError::Unsupported("restore in recording writer"))
    }

    fn list_backups(&self, _path: &str) -> Result<Vec<BackupLocator>, WriteError> {
        Ok(Vec::new())
    }
}

/// Writer whose writes always fail
#[derive(Debug, Default)]
pub struct FailingWriter;

impl FileWriter for FailingWriter {
    fn write(&self, _path: &str, _content: &str) -> Result<Option<BackupLocator>, WriteError> {
        Err(WriteError::Unsupported("writes disabled"))
    }

    fn restore(&self, _path: &str, _backup: &BackupLocator) -> Result<String, WriteError> {
        Err(WriteError::Unsupported("writes disabled"))
    }

    fn list_backups(&self, _path: &str) -> Result<Vec<BackupLocator>, WriteError> {
        Ok(Vec::new())
    }
}

/// Observer that keeps every state it is shown
#[derive(Debug, Default)]
pub struct RecordingObserver {
    seen: Mutex<Vec<ProgressionState>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<ProgressionState> {
        self.seen.lock().clone()
    }
}

impl ProgressionObserver for RecordingObserver {
    fn on_progression_changed(&self, state: &ProgressionState) {
        self.seen.lock().push(state.clone());
    }
}

/// Orchestrator over the demo project plus handles to inspect it
pub struct TestHarness {
    pub orchestrator: ChangeOrchestrator,
    pub catalog: Arc<InMemoryCatalog>,
    pub writer: Arc<RecordingWriter>,
}

pub fn harness_with_generator(generator: PatchGenerator) -> TestHarness {
    let catalog = Arc::new(demo_catalog());
    let writer = RecordingWriter::new();
    let orchestrator = ChangeOrchestrator::new(
        catalog.clone(),
        writer.clone(),
        Arc::new(ProgressionStore::new(Arc::new(MemoryStore::new()))),
        Arc::new(generator),
    );
    TestHarness {
        orchestrator,
        catalog,
        writer,
    }
}

/// Demo project with the local fallback only
pub fn setup_test_orchestrator() -> TestHarness {
    harness_with_generator(PatchGenerator::new(PatchConfig::default()))
}

/// Demo project with a remote generator
pub fn setup_with_remote(remote: Arc<dyn RemoteGenerator>, timeout: Duration) -> TestHarness {
    harness_with_generator(
        PatchGenerator::new(PatchConfig::default().with_timeout(timeout)).with_remote(remote),
    )
}
