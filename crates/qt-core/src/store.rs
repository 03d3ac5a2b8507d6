use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::types::{MemoryData, TaskStatus};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("task {id} is {from} and cannot move to {to}")]
    InvalidTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
    #[error("review score {0} is outside 0-100")]
    InvalidScore(i64),
    #[error("project {0} is not active")]
    ProjectNotActive(String),
    #[error("{entity} id already exists: {id}")]
    DuplicateId { entity: &'static str, id: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

/// Where the document lives between process runs.
///
/// `save` always receives the complete document; backends never see partial
/// updates.
pub trait MemoryBackend: Send {
    /// Load the document, or `None` when nothing has been stored yet.
    fn load(&self) -> Result<Option<MemoryData>>;

    /// Replace the stored document.
    fn save(&self, data: &MemoryData) -> Result<()>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Pretty-printed JSON file, rewritten in full on every save.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MemoryBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<MemoryData>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)?;
        let data: MemoryData = serde_json::from_str(&text)?;
        Ok(Some(data))
    }

    fn save(&self, data: &MemoryData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Process-local backend. Clones share the same slot, so a test can keep one
/// handle and reopen a [`Memory`] from it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    slot: Arc<Mutex<Option<MemoryData>>>,
    saves: Arc<Mutex<usize>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last saved document, if any.
    pub fn snapshot(&self) -> Option<MemoryData> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MemoryBackend for InMemoryBackend {
    fn load(&self) -> Result<Option<MemoryData>> {
        Ok(self.snapshot())
    }

    fn save(&self, data: &MemoryData) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(data.clone());
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// The in-memory document plus the backend it is written through.
///
/// There is no internal locking: callers must guarantee a single mutator,
/// e.g. by holding a [`crate::lockfile::WriterLock`] for the backing file.
pub struct Memory {
    data: MemoryData,
    backend: Box<dyn MemoryBackend>,
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("backend", &self.backend.describe())
            .field("projects", &self.data.projects.len())
            .field("tasks", &self.data.tasks.len())
            .finish()
    }
}

impl Memory {
    /// Load from `backend`, starting from the empty skeleton when it holds
    /// nothing yet.
    pub fn open(backend: impl MemoryBackend + 'static) -> Result<Self> {
        let data = match backend.load()? {
            Some(data) => {
                info!(
                    source = %backend.describe(),
                    projects = data.projects.len(),
                    tasks = data.tasks.len(),
                    "memory loaded"
                );
                data
            }
            None => {
                info!(source = %backend.describe(), "no stored memory, starting empty");
                MemoryData::default()
            }
        };
        Ok(Self {
            data,
            backend: Box::new(backend),
        })
    }

    /// Open a JSON file store at `path`.
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(JsonFileBackend::new(path))
    }

    /// A throwaway store that never touches the file system.
    pub fn in_memory() -> Self {
        Self {
            data: MemoryData::default(),
            backend: Box::new(InMemoryBackend::new()),
        }
    }

    pub fn data(&self) -> &MemoryData {
        &self.data
    }

    /// Replace everything with the empty skeleton and persist it.
    pub fn reset(&mut self) -> Result<()> {
        self.mutate(|data| *data = MemoryData::default())?;
        info!(target_store = %self.backend.describe(), "memory reset");
        Ok(())
    }

    /// Apply `change` and write the whole document through the backend.
    ///
    /// A failed save restores the document as it was before `change`, so a
    /// mutation is either both applied and stored or not applied at all.
    pub(crate) fn mutate<T>(
        &mut self,
        change: impl FnOnce(&mut MemoryData) -> T,
    ) -> Result<T> {
        let before = self.data.clone();
        let out = change(&mut self.data);
        if let Err(e) = self.backend.save(&self.data) {
            self.data = before;
            warn!(
                target_store = %self.backend.describe(),
                error = %e,
                "save failed, change rolled back"
            );
            return Err(e);
        }
        debug!(target_store = %self.backend.describe(), "memory persisted");
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkflowType;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Saves go to an [`InMemoryBackend`] until `failing` is set.
    #[derive(Clone, Default)]
    struct FlakyBackend {
        inner: InMemoryBackend,
        failing: Arc<AtomicBool>,
    }

    impl FlakyBackend {
        fn fail(&self, on: bool) {
            self.failing.store(on, Ordering::SeqCst);
        }
    }

    impl MemoryBackend for FlakyBackend {
        fn load(&self) -> Result<Option<MemoryData>> {
            self.inner.load()
        }

        fn save(&self, data: &MemoryData) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.save(data)
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[test]
    fn open_missing_file_starts_empty() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let memory = Memory::open_path(dir.path().join("memory.json")).unwrap();
        assert!(memory.data().projects.is_empty());
        assert_eq!(memory.data(), &MemoryData::default());
        // Nothing is written until the first mutation.
        assert!(!dir.path().join("memory.json").exists());
    }

    #[test]
    fn json_backend_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("memory.json");
        let backend = JsonFileBackend::new(&path);
        backend.save(&MemoryData::default()).unwrap();
        assert!(path.exists());
        assert_eq!(backend.load().unwrap(), Some(MemoryData::default()));
    }

    #[test]
    fn corrupt_file_is_a_serde_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Memory::open_path(&path).unwrap_err();
        assert!(matches!(err, StoreError::Serde(_)));
    }

    #[test]
    fn reset_persists_empty_skeleton() {
        let backend = InMemoryBackend::new();
        let mut memory = Memory::open(backend.clone()).unwrap();
        memory
            .start_project("ship it", WorkflowType::CompletePipeline)
            .unwrap();
        assert_eq!(memory.data().projects.len(), 1);

        memory.reset().unwrap();
        assert_eq!(memory.data(), &MemoryData::default());
        assert_eq!(backend.snapshot(), Some(MemoryData::default()));
    }

    #[test]
    fn every_mutation_saves_once() {
        let backend = InMemoryBackend::new();
        let mut memory = Memory::open(backend.clone()).unwrap();
        let project = memory
            .start_project("goal", WorkflowType::Collaborative)
            .unwrap();
        memory.add_task(&project, "t1", "draft").unwrap();
        memory.complete_task("t1", "drafted").unwrap();
        assert_eq!(backend.save_count(), 3);
    }

    #[test]
    fn failed_save_rolls_the_change_back() {
        let backend = FlakyBackend::default();
        let mut memory = Memory::open(backend.clone()).unwrap();
        let project = memory
            .start_project("goal", WorkflowType::CompletePipeline)
            .unwrap();
        memory.add_task(&project, "t1", "draft").unwrap();
        let before = memory.data().clone();

        backend.fail(true);
        let err = memory.complete_task("t1", "drafted").unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(memory.data(), &before);
        assert_eq!(memory.task("t1").unwrap().status, TaskStatus::Pending);
        assert_eq!(memory.data().agent_stats.executor.tasks_completed, 0);

        assert!(memory.add_task(&project, "t2", "other").is_err());
        assert!(memory.start_project("second", WorkflowType::Iterative).is_err());
        assert!(memory.reset().is_err());
        assert_eq!(memory.data(), &before);

        // Once the backend recovers the same call goes through.
        backend.fail(false);
        memory.complete_task("t1", "drafted").unwrap();
        let stored = backend.inner.snapshot().unwrap();
        assert_eq!(stored.tasks[0].status, TaskStatus::Completed);
        assert_eq!(stored.agent_stats.executor.tasks_completed, 1);
        assert_eq!(&stored, memory.data());
    }

    #[test]
    fn failed_review_leaves_critic_mean_alone() {
        let backend = FlakyBackend::default();
        let mut memory = Memory::open(backend.clone()).unwrap();
        let project = memory
            .start_project("goal", WorkflowType::CompletePipeline)
            .unwrap();
        memory.add_task(&project, "t1", "draft").unwrap();
        memory.complete_task("t1", "drafted").unwrap();

        backend.fail(true);
        assert!(memory.review_task("t1", 90, "good").is_err());
        assert!(memory.data().reviews.is_empty());
        assert_eq!(memory.data().agent_stats.critic.reviews_completed, 0);
        assert!(memory.end_project(&project, "done", Vec::new()).is_err());
        assert!(memory.project(project.id()).unwrap().is_active());
    }
}
