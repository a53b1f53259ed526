//! Ban list and the bot-administrator directives that edit it.
//!
//! Names are compared case-insensitively and stored lowercase. Every
//! mutation rewrites the whole file before the directive is acknowledged.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{error, info, warn};

use crate::error::BanStoreError;

/// Durable storage for the ban list.
pub trait BanStorage: Send + Sync + 'static {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<Vec<String>>, BanStoreError>;
    fn save(&self, names: &[String]) -> Result<(), BanStoreError>;
}

/// A JSON array of lowercase names, rewritten atomically (tmp file + rename).
#[derive(Debug, Clone)]
pub struct JsonFileBanStorage {
    path: PathBuf,
}

impl JsonFileBanStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl BanStorage for JsonFileBanStorage {
    fn load(&self) -> Result<Option<Vec<String>>, BanStoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, names: &[String]) -> Result<(), BanStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(names)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory ban set backed by a [`BanStorage`].
pub struct BanStore {
    storage: Box<dyn BanStorage>,
    names: Mutex<BTreeSet<String>>,
}

impl BanStore {
    /// Load the persisted list. A missing or unreadable list starts empty.
    pub fn open(storage: Box<dyn BanStorage>) -> Self {
        let names = match storage.load() {
            Ok(Some(names)) => {
                let names: BTreeSet<String> = names.iter().map(|n| normalize(n)).collect();
                info!(count = names.len(), "Loaded ban list");
                names
            }
            Ok(None) => {
                info!("No ban list found, starting empty");
                BTreeSet::new()
            }
            Err(e) => {
                error!(error = %e, "Failed to load ban list, starting empty");
                BTreeSet::new()
            }
        };
        Self {
            storage,
            names: Mutex::new(names),
        }
    }

    /// Add `name`. Returns false if it was already banned.
    pub fn ban(&self, name: &str) -> bool {
        let mut names = self.lock();
        let added = names.insert(normalize(name));
        if added {
            self.persist(&names);
            info!(player = %name, "Player banned");
        }
        added
    }

    /// Remove `name`. Returns false if it was not banned.
    pub fn unban(&self, name: &str) -> bool {
        let mut names = self.lock();
        let removed = names.remove(&normalize(name));
        if removed {
            self.persist(&names);
            info!(player = %name, "Player unbanned");
        }
        removed
    }

    pub fn is_banned(&self, name: &str) -> bool {
        self.lock().contains(&normalize(name))
    }

    /// Sorted lowercase names.
    pub fn list(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    // Held across the write so the file always reflects the latest mutation.
    fn persist(&self, names: &BTreeSet<String>) {
        let snapshot: Vec<String> = names.iter().cloned().collect();
        if let Err(e) = self.storage.save(&snapshot) {
            warn!(error = %e, "Failed to persist ban list, keeping in-memory change");
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Chat directives only the bot administrator may issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminDirective {
    Ban(String),
    Unban(String),
    List,
}

impl AdminDirective {
    /// Parse a trimmed chat body. Directives with an empty target are not directives.
    pub fn parse(body: &str) -> Option<Self> {
        if body == "#banlist" {
            return Some(Self::List);
        }
        if let Some(target) = body.strip_prefix("#ban ") {
            return non_empty(target).map(Self::Ban);
        }
        if let Some(target) = body.strip_prefix("#unban ") {
            return non_empty(target).map(Self::Unban);
        }
        None
    }

    /// Apply to `store` and return the acknowledgment to send back.
    pub fn apply(&self, store: &BanStore) -> String {
        match self {
            Self::Ban(name) => {
                store.ban(name);
                format!("Player {name} is now banned from the AI.")
            }
            Self::Unban(name) => {
                store.unban(name);
                format!("Player {name} has been unbanned.")
            }
            Self::List => {
                let names = store.list();
                if names.is_empty() {
                    "No players are banned.".to_string()
                } else {
                    format!("Banned players: {}", names.join(", "))
                }
            }
        }
    }
}

fn non_empty(target: &str) -> Option<String> {
    let target = target.trim();
    (!target.is_empty()).then(|| target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemoryStorage {
        initial: Option<Vec<String>>,
        fail_load: bool,
        fail_save: bool,
        saved: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl BanStorage for MemoryStorage {
        fn load(&self) -> Result<Option<Vec<String>>, BanStoreError> {
            if self.fail_load {
                return Err(std::io::Error::other("disk on fire").into());
            }
            Ok(self.initial.clone())
        }

        fn save(&self, names: &[String]) -> Result<(), BanStoreError> {
            if self.fail_save {
                return Err(std::io::Error::other("read-only").into());
            }
            self.saved.lock().unwrap().push(names.to_vec());
            Ok(())
        }
    }

    fn file_store(dir: &TempDir) -> (BanStore, PathBuf) {
        let path = dir.path().join("banned.json");
        (BanStore::open(Box::new(JsonFileBanStorage::new(&path))), path)
    }

    fn read_file(path: &Path) -> Vec<String> {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let (store, path) = file_store(&dir);
        assert!(store.list().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn ban_is_case_insensitive_and_persisted() {
        let dir = TempDir::new().unwrap();
        let (store, path) = file_store(&dir);

        assert!(store.ban("Eve"));
        assert!(store.is_banned("EVE"));
        assert!(store.is_banned("eve"));
        assert_eq!(read_file(&path), vec!["eve"]);
    }

    #[test]
    fn unban_rewrites_file() {
        let dir = TempDir::new().unwrap();
        let (store, path) = file_store(&dir);

        store.ban("Eve");
        store.ban("mallory");
        assert!(store.unban("EVE"));
        assert!(!store.is_banned("eve"));
        assert_eq!(read_file(&path), vec!["mallory"]);
        assert!(!dir.path().join("banned.json.tmp").exists());
    }

    #[test]
    fn reopen_loads_previous_list() {
        let dir = TempDir::new().unwrap();
        let (store, _) = file_store(&dir);
        store.ban("Eve");
        drop(store);

        let (store, _) = file_store(&dir);
        assert!(store.is_banned("eve"));
    }

    #[test]
    fn loaded_names_are_lowercased() {
        let store = BanStore::open(Box::new(MemoryStorage {
            initial: Some(vec!["Griefer".into()]),
            ..MemoryStorage::default()
        }));
        assert_eq!(store.list(), vec!["griefer"]);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("banned.json");
        fs::write(&path, "{not json").unwrap();
        let store = BanStore::open(Box::new(JsonFileBanStorage::new(&path)));
        assert!(store.list().is_empty());
    }

    #[test]
    fn load_error_starts_empty() {
        let store = BanStore::open(Box::new(MemoryStorage {
            fail_load: true,
            ..MemoryStorage::default()
        }));
        assert!(store.list().is_empty());
    }

    #[test]
    fn save_failure_keeps_in_memory_change() {
        let store = BanStore::open(Box::new(MemoryStorage {
            fail_save: true,
            ..MemoryStorage::default()
        }));
        store.ban("eve");
        assert!(store.is_banned("eve"));
    }

    #[test]
    fn no_op_mutations_do_not_write() {
        let storage = MemoryStorage::default();
        let saved = Arc::clone(&storage.saved);
        let store = BanStore::open(Box::new(storage));

        store.ban("eve");
        store.ban("EVE");
        store.unban("bob");
        assert_eq!(saved.lock().unwrap().len(), 1);
    }

    #[test]
    fn parse_directives() {
        assert_eq!(AdminDirective::parse("#ban Eve"), Some(AdminDirective::Ban("Eve".into())));
        assert_eq!(
            AdminDirective::parse("#unban  Eve "),
            Some(AdminDirective::Unban("Eve".into()))
        );
        assert_eq!(AdminDirective::parse("#banlist"), Some(AdminDirective::List));
        assert_eq!(AdminDirective::parse("#ban "), None);
        assert_eq!(AdminDirective::parse("#ban"), None);
        assert_eq!(AdminDirective::parse("#banana split"), None);
        assert_eq!(AdminDirective::parse("#deepseek #ban Eve"), None);
    }

    #[test]
    fn apply_replies() {
        let store = BanStore::open(Box::new(MemoryStorage::default()));

        assert_eq!(AdminDirective::List.apply(&store), "No players are banned.");
        assert_eq!(
            AdminDirective::Ban("Eve".into()).apply(&store),
            "Player Eve is now banned from the AI."
        );
        AdminDirective::Ban("bob".into()).apply(&store);
        assert_eq!(AdminDirective::List.apply(&store), "Banned players: bob, eve");
        assert_eq!(
            AdminDirective::Unban("Eve".into()).apply(&store),
            "Player Eve has been unbanned."
        );
        assert_eq!(AdminDirective::List.apply(&store), "Banned players: bob");
    }
}
