// src/fs/mock.rs

//! In-memory [`FileSystem`] used by unit and integration tests.

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // child names, in insertion order
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    /// Paths under which `create_dir`/`create_dir_all` fail.
    deny_create: HashSet<PathBuf>,
    /// Paths under which `remove_dir_all` fails.
    deny_remove: HashSet<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut state = MockState::default();
        // Ensure root exists
        state
            .entries
            .insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock filesystem lock poisoned")
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut state = self.lock();
        insert_entry(&mut state.entries, path, MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.lock();
        if !state.entries.contains_key(path) {
            insert_entry(&mut state.entries, path, MockEntry::Dir(Vec::new()));
        }
    }

    /// Make directory creation at or below `path` fail.
    pub fn deny_create_under(&self, path: impl AsRef<Path>) {
        self.lock().deny_create.insert(path.as_ref().to_path_buf());
    }

    /// Make directory removal at or below `path` fail.
    pub fn deny_remove_under(&self, path: impl AsRef<Path>) {
        self.lock().deny_remove.insert(path.as_ref().to_path_buf());
    }

    pub fn file_contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().entries.get(path.as_ref()) {
            Some(MockEntry::File(content)) => Some(content.clone()),
            _ => None,
        }
    }
}

fn parent_or_root(path: &Path) -> Option<&Path> {
    path.parent().map(|parent| {
        if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        }
    })
}

fn insert_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path, entry: MockEntry) {
    entries.insert(path.to_path_buf(), entry);

    if let Some(parent) = parent_or_root(path) {
        if parent != path {
            ensure_dir_entry(entries, parent);
            link_child(entries, parent, path);
        }
    }
}

fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    insert_entry(entries, path, MockEntry::Dir(Vec::new()));
}

fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

fn is_denied(set: &HashSet<PathBuf>, path: &Path) -> bool {
    set.iter().any(|denied| path.starts_with(denied))
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        if is_denied(&state.deny_create, path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        if state.entries.contains_key(path) {
            return Err(anyhow!("File exists: {:?}", path));
        }
        match parent_or_root(path).map(|p| state.entries.get(p)) {
            Some(Some(MockEntry::Dir(_))) | None => {}
            _ => return Err(anyhow!("Parent directory missing: {:?}", path)),
        }
        insert_entry(&mut state.entries, path, MockEntry::Dir(Vec::new()));
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        if is_denied(&state.deny_create, path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        match state.entries.get(path) {
            Some(MockEntry::Dir(_)) => Ok(()),
            Some(MockEntry::File(_)) => Err(anyhow!("Not a directory: {:?}", path)),
            None => {
                insert_entry(&mut state.entries, path, MockEntry::Dir(Vec::new()));
                Ok(())
            }
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        if is_denied(&state.deny_remove, path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        if !matches!(state.entries.get(path), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        state.entries.retain(|p, _| !p.starts_with(path));
        if let Some(parent) = parent_or_root(path) {
            if let Some(MockEntry::Dir(children)) = state.entries.get_mut(parent) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    children.retain(|c| c != name);
                }
            }
        }
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.lock();
        let content = match state.entries.get(from) {
            Some(MockEntry::File(content)) => content.clone(),
            Some(MockEntry::Dir(_)) => return Err(anyhow!("Is a directory: {:?}", from)),
            None => return Err(anyhow!("File not found: {:?}", from)),
        };
        match parent_or_root(to).map(|p| state.entries.get(p)) {
            Some(Some(MockEntry::Dir(_))) | None => {}
            _ => return Err(anyhow!("Parent directory missing: {:?}", to)),
        }
        insert_entry(&mut state.entries, to, MockEntry::File(content));
        Ok(())
    }
}
