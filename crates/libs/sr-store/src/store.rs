//! Script index stored under a storage root.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use sr_runner::toolchain::extension_of;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    prelude::*,
    record::{ScriptIndex, ScriptRecord},
    search::{SearchHit, rank},
};

pub const META_DIR: &str = ".coding-ai-agent";
pub const INDEX_FILE: &str = "index.json";
pub const SCRIPTS_DIR: &str = "scripts";

const MAX_SLUG_LEN: usize = 60;

#[derive(Debug)]
pub struct ScriptStore {
    root: PathBuf,
    /// Serializes index read-modify-write cycles.
    index_lock: Mutex<()>,
}

impl ScriptStore {
    /// Open the store at `root`, creating its directories if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            root: root.into(),
            index_lock: Mutex::new(()),
        };
        fs::create_dir_all(store.meta_dir())?;
        fs::create_dir_all(store.scripts_dir())?;
        info!("Script store opened at {}", store.root.display());
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(META_DIR)
    }

    pub fn index_path(&self) -> PathBuf {
        self.meta_dir().join(INDEX_FILE)
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join(SCRIPTS_DIR)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.index_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the index. A missing or unparsable file reads as an empty index.
    pub fn load_index(&self) -> Result<ScriptIndex> {
        let path = self.index_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ScriptIndex::default()),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str(&content) {
            Ok(index) => Ok(index),
            Err(err) => {
                warn!("Ignoring unreadable index {}: {err}", path.display());
                Ok(ScriptIndex::default())
            }
        }
    }

    pub fn save_index(&self, index: &ScriptIndex) -> Result<()> {
        let content = serde_json::to_string_pretty(index)?;
        fs::write(self.index_path(), content)?;
        Ok(())
    }

    pub fn find(&self, id: &str) -> Result<Option<ScriptRecord>> {
        Ok(self.load_index()?.find(id).cloned())
    }

    fn get(&self, id: &str) -> Result<ScriptRecord> {
        self.find(id)?
            .ok_or_else(|| Error::ScriptNotFound(String::from(id)))
    }

    /// All records, newest first.
    pub fn list(&self) -> Result<Vec<ScriptRecord>> {
        let mut scripts = self.load_index()?.scripts;
        scripts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(scripts)
    }

    /// Store `code` as a new script and add it to the index.
    ///
    /// `name` is reduced to a slug that keeps its extension. A numeric suffix
    /// is added when another script already uses the file name.
    pub fn create(&self, name: &str, code: &str, explanation: &str) -> Result<ScriptRecord> {
        let _guard = self.lock();
        let mut index = self.load_index()?;

        let file_name = self.unused_file_name(name);
        let file_path = self.scripts_dir().join(&file_name);
        fs::write(&file_path, code)?;

        let record = ScriptRecord {
            id: Uuid::new_v4().simple().to_string(),
            name: file_name,
            file_path,
            explanation: String::from(explanation),
            tags: Vec::new(),
            created_at: Utc::now(),
        };
        index.scripts.push(record.clone());
        self.save_index(&index)?;

        info!("Created script {} ({})", record.id, record.name);
        Ok(record)
    }

    fn unused_file_name(&self, name: &str) -> String {
        let (stem, extension) = split_name(name);
        let with_suffix = |suffix: &str| match extension.as_deref() {
            Some(extension) => format!("{stem}{suffix}.{extension}"),
            None => format!("{stem}{suffix}"),
        };

        let mut file_name = with_suffix("");
        let mut counter = 2;
        while self.scripts_dir().join(&file_name).exists() {
            file_name = with_suffix(&format!("-{counter}"));
            counter += 1;
        }
        file_name
    }

    /// Source of script `id`. An unreadable file reads as empty.
    pub fn read_code(&self, id: &str) -> Result<String> {
        let record = self.get(id)?;
        match fs::read_to_string(&record.file_path) {
            Ok(code) => Ok(code),
            Err(err) => {
                warn!("Failed to read {}: {err}", record.file_path.display());
                Ok(String::new())
            }
        }
    }

    /// Ranked keyword search over names, explanations, tags and sources.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let scripts = self.load_index()?.scripts.into_iter().map(|record| {
            let code = fs::read_to_string(&record.file_path).unwrap_or_default();
            (record, code)
        });
        let hits = rank(scripts, query);
        debug!("Search {query:?} matched {} script(s)", hits.len());
        Ok(hits)
    }

    pub fn update_code(&self, id: &str, code: &str) -> Result<ScriptRecord> {
        let record = self.get(id)?;
        fs::write(&record.file_path, code)?;
        debug!("Updated source of {id}");
        Ok(record)
    }
}

/// Lowercase ASCII slug made of `[a-z0-9]` runs joined by `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

fn split_name(name: &str) -> (String, Option<String>) {
    let extension = extension_of(name)
        .map(slugify)
        .filter(|extension| !extension.is_empty());
    let stem = match extension_of(name) {
        Some(extension) => &name[..name.len() - extension.len() - 1],
        None => name,
    };
    let stem = match slugify(stem) {
        stem if stem.is_empty() => String::from("script"),
        stem => stem,
    };
    (stem, extension)
}
