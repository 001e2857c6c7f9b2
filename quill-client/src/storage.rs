//! Key-value persistence for the session tokens

use std::{
    collections::BTreeMap,
    fs::{self, DirBuilder, File},
    io::{self, BufReader},
    path::PathBuf,
};

use parking_lot::Mutex;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn delete(&self, key: &str) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage(Mutex<BTreeMap<String, String>>);

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    pub fn with_tokens(access: &str, refresh: Option<&str>) -> MemoryStorage {
        let mut map = BTreeMap::new();
        map.insert(ACCESS_TOKEN_KEY.to_string(), access.to_string());
        if let Some(refresh) = refresh {
            map.insert(REFRESH_TOKEN_KEY.to_string(), refresh.to_string());
        }
        MemoryStorage(Mutex::new(map))
    }
}

impl TokenStorage for MemoryStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.0.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.0.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        self.0.lock().remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten atomically on every change
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> FileStorage {
        FileStorage {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn load(&self) -> io::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let file = BufReader::new(File::open(&self.path)?);
        serde_json::from_reader(file).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn save(&self, map: &BTreeMap<String, String>) -> io::Result<()> {
        let dir = self.path.parent().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Other,
                "unable to find parent dir of session file",
            )
        })?;
        if !dir.as_os_str().is_empty() && !dir.exists() {
            DirBuilder::new().recursive(true).create(dir)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        {
            let tmp_file = File::create(&tmp_path)?;
            serde_json::to_writer_pretty(tmp_file, map)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        }
        fs::rename(tmp_path, &self.path)
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> io::Result<()> {
        let _guard = self.lock.lock();
        let mut map = self.load()?;
        f(&mut map);
        self.save(&map)
    }
}

impl TokenStorage for FileStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        self.update(|map| {
            map.remove(key);
        })
    }
}
