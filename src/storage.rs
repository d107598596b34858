use std::path::PathBuf;

/// Flat-file storage seam shared by the config and the allow-list.
pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
}

#[derive(Clone)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: &str) -> std::io::Result<Self> {
        let path = PathBuf::from(storage_dir);
        std::fs::create_dir_all(&path)?;
        Ok(BackendLocal { base_dir: path })
    }

    fn path_of(&self, ident: &str) -> PathBuf {
        self.base_dir.join(ident)
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.path_of(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path_of(ident))
    }

    /// Write through a uniquely-named temp file, then rename, so readers
    /// never observe a half-written file.
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let temp_name = format!("{}-{ident}", rusty_ulid::generate_ulid_string());
        let temp_path = self.base_dir.join(&temp_name);

        std::fs::write(&temp_path, data)?;

        std::fs::rename(&temp_path, self.path_of(ident))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_roundtrip() {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let store = BackendLocal::new(tmp.path().to_str().unwrap()).unwrap();

        assert!(!store.exists("list.json"));
        store.write("list.json", b"[1,2]").unwrap();
        assert!(store.exists("list.json"));
        assert_eq!(store.read("list.json").unwrap(), b"[1,2]");
    }

    #[test]
    fn test_write_replaces_existing() {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let store = BackendLocal::new(tmp.path().to_str().unwrap()).unwrap();

        store.write("f", b"old").unwrap();
        store.write("f", b"new").unwrap();
        assert_eq!(store.read("f").unwrap(), b"new");
    }
}
