use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    pub fn full_path(&self, path: &str) -> String {
        Path::new(&self.base_path).join(path).display().to_string()
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_missing_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().join("reports").display().to_string());

        storage
            .write_file("2026/averages.json", b"{\"overall\":12.5}")
            .await
            .unwrap();

        let data = fs::read(temp_dir.path().join("reports/2026/averages.json")).unwrap();
        assert_eq!(data, b"{\"overall\":12.5}");
        assert!(storage.full_path("2026/averages.json").ends_with("averages.json"));
    }

    #[tokio::test]
    async fn test_write_into_a_file_path_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("taken"), b"x").unwrap();
        let storage = LocalStorage::new(temp_dir.path().join("taken").display().to_string());

        let err = storage.write_file("averages.csv", b"overall").await.unwrap_err();
        assert!(matches!(err, crate::utils::error::ScrapeError::IoError(_)));
    }
}
