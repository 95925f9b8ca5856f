use crate::domain::ports::Storage;
use crate::utils::error::{MapiesError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// 記憶體內的儲存，用於測試與 dry run
#[derive(Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn file_count(&self) -> usize {
        self.files.lock().await.len()
    }
}

impl Storage for MemoryStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| MapiesError::not_found("file", path))
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        let mut files = self.files.lock().await;
        files.remove(path);
        Ok(())
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let files = self.files.lock().await;
        Ok(files
            .keys()
            .filter(|key| {
                key.strip_prefix(&prefix)
                    .map(|rest| !rest.is_empty() && !rest.contains('/'))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_only_direct_children() {
        let storage = MemoryStorage::new();
        storage.write_file("maps/a.json", b"1").await.unwrap();
        storage.write_file("maps/a/markers/x.json", b"2").await.unwrap();
        storage.write_file("mapsx/b.json", b"3").await.unwrap();

        assert_eq!(
            storage.list_files("maps").await.unwrap(),
            vec!["maps/a.json".to_string()]
        );
        assert_eq!(storage.file_count().await, 3);
    }
}
