use crate::domain::ports::Storage;
use crate::utils::error::{MapiesError, Result};
use crate::utils::validation::validate_document_id;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// JSON 文件儲存層：`{collection}/{id}.json`，集合可以巢狀
/// （例如 `maps/{map_id}/markers`）
pub struct DocumentStore<S: Storage> {
    storage: S,
}

impl<S: Storage> DocumentStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn doc_path(collection: &str, id: &str) -> Result<String> {
        validate_document_id("document_id", id)?;
        Ok(format!("{}/{}.json", collection.trim_end_matches('/'), id))
    }

    pub async fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        let path = Self::doc_path(collection, id)?;
        match self.storage.read_file(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 與 `get` 相同，但文件不存在時回傳 `NotFound`
    pub async fn require<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        kind: &str,
    ) -> Result<T> {
        self.get(collection, id)
            .await?
            .ok_or_else(|| MapiesError::not_found(kind, id))
    }

    pub async fn set<T: Serialize + Sync>(&self, collection: &str, id: &str, doc: &T) -> Result<()> {
        let path = Self::doc_path(collection, id)?;
        let bytes = serde_json::to_vec_pretty(doc)?;
        self.storage.write_file(&path, &bytes).await
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let path = Self::doc_path(collection, id)?;
        self.storage.delete_file(&path).await
    }

    pub async fn list_ids(&self, collection: &str) -> Result<Vec<String>> {
        let files = self.storage.list_files(collection).await?;
        Ok(files
            .iter()
            .filter_map(|path| path.rsplit('/').next())
            .filter_map(|name| name.strip_suffix(".json"))
            .map(str::to_string)
            .collect())
    }

    pub async fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let mut docs = Vec::new();
        for id in self.list_ids(collection).await? {
            if let Some(doc) = self.get(collection, &id).await? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }
}
