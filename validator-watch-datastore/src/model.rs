use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use async_trait::async_trait;
use anyhow::{Result, Context, anyhow};

use crate::watch_datastore::WatchDatastore;

/// A JSON record stored under a path derived from its key fields.
#[async_trait]
pub trait Model: Sized + Serialize + for<'de> Deserialize<'de> + Send + Sync {
    const ID_PATH: &'static str;
    const FIELDS: &'static [&'static str];
    const FIELD_DEFAULTS: &'static [(&'static str, serde_json::Value)];

    fn create_from_json(mut obj: serde_json::Value) -> Result<Self> {
        if !obj.is_object() {
            return Err(anyhow!("Expected a JSON object for {}", Self::ID_PATH));
        }
        for (field, default_value) in Self::FIELD_DEFAULTS {
            if obj.get(*field).is_none() {
                obj[*field] = default_value.clone();
            }
        }
        for field in Self::FIELDS {
            if obj.get(*field).is_none() {
                return Err(anyhow!("Missing required field: {}", field));
            }
        }
        serde_json::from_value(obj).context("Failed to deserialize object")
    }

    fn from_json_string(json: &str) -> Result<Self> {
        let obj: serde_json::Value = serde_json::from_str(json)
            .context("Failed to parse JSON string")?;
        Self::create_from_json(obj)
    }

    fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize to JSON string")
    }

    fn to_json_object(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).context("Failed to serialize to JSON value")
    }

    /// Writes the whole record in one put; readers never see a partial update.
    async fn save(&self, datastore: &WatchDatastore) -> Result<()> {
        let json = self.to_json_string()?;
        datastore.put(&self.get_id(), json.as_bytes()).await
            .context("Failed to save model to datastore")
    }

    fn get_id_for(keys: &HashMap<String, String>) -> Result<String> {
        let mut id = String::from(Self::ID_PATH);
        for name in Self::get_key_names() {
            let value = keys.get(&name)
                .ok_or_else(|| anyhow!("Missing key {} for {}", name, Self::ID_PATH))?;
            id = id.replace(&format!("${{{}}}", name), value);
        }
        Ok(id)
    }

    fn get_key_names() -> Vec<String> {
        let re = regex::Regex::new(r"\$\{(\w+)\}").expect("static key pattern");
        re.captures_iter(Self::ID_PATH)
            .map(|cap| cap[1].to_string())
            .collect()
    }

    /// The part of `ID_PATH` before the first key placeholder, without trailing slash.
    fn collection_prefix() -> &'static str {
        let end = Self::ID_PATH.find("${").unwrap_or(Self::ID_PATH.len());
        Self::ID_PATH[..end].trim_end_matches('/')
    }

    fn get_id_keys(&self) -> HashMap<String, String>;

    fn get_id(&self) -> String {
        let keys = self.get_id_keys();
        let mut id = String::from(Self::ID_PATH);
        for (key, value) in keys {
            id = id.replace(&format!("${{{}}}", key), &value);
        }
        id
    }

    async fn find_one(datastore: &WatchDatastore, keys: HashMap<String, String>) -> Result<Option<Self>> {
        let key = Self::get_id_for(&keys)?;
        match datastore.get_string(&key).await? {
            Some(value) => Ok(Some(Self::from_json_string(&value)?)),
            None => Ok(None),
        }
    }

    async fn find_all(datastore: &WatchDatastore) -> Result<Vec<Self>> {
        let mut found = Vec::new();
        for result in datastore.iterator(Self::collection_prefix()) {
            let (_, value) = result?;
            let json = String::from_utf8(value.to_vec())?;
            found.push(Self::from_json_string(&json)?);
        }
        Ok(found)
    }

    async fn reload(&mut self, datastore: &WatchDatastore) -> Result<()> {
        let keys = self.get_id_keys();
        if let Some(obj) = Self::find_one(datastore, keys).await? {
            *self = obj;
            Ok(())
        } else {
            Err(anyhow!("Key not found: {}", self.get_id()))
        }
    }

    async fn delete(&self, datastore: &WatchDatastore) -> Result<()> {
        datastore.delete(&self.get_id()).await
            .context("Failed to delete model from datastore")
    }
}
