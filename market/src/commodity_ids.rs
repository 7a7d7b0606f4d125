//! Name -> numeric id table for backends that search by commodity id.
//!
//! The table is a flat JSON object, e.g. `{"Painite": 84, "Platinum": "81"}`.
//! Keys are matched trimmed and case-insensitively. Values that are not
//! whole numbers are skipped.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::preferences::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommodityIds {
    ids: HashMap<String, u32>,
}

impl CommodityIds {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: HashMap<String, Value> =
            serde_json::from_str(text).map_err(|e| ConfigError::CommodityMap(e.to_string()))?;

        let mut ids = HashMap::with_capacity(raw.len());
        for (name, value) in raw {
            let id = match &value {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }
            .and_then(|id| u32::try_from(id).ok());

            match id {
                Some(id) => {
                    ids.insert(normalize(&name), id);
                }
                None => debug!(%name, %value, "skipping commodity id that is not a whole number"),
            }
        }
        Ok(Self { ids })
    }

    /// Reads the table at `path`. A missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "commodity id table not found; id searches will find nothing");
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::CommodityMap(format!(
                "{}: {err}",
                path.display()
            ))),
        }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.ids.get(&normalize(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<(String, u32)> for CommodityIds {
    fn from_iter<T: IntoIterator<Item = (String, u32)>>(iter: T) -> Self {
        Self {
            ids: iter
                .into_iter()
                .map(|(name, id)| (normalize(&name), id))
                .collect(),
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
