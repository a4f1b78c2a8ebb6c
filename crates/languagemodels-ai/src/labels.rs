//! Class label names for sequence-classification models.
//!
//! HuggingFace exports keep the label names in `config.json` under
//! `id2label`, keyed by the stringified class index.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

/// Label order used by SST-2 sentiment models when no config is shipped.
pub const SST2_LABELS: &[&str] = &["NEGATIVE", "POSITIVE"];

#[derive(Deserialize)]
struct ModelConfig {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Label names indexed by class id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    names: Vec<String>,
}

impl Default for LabelMap {
    fn default() -> Self {
        Self {
            names: SST2_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LabelMap {
    /// Parse the `id2label` table of a model `config.json`.
    pub fn from_config_json(json: &str) -> anyhow::Result<Self> {
        let config: ModelConfig = serde_json::from_str(json)?;
        anyhow::ensure!(!config.id2label.is_empty(), "config has no id2label table");

        let mut indexed = config
            .id2label
            .into_iter()
            .map(|(id, name)| {
                id.parse::<usize>()
                    .map(|i| (i, name))
                    .map_err(|_| anyhow::anyhow!("non-numeric label id {id:?}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        indexed.sort_by_key(|(i, _)| *i);

        for (expected, (id, _)) in indexed.iter().enumerate() {
            anyhow::ensure!(*id == expected, "label ids are not contiguous at {expected}");
        }

        Ok(Self {
            names: indexed.into_iter().map(|(_, name)| name).collect(),
        })
    }

    /// Read `config.json` from a model directory, falling back to SST-2
    /// labels when the file is absent.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let path = model_dir.join("config.json");
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(&path)?;
        Self::from_config_json(&json)
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// True iff `label` names the positive class.
pub fn is_positive_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("positive")
}
