/// Static supplement catalog.
///
/// The catalog document is a JSON object with a version string, the supplement records in
/// declaration order, optional category display names, and the lookup tables used by the
/// matcher:
///
/// ```json
/// { "version": "...", "categories": {..}, "supplements": [..],
///   "symptom_map": {"fatigue": ["iron"]}, "goal_map": {..}, "fallback": [..] }
/// ```
///
/// It is loaded once at startup and never mutated afterwards.
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::AppError;
use crate::model::{Category, SupplementRecord};

const EMBEDDED_CATALOG: &str = include_str!("../data/catalog.json");

/// Answer -> supplement id lookup tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingTables {
    #[serde(default, rename = "symptom_map")]
    pub symptoms: BTreeMap<String, Vec<String>>,
    #[serde(default, rename = "goal_map")]
    pub goals: BTreeMap<String, Vec<String>>,
    /// Ids recommended when no symptom or goal produced a hit.
    #[serde(default)]
    pub fallback: Vec<String>,
}

impl MatchingTables {
    fn normalized(self) -> Self {
        let fold = |table: BTreeMap<String, Vec<String>>| {
            let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (key, ids) in table {
                if let Some(key) = normalize_key(&key) {
                    out.entry(key).or_default().extend(ids);
                }
            }
            out
        };
        Self {
            symptoms: fold(self.symptoms),
            goals: fold(self.goals),
            fallback: self.fallback,
        }
    }

    fn referenced_ids(&self) -> impl Iterator<Item = &String> {
        self.symptoms
            .values()
            .chain(self.goals.values())
            .flatten()
            .chain(self.fallback.iter())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    version: String,
    #[serde(default)]
    categories: BTreeMap<String, String>,
    supplements: Vec<SupplementRecord>,
    #[serde(flatten)]
    tables: MatchingTables,
}

#[derive(Debug)]
pub struct Catalog {
    version: String,
    records: Vec<SupplementRecord>,
    index: HashMap<String, usize>,
    category_names: BTreeMap<String, String>,
    tables: MatchingTables,
}

impl Catalog {
    /// The catalog compiled into the binary.
    pub fn embedded() -> Result<Self, AppError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Load from `path` when given, otherwise fall back to the embedded catalog.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Catalog(format!("failed to read {}: {e}", path.display()))
                })?;
                Self::from_json(&content)
            }
            None => Self::embedded(),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, AppError> {
        let doc: CatalogDocument = serde_json::from_str(content)
            .map_err(|e| AppError::Catalog(format!("invalid catalog document: {e}")))?;
        Self::from_parts(doc.version, doc.supplements, doc.categories, doc.tables)
    }

    /// Validate and index the records.
    ///
    /// Duplicate or empty ids and out-of-range efficacy scores are rejected. Table entries
    /// pointing at unknown ids are only logged; the matcher skips them.
    pub fn from_parts(
        version: String,
        records: Vec<SupplementRecord>,
        category_names: BTreeMap<String, String>,
        tables: MatchingTables,
    ) -> Result<Self, AppError> {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if record.id.trim().is_empty() {
                return Err(AppError::Catalog(format!(
                    "record at position {position} has an empty id"
                )));
            }
            if record.efficacy_score > 100 {
                return Err(AppError::Catalog(format!(
                    "efficacy_score of '{}' is {}, expected 0..=100",
                    record.id, record.efficacy_score
                )));
            }
            if index.insert(record.id.clone(), position).is_some() {
                return Err(AppError::Catalog(format!("duplicate supplement id: {}", record.id)));
            }
        }

        let tables = tables.normalized();
        for id in tables.referenced_ids() {
            if !index.contains_key(id) {
                warn!(id, "mapping table references unknown supplement id");
            }
        }

        Ok(Self {
            version,
            records,
            index,
            category_names,
            tables,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records in declaration order.
    pub fn records(&self) -> &[SupplementRecord] {
        &self.records
    }

    pub fn tables(&self) -> &MatchingTables {
        &self.tables
    }

    pub fn get(&self, id: &str) -> Option<&SupplementRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    /// Exact lookup first, then a case-insensitive scan.
    pub fn find(&self, id: &str) -> Option<&SupplementRecord> {
        self.get(id).or_else(|| {
            self.records
                .iter()
                .find(|r| r.id.eq_ignore_ascii_case(id))
        })
    }

    /// Declaration index of `id`, the deterministic ranking tie-break.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn categories(&self) -> BTreeMap<String, Category> {
        let mut categories: BTreeMap<String, Category> = BTreeMap::new();
        for record in &self.records {
            categories
                .entry(record.category.clone())
                .or_insert_with(|| Category {
                    key: record.category.clone(),
                    display_name: self
                        .category_names
                        .get(&record.category)
                        .cloned()
                        .unwrap_or_else(|| record.category.clone()),
                    supplement_count: 0,
                })
                .supplement_count += 1;
        }
        categories
    }

    /// Case-insensitive category lookup.
    pub fn find_category(&self, key: &str) -> Result<Category, AppError> {
        let categories = self.categories();
        categories
            .values()
            .find(|c| c.key.eq_ignore_ascii_case(key))
            .cloned()
            .ok_or_else(|| {
                let available: Vec<&str> = categories.keys().map(|s| s.as_str()).collect();
                AppError::UnknownCategory(format!(
                    "'{key}'. Available categories: {}",
                    available.join(", ")
                ))
            })
    }

    pub fn records_in_category(&self, key: &str) -> Vec<&SupplementRecord> {
        self.records
            .iter()
            .filter(|r| r.category.eq_ignore_ascii_case(key))
            .collect()
    }

    /// Symptom answers the quiz can offer, sorted.
    pub fn known_symptoms(&self) -> Vec<String> {
        self.tables.symptoms.keys().cloned().collect()
    }

    /// Goal answers the quiz can offer, sorted.
    pub fn known_goals(&self) -> Vec<String> {
        self.tables.goals.keys().cloned().collect()
    }
}

/// Fold a quiz answer into table-key form: trimmed, lowercase, with runs of whitespace,
/// hyphens and underscores collapsed to a single `_`. Blank answers yield `None`.
pub fn normalize_key(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_sep = !out.is_empty();
            continue;
        }
        if pending_sep {
            out.push('_');
            pending_sep = false;
        }
        out.extend(ch.to_lowercase());
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
