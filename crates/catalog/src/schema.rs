use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog collections that can be searched by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    People,
    Starships,
    Planets,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::People, Category::Starships, Category::Planets];

    /// Path segment used by the catalog REST API
    pub fn path_segment(&self) -> &'static str {
        match self {
            Category::People => "people",
            Category::Starships => "starships",
            Category::Planets => "planets",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// A record returned by the catalog for a name search.
///
/// The payload is kept as-is; nothing downstream interprets its fields
/// beyond `name`, which is only read for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogEntry(pub serde_json::Value);

impl CatalogEntry {
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(|n| n.as_str())
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Body of `GET /{category}/?search=...`
#[derive(Debug, Deserialize)]
pub(crate) struct SearchPage {
    pub count: u64,
    #[serde(default)]
    pub results: Vec<CatalogEntry>,
}

impl SearchPage {
    /// First match only, per catalog convention
    pub(crate) fn into_first_match(self) -> Option<CatalogEntry> {
        if self.count == 0 {
            return None;
        }
        self.results.into_iter().next()
    }
}

/// Matched entries for each category of one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedEntities {
    pub characters: Vec<CatalogEntry>,
    pub starships: Vec<CatalogEntry>,
    pub planets: Vec<CatalogEntry>,
}

impl ResolvedEntities {
    pub fn total(&self) -> usize {
        self.characters.len() + self.starships.len() + self.planets.len()
    }
}
