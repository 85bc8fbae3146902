use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::client::CatalogLookup;
use crate::schema::{CatalogEntry, Category, ResolvedEntities};

/// Fans name lookups out over a bounded set of tasks.
#[derive(Clone)]
pub struct Resolver {
    lookup: Arc<dyn CatalogLookup>,
    max_concurrency: usize,
}

impl Resolver {
    pub fn new(lookup: Arc<dyn CatalogLookup>, max_concurrency: usize) -> Self {
        Self {
            lookup,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Resolve every name in `names`, one lookup each.
    ///
    /// Matches come back in input order. Names without a match, and names
    /// whose lookup failed, are left out.
    pub async fn resolve(&self, category: Category, names: &[String]) -> Vec<CatalogEntry> {
        if names.is_empty() {
            return Vec::new();
        }

        let permits = Arc::new(Semaphore::new(names.len().min(self.max_concurrency)));
        let mut tasks = JoinSet::new();

        for (index, name) in names.iter().cloned().enumerate() {
            let lookup = Arc::clone(&self.lookup);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                // Never closed, so acquire only fails if the semaphore is dropped
                let _permit = permits.acquire_owned().await.ok();
                let outcome = lookup.search(category, &name).await;
                (index, name, outcome)
            });
        }

        let mut slots: Vec<Option<CatalogEntry>> = vec![None; names.len()];

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, name, Ok(Some(entry)))) => {
                    debug!(%category, name = %name, matched = ?entry.name(), "Catalog match");
                    slots[index] = Some(entry);
                }
                Ok((_, name, Ok(None))) => {
                    debug!(%category, name = %name, "No catalog match");
                }
                Ok((_, name, Err(e))) => {
                    let error = format!("{:#}", e);
                    warn!(%category, name = %name, %error, "Catalog lookup failed, skipping");
                }
                Err(e) => {
                    warn!(%category, error = %e, "Catalog lookup task aborted, skipping");
                }
            }
        }

        let matched: Vec<CatalogEntry> = slots.into_iter().flatten().collect();

        info!(
            %category,
            requested = names.len(),
            matched = matched.len(),
            "Resolved catalog names"
        );

        matched
    }

    /// Resolve the three categories concurrently and wait for all of them.
    pub async fn resolve_all(
        &self,
        characters: &[String],
        starships: &[String],
        planets: &[String],
    ) -> ResolvedEntities {
        let (characters, starships, planets) = tokio::join!(
            self.resolve(Category::People, characters),
            self.resolve(Category::Starships, starships),
            self.resolve(Category::Planets, planets),
        );

        ResolvedEntities {
            characters,
            starships,
            planets,
        }
    }
}
