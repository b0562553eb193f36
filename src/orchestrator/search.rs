//! Core search orchestrator: registry ownership, multi-wiki fan-out, ranking.
//!
//! [`WikiSearch`] is the object a host holds. It owns the wiki registry,
//! the query cache and the current preferences, and answers queries by
//! querying every registered wiki concurrently and merging the hits into
//! one [`BoundedRankedCollection`].

use std::sync::{Arc, RwLock};

use crate::api::{search_pages, site_info, SearchRequest};
use crate::cache::{normalise_query, CacheKey, QueryCache};
use crate::config::{Preferences, SearchConfig};
use crate::error::WikiSearchError;
use crate::http::{Fetcher, HttpFetcher};
use crate::ranked::BoundedRankedCollection;
use crate::registry::{RegistrySnapshot, ResolutionSummary, WikiRegistry};
use crate::types::{RankedItem, ResolvedEndpoint, WikiPage};

use super::titles::improve_title;

/// Feature flags captured at the start of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Flags {
    improved_titles: bool,
    improved_filters: bool,
}

/// Multi-wiki search with endpoint discovery and a query cache.
#[derive(Debug)]
pub struct WikiSearch<F> {
    config: SearchConfig,
    fetcher: Arc<F>,
    registry: WikiRegistry<F>,
    cache: QueryCache,
    preferences: RwLock<Preferences>,
}

impl WikiSearch<HttpFetcher> {
    /// Create a searcher that talks to wikis over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`WikiSearchError::Config`] for an invalid configuration or
    /// [`WikiSearchError::Http`] if the HTTP client cannot be built.
    pub fn with_http(config: SearchConfig) -> Result<Self, WikiSearchError> {
        config.validate()?;
        let fetcher = HttpFetcher::new(&config)?;
        Self::new(config, fetcher)
    }
}

impl<F: Fetcher> WikiSearch<F> {
    /// Create a searcher issuing all requests through `fetcher`.
    ///
    /// The registry starts empty; call [`apply_preferences`](Self::apply_preferences)
    /// or [`rebuild`](Self::rebuild) to register wikis.
    ///
    /// # Errors
    ///
    /// Returns [`WikiSearchError::Config`] if `config` is invalid.
    pub fn new(config: SearchConfig, fetcher: F) -> Result<Self, WikiSearchError> {
        config.validate()?;
        let fetcher = Arc::new(fetcher);
        Ok(Self {
            registry: WikiRegistry::new(Arc::clone(&fetcher), config.resolve_concurrency),
            cache: QueryCache::new(config.cache_entries),
            preferences: RwLock::new(Preferences::default()),
            fetcher,
            config,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The wiki registry.
    pub fn registry(&self) -> &WikiRegistry<F> {
        &self.registry
    }

    /// A copy of the current preferences.
    pub fn preferences(&self) -> Preferences {
        self.preferences
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Install new preferences from the host.
    ///
    /// Rebuilds the registry only when the URL list changed and returns
    /// that rebuild's summary. A change of either feature flag clears the
    /// cache, since cached answers were shaped by the old flags.
    pub async fn apply_preferences(&self, preferences: Preferences) -> Option<ResolutionSummary> {
        let previous = {
            let mut guard = self
                .preferences
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::replace(&mut *guard, preferences.clone())
        };

        if previous.improved_titles != preferences.improved_titles
            || previous.improved_filters != preferences.improved_filters
        {
            tracing::debug!("search flags changed, clearing cache");
            self.cache.invalidate_all();
        }

        if previous.wiki_urls == preferences.wiki_urls {
            return None;
        }
        Some(self.rebuild(&preferences.wiki_urls).await)
    }

    /// Rebuild the registry from `raw_list` and clear the query cache.
    ///
    /// See [`WikiRegistry::rebuild`]. The cache is left alone when the
    /// rebuild was superseded by a newer one.
    pub async fn rebuild(&self, raw_list: &str) -> ResolutionSummary {
        let summary = self.registry.rebuild(raw_list).await;
        if summary.applied {
            self.cache.invalidate_all();
        }
        summary
    }

    /// Search every registered wiki for `query`.
    ///
    /// Returns at most `max_results` items scoring at least `min_score`,
    /// best first. An empty query returns no results without touching
    /// the network. Wikis that fail are skipped; the worst outcome is an
    /// empty list.
    pub async fn search(&self, query: &str) -> Vec<RankedItem> {
        let normalised = normalise_query(query);
        if normalised.is_empty() {
            return Vec::new();
        }

        let snapshot = self.registry.snapshot();
        let flags = self.flags();
        let key = CacheKey::new(
            &normalised,
            snapshot.generation(),
            flags.improved_titles,
            flags.improved_filters,
        );

        if let Some(cached) = self.cache.get(&key).await {
            tracing::trace!(query = %normalised, "cache hit");
            return cached;
        }

        let results = self.search_uncached(query.trim(), &snapshot, flags).await;
        self.cache.insert(key, results.clone()).await;
        results
    }

    async fn search_uncached(
        &self,
        query: &str,
        snapshot: &RegistrySnapshot,
        flags: Flags,
    ) -> Vec<RankedItem> {
        tracing::trace!(query, wikis = snapshot.len(), "searching wikis");

        // 1. Fan out to every wiki concurrently.
        let futures: Vec<_> = snapshot
            .endpoints()
            .map(|endpoint| async move {
                let outcome = self.query_wiki(endpoint, query, flags).await;
                (endpoint, outcome)
            })
            .collect();
        let outcomes = futures::future::join_all(futures).await;

        // 2. Funnel every surviving page into one ranked collection.
        let mut ranked =
            BoundedRankedCollection::new(query, self.config.min_score, self.config.max_results);
        for (endpoint, outcome) in outcomes {
            match outcome {
                Ok(pages) => {
                    tracing::debug!(
                        host = endpoint.host(),
                        count = pages.len(),
                        "wiki returned pages"
                    );
                    ranked.extend(pages);
                }
                Err(err) => {
                    tracing::warn!(host = endpoint.host(), error = %err, "wiki query failed");
                }
            }
        }

        ranked.into_vec()
    }

    /// Query one wiki, dropping its home page and applying title rewriting.
    async fn query_wiki(
        &self,
        endpoint: &Arc<ResolvedEndpoint>,
        query: &str,
        flags: Flags,
    ) -> Result<Vec<WikiPage>, WikiSearchError> {
        let fetcher = self.fetcher.as_ref();
        let site = site_info(fetcher, endpoint).await?;

        let namespaces = if flags.improved_filters {
            site.content_namespace_ids()
        } else {
            vec![0]
        };
        let request = SearchRequest {
            limit: self.config.per_wiki_limit,
            extract_chars: self.config.extract_chars,
            namespaces,
        };

        let pages = search_pages(fetcher, endpoint, query, &request).await?;
        Ok(pages
            .into_iter()
            .filter(|page| page.title != site.main_page)
            .map(|mut page| {
                if flags.improved_titles {
                    page.display_title = improve_title(&page.display_title);
                }
                page
            })
            .collect())
    }

    fn flags(&self) -> Flags {
        let prefs = self
            .preferences
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Flags {
            improved_titles: prefs.improved_titles,
            improved_filters: prefs.improved_filters,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_utils::{
        search_json, site_info_json, ScriptedFetcher, MEDIAWIKI_HOME, PLAIN_HOME,
    };

    const A_API: &str = "http://a.wiki.org/api.php";
    const B_API: &str = "http://b.wiki.org/w/api.php";

    fn dragon_wikis() -> ScriptedFetcher {
        ScriptedFetcher::new()
            .html("http://a.wiki.org/", MEDIAWIKI_HOME)
            .json(A_API, &site_info_json("A Wiki"))
            .json_when(
                A_API,
                ("generator", "search"),
                &search_json(&[
                    (1, "Main Page", "Welcome to A"),
                    (2, "Dragon", "A large fire-breathing beast"),
                    (3, "Red Dragon", "The red kind"),
                    (4, "Goblin", "Small and green"),
                ]),
            )
            .html("http://b.wiki.org/", MEDIAWIKI_HOME)
            .json(B_API, &site_info_json("B Wiki"))
            .json_when(
                B_API,
                ("generator", "search"),
                &search_json(&[
                    (10, "Dragons", "Overview of dragons"),
                    (11, "Lists/Characters:Dragon", "Character list"),
                    (12, "Dragonstone", "An island"),
                ]),
            )
            .html("http://example.org/", PLAIN_HOME)
    }

    async fn searcher(fetcher: ScriptedFetcher, urls: &str) -> WikiSearch<ScriptedFetcher> {
        let search = WikiSearch::new(SearchConfig::default(), fetcher).expect("valid config");
        search.apply_preferences(Preferences::with_urls(urls)).await;
        search
    }

    fn titles(results: &[RankedItem]) -> Vec<&str> {
        results.iter().map(|r| r.name()).collect()
    }

    #[test]
    fn invalid_config_rejected() {
        let config = SearchConfig {
            max_results: 0,
            ..Default::default()
        };
        assert!(WikiSearch::new(config, ScriptedFetcher::new()).is_err());
    }

    #[tokio::test]
    async fn merges_both_wikis_into_one_ranking() {
        let search = searcher(dragon_wikis(), "a.wiki.org | b.wiki.org").await;
        let results = search.search("dragon").await;

        assert!(!results.is_empty());
        assert!(results.len() <= 8);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(results.iter().all(|r| r.score >= 60));
        assert_eq!(results[0].name(), "Dragon");

        let hosts: Vec<&str> = results.iter().map(|r| r.item.endpoint.host()).collect();
        assert!(hosts.contains(&"a.wiki.org"));
        assert!(hosts.contains(&"b.wiki.org"));
        assert!(!titles(&results).contains(&"Goblin"));
    }

    #[tokio::test]
    async fn main_page_never_returned() {
        let search = searcher(dragon_wikis(), "a.wiki.org").await;
        let results = search.search("main page").await;
        assert!(!titles(&results).contains(&"Main Page"));
    }

    #[tokio::test]
    async fn capacity_limits_merged_results() {
        let config = SearchConfig {
            max_results: 2,
            ..Default::default()
        };
        let search = WikiSearch::new(config, dragon_wikis()).expect("valid config");
        search
            .apply_preferences(Preferences::with_urls("a.wiki.org b.wiki.org"))
            .await;
        assert_eq!(search.search("dragon").await.len(), 2);
    }

    #[tokio::test]
    async fn repeated_search_served_from_cache() {
        let search = searcher(dragon_wikis(), "a.wiki.org | b.wiki.org").await;
        let first = search.search("dragon").await;
        let requests = search.fetcher.total_requests();

        let second = search.search("  DRAGON ").await;
        assert_eq!(search.fetcher.total_requests(), requests);
        assert_eq!(titles(&first), titles(&second));
    }

    #[tokio::test]
    async fn rebuild_invalidates_cache() {
        let search = searcher(dragon_wikis(), "a.wiki.org | b.wiki.org").await;
        search.search("dragon").await;

        search
            .apply_preferences(Preferences::with_urls("a.wiki.org"))
            .await;
        let results = search.search("dragon").await;
        assert!(results.iter().all(|r| r.item.endpoint.host() == "a.wiki.org"));
    }

    #[tokio::test]
    async fn unchanged_url_list_does_not_rebuild() {
        let search = searcher(dragon_wikis(), "a.wiki.org").await;
        let generation = search.registry().snapshot().generation();
        let summary = search
            .apply_preferences(Preferences {
                wiki_urls: "a.wiki.org".into(),
                improved_titles: true,
                improved_filters: false,
            })
            .await;
        assert!(summary.is_none());
        assert_eq!(search.registry().snapshot().generation(), generation);
    }

    #[tokio::test]
    async fn improved_titles_rewrites_display_title() {
        let config = SearchConfig {
            min_score: 0,
            ..Default::default()
        };
        let search = WikiSearch::new(config, dragon_wikis()).expect("valid config");
        search
            .apply_preferences(Preferences {
                wiki_urls: "b.wiki.org".into(),
                improved_titles: true,
                improved_filters: false,
            })
            .await;
        let results = search.search("dragon").await;
        let rewritten = results
            .iter()
            .find(|r| r.item.id == 11)
            .expect("character list page ranked");
        assert_eq!(rewritten.name(), "Lists - Characters: Dragon");
        assert_eq!(rewritten.item.title, "Lists/Characters:Dragon");
    }

    #[tokio::test]
    async fn improved_filters_search_content_namespaces() {
        let search = searcher(dragon_wikis(), "a.wiki.org").await;
        search.search("dragon").await;
        let plain = search.fetcher.last_params(A_API).expect("searched");
        assert_eq!(plain.get("gsrnamespace").map(String::as_str), Some("0"));

        search
            .apply_preferences(Preferences {
                wiki_urls: "a.wiki.org".into(),
                improved_titles: false,
                improved_filters: true,
            })
            .await;
        search.search("dragon").await;
        let filtered = search.fetcher.last_params(A_API).expect("searched");
        assert_eq!(filtered.get("gsrnamespace").map(String::as_str), Some("0|3000"));
    }

    #[tokio::test]
    async fn failing_wiki_is_skipped() {
        let fetcher = dragon_wikis()
            .html("http://c.wiki.org/", MEDIAWIKI_HOME)
            .json("http://c.wiki.org/api.php", &site_info_json("C Wiki"))
            .json_when(
                "http://c.wiki.org/api.php",
                ("generator", "search"),
                "<html>oops</html>",
            );
        let search = searcher(fetcher, "a.wiki.org c.wiki.org").await;
        assert_eq!(search.registry().snapshot().len(), 2);

        let results = search.search("dragon").await;
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.item.endpoint.host() == "a.wiki.org"));
    }

    #[tokio::test]
    async fn unresolvable_urls_do_not_block_others() {
        let search = searcher(dragon_wikis(), "example.org | a.wiki.org | not a url").await;
        assert_eq!(search.registry().snapshot().hosts(), vec!["a.wiki.org"]);
        assert!(!search.search("dragon").await.is_empty());
    }

    #[tokio::test]
    async fn preferences_applied_from_spawned_task() {
        let search = Arc::new(
            WikiSearch::new(SearchConfig::default(), dragon_wikis()).expect("valid config"),
        );

        let task = tokio::spawn({
            let search = Arc::clone(&search);
            async move {
                search
                    .apply_preferences(Preferences::with_urls("a.wiki.org | b.wiki.org"))
                    .await
            }
        });
        let summary = task
            .await
            .expect("task completes")
            .expect("url list changed");

        assert_eq!(summary.resolved, 2);
        assert!(!search.search("dragon").await.is_empty());
    }

    #[tokio::test]
    async fn superseded_rebuild_keeps_newer_cache() {
        let fetcher = dragon_wikis()
            .html("http://slow.wiki.org/", MEDIAWIKI_HOME)
            .json("http://slow.wiki.org/api.php", &site_info_json("Slow Wiki"))
            .delay("http://slow.wiki.org/", Duration::from_millis(200));
        let search = WikiSearch::new(SearchConfig::default(), fetcher).expect("valid config");

        let (stale, (fresh, first)) = tokio::join!(search.rebuild("slow.wiki.org"), async {
            let summary = search.rebuild("a.wiki.org").await;
            let results = search.search("dragon").await;
            (summary, results)
        });
        assert!(!stale.applied);
        assert!(fresh.applied);
        assert!(!first.is_empty());
        assert_eq!(search.registry().snapshot().hosts(), vec!["a.wiki.org"]);

        // The late, discarded rebuild must not have cleared the cache.
        let requests = search.fetcher.total_requests();
        let second = search.search("dragon").await;
        assert_eq!(search.fetcher.total_requests(), requests);
        assert_eq!(titles(&first), titles(&second));
    }

    #[tokio::test]
    async fn empty_query_returns_nothing_without_requests() {
        let search = searcher(dragon_wikis(), "a.wiki.org").await;
        let requests = search.fetcher.total_requests();
        assert!(search.search("   ").await.is_empty());
        assert_eq!(search.fetcher.total_requests(), requests);
    }

    #[tokio::test]
    async fn no_wikis_means_no_results() {
        let search = WikiSearch::new(SearchConfig::default(), ScriptedFetcher::new())
            .expect("valid config");
        assert!(search.search("dragon").await.is_empty());
    }

    #[tokio::test]
    async fn site_name_used_in_description() {
        let search = searcher(dragon_wikis(), "a.wiki.org").await;
        let results = search.search("dragon").await;
        let top = results.first().expect("has results");
        assert_eq!(top.description(), "A Wiki - A large fire-breathing beast");
        assert_eq!(top.url(), "http://a.wiki.org/wiki/Dragon");
    }
}
