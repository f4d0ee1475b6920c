// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Page discovery and prioritization
//!
//! Crawls a seed page's internal links, classifies each by path heuristics,
//! assigns a priority, deduplicates, and returns a ranked, capped list of
//! candidate pages for the collection phase.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use url::Url;

use crate::clients::extractor::extract_hrefs;
use crate::clients::PageExtractor;
use crate::errors::SiteflowError;

/// Classified page category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Blog,
    Product,
    About,
    Contact,
    Services,
    Pricing,
    Features,
    Support,
    /// Internal page matching no category pattern
    Subpage,
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Blog => "blog",
            Self::Product => "product",
            Self::About => "about",
            Self::Contact => "contact",
            Self::Services => "services",
            Self::Pricing => "pricing",
            Self::Features => "features",
            Self::Support => "support",
            Self::Subpage => "subpage",
        };
        write!(f, "{name}")
    }
}

/// Ordered classification table: first matching path substring wins.
/// The weight is the category's default priority.
const CATEGORY_TABLE: &[(&str, PageType, u32)] = &[
    ("blog", PageType::Blog, 3),
    ("product", PageType::Product, 5),
    ("about", PageType::About, 2),
    ("contact", PageType::Contact, 2),
    ("service", PageType::Services, 3),
    ("pricing", PageType::Pricing, 4),
    ("feature", PageType::Features, 3),
    ("support", PageType::Support, 1),
];

const SUBPAGE_PRIORITY: u32 = 1;

/// A crawled, classified, prioritized URL proposed as pipeline input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePage {
    pub url: Url,
    pub page_type: PageType,
    pub priority: u32,
}

/// Discovery bounds and per-category overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryOptions {
    /// Maximum candidates returned
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Crawl depth from the seed. Depth 1 reads only the seed page.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Per-category priority overrides. Weight 0 disables the category.
    #[serde(default)]
    pub weights: HashMap<PageType, u32>,
}

fn default_max_pages() -> usize {
    10
}

fn default_max_depth() -> usize {
    1
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            weights: HashMap::new(),
        }
    }
}

impl DiscoveryOptions {
    /// Effective priority for a category, after overrides. `None` means the
    /// category is disabled.
    fn priority_for(&self, page_type: PageType) -> Option<u32> {
        let default = CATEGORY_TABLE
            .iter()
            .find(|(_, t, _)| *t == page_type)
            .map(|(_, _, w)| *w)
            .unwrap_or(SUBPAGE_PRIORITY);
        let weight = self.weights.get(&page_type).copied().unwrap_or(default);
        (weight > 0).then_some(weight)
    }
}

/// Classify a URL by path substring matching
pub fn classify(url: &Url) -> PageType {
    let path = url.path().to_lowercase();
    for (pattern, page_type, _) in CATEGORY_TABLE {
        if path.contains(pattern) {
            return *page_type;
        }
    }
    PageType::Subpage
}

/// Normalize a URL for deduplication: drop query and fragment, strip a
/// single trailing slash. The rule is arbitrary but applied consistently.
fn normalize(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_query(None);
    normalized.set_fragment(None);
    let repr = normalized.to_string();
    repr.strip_suffix('/').map(str::to_string).unwrap_or(repr)
}

fn is_root(url: &Url) -> bool {
    matches!(url.path(), "" | "/")
}

/// Discover candidate pages starting from a seed URL.
///
/// A failed seed fetch is fatal (without a seed there is nothing to crawl);
/// failed fetches of deeper pages are logged and skipped.
pub async fn discover(
    seed: &Url,
    options: &DiscoveryOptions,
    extractor: &dyn PageExtractor,
) -> Result<Vec<CandidatePage>, SiteflowError> {
    let seed_origin = seed.origin();
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(normalize(seed));

    let mut candidates: Vec<CandidatePage> = Vec::new();
    let mut frontier: Vec<Url> = vec![seed.clone()];

    // Deeper pages are only fetched while the candidate pool is still
    // short of twice the requested cap. This bounds crawl cost on
    // link-heavy sites without starving the priority sort of choices.
    let crawl_budget = options.max_pages.saturating_mul(2);
    let max_depth = options.max_depth.max(1);

    for depth in 0..max_depth {
        let mut next_frontier = Vec::new();

        for page in &frontier {
            let html = match extractor.fetch_html(page).await {
                Ok(html) => html,
                Err(e) if depth == 0 => return Err(e),
                Err(e) => {
                    warn!(url = %page, error = %e, "skipping unfetchable page");
                    continue;
                }
            };

            for href in extract_hrefs(&html) {
                let Ok(resolved) = page.join(&href) else {
                    continue;
                };
                if !matches!(resolved.scheme(), "http" | "https") {
                    continue;
                }
                if resolved.origin() != seed_origin {
                    continue;
                }
                // The seed fetch already covers the root
                if is_root(&resolved) {
                    continue;
                }
                if !seen.insert(normalize(&resolved)) {
                    continue;
                }

                let page_type = classify(&resolved);
                let Some(priority) = options.priority_for(page_type) else {
                    debug!(url = %resolved, %page_type, "category disabled");
                    continue;
                };

                if depth + 1 < max_depth && candidates.len() < crawl_budget {
                    next_frontier.push(resolved.clone());
                }
                candidates.push(CandidatePage {
                    url: resolved,
                    page_type,
                    priority,
                });
            }
        }

        frontier = next_frontier;
        if frontier.is_empty() {
            break;
        }
    }

    // Priority desc, normalized URL asc for determinism
    candidates.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| normalize(&a.url).cmp(&normalize(&b.url)))
    });
    candidates.truncate(options.max_pages);

    Ok(candidates)
}
