//! Scoping strategies: which cache tags a content change invalidates.

use crate::{RenderContext, ReferenceResolver};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempo_core::{ConfigError, ContentType, TempoConfig, TempoResult, TemporalContent};
use tracing::warn;

/// Tag covering every cached page.
pub const GLOBAL_TAG: &str = "pages";

pub const GLOBAL_SCOPING: &str = "global";
pub const PER_PAGE_SCOPING: &str = "per-page";
pub const PER_CONTENT_SCOPING: &str = "per-content";

/// Cache tag for a single page.
pub fn page_tag(page_id: i64) -> String {
    format!("pageId_{}", page_id)
}

/// Policy mapping a changed record to the cache tags to flush.
pub trait ScopingStrategy: Send + Sync {
    /// Identifier used in configuration.
    fn name(&self) -> &'static str;

    /// Tags to invalidate when `content` changes visibility.
    ///
    /// # Arguments
    /// * `content` - The record whose transition fired
    /// * `context` - Variant the transition was observed in
    ///
    /// # Returns
    /// The tag set. Built-in strategies never fail; a failing custom strategy
    /// is treated as a per-event error by the caller.
    fn tags(
        &self,
        content: &TemporalContent,
        context: &RenderContext,
    ) -> TempoResult<BTreeSet<String>>;
}

/// Every change flushes the whole page cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalScoping;

impl ScopingStrategy for GlobalScoping {
    fn name(&self) -> &'static str {
        GLOBAL_SCOPING
    }

    fn tags(
        &self,
        _content: &TemporalContent,
        _context: &RenderContext,
    ) -> TempoResult<BTreeSet<String>> {
        Ok(BTreeSet::from([GLOBAL_TAG.to_string()]))
    }
}

/// Flush the page the record lives on.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerPageScoping;

impl PerPageScoping {
    fn page_tags(content: &TemporalContent) -> BTreeSet<String> {
        BTreeSet::from([page_tag(content.page_id())])
    }
}

impl ScopingStrategy for PerPageScoping {
    fn name(&self) -> &'static str {
        PER_PAGE_SCOPING
    }

    fn tags(
        &self,
        content: &TemporalContent,
        _context: &RenderContext,
    ) -> TempoResult<BTreeSet<String>> {
        Ok(Self::page_tags(content))
    }
}

/// Flush every page a content element is displayed on.
///
/// Pages and unresolvable elements get the per-page tag.
#[derive(Clone, Default)]
pub struct PerContentScoping {
    resolver: Option<Arc<ReferenceResolver>>,
}

impl PerContentScoping {
    /// `None` disables reference resolution.
    pub fn new(resolver: Option<Arc<ReferenceResolver>>) -> Self {
        Self { resolver }
    }

    pub fn uses_reference_index(&self) -> bool {
        self.resolver.is_some()
    }
}

impl ScopingStrategy for PerContentScoping {
    fn name(&self) -> &'static str {
        PER_CONTENT_SCOPING
    }

    fn tags(
        &self,
        content: &TemporalContent,
        context: &RenderContext,
    ) -> TempoResult<BTreeSet<String>> {
        let resolver = match (&self.resolver, content.content_type()) {
            (Some(resolver), ContentType::Content) => resolver,
            _ => return Ok(PerPageScoping::page_tags(content)),
        };

        match resolver.resolve_pages(content, context.workspace_id()) {
            Ok(pages) if !pages.is_empty() => Ok(pages.into_iter().map(page_tag).collect()),
            Ok(_) => Ok(PerPageScoping::page_tags(content)),
            Err(e) => {
                warn!(
                    collection = %content.collection_name,
                    id = content.id,
                    error = %e,
                    "Reference resolution failed, falling back to page scope"
                );
                Ok(PerPageScoping::page_tags(content))
            }
        }
    }
}

/// Build the scoping strategy named by `config`.
///
/// The resolver is only used by `per-content`, and only when
/// `use_reference_index` is on.
pub fn scoping_strategy_from_config(
    config: &TempoConfig,
    resolver: Option<Arc<ReferenceResolver>>,
) -> Result<Arc<dyn ScopingStrategy>, ConfigError> {
    match config.scoping_strategy() {
        GLOBAL_SCOPING => Ok(Arc::new(GlobalScoping)),
        PER_PAGE_SCOPING => Ok(Arc::new(PerPageScoping)),
        PER_CONTENT_SCOPING => {
            let resolver = resolver.filter(|_| config.use_reference_index());
            Ok(Arc::new(PerContentScoping::new(resolver)))
        }
        other => Err(ConfigError::UnknownStrategy {
            kind: "scoping".to_string(),
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_core::{CONTENT_COLLECTION, PAGES_COLLECTION};
    use tempo_storage::{MockContentStore, MockReferenceIndex, RecordRef};

    fn resolver_with_reference() -> (Arc<MockReferenceIndex>, Arc<ReferenceResolver>) {
        let store = Arc::new(MockContentStore::new());
        store.insert(TemporalContent::content_element(10, 1)).unwrap();
        let index = Arc::new(MockReferenceIndex::new());
        index
            .add_reference(
                RecordRef::new(PAGES_COLLECTION, 5),
                RecordRef::new(CONTENT_COLLECTION, 10),
            )
            .unwrap();
        let resolver = Arc::new(ReferenceResolver::new(store, index.clone()));
        (index, resolver)
    }

    fn tag_set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_global_is_constant() {
        let context = RenderContext::live();
        for content in [TemporalContent::page(1, 0), TemporalContent::content_element(9, 4)] {
            assert_eq!(GlobalScoping.tags(&content, &context).unwrap(), tag_set(&["pages"]));
        }
    }

    #[test]
    fn test_per_page_uses_page_id() {
        let context = RenderContext::live();
        assert_eq!(
            PerPageScoping.tags(&TemporalContent::page(7, 1), &context).unwrap(),
            tag_set(&["pageId_7"])
        );
        assert_eq!(
            PerPageScoping
                .tags(&TemporalContent::content_element(3, 7), &context)
                .unwrap(),
            tag_set(&["pageId_7"])
        );
    }

    #[test]
    fn test_per_content_resolves_references() {
        let (_, resolver) = resolver_with_reference();
        let strategy = PerContentScoping::new(Some(resolver));

        let tags = strategy
            .tags(&TemporalContent::content_element(10, 1), &RenderContext::live())
            .unwrap();
        assert_eq!(tags, tag_set(&["pageId_1", "pageId_5"]));
    }

    #[test]
    fn test_per_content_pages_behave_like_per_page() {
        let (_, resolver) = resolver_with_reference();
        let strategy = PerContentScoping::new(Some(resolver));

        let tags = strategy
            .tags(&TemporalContent::page(5, 0), &RenderContext::live())
            .unwrap();
        assert_eq!(tags, tag_set(&["pageId_5"]));
    }

    #[test]
    fn test_per_content_falls_back_on_resolution_error() {
        let (index, resolver) = resolver_with_reference();
        index.set_failing(true);
        let strategy = PerContentScoping::new(Some(resolver));

        let tags = strategy
            .tags(&TemporalContent::content_element(10, 1), &RenderContext::live())
            .unwrap();
        assert_eq!(tags, tag_set(&["pageId_1"]));
    }

    #[test]
    fn test_per_content_without_resolver() {
        let strategy = PerContentScoping::new(None);
        assert!(!strategy.uses_reference_index());

        let tags = strategy
            .tags(&TemporalContent::content_element(10, 1), &RenderContext::live())
            .unwrap();
        assert_eq!(tags, tag_set(&["pageId_1"]));
    }

    #[test]
    fn test_factory_selects_by_name() {
        let (_, resolver) = resolver_with_reference();
        for name in [GLOBAL_SCOPING, PER_PAGE_SCOPING, PER_CONTENT_SCOPING] {
            let config = TempoConfig {
                scoping_strategy: name.to_string(),
                ..TempoConfig::default()
            };
            let strategy = scoping_strategy_from_config(&config, Some(resolver.clone())).unwrap();
            assert_eq!(strategy.name(), name);
        }
    }

    #[test]
    fn test_factory_rejects_unknown_name() {
        let config = TempoConfig {
            scoping_strategy: "per-site".to_string(),
            ..TempoConfig::default()
        };
        let result = scoping_strategy_from_config(&config, None);
        assert!(matches!(
            result,
            Err(ConfigError::UnknownStrategy { ref name, .. }) if name == "per-site"
        ));
    }

    #[test]
    fn test_factory_honours_reference_index_flag() {
        let (_, resolver) = resolver_with_reference();
        let config = TempoConfig {
            scoping_strategy: PER_CONTENT_SCOPING.to_string(),
            use_reference_index: false,
            ..TempoConfig::default()
        };
        let strategy = scoping_strategy_from_config(&config, Some(resolver)).unwrap();

        let tags = strategy
            .tags(&TemporalContent::content_element(10, 1), &RenderContext::live())
            .unwrap();
        assert_eq!(tags, tag_set(&["pageId_1"]));
    }
}
