//! Page resolution for content elements.
//!
//! Resolution is bounded: references are followed a single hop, then mount
//! points and shortcuts of the pages found so far are added. Chains longer
//! than that are not chased.

use std::collections::BTreeSet;
use std::sync::Arc;
use tempo_core::{TempoResult, TemporalContent, PAGES_COLLECTION};
use tempo_storage::{ContentStore, ReferenceIndex};
use tracing::debug;

/// Finds every page a content element is displayed on.
#[derive(Clone)]
pub struct ReferenceResolver {
    store: Arc<dyn ContentStore>,
    index: Arc<dyn ReferenceIndex>,
}

impl ReferenceResolver {
    pub fn new(store: Arc<dyn ContentStore>, index: Arc<dyn ReferenceIndex>) -> Self {
        Self { store, index }
    }

    /// Pages displaying `element`, deduplicated.
    ///
    /// 1. the element's containing page
    /// 2. pages referencing the element, and the containing pages of
    ///    elements referencing it
    /// 3. pages mounting any page from 1-2
    /// 4. shortcuts to any page from 1-2
    pub fn resolve_pages(
        &self,
        element: &TemporalContent,
        workspace_id: i64,
    ) -> TempoResult<BTreeSet<i64>> {
        let mut pages = BTreeSet::new();
        pages.insert(element.parent_id);

        for reference in
            self.index
                .referrers_of(&element.collection_name, element.id, workspace_id)?
        {
            if reference.collection == PAGES_COLLECTION {
                pages.insert(reference.id);
            } else if let Some(referrer) =
                self.store
                    .find_by_id(reference.id, &reference.collection, workspace_id)?
            {
                pages.insert(referrer.parent_id);
            }
        }

        let mount_points = self.index.mount_points_for(&pages, workspace_id)?;
        let shortcuts = self.index.shortcuts_to(&pages, workspace_id)?;
        pages.extend(mount_points);
        pages.extend(shortcuts);

        debug!(
            collection = %element.collection_name,
            id = element.id,
            workspace_id,
            pages = pages.len(),
            "Resolved display pages"
        );
        Ok(pages)
    }

    /// Same as [`ReferenceResolver::resolve_pages`] starting from an id.
    /// Unknown elements resolve to no pages.
    pub fn resolve_pages_by_id(
        &self,
        collection: &str,
        element_id: i64,
        workspace_id: i64,
    ) -> TempoResult<BTreeSet<i64>> {
        match self.store.find_by_id(element_id, collection, workspace_id)? {
            Some(element) => self.resolve_pages(&element, workspace_id),
            None => Ok(BTreeSet::new()),
        }
    }
}
