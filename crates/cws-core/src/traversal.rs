//! Depth-first traversal of an [`AssetTree`] with per-type visitors.
//!
//! The walk is pre-order: every visitor registered for a node's type runs,
//! in registration order, before the walk descends into that node's
//! children. Calls are awaited one at a time; nothing is spawned.

use crate::asset::Asset;
use crate::cache::AssetCache;
use crate::child::Child;
use crate::params::TraversalParams;
use crate::tree::{child_list, AssetTree};
use async_trait::async_trait;
use cws_connectors::{AssetOperations, AssetType, AssetTypeTable, CascadeError, CascadeResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// What a visitor can reach during a walk.
#[derive(Clone, Copy)]
pub struct VisitContext<'a> {
    pub client: &'a dyn AssetOperations,
    pub cache: &'a AssetCache,
}

impl<'a> VisitContext<'a> {
    pub fn new(client: &'a dyn AssetOperations, cache: &'a AssetCache) -> Self {
        Self { client, cache }
    }

    pub fn types(&self) -> &AssetTypeTable {
        self.client.type_table()
    }

    /// The materialized asset behind `child`, through the cache.
    pub async fn asset(&self, child: &Child) -> CascadeResult<Arc<Asset>> {
        self.cache.retrieve_asset(self.client, child).await
    }
}

/// A callback run once for each visited node of a registered type.
///
/// Visitors read the node and the shared params and record findings in
/// `results`. A visitor that does not apply to a node returns `Ok(())`; an
/// error aborts the whole walk.
#[async_trait]
pub trait Visitor<R: Send>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn visit(
        &self,
        ctx: &VisitContext<'_>,
        child: &Child,
        params: &TraversalParams,
        results: &mut R,
    ) -> CascadeResult<()>;
}

/// Visitors keyed by the asset type they run on.
pub struct VisitorMap<R: Send> {
    by_type: HashMap<AssetType, Vec<Arc<dyn Visitor<R>>>>,
}

impl<R: Send> Default for VisitorMap<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send> VisitorMap<R> {
    pub fn new() -> Self {
        Self {
            by_type: HashMap::new(),
        }
    }

    /// Appends `visitor` to the list for `asset_type`.
    pub fn register(&mut self, asset_type: AssetType, visitor: Arc<dyn Visitor<R>>) -> &mut Self {
        self.by_type.entry(asset_type).or_default().push(visitor);
        self
    }

    /// Registers one visitor for several types.
    pub fn register_all(&mut self, types: &[AssetType], visitor: Arc<dyn Visitor<R>>) -> &mut Self {
        for asset_type in types {
            self.register(*asset_type, Arc::clone(&visitor));
        }
        self
    }

    pub fn visitors_for(&self, asset_type: AssetType) -> &[Arc<dyn Visitor<R>>] {
        self.by_type
            .get(&asset_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn registered_types(&self) -> impl Iterator<Item = AssetType> + '_ {
        self.by_type.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

/// Counters for one completed walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub nodes_visited: u64,
    pub containers_expanded: u64,
    pub visitor_calls: u64,
}

/// Walks `tree` depth-first, running `visitors` on each node.
///
/// Recycled children are not walked, and a node reached twice is skipped.
/// `cancel` is checked before every node; when it fires the walk stops with
/// [`CascadeError::Cancelled`] and `results` keeps what was recorded so far.
#[instrument(skip_all, fields(root = %tree.root().key()))]
pub async fn traverse<R: Send>(
    ctx: &VisitContext<'_>,
    tree: &AssetTree,
    visitors: &VisitorMap<R>,
    params: &TraversalParams,
    results: &mut R,
    cancel: &CancellationToken,
) -> CascadeResult<TraversalStats> {
    let types = ctx.types();
    let mut stats = TraversalStats::default();
    let mut seen = HashSet::new();
    let mut stack = vec![tree.root().clone()];

    while let Some(node) = stack.pop() {
        if cancel.is_cancelled() {
            warn!(nodes_visited = stats.nodes_visited, "Traversal cancelled");
            return Err(CascadeError::Cancelled(format!(
                "Traversal cancelled after {} nodes",
                stats.nodes_visited
            )));
        }
        if !seen.insert(node.key()) {
            debug!(key = %node.key(), "Node already visited");
            continue;
        }
        stats.nodes_visited += 1;

        for visitor in visitors.visitors_for(node.asset_type()) {
            visitor.visit(ctx, &node, params, results).await?;
            stats.visitor_calls += 1;
        }

        if types.is_container(node.asset_type()) {
            let asset = ctx.asset(&node).await?;
            let children = child_list(types, &asset)?;
            debug!(path = node.path(), children = children.len(), "Expanding container");
            stats.containers_expanded += 1;
            // Reversed so the first child is popped first.
            stack.extend(children.into_iter().filter(|c| !c.is_recycled()).rev());
        }
    }

    info!(
        nodes_visited = stats.nodes_visited,
        containers_expanded = stats.containers_expanded,
        visitor_calls = stats.visitor_calls,
        "Traversal complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cws_connectors::testing::{hex_id, mock_with_sample_tree, sample_child_json, sample_folder, sample_page};
    use cws_connectors::MockTransport;
    use serde_json::json;

    /// Records `<label>:<path>` for each node it sees.
    struct Recorder(&'static str);

    #[async_trait]
    impl Visitor<Vec<String>> for Recorder {
        fn name(&self) -> &str {
            self.0
        }

        async fn visit(
            &self,
            _ctx: &VisitContext<'_>,
            child: &Child,
            _params: &TraversalParams,
            results: &mut Vec<String>,
        ) -> CascadeResult<()> {
            results.push(format!("{}:{}", self.0, child.path()));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Visitor<Vec<String>> for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn visit(
            &self,
            _ctx: &VisitContext<'_>,
            _child: &Child,
            _params: &TraversalParams,
            _results: &mut Vec<String>,
        ) -> CascadeResult<()> {
            Err(CascadeError::UnacceptableValue("boom".to_string()))
        }
    }

    fn docs_root() -> Child {
        Child::new(hex_id(1), AssetType::Folder, "docs", Some("www"))
    }

    fn tree() -> AssetTree {
        AssetTree::new(&AssetTypeTable::standard(), docs_root()).unwrap()
    }

    /// docs/{a, sub/{x}, c}
    fn nested_mock() -> MockTransport {
        let mock = MockTransport::new();
        mock.insert(
            AssetType::Folder,
            sample_folder(
                &hex_id(1),
                "docs",
                "www",
                vec![
                    sample_child_json(&hex_id(2), AssetType::Page, "docs/a", "www"),
                    sample_child_json(&hex_id(5), AssetType::Folder, "docs/sub", "www"),
                    sample_child_json(&hex_id(4), AssetType::Page, "docs/c", "www"),
                ],
            ),
        );
        mock.insert(
            AssetType::Folder,
            sample_folder(
                &hex_id(5),
                "docs/sub",
                "www",
                vec![sample_child_json(&hex_id(6), AssetType::Page, "docs/sub/x", "www")],
            ),
        );
        for (id, path) in [(2, "docs/a"), (4, "docs/c"), (6, "docs/sub/x")] {
            mock.insert(AssetType::Page, sample_page(&hex_id(id), path, "www", json!({})));
        }
        mock
    }

    #[tokio::test]
    async fn test_pre_order_and_registration_order() {
        let mock = nested_mock();
        let cache = AssetCache::new();
        let ctx = VisitContext::new(&mock, &cache);

        let mut visitors: VisitorMap<Vec<String>> = VisitorMap::new();
        visitors
            .register(AssetType::Folder, Arc::new(Recorder("dir")))
            .register_all(&[AssetType::Page], Arc::new(Recorder("first")))
            .register(AssetType::Page, Arc::new(Recorder("second")));

        let mut seen: Vec<String> = Vec::new();
        let stats = traverse(
            &ctx,
            &tree(),
            &visitors,
            &TraversalParams::new(),
            &mut seen,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(
            seen,
            vec![
                "dir:docs",
                "first:docs/a",
                "second:docs/a",
                "dir:docs/sub",
                "first:docs/sub/x",
                "second:docs/sub/x",
                "first:docs/c",
                "second:docs/c",
            ]
        );
        assert_eq!(
            stats,
            TraversalStats {
                nodes_visited: 5,
                containers_expanded: 2,
                visitor_calls: 8,
            }
        );
        // Only containers are read to expand the walk.
        assert_eq!(mock.count("read"), 2);
    }

    #[tokio::test]
    async fn test_unregistered_types_are_walked_but_not_visited() {
        let mock = mock_with_sample_tree();
        let cache = AssetCache::new();
        let ctx = VisitContext::new(&mock, &cache);
        let mut visitors: VisitorMap<Vec<String>> = VisitorMap::new();
        visitors.register(AssetType::File, Arc::new(Recorder("file")));

        let mut seen: Vec<String> = Vec::new();
        let stats = traverse(
            &ctx,
            &tree(),
            &visitors,
            &TraversalParams::new(),
            &mut seen,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(seen.is_empty());
        assert_eq!(stats.nodes_visited, 4);
        assert_eq!(stats.visitor_calls, 0);
    }

    #[tokio::test]
    async fn test_visitor_error_aborts() {
        let mock = mock_with_sample_tree();
        let cache = AssetCache::new();
        let ctx = VisitContext::new(&mock, &cache);
        let mut visitors: VisitorMap<Vec<String>> = VisitorMap::new();
        visitors
            .register(AssetType::Page, Arc::new(Recorder("page")))
            .register(AssetType::Page, Arc::new(Failing));

        let mut seen: Vec<String> = Vec::new();
        let err = traverse(
            &ctx,
            &tree(),
            &visitors,
            &TraversalParams::new(),
            &mut seen,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CascadeError::UnacceptableValue(_)));
        assert_eq!(seen, vec!["page:docs/a"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_keeps_results() {
        let mock = mock_with_sample_tree();
        let cache = AssetCache::new();
        let ctx = VisitContext::new(&mock, &cache);
        let visitors: VisitorMap<Vec<String>> = VisitorMap::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut seen = vec!["earlier".to_string()];
        let err = traverse(
            &ctx,
            &tree(),
            &visitors,
            &TraversalParams::new(),
            &mut seen,
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CascadeError::Cancelled(_)));
        assert_eq!(seen, vec!["earlier"]);
        assert!(mock.performed().is_empty());
    }

    #[tokio::test]
    async fn test_recycled_and_repeated_children_are_skipped() {
        let mock = MockTransport::new();
        let mut recycled = sample_child_json(&hex_id(3), AssetType::Page, "docs/old", "www");
        recycled["recycled"] = json!(true);
        mock.insert(
            AssetType::Folder,
            sample_folder(
                &hex_id(1),
                "docs",
                "www",
                vec![
                    sample_child_json(&hex_id(2), AssetType::Page, "docs/a", "www"),
                    sample_child_json(&hex_id(2), AssetType::Page, "docs/a", "www"),
                    recycled,
                ],
            ),
        );

        let cache = AssetCache::new();
        let ctx = VisitContext::new(&mock, &cache);
        let mut visitors: VisitorMap<Vec<String>> = VisitorMap::new();
        visitors.register(AssetType::Page, Arc::new(Recorder("page")));

        let mut seen: Vec<String> = Vec::new();
        traverse(
            &ctx,
            &tree(),
            &visitors,
            &TraversalParams::new(),
            &mut seen,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(seen, vec!["page:docs/a"]);
    }

    #[test]
    fn test_visitor_map_lookup() {
        let mut visitors: VisitorMap<Vec<String>> = VisitorMap::new();
        assert!(visitors.is_empty());
        visitors.register_all(&[AssetType::Page, AssetType::File], Arc::new(Recorder("x")));
        assert_eq!(visitors.visitors_for(AssetType::Page).len(), 1);
        assert!(visitors.visitors_for(AssetType::Folder).is_empty());
        assert_eq!(visitors.registered_types().count(), 2);
        assert_eq!(visitors.visitors_for(AssetType::File)[0].name(), "x");
    }
}
