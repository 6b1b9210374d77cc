//! Reports: visitor predicates composed with the traversal engine.
//!
//! A [`Report`] owns a client, a read-through cache and a root container.
//! Each driver clears the cache, builds the traversal params, registers the
//! visitors its [`ReportKind`] needs and walks the tree. The results of the
//! last run of every kind are kept and available through [`Report::results`].
//!
//! # Example
//!
//! ```ignore
//! let client = cws_connectors::connect(&ClientConfig::from_env()?)?;
//! let mut report = Report::new(client);
//! report
//!     .set_root_container(AssetType::Folder, "news", Some("www"))
//!     .await?;
//! let results = report
//!     .report_date(DateField::EndDate, Utc::now())
//!     .await?;
//! for path in results.bucket(AssetType::Page, ReportBucket::DateBefore(DateField::EndDate)) {
//!     println!("expired: {}", path);
//! }
//! ```

pub mod matching;
pub mod results;
pub mod visitors;

pub use matching::{FieldPair, MatchPolicy};
pub use results::{DateField, ReportBucket, ReportResults};

use crate::asset::Asset;
use crate::cache::AssetCache;
use crate::child::Child;
use crate::params::TraversalParams;
use crate::traversal::{traverse, TraversalStats, VisitContext, Visitor, VisitorMap};
use crate::tree::AssetTree;
use chrono::{DateTime, Utc};
use cws_connectors::{resolve, AssetOperations, AssetType, CascadeError, CascadeResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use visitors::{
    ContentSubstringVisitor, CountVisitor, DateVisitor, FieldValueVisitor,
    ShouldBePublishedVisitor, DISJUNCTIVE, FIELD_PAIRS, RELATIVE_TO, SHOULD_BE_PUBLISHED,
    SUBSTRING,
};

/// Types that carry metadata.
pub const METADATA_TYPES: &[AssetType] = &[
    AssetType::Folder,
    AssetType::Page,
    AssetType::File,
    AssetType::Symlink,
    AssetType::FeedBlock,
    AssetType::IndexBlock,
    AssetType::TextBlock,
    AssetType::XhtmlDataDefinitionBlock,
    AssetType::XmlBlock,
];

/// Types that live in folders and carry created/last-modified dates.
pub const FOLDER_CONTAINED_TYPES: &[AssetType] = &[
    AssetType::Folder,
    AssetType::Page,
    AssetType::File,
    AssetType::Symlink,
    AssetType::Reference,
    AssetType::Template,
    AssetType::FeedBlock,
    AssetType::IndexBlock,
    AssetType::TextBlock,
    AssetType::XhtmlDataDefinitionBlock,
    AssetType::XmlBlock,
    AssetType::ScriptFormat,
    AssetType::XsltFormat,
];

/// Types with searchable text content.
pub const CONTENT_TYPES: &[AssetType] = &[
    AssetType::Page,
    AssetType::TextBlock,
    AssetType::XhtmlDataDefinitionBlock,
];

/// Types with a `shouldBePublished` flag.
pub const PUBLISHABLE_TYPES: &[AssetType] = &[AssetType::Page, AssetType::File, AssetType::Folder];

/// Which report a run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Date(DateField),
    MetadataValues,
    ContentSubstring,
    ShouldBePublished,
    NumberOfAssets,
}

impl ReportKind {
    /// The types this kind inspects when the caller does not narrow them.
    pub fn default_types(&self) -> &'static [AssetType] {
        match self {
            ReportKind::Date(field) if field.is_metadata() => METADATA_TYPES,
            ReportKind::Date(_) => FOLDER_CONTAINED_TYPES,
            ReportKind::MetadataValues => METADATA_TYPES,
            ReportKind::ContentSubstring => CONTENT_TYPES,
            ReportKind::ShouldBePublished => PUBLISHABLE_TYPES,
            ReportKind::NumberOfAssets => AssetType::ALL,
        }
    }

    /// Dispatch table: the visitors a run of this kind registers on `types`.
    pub fn visitors(&self, types: &[AssetType]) -> VisitorMap<ReportResults> {
        let visitor: Arc<dyn Visitor<ReportResults>> = match self {
            ReportKind::Date(field) => Arc::new(DateVisitor::new(*field)),
            ReportKind::MetadataValues => Arc::new(FieldValueVisitor),
            ReportKind::ContentSubstring => Arc::new(ContentSubstringVisitor),
            ReportKind::ShouldBePublished => Arc::new(ShouldBePublishedVisitor),
            ReportKind::NumberOfAssets => Arc::new(CountVisitor),
        };
        let mut map = VisitorMap::new();
        map.register_all(types, visitor);
        map
    }
}

/// Report orchestrator.
pub struct Report {
    client: Arc<dyn AssetOperations>,
    cache: AssetCache,
    root: Option<AssetTree>,
    cancel: CancellationToken,
    completed: HashMap<ReportKind, ReportResults>,
    last_stats: Option<TraversalStats>,
}

impl Report {
    pub fn new(client: Arc<dyn AssetOperations>) -> Self {
        Self {
            client,
            cache: AssetCache::new(),
            root: None,
            cancel: CancellationToken::new(),
            completed: HashMap::new(),
            last_stats: None,
        }
    }

    /// Uses `token` to stop runs early. Cancelling it fails the current run
    /// and every later one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    pub fn root(&self) -> Option<&Child> {
        self.root.as_ref().map(AssetTree::root)
    }

    /// Sets the container every later run starts from.
    pub fn set_root(&mut self, root: Child) -> CascadeResult<&mut Self> {
        self.root = Some(AssetTree::new(self.client.type_table(), root)?);
        Ok(self)
    }

    /// Resolves and reads a container, then makes it the root.
    pub async fn set_root_container(
        &mut self,
        asset_type: AssetType,
        locator: &str,
        site_name: Option<&str>,
    ) -> CascadeResult<&mut Self> {
        let identifier = resolve(asset_type, locator, site_name)?;
        let reply = self.client.read(&identifier).await?;
        let asset = Asset::from_read(&identifier, reply)?;
        self.set_root(Child::from_asset(&asset)?)
    }

    /// Results of the last completed run of `kind`; `None` if it never ran.
    pub fn results(&self, kind: ReportKind) -> Option<&ReportResults> {
        self.completed.get(&kind)
    }

    pub fn last_stats(&self) -> Option<TraversalStats> {
        self.last_stats
    }

    /// Runs `kind` over `types` from the root with `params`.
    ///
    /// Fails with [`CascadeError::NullAsset`] when no root is set.
    #[instrument(skip_all, fields(kind = ?kind))]
    pub async fn run(
        &mut self,
        kind: ReportKind,
        params: TraversalParams,
        types: &[AssetType],
    ) -> CascadeResult<ReportResults> {
        let tree = self
            .root
            .clone()
            .ok_or_else(|| CascadeError::NullAsset("Report has no root container".to_string()))?;
        self.cache.clear_cache().await;

        let visitors = kind.visitors(types);
        let ctx = VisitContext::new(self.client.as_ref(), &self.cache);
        let mut results = ReportResults::new();
        let stats = traverse(&ctx, &tree, &visitors, &params, &mut results, &self.cancel).await?;

        info!(
            root = tree.root().path(),
            nodes = stats.nodes_visited,
            "Report complete"
        );
        self.last_stats = Some(stats);
        self.completed.insert(kind, results.clone());
        Ok(results)
    }

    /// Buckets assets by whether `field` falls before or after `relative_to`.
    pub async fn report_date(
        &mut self,
        field: DateField,
        relative_to: DateTime<Utc>,
    ) -> CascadeResult<ReportResults> {
        let kind = ReportKind::Date(field);
        let params = TraversalParams::new().with(RELATIVE_TO, relative_to.to_rfc3339());
        self.run(kind, params, kind.default_types()).await
    }

    /// Collects assets whose metadata matches `pairs`, any (`disjunctive`) or all.
    pub async fn report_metadata_values(
        &mut self,
        pairs: &[FieldPair],
        disjunctive: bool,
    ) -> CascadeResult<ReportResults> {
        if pairs.is_empty() {
            return Err(CascadeError::EmptyValue("No field pairs to match".to_string()));
        }
        let kind = ReportKind::MetadataValues;
        let params = TraversalParams::new()
            .with(FIELD_PAIRS, FieldPair::to_value(pairs))
            .with(DISJUNCTIVE, disjunctive);
        self.run(kind, params, kind.default_types()).await
    }

    /// Collects pages and blocks whose text contains `substring`.
    pub async fn report_content_substring(&mut self, substring: &str) -> CascadeResult<ReportResults> {
        if substring.is_empty() {
            return Err(CascadeError::EmptyValue("Empty substring".to_string()));
        }
        let kind = ReportKind::ContentSubstring;
        let params = TraversalParams::new().with(SUBSTRING, substring);
        self.run(kind, params, kind.default_types()).await
    }

    pub async fn report_should_be_published(&mut self, flag: bool) -> CascadeResult<ReportResults> {
        let kind = ReportKind::ShouldBePublished;
        let params = TraversalParams::new().with(SHOULD_BE_PUBLISHED, flag);
        self.run(kind, params, kind.default_types()).await
    }

    /// Counts assets per type. An empty `types` counts every type.
    pub async fn report_number_of_assets(&mut self, types: &[AssetType]) -> CascadeResult<ReportResults> {
        let kind = ReportKind::NumberOfAssets;
        let types = if types.is_empty() {
            kind.default_types()
        } else {
            types
        };
        self.run(kind, TraversalParams::new(), types).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cws_connectors::testing::{hex_id, mock_with_sample_tree};
    use cws_connectors::MockTransport;

    fn report(mock: MockTransport) -> (Arc<MockTransport>, Report) {
        let mock = Arc::new(mock);
        let report = Report::new(mock.clone());
        (mock, report)
    }

    fn docs_root() -> Child {
        Child::new(hex_id(1), AssetType::Folder, "docs", Some("www"))
    }

    #[tokio::test]
    async fn test_results_not_yet_run() {
        let (_, report) = report(mock_with_sample_tree());
        assert!(report.results(ReportKind::NumberOfAssets).is_none());
        assert!(report.last_stats().is_none());
    }

    #[tokio::test]
    async fn test_run_without_root() {
        let (_, mut report) = report(mock_with_sample_tree());
        let err = report.report_number_of_assets(&[]).await.unwrap_err();
        assert!(matches!(err, CascadeError::NullAsset(_)));
    }

    #[tokio::test]
    async fn test_root_must_be_container() {
        let (_, mut report) = report(mock_with_sample_tree());
        let page = Child::new(hex_id(2), AssetType::Page, "docs/a", Some("www"));
        assert!(matches!(
            report.set_root(page),
            Err(CascadeError::WrongAssetType { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_root_container_by_path() {
        let (_, mut report) = report(mock_with_sample_tree());
        report
            .set_root_container(AssetType::Folder, "/docs/", Some("www"))
            .await
            .unwrap();
        assert_eq!(report.root().map(Child::id), Some(hex_id(1).as_str()));
    }

    #[tokio::test]
    async fn test_number_of_assets() {
        let (_, mut report) = report(mock_with_sample_tree());
        report.set_root(docs_root()).unwrap();

        let results = report.report_number_of_assets(&[AssetType::Page]).await.unwrap();
        assert_eq!(results.count(AssetType::Page), 3);
        assert_eq!(results.count(AssetType::Folder), 0);

        let all = report.report_number_of_assets(&[]).await.unwrap();
        assert_eq!(all.count(AssetType::Folder), 1);
        assert_eq!(all.total_count(), 4);
        assert_eq!(report.results(ReportKind::NumberOfAssets), Some(&all));
        assert_eq!(report.last_stats().map(|s| s.nodes_visited), Some(4));
    }

    #[tokio::test]
    async fn test_each_run_clears_the_cache() {
        let (mock, mut report) = report(mock_with_sample_tree());
        report.set_root(docs_root()).unwrap();

        report.report_should_be_published(true).await.unwrap();
        let first = mock.count("read");
        report.report_should_be_published(true).await.unwrap();
        assert_eq!(mock.count("read"), first * 2);
    }

    #[tokio::test]
    async fn test_metadata_values_rejects_empty_pairs() {
        let (mock, mut report) = report(mock_with_sample_tree());
        report.set_root(docs_root()).unwrap();
        assert!(matches!(
            report.report_metadata_values(&[], true).await,
            Err(CascadeError::EmptyValue(_))
        ));
        assert!(mock.performed().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_report_keeps_previous_results() {
        let (_, mut report) = report(mock_with_sample_tree());
        report.set_root(docs_root()).unwrap();
        let before = report.report_number_of_assets(&[]).await.unwrap();

        report.cancellation_token().cancel();
        let err = report.report_number_of_assets(&[]).await.unwrap_err();
        assert!(matches!(err, CascadeError::Cancelled(_)));
        assert_eq!(report.results(ReportKind::NumberOfAssets), Some(&before));
    }

    #[tokio::test]
    async fn test_date_kinds_are_kept_separately() {
        let (_, mut report) = report(mock_with_sample_tree());
        report.set_root(docs_root()).unwrap();
        let at = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();

        report.report_date(DateField::EndDate, at).await.unwrap();
        assert!(report.results(ReportKind::Date(DateField::EndDate)).is_some());
        assert!(report.results(ReportKind::Date(DateField::StartDate)).is_none());
    }

    #[test]
    fn test_dispatch_table() {
        let map = ReportKind::ContentSubstring.visitors(ReportKind::ContentSubstring.default_types());
        assert_eq!(map.visitors_for(AssetType::Page).len(), 1);
        assert!(map.visitors_for(AssetType::File).is_empty());
        assert_eq!(
            ReportKind::Date(DateField::Created).default_types(),
            FOLDER_CONTAINED_TYPES
        );
    }
}
