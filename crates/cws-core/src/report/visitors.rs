//! Per-node report predicates.
//!
//! Each visitor reads its inputs from the traversal params, materializes the
//! node through the cache when it needs the asset, and appends the node's
//! path to one bucket when its predicate holds.

use super::matching::{matches, FieldPair, MatchPolicy};
use super::results::{DateField, ReportBucket, ReportResults};
use crate::child::Child;
use crate::params::TraversalParams;
use crate::traversal::{VisitContext, Visitor};
use async_trait::async_trait;
use cws_connectors::{CascadeError, CascadeResult};
use tracing::trace;

/// Threshold date for date reports.
pub const RELATIVE_TO: &str = "relative_to";
/// `[{ field: value }, ...]` for metadata value reports.
pub const FIELD_PAIRS: &str = "field_pairs";
/// Boolean: any pair (true) or all pairs (false).
pub const DISJUNCTIVE: &str = "disjunctive";
pub const SUBSTRING: &str = "substring";
pub const SHOULD_BE_PUBLISHED: &str = "should_be_published";

/// Sorts assets into before/after buckets around [`RELATIVE_TO`].
///
/// Assets without the date are skipped, as are those exactly on the threshold.
pub struct DateVisitor {
    field: DateField,
}

impl DateVisitor {
    pub fn new(field: DateField) -> Self {
        Self { field }
    }
}

#[async_trait]
impl Visitor<ReportResults> for DateVisitor {
    fn name(&self) -> &str {
        "date"
    }

    async fn visit(
        &self,
        ctx: &VisitContext<'_>,
        child: &Child,
        params: &TraversalParams,
        results: &mut ReportResults,
    ) -> CascadeResult<()> {
        let relative_to = params.require_datetime(RELATIVE_TO)?;
        let asset = ctx.asset(child).await?;
        let value = match self.field {
            DateField::StartDate => asset.metadata().start_date(),
            DateField::EndDate => asset.metadata().end_date(),
            DateField::ReviewDate => asset.metadata().review_date(),
            DateField::LastModified => asset.last_modified_date(),
            DateField::Created => asset.created_date(),
        };
        let Some(value) = value else {
            return Ok(());
        };

        let bucket = if value < relative_to {
            ReportBucket::DateBefore(self.field)
        } else if value > relative_to {
            ReportBucket::DateAfter(self.field)
        } else {
            return Ok(());
        };
        trace!(path = child.path(), %bucket, "Date match");
        results.append(child.asset_type(), bucket, child.path());
        Ok(())
    }
}

/// Matches metadata against [`FIELD_PAIRS`] under [`DISJUNCTIVE`].
pub struct FieldValueVisitor;

#[async_trait]
impl Visitor<ReportResults> for FieldValueVisitor {
    fn name(&self) -> &str {
        "metadata_field_value"
    }

    async fn visit(
        &self,
        ctx: &VisitContext<'_>,
        child: &Child,
        params: &TraversalParams,
        results: &mut ReportResults,
    ) -> CascadeResult<()> {
        let pairs = params
            .get(FIELD_PAIRS)
            .ok_or_else(|| CascadeError::EmptyValue(format!("Missing parameter '{}'", FIELD_PAIRS)))
            .and_then(FieldPair::list_from_value)?;
        let policy = MatchPolicy::from_flag(params.get_bool(DISJUNCTIVE)?.unwrap_or(false));

        let asset = ctx.asset(child).await?;
        if matches(&asset.metadata(), &pairs, policy) {
            results.append(child.asset_type(), ReportBucket::MetadataFieldValue, child.path());
        }
        Ok(())
    }
}

/// Finds [`SUBSTRING`] in page and block text.
pub struct ContentSubstringVisitor;

#[async_trait]
impl Visitor<ReportResults> for ContentSubstringVisitor {
    fn name(&self) -> &str {
        "content_substring"
    }

    async fn visit(
        &self,
        ctx: &VisitContext<'_>,
        child: &Child,
        params: &TraversalParams,
        results: &mut ReportResults,
    ) -> CascadeResult<()> {
        let needle = params.require_str(SUBSTRING)?;
        let asset = ctx.asset(child).await?;
        let Some(content) = asset.xhtml() else {
            return Ok(());
        };
        if content.contains(needle) {
            results.append(child.asset_type(), ReportBucket::ContentSubstring, child.path());
        }
        Ok(())
    }
}

/// Collects assets whose `shouldBePublished` equals [`SHOULD_BE_PUBLISHED`].
pub struct ShouldBePublishedVisitor;

#[async_trait]
impl Visitor<ReportResults> for ShouldBePublishedVisitor {
    fn name(&self) -> &str {
        "should_be_published"
    }

    async fn visit(
        &self,
        ctx: &VisitContext<'_>,
        child: &Child,
        params: &TraversalParams,
        results: &mut ReportResults,
    ) -> CascadeResult<()> {
        let wanted = params.require_bool(SHOULD_BE_PUBLISHED)?;
        let asset = ctx.asset(child).await?;
        if asset.should_be_published() == Some(wanted) {
            results.append(child.asset_type(), ReportBucket::ShouldBePublished, child.path());
        }
        Ok(())
    }
}

/// Counts nodes per type without reading them.
pub struct CountVisitor;

#[async_trait]
impl Visitor<ReportResults> for CountVisitor {
    fn name(&self) -> &str {
        "count"
    }

    async fn visit(
        &self,
        _ctx: &VisitContext<'_>,
        child: &Child,
        _params: &TraversalParams,
        results: &mut ReportResults,
    ) -> CascadeResult<()> {
        results.increment(child.asset_type());
        Ok(())
    }
}
