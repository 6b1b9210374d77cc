//! # cws-core
//!
//! Asset trees, traversal and reporting over the Cascade web-service API.
//!
//! This crate turns the raw operations of `cws-connectors` into lazily
//! materialized [`Child`] handles, walks container hierarchies depth-first
//! with per-type [`Visitor`]s through a read-through [`AssetCache`], and
//! builds the [`Report`] drivers on top of that walk.

pub mod asset;
pub mod cache;
pub mod child;
pub mod metadata;
pub mod params;
pub mod report;
pub mod traversal;
pub mod tree;

pub use asset::Asset;
pub use cache::{AssetCache, CacheStats};
pub use child::Child;
pub use metadata::{parse_timestamp, DynamicField, Metadata, WIRED_FIELDS};
pub use params::TraversalParams;
pub use report::{
    DateField, FieldPair, MatchPolicy, Report, ReportBucket, ReportKind, ReportResults,
};
pub use traversal::{traverse, TraversalStats, VisitContext, Visitor, VisitorMap};
pub use tree::{child_list, AssetTree};

pub use cws_connectors::{CascadeError, CascadeResult};
pub use tokio_util::sync::CancellationToken;
