//! Typed report accumulator.

use cws_connectors::AssetType;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Date properties a date report can compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DateField {
    StartDate,
    EndDate,
    ReviewDate,
    LastModified,
    Created,
}

impl DateField {
    pub const ALL: &'static [DateField] = &[
        DateField::StartDate,
        DateField::EndDate,
        DateField::ReviewDate,
        DateField::LastModified,
        DateField::Created,
    ];

    fn label(&self) -> &'static str {
        match self {
            DateField::StartDate => "StartDate",
            DateField::EndDate => "EndDate",
            DateField::ReviewDate => "ReviewDate",
            DateField::LastModified => "LastModifiedDate",
            DateField::Created => "CreatedDate",
        }
    }

    /// Whether the value lives in metadata rather than on the asset itself.
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            DateField::StartDate | DateField::EndDate | DateField::ReviewDate
        )
    }
}

/// A named list of matching paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportBucket {
    DateBefore(DateField),
    DateAfter(DateField),
    MetadataFieldValue,
    ContentSubstring,
    ShouldBePublished,
}

impl fmt::Display for ReportBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportBucket::DateBefore(field) => write!(f, "report{}Before", field.label()),
            ReportBucket::DateAfter(field) => write!(f, "report{}After", field.label()),
            ReportBucket::MetadataFieldValue => f.write_str("reportMetadataFieldValue"),
            ReportBucket::ContentSubstring => f.write_str("reportContentSubstring"),
            ReportBucket::ShouldBePublished => f.write_str("reportShouldBePublished"),
        }
    }
}

impl Serialize for ReportBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `asset type -> bucket -> paths`, plus per-type counters.
///
/// Paths keep the order the traversal found them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportResults {
    buckets: BTreeMap<AssetType, BTreeMap<ReportBucket, Vec<String>>>,
    counters: BTreeMap<AssetType, u64>,
}

impl ReportResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, asset_type: AssetType, bucket: ReportBucket, path: impl Into<String>) {
        self.buckets
            .entry(asset_type)
            .or_default()
            .entry(bucket)
            .or_default()
            .push(path.into());
    }

    pub fn increment(&mut self, asset_type: AssetType) {
        *self.counters.entry(asset_type).or_default() += 1;
    }

    /// Paths in `bucket` for `asset_type`; empty when nothing matched.
    pub fn bucket(&self, asset_type: AssetType, bucket: ReportBucket) -> &[String] {
        self.buckets
            .get(&asset_type)
            .and_then(|b| b.get(&bucket))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every non-empty bucket for `asset_type`.
    pub fn buckets_for(&self, asset_type: AssetType) -> impl Iterator<Item = (ReportBucket, &[String])> + '_ {
        self.buckets
            .get(&asset_type)
            .into_iter()
            .flatten()
            .map(|(bucket, paths)| (*bucket, paths.as_slice()))
    }

    pub fn count(&self, asset_type: AssetType) -> u64 {
        self.counters.get(&asset_type).copied().unwrap_or(0)
    }

    pub fn total_count(&self) -> u64 {
        self.counters.values().sum()
    }

    /// Types with at least one bucket entry or counter.
    pub fn asset_types(&self) -> Vec<AssetType> {
        let mut types: Vec<_> = self
            .buckets
            .keys()
            .chain(self.counters.keys())
            .copied()
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// Folds `other` into `self`, appending paths after the existing ones.
    pub fn merge(&mut self, other: ReportResults) {
        for (asset_type, buckets) in other.buckets {
            let mine = self.buckets.entry(asset_type).or_default();
            for (bucket, paths) in buckets {
                mine.entry(bucket).or_default().extend(paths);
            }
        }
        for (asset_type, n) in other.counters {
            *self.counters.entry(asset_type).or_default() += n;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty() && self.counters.is_empty()
    }
}
