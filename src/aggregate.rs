use log::debug;
use rayon::prelude::*;

use crate::{
    record::PeptideRecord,
    results::{EffectSizeRecord, GroupComparisonRecord},
    table::{tally_by_modification, AnchorCounts, ContingencyTable},
    utils::{distinct_modifications, partition_by_batch, partition_by_group},
};

/// Scores every modification against the rest within a single batch and group
///
/// One record per distinct modification, sorted by modification.
pub fn batch_enrichment(
    records: &[&PeptideRecord],
    batch_id: &str,
    group: &str,
) -> Vec<EffectSizeRecord> {
    let tallies = tally_by_modification(records.iter().copied());
    let totals = tallies
        .values()
        .fold(AnchorCounts::default(), |acc, c| AnchorCounts {
            anchor: acc.anchor + c.anchor,
            non_anchor: acc.non_anchor + c.non_anchor,
        });

    let mut out = tallies
        .iter()
        .map(|(modification, own)| {
            let rest = AnchorCounts {
                anchor: totals.anchor - own.anchor,
                non_anchor: totals.non_anchor - own.non_anchor,
            };
            let table = ContingencyTable::from_counts(*own, rest);
            EffectSizeRecord::from_table(modification, batch_id, group, &table)
        })
        .collect::<Vec<_>>();
    out.sort_unstable_by(|a, b| a.modification.cmp(&b.modification));
    out
}

/// Compares the anchor odds of every modification between two groups of one batch
///
/// Every modification seen in either group gets a record; a modification
/// missing from one group contributes an empty row.
pub fn batch_group_comparison(
    records: &[&PeptideRecord],
    batch_id: &str,
    group_a: &str,
    group_b: &str,
) -> Vec<GroupComparisonRecord> {
    let relevant = records
        .iter()
        .copied()
        .filter(|r| r.group == group_a || r.group == group_b)
        .collect::<Vec<_>>();
    distinct_modifications(relevant.iter().copied())
        .into_iter()
        .map(|modification| {
            let table = ContingencyTable::between_groups(
                relevant.iter().copied(),
                modification,
                group_a,
                group_b,
            );
            GroupComparisonRecord::from_table(modification, batch_id, &table)
        })
        .collect()
}

/// Per-batch effect sizes over a borrowed record set
///
/// Batches are independent units and are processed in parallel; the output
/// order is always (batch, group, modification).
pub struct BatchAggregator<'a> {
    records: &'a [PeptideRecord],
}
impl<'a> BatchAggregator<'a> {
    pub fn new(records: &'a [PeptideRecord]) -> Self {
        Self { records }
    }

    /// Enrichment records for every (batch, group) present, or only for `group`
    pub fn enrichment(&self, group: Option<&str>) -> Vec<EffectSizeRecord> {
        let selected = self
            .records
            .iter()
            .filter(|r| group.map_or(true, |g| r.group == g));
        let batches = partition_by_batch(selected);

        batches
            .par_iter()
            .flat_map_iter(|(batch_id, batch_records)| {
                partition_by_group(batch_records)
                    .into_iter()
                    .flat_map(move |(group, group_records)| {
                        debug!(
                            "Batch {}: {} {} records",
                            batch_id,
                            group_records.len(),
                            group
                        );
                        batch_enrichment(&group_records, batch_id, group)
                    })
            })
            .collect()
    }

    /// Tumor-vs-normal comparisons for every batch that contains both groups
    pub fn group_comparisons(&self, tumor: &str, normal: &str) -> Vec<GroupComparisonRecord> {
        let batches = partition_by_batch(self.records);

        batches
            .par_iter()
            .filter(|(_, batch_records)| {
                batch_records.iter().any(|r| r.group == tumor)
                    && batch_records.iter().any(|r| r.group == normal)
            })
            .flat_map_iter(|(batch_id, batch_records)| {
                batch_group_comparison(batch_records, batch_id, tumor, normal)
            })
            .collect()
    }
}
