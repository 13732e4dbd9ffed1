use itertools::Itertools;

use crate::record::PeptideRecord;

/// Splits records into per-batch slices, ordered by batch id
pub fn partition_by_batch<'a, I>(records: I) -> Vec<(&'a str, Vec<&'a PeptideRecord>)>
where
    I: IntoIterator<Item = &'a PeptideRecord>,
{
    records
        .into_iter()
        .into_group_map_by(|r| r.batch_id.as_str())
        .into_iter()
        .sorted_by_key(|(batch_id, _)| *batch_id)
        .collect()
}

/// Splits records into per-group slices, ordered by group label
pub fn partition_by_group<'a>(
    records: &[&'a PeptideRecord],
) -> Vec<(&'a str, Vec<&'a PeptideRecord>)> {
    records
        .iter()
        .copied()
        .into_group_map_by(|r| r.group.as_str())
        .into_iter()
        .sorted_by_key(|(group, _)| *group)
        .collect()
}

/// Number of distinct batches containing at least one record of `group`
pub fn count_batches(records: &[PeptideRecord], group: &str) -> usize {
    records
        .iter()
        .filter(|r| r.group == group)
        .map(|r| r.batch_id.as_str())
        .unique()
        .count()
}

/// Distinct modification labels, sorted
pub fn distinct_modifications<'a, I>(records: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a PeptideRecord>,
{
    records
        .into_iter()
        .map(|r| r.modification.as_str())
        .unique()
        .sorted()
        .collect()
}
