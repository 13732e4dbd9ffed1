use std::collections::HashMap;

use crate::record::{AnchorTag, PeptideRecord};

/// Anchor / non-anchor tallies for a single category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnchorCounts {
    pub anchor: u64,
    pub non_anchor: u64,
}
impl AnchorCounts {
    pub fn add(&mut self, tag: AnchorTag) {
        match tag {
            AnchorTag::Anchor => self.anchor += 1,
            AnchorTag::NonAnchor => self.non_anchor += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.anchor + self.non_anchor
    }

    /// Percentage of observations on an anchor residue, 0 for an empty category
    pub fn anchor_pct(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            100.0 * self.anchor as f64 / self.total() as f64
        }
    }
}

/// Tallies records per modification in a single pass
pub fn tally_by_modification<'a, I>(records: I) -> HashMap<&'a str, AnchorCounts>
where
    I: IntoIterator<Item = &'a PeptideRecord>,
{
    let mut counts: HashMap<&str, AnchorCounts> = HashMap::new();
    for record in records {
        counts
            .entry(record.modification.as_str())
            .or_default()
            .add(record.anchor);
    }
    counts
}

/// A 2x2 table of counts
///
/// ```text
///              anchor   non-anchor
/// row 1          a          b
/// row 2          c          d
/// ```
///
/// Margins are always derived from the cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContingencyTable {
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub d: u64,
}
impl ContingencyTable {
    pub fn new(a: u64, b: u64, c: u64, d: u64) -> Self {
        Self { a, b, c, d }
    }

    /// Builds the table from the tallies of one category and its complement
    pub fn from_counts(own: AnchorCounts, rest: AnchorCounts) -> Self {
        Self::new(own.anchor, own.non_anchor, rest.anchor, rest.non_anchor)
    }

    /// Target modification against every other modification in `records`
    pub fn modification_vs_rest<'a, I>(records: I, target: &str) -> Self
    where
        I: IntoIterator<Item = &'a PeptideRecord>,
    {
        let mut own = AnchorCounts::default();
        let mut rest = AnchorCounts::default();
        for record in records {
            if record.modification == target {
                own.add(record.anchor);
            } else {
                rest.add(record.anchor);
            }
        }
        Self::from_counts(own, rest)
    }

    /// Target modification in `group_a` (first row) against `group_b` (second row)
    ///
    /// Records belonging to neither group are ignored.
    pub fn between_groups<'a, I>(records: I, target: &str, group_a: &str, group_b: &str) -> Self
    where
        I: IntoIterator<Item = &'a PeptideRecord>,
    {
        let mut first = AnchorCounts::default();
        let mut second = AnchorCounts::default();
        for record in records.into_iter().filter(|r| r.modification == target) {
            if record.group == group_a {
                first.add(record.anchor);
            } else if record.group == group_b {
                second.add(record.anchor);
            }
        }
        Self::from_counts(first, second)
    }

    pub fn row1(&self) -> u64 {
        self.a + self.b
    }

    pub fn row2(&self) -> u64 {
        self.c + self.d
    }

    pub fn col1(&self) -> u64 {
        self.a + self.c
    }

    pub fn col2(&self) -> u64 {
        self.b + self.d
    }

    pub fn total(&self) -> u64 {
        self.row1() + self.row2()
    }

    pub fn first_row(&self) -> AnchorCounts {
        AnchorCounts {
            anchor: self.a,
            non_anchor: self.b,
        }
    }

    pub fn second_row(&self) -> AnchorCounts {
        AnchorCounts {
            anchor: self.c,
            non_anchor: self.d,
        }
    }
}
