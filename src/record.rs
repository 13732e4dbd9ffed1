use std::{fmt, str::FromStr};

use derive_new::new;

/// Whether a modification sits on an anchor residue of its peptide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorTag {
    Anchor,
    NonAnchor,
}
impl AnchorTag {
    pub fn is_anchor(&self) -> bool {
        matches!(self, AnchorTag::Anchor)
    }
}
impl FromStr for AnchorTag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anchor" => Ok(AnchorTag::Anchor),
            "non_anchor" => Ok(AnchorTag::NonAnchor),
            _ => anyhow::bail!("unknown anchor tag: {s}"),
        }
    }
}
impl fmt::Display for AnchorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorTag::Anchor => write!(f, "anchor"),
            AnchorTag::NonAnchor => write!(f, "non_anchor"),
        }
    }
}

/// A single modification observation on a presented peptide
///
/// Labels are opaque: any distinct `modification`, `batch_id` or `group`
/// string is its own category.
#[derive(Debug, Clone, new)]
pub struct PeptideRecord {
    #[new(into)]
    pub modification: String,
    pub anchor: AnchorTag,
    #[new(into)]
    pub batch_id: String,
    #[new(into)]
    pub group: String,
    /// Presentation score from the upstream binding predictor
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_tag_parse() {
        assert_eq!("anchor".parse::<AnchorTag>().unwrap(), AnchorTag::Anchor);
        assert_eq!(
            "non_anchor".parse::<AnchorTag>().unwrap(),
            AnchorTag::NonAnchor
        );
        assert!("Anchor".parse::<AnchorTag>().is_err());
    }

    #[test]
    fn test_anchor_tag_display() {
        assert_eq!(AnchorTag::NonAnchor.to_string(), "non_anchor");
        assert!(AnchorTag::Anchor.is_anchor());
    }

    #[test]
    fn test_record_new_into() {
        let record = PeptideRecord::new("Phospho", AnchorTag::Anchor, "b1", "Tumor", 0.7);
        assert_eq!(record.modification, "Phospho");
        assert_eq!(record.batch_id, "b1");
    }
}
