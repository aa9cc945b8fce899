//! JSON messages exchanged with the treemap and search panels.

use crate::{AggregationPolicy, ColorRange, LineMatch, RiskLevel};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

pub const TREEMAP_HEADER: [&str; 4] = ["File", "Parent", "Size", "Risk"];

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PanelRequest {
    Init,
    TypeChanged { value: AggregationPolicy },
    Search { value: String },
    Rescan,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PanelMessage {
    Init {
        data: TreemapTable,
        #[serde(rename = "colorRanges")]
        color_ranges: Vec<ColorRange>,
    },
    UpdateData {
        data: Vec<RiskUpdate>,
    },
    SearchResults {
        data: SearchResultPayload,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TreemapCell {
    /// Node key (its relative path).
    pub v: String,
    /// 1-based display index.
    pub f: usize,
    #[serde(rename = "isFile")]
    pub is_file: bool,
    pub path: String,
}

/// `[cell, parent, size, risk]`
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TreemapRow(pub TreemapCell, pub Option<String>, pub usize, pub RiskLevel);

/// Treemap rows preceded by the column header row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreemapTable {
    pub rows: Vec<TreemapRow>,
}

impl Serialize for TreemapTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len() + 1))?;
        seq.serialize_element(&TREEMAP_HEADER)?;
        for row in &self.rows {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct RiskUpdate {
    pub index: usize,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SearchResultPayload {
    pub index: usize,
    /// Matched lines keyed by line index; empty when the file has no matches.
    #[serde(rename = "match")]
    pub matches: BTreeMap<usize, LineMatch>,
}
