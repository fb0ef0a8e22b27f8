//! Synthetic clustered graphs
//!
//! Each cluster is a ring of nodes sharing a color, with a few chords inside
//! the cluster and one bridge edge to the next cluster. Edges inside a
//! cluster are bundled by cluster; bridges get their own bundle.

use crate::error::Result;
use crate::types::{EdgeTable, NodeTable, ShapedGraph};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in dataset sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// 4 clusters of 8 nodes
    #[default]
    Small,
    /// 32 clusters of 250 nodes
    Large,
}

impl DatasetKind {
    /// `(clusters, nodes per cluster)`
    pub fn dimensions(self) -> (usize, usize) {
        match self {
            DatasetKind::Small => (4, 8),
            DatasetKind::Large => (32, 250),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DatasetKind::Small => "small",
            DatasetKind::Large => "large",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(DatasetKind::Small),
            "large" => Ok(DatasetKind::Large),
            other => Err(format!("unknown dataset '{}' (expected small or large)", other)),
        }
    }
}

/// Dataset selection as stored in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub kind: DatasetKind,
    /// Chords added inside each cluster besides the ring
    #[serde(default = "default_chords")]
    pub chords_per_cluster: usize,
}

fn default_chords() -> usize {
    2
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            kind: DatasetKind::Small,
            chords_per_cluster: default_chords(),
        }
    }
}

impl DatasetConfig {
    pub fn build(&self) -> Result<ShapedGraph> {
        let (clusters, per_cluster) = self.kind.dimensions();
        clustered_graph(clusters, per_cluster, self.chords_per_cluster)
    }
}

/// Build a clustered graph with `clusters * per_cluster` nodes
pub fn clustered_graph(
    clusters: usize,
    per_cluster: usize,
    chords_per_cluster: usize,
) -> Result<ShapedGraph> {
    let n = clusters * per_cluster;
    let mut ids = Vec::with_capacity(n);
    let mut colors = Vec::with_capacity(n);
    let mut sizes = Vec::with_capacity(n);
    for c in 0..clusters {
        for i in 0..per_cluster {
            ids.push((c * per_cluster + i) as i64);
            colors.push(c as i64);
            // Hubs at the start of each ring are drawn larger
            sizes.push(if i == 0 { 30 } else { 10 + (i % 5) as i64 * 2 });
        }
    }

    let mut src = Vec::new();
    let mut dst = Vec::new();
    let mut bundles = Vec::new();
    let mut edge_colors = Vec::new();
    let mut push = |a: usize, b: usize, bundle: i64, color: i64| {
        src.push(a as i64);
        dst.push(b as i64);
        bundles.push(bundle);
        edge_colors.push(color);
    };

    for c in 0..clusters {
        let base = c * per_cluster;
        if per_cluster > 1 {
            let ring = if per_cluster == 2 { 1 } else { per_cluster };
            for i in 0..ring {
                push(base + i, base + (i + 1) % per_cluster, c as i64, c as i64);
            }
        }
        if per_cluster > 3 {
            for k in 0..chords_per_cluster {
                let a = base + (k * 3) % per_cluster;
                let b = base + (k * 3 + per_cluster / 2) % per_cluster;
                if a != b {
                    push(a, b, c as i64, c as i64);
                }
            }
        }
        if clusters > 1 && per_cluster > 0 {
            let next = ((c + 1) % clusters) * per_cluster;
            push(base, next, clusters as i64 + c as i64, -1);
        }
    }

    let edge_ids = (0..src.len() as i64).collect();
    let nodes = NodeTable::from_columns(ids, colors, sizes)?;
    let edges = EdgeTable::from_columns(edge_ids, src, dst, bundles, edge_colors)?;
    ShapedGraph::new(nodes, edges)
}
