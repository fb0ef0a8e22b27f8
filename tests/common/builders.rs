//! Test data builders for creating test graphs

use layoutstream_rs::{EdgeTable, NodeTable, ShapedGraph};

/// Builder for small shaped graphs with integer ids
pub struct GraphBuilder {
    nodes: usize,
    edges: Vec<(i64, i64)>,
    cluster_size: usize,
}

impl GraphBuilder {
    pub fn new(nodes: usize) -> Self {
        Self {
            nodes,
            edges: Vec::new(),
            cluster_size: 2,
        }
    }

    pub fn edge(mut self, src: i64, dst: i64) -> Self {
        self.edges.push((src, dst));
        self
    }

    /// Connect node `i` to `i + 1` for every node
    pub fn path(mut self) -> Self {
        for i in 1..self.nodes as i64 {
            self.edges.push((i - 1, i));
        }
        self
    }

    pub fn cluster_size(mut self, size: usize) -> Self {
        self.cluster_size = size.max(1);
        self
    }

    pub fn build(self) -> ShapedGraph {
        let ids: Vec<i64> = (0..self.nodes as i64).collect();
        let colors = ids.iter().map(|i| *i / self.cluster_size as i64).collect();
        let sizes = ids.iter().map(|i| 10 + i).collect();
        let nodes = NodeTable::from_columns(ids, colors, sizes).expect("valid node table");

        let (src, dst): (Vec<i64>, Vec<i64>) = self.edges.iter().copied().unzip();
        let edge_ids = (0..src.len() as i64).collect();
        let bundles = vec![0; src.len()];
        let colors = src.iter().map(|s| *s % 3).collect();
        let edges = EdgeTable::from_columns(edge_ids, src, dst, bundles, colors)
            .expect("valid edge table");
        ShapedGraph::new(nodes, edges).expect("edges reference known nodes")
    }
}

/// Row-major positions `[i, -i]` for `n` nodes, offset by `shift`
pub fn positions(n: usize, shift: f32) -> Vec<f32> {
    (0..n)
        .flat_map(|i| [i as f32 + shift, -(i as f32) - shift])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_builder() {
        let graph = GraphBuilder::new(4).edge(0, 1).edge(1, 2).edge(2, 3).build();
        assert_eq!(graph.num_nodes(), 4);
        assert_eq!(graph.num_edges(), 3);
    }
}
