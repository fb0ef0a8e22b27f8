//! Per-iteration streaming hook
//!
//! [`LayoutCallback`] is invoked once per layout iteration with the raw
//! position buffer. It maps the buffer to float32 coordinates, joins them
//! by row position with the cached static node columns, frames the result
//! and pushes it through a [`StreamChannel`] without waiting on delivery.
//!
//! The static edge table is framed before the first node frame, and again
//! whenever fresh edge data is supplied through [`LayoutCallback::refresh_edges`].

use crate::channel::{SendResult, StreamChannel};
use crate::codec::{encode_columns, FrameKind};
use crate::error::{Result, StreamError};
use crate::mapper::{PositionBuffer, PositionMapper};
use crate::session::SessionOptions;
use crate::types::{Column, EdgeTable, NodeTable, ShapedGraph, COL_X, COL_Y};

/// Framing state for one layout run
pub struct LayoutCallback<M> {
    mapper: M,
    nodes: NodeTable,
    edges: EdgeTable,
    node_col_names: Vec<String>,
    edge_col_names: Vec<String>,
    resend_edges: bool,
    /// Edge frame still owed to the consumer
    edges_pending: bool,
    iteration: u64,
    edge_frames: u64,
    frames_skipped: u64,
}

impl<M: PositionMapper> LayoutCallback<M> {
    /// Capture static tables and validate the configured column lists
    pub fn new(mapper: M, graph: &ShapedGraph, options: &SessionOptions) -> Result<Self> {
        validate_node_columns(&graph.nodes, &options.node_col_names)?;
        validate_edge_columns(&graph.edges, &options.edge_col_names)?;

        Ok(Self {
            mapper,
            nodes: graph.nodes.clone(),
            edges: graph.edges.clone(),
            node_col_names: options.node_col_names.clone(),
            edge_col_names: options.edge_col_names.clone(),
            resend_edges: options.resend_edges,
            edges_pending: true,
            iteration: 0,
            edge_frames: 0,
            frames_skipped: 0,
        })
    }

    /// Number of iterations streamed so far
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Number of nodes every position batch must carry
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_frames(&self) -> u64 {
        self.edge_frames
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Stream one layout iteration.
    ///
    /// A row count that differs from the static node table fails before
    /// anything is sent. Encoding failures skip the frame and still advance
    /// the iteration counter; transport drops are not errors.
    ///
    /// Node frames are not held back while the edge frame is pending. If the
    /// edge frame is dropped, the node frame of the same iteration is still
    /// sent, so a consumer may receive node frames before any edge frame.
    pub fn invoke(&mut self, raw: &PositionBuffer<'_>, channel: &mut StreamChannel) -> Result<()> {
        let rows = raw.rows()?;
        if rows != self.nodes.len() {
            return Err(StreamError::schema(format!(
                "position batch has {} rows, session has {} nodes",
                rows,
                self.nodes.len()
            )));
        }

        let positions = self.mapper.map_positions(raw)?;
        if positions.len() != rows {
            return Err(StreamError::schema(format!(
                "position mapper returned {} rows for a batch of {}",
                positions.len(),
                rows
            )));
        }

        if self.edges_pending || self.resend_edges {
            self.send_edges(channel);
        }

        let x = Column::Float32(positions.x);
        let y = Column::Float32(positions.y);
        let mut columns: Vec<(&str, &Column)> = Vec::with_capacity(self.node_col_names.len());
        for name in &self.node_col_names {
            let column = match name.as_str() {
                COL_X => &x,
                COL_Y => &y,
                other => self.nodes.table().require(other)?,
            };
            columns.push((name.as_str(), column));
        }

        match encode_columns(FrameKind::Nodes, self.iteration, rows, &columns) {
            Ok(wire) => {
                channel.send(wire);
            }
            Err(e) => {
                self.frames_skipped += 1;
                tracing::warn!("Skipping node frame for iteration {}: {}", self.iteration, e);
            }
        }

        self.iteration += 1;
        Ok(())
    }

    /// Replace the static edge table and queue it for the next iteration
    pub fn refresh_edges(&mut self, edges: EdgeTable) -> Result<()> {
        validate_edge_columns(&edges, &self.edge_col_names)?;
        edges.validate_against(&self.nodes)?;
        self.edges = edges;
        self.edges_pending = true;
        Ok(())
    }

    /// Send an out-of-band payload outside the per-iteration path
    pub fn update(&self, msg: Vec<u8>, channel: &mut StreamChannel) -> SendResult {
        channel.send(msg)
    }

    fn send_edges(&mut self, channel: &mut StreamChannel) {
        let table = self.edges.table();
        let mut columns: Vec<(&str, &Column)> = Vec::with_capacity(self.edge_col_names.len());
        for name in &self.edge_col_names {
            // Names were validated against this table when it was captured
            if let Some(column) = table.column(name) {
                columns.push((name.as_str(), column));
            }
        }

        match encode_columns(FrameKind::Edges, self.iteration, table.num_rows(), &columns) {
            Ok(wire) => {
                // A dropped edge frame is retried with the next iteration
                if channel.send(wire).is_delivered() {
                    self.edges_pending = false;
                    self.edge_frames += 1;
                }
            }
            Err(e) => {
                self.edges_pending = false;
                self.frames_skipped += 1;
                tracing::warn!("Skipping edge frame: {}", e);
            }
        }
    }
}

fn validate_node_columns(nodes: &NodeTable, names: &[String]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(StreamError::Config(format!(
                "node column '{}' listed twice",
                name
            )));
        }
        if name != COL_X && name != COL_Y && nodes.table().column(name).is_none() {
            return Err(StreamError::schema(format!(
                "node column '{}' is neither a position nor a static node column",
                name
            )));
        }
    }
    Ok(())
}

fn validate_edge_columns(edges: &EdgeTable, names: &[String]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(StreamError::Config(format!(
                "edge column '{}' listed twice",
                name
            )));
        }
        if edges.table().column(name).is_none() {
            return Err(StreamError::schema(format!(
                "edge column '{}' is not in the edge table",
                name
            )));
        }
    }
    Ok(())
}
