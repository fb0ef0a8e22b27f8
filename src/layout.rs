//! Producer side interfaces and a stand-in layout
//!
//! A [`LayoutAlgorithm`] drives the iteration loop and hands each batch of
//! positions to an injected [`IterationCallback`]. [`JitterLayout`] is a
//! small deterministic producer used by the binary and the tests; it pulls
//! connected nodes together and nudges everything with a seeded jitter, which
//! is enough to produce a moving picture without being a real force-directed
//! algorithm.

use crate::error::Result;
use crate::mapper::{PositionBuffer, PositionMapper};
use crate::session::{Session, SessionSummary};
use crate::types::ShapedGraph;

/// Capability handed to a layout routine
pub trait IterationCallback {
    /// Called once per completed iteration with positions in node table order
    fn on_iteration(&mut self, positions: PositionBuffer<'_>) -> Result<()>;

    /// Called once after the last iteration
    fn on_close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// An iterative layout that reports positions after every iteration
pub trait LayoutAlgorithm {
    fn run(
        &mut self,
        graph: &ShapedGraph,
        max_iter: u32,
        callback: &mut dyn IterationCallback,
    ) -> Result<()>;
}

/// Deterministic stand-in layout
#[derive(Debug, Clone)]
pub struct JitterLayout {
    seed: u64,
    /// Fraction of the distance to its neighbours a node moves per iteration
    pub attraction: f32,
    /// Amplitude of the per-iteration jitter
    pub jitter: f32,
}

impl Default for JitterLayout {
    fn default() -> Self {
        Self::new(0x5eed)
    }
}

impl JitterLayout {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            attraction: 0.05,
            jitter: 0.5,
        }
    }

    /// xorshift64*, mapped to [-1, 1)
    fn next_unit(state: &mut u64) -> f32 {
        let mut x = *state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        *state = x;
        let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 40;
        (bits as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
    }
}

impl LayoutAlgorithm for JitterLayout {
    fn run(
        &mut self,
        graph: &ShapedGraph,
        max_iter: u32,
        callback: &mut dyn IterationCallback,
    ) -> Result<()> {
        let n = graph.num_nodes();
        let endpoints = graph.edges.endpoint_rows(&graph.nodes)?.unwrap_or_default();
        let mut state = self.seed | 1;

        // Start on a circle so the first frame is already spread out
        let radius = (n as f32).sqrt() * 10.0;
        let mut positions = Vec::with_capacity(n * 2);
        for i in 0..n {
            let angle = i as f32 / n.max(1) as f32 * std::f32::consts::TAU;
            positions.push(radius * angle.cos());
            positions.push(radius * angle.sin());
        }

        let mut delta = vec![0.0f32; n * 2];
        for iteration in 0..max_iter {
            delta.iter_mut().for_each(|d| *d = 0.0);
            for &(a, b) in &endpoints {
                let dx = positions[b * 2] - positions[a * 2];
                let dy = positions[b * 2 + 1] - positions[a * 2 + 1];
                delta[a * 2] += dx * self.attraction;
                delta[a * 2 + 1] += dy * self.attraction;
                delta[b * 2] -= dx * self.attraction;
                delta[b * 2 + 1] -= dy * self.attraction;
            }
            for (p, d) in positions.iter_mut().zip(&delta) {
                *p += d + self.jitter * Self::next_unit(&mut state);
            }

            tracing::trace!("Layout iteration {} of {}", iteration + 1, max_iter);
            callback.on_iteration(PositionBuffer::RowMajorF32(&positions))?;
        }

        callback.on_close()
    }
}

/// Run `layout` against an opened session and tear the session down.
///
/// Teardown runs even when the layout fails; the layout's error is returned
/// in that case.
pub fn stream_layout<M: PositionMapper>(
    session: &mut Session<M>,
    layout: &mut dyn LayoutAlgorithm,
    graph: &ShapedGraph,
    max_iter: u32,
) -> Result<SessionSummary> {
    let outcome = layout.run(graph, max_iter, session);
    let summary = session.teardown();
    if let Err(e) = outcome {
        tracing::error!("Layout run failed after {} iterations: {}", summary.iterations, e);
        return Err(e);
    }
    Ok(summary)
}
