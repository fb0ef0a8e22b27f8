//! Integration tests for the session lifecycle
//!
//! These drive a full open -> iterate -> teardown cycle through the public
//! API over an in-process channel and inspect the decoded stream.

mod common;

use common::builders::{positions, GraphBuilder};
use common::{count_kinds, decode_all, node_iterations};
use layoutstream_rs::{
    codec::{FrameKind, Message},
    layout::{stream_layout, IterationCallback, JitterLayout, LayoutAlgorithm},
    types::{
        Category, Column, EdgeDescriptor, EdgeTable, NodeId, NodeSnapshot, NodeTable, ShapedGraph,
        Table,
    },
    DefaultMapper, PositionBuffer, Result, Session, SessionOptions, SessionState, StreamChannel,
};

fn scenario_graph() -> ShapedGraph {
    GraphBuilder::new(4).edge(0, 1).edge(1, 2).edge(2, 3).build()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_two_iterations_produce_edge_nodes_and_sentinel() {
    let graph = scenario_graph();
    let (channel, rx) = StreamChannel::in_process(16);

    let mut session = Session::new(SessionOptions::default());
    session.open(&graph, DefaultMapper, channel).unwrap();
    let summary = stream_layout(&mut session, &mut JitterLayout::default(), &graph, 2).unwrap();

    let messages = decode_all(rx.try_iter());
    assert_eq!(count_kinds(&messages), (1, 2, 1));
    assert_eq!(messages.len(), 4);

    // Edge frame first, sentinel last
    let edges = messages[0].as_frame().unwrap();
    assert_eq!(edges.kind, FrameKind::Edges);
    assert_eq!(edges.table.num_rows(), 3);
    let names: Vec<_> = edges.table.column_names().collect();
    assert_eq!(names, vec!["edge", "color", "bundle"]);
    assert_eq!(messages[3], Message::Close);

    assert_eq!(node_iterations(&messages), vec![0, 1]);
    let nodes = messages[1].as_frame().unwrap();
    let names: Vec<_> = nodes.table.column_names().collect();
    assert_eq!(names, vec!["id", "color", "size", "x", "y"]);
    assert_eq!(nodes.table.num_rows(), 4);

    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.edge_frames, 1);
    assert_eq!(summary.channel.sent, 4);
    assert_eq!(summary.channel.dropped, 0);
    assert!(summary.sentinel_delivered);
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn test_fixed_positions_round_trip_with_static_columns() {
    let nodes =
        NodeTable::from_columns(vec![0, 1, 2, 3], vec![1, 2, 1, 2], vec![10, 10, 20, 20]).unwrap();
    let edges = EdgeTable::from_columns(
        vec![0, 1, 2],
        vec![0, 1, 2],
        vec![1, 2, 3],
        vec![0, 0, 1],
        vec![1, 2, 1],
    )
    .unwrap();
    let graph = ShapedGraph::new(nodes, edges).unwrap();
    let (channel, rx) = StreamChannel::in_process(16);

    let mut session = Session::new(SessionOptions::default());
    session.open(&graph, DefaultMapper, channel).unwrap();
    let batches: [[f32; 8]; 2] = [
        [0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0],
        [0.1, 0.1, 1.1, 1.1, 2.1, 2.1, 3.1, 3.1],
    ];
    for batch in &batches {
        session.on_iteration(PositionBuffer::RowMajorF32(batch)).unwrap();
    }
    session.teardown();

    let messages = decode_all(rx.try_iter());
    assert_eq!(count_kinds(&messages), (1, 2, 1));
    for (frame_idx, batch) in batches.iter().enumerate() {
        let rows = NodeSnapshot::rows(&messages[frame_idx + 1].as_frame().unwrap().table).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, (0..4).map(NodeId::Int).collect::<Vec<_>>());
        assert_eq!(
            rows.iter().map(|r| r.color.clone()).collect::<Vec<_>>(),
            [1, 2, 1, 2].map(Category::Int).to_vec()
        );
        assert_eq!(
            rows.iter().map(|r| r.size).collect::<Vec<_>>(),
            vec![10.0, 10.0, 20.0, 20.0]
        );
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.x, batch[i * 2]);
            assert_eq!(row.y, batch[i * 2 + 1]);
        }
    }
}

#[test]
fn test_string_colors_and_bundles_read_back() {
    let nodes = NodeTable::new(
        Table::new()
            .with_column("id", Column::Int(vec![0, 1]))
            .unwrap()
            .with_column("color", Column::Str(vec!["red".into(), "blue".into()]))
            .unwrap()
            .with_column("size", Column::Int(vec![3, 4]))
            .unwrap(),
    )
    .unwrap();
    let edges = EdgeTable::new(
        Table::new()
            .with_column("edge", Column::Int(vec![0]))
            .unwrap()
            .with_column("src", Column::Int(vec![0]))
            .unwrap()
            .with_column("dst", Column::Int(vec![1]))
            .unwrap()
            .with_column("bundle", Column::Str(vec!["b".into()]))
            .unwrap()
            .with_column("color", Column::Str(vec!["grey".into()]))
            .unwrap(),
    )
    .unwrap();
    let graph = ShapedGraph::new(nodes, edges).unwrap();
    let (channel, rx) = StreamChannel::in_process(16);

    let mut session = Session::new(SessionOptions::default());
    session.open(&graph, DefaultMapper, channel).unwrap();
    session
        .on_iteration(PositionBuffer::RowMajorF32(&positions(2, 0.0)))
        .unwrap();
    session.teardown();

    let messages = decode_all(rx.try_iter());
    let edge_rows = EdgeDescriptor::rows(&messages[0].as_frame().unwrap().table).unwrap();
    assert_eq!(edge_rows[0].bundle, Category::from("b"));
    assert_eq!(edge_rows[0].color, Category::from("grey"));

    let node_rows = NodeSnapshot::rows(&messages[1].as_frame().unwrap().table).unwrap();
    let colors: Vec<_> = node_rows.iter().map(|r| r.color.to_string()).collect();
    assert_eq!(colors, vec!["red", "blue"]);
}

#[test]
fn test_iteration_before_open_sends_nothing() {
    let graph = scenario_graph();
    let (channel, rx) = StreamChannel::in_process(16);

    let mut session = Session::new(SessionOptions::default());
    let err = session
        .on_iteration(PositionBuffer::RowMajorF32(&positions(4, 0.0)))
        .unwrap_err();
    assert!(err.is_invalid_state());

    // Opening afterwards must not flush anything from the rejected call
    session.open(&graph, DefaultMapper, channel).unwrap();
    assert!(rx.try_recv().is_err());
    assert_eq!(session.iteration(), 0);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_repeated_close_sends_one_sentinel() {
    let graph = scenario_graph();
    let (channel, rx) = StreamChannel::in_process(16);

    let mut session = Session::new(SessionOptions::default());
    session.open(&graph, DefaultMapper, channel).unwrap();
    session
        .on_iteration(PositionBuffer::RowMajorF32(&positions(4, 0.0)))
        .unwrap();

    session.teardown();
    session.on_close().unwrap();
    session.teardown();

    let (_, _, sentinels) = count_kinds(&decode_all(rx.try_iter()));
    assert_eq!(sentinels, 1);
}

#[test]
fn test_close_without_open_is_safe() {
    let mut session: Session = Session::new(SessionOptions::default());
    let summary = session.teardown();
    assert!(!summary.sentinel_delivered);
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.summary().is_some());
}

// ============================================================================
// Schema invariant
// ============================================================================

#[test]
fn test_row_count_mismatch_sends_no_frames() {
    let graph = scenario_graph();
    let (channel, rx) = StreamChannel::in_process(16);

    let mut session = Session::new(SessionOptions::default());
    session.open(&graph, DefaultMapper, channel).unwrap();

    let err = session
        .on_iteration(PositionBuffer::RowMajorF32(&positions(3, 0.0)))
        .unwrap_err();
    assert!(err.is_schema_mismatch());
    assert!(rx.try_recv().is_err());
    assert_eq!(session.channel_stats().attempts(), 0);
}

/// Layout that reports one node too few
struct ShortLayout;

impl LayoutAlgorithm for ShortLayout {
    fn run(
        &mut self,
        graph: &ShapedGraph,
        _max_iter: u32,
        callback: &mut dyn IterationCallback,
    ) -> Result<()> {
        let short = positions(graph.num_nodes() - 1, 0.0);
        callback.on_iteration(PositionBuffer::RowMajorF32(&short))?;
        callback.on_close()
    }
}

#[test]
fn test_failed_layout_still_tears_down() {
    let graph = scenario_graph();
    let (channel, rx) = StreamChannel::in_process(16);

    let mut session = Session::new(SessionOptions::default());
    session.open(&graph, DefaultMapper, channel).unwrap();
    let err = stream_layout(&mut session, &mut ShortLayout, &graph, 5).unwrap_err();
    assert!(err.is_schema_mismatch());

    assert_eq!(session.state(), SessionState::Closed);
    let messages = decode_all(rx.try_iter());
    assert_eq!(messages, vec![Message::Close]);
}

// ============================================================================
// Content
// ============================================================================

#[test]
fn test_node_frame_joins_positions_with_static_columns() {
    let graph = scenario_graph();
    let (channel, rx) = StreamChannel::in_process(16);

    let mut session = Session::new(SessionOptions::default());
    session.open(&graph, DefaultMapper, channel).unwrap();
    session
        .on_iteration(PositionBuffer::RowMajorF32(&positions(4, 0.25)))
        .unwrap();

    let messages = decode_all(rx.try_iter());
    let rows = NodeSnapshot::rows(&messages[1].as_frame().unwrap().table).unwrap();
    assert_eq!(rows.len(), 4);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.x, i as f32 + 0.25);
        assert_eq!(row.y, -(i as f32) - 0.25);
        assert_eq!(row.size, 10.0 + i as f64);
    }
}

#[test]
fn test_refreshed_edges_precede_next_node_frame() {
    let graph = scenario_graph();
    let (channel, rx) = StreamChannel::in_process(16);

    let mut session = Session::new(SessionOptions::default());
    session.open(&graph, DefaultMapper, channel).unwrap();
    session
        .on_iteration(PositionBuffer::RowMajorF32(&positions(4, 0.0)))
        .unwrap();

    let fresh = EdgeTable::from_columns(vec![7], vec![0], vec![3], vec![1], vec![2]).unwrap();
    session.refresh_edges(fresh).unwrap();
    session
        .on_iteration(PositionBuffer::RowMajorF32(&positions(4, 1.0)))
        .unwrap();

    let messages = decode_all(rx.try_iter());
    let kinds: Vec<_> = messages
        .iter()
        .filter_map(|m| m.as_frame())
        .map(|f| f.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![FrameKind::Edges, FrameKind::Nodes, FrameKind::Edges, FrameKind::Nodes]
    );
    assert_eq!(messages[2].as_frame().unwrap().table.num_rows(), 1);
}

#[test]
fn test_custom_column_order_and_columnar_buffer() {
    let graph = scenario_graph();
    let (channel, rx) = StreamChannel::in_process(16);
    let options = SessionOptions {
        node_col_names: vec!["x".into(), "y".into(), "id".into()],
        edge_col_names: vec!["bundle".into(), "edge".into()],
        ..SessionOptions::default()
    };

    let mut session = Session::new(options);
    session.open(&graph, DefaultMapper, channel).unwrap();
    let x = [1.0f32, 2.0, 3.0, 4.0];
    let y = [5.0f32, 6.0, 7.0, 8.0];
    session
        .on_iteration(PositionBuffer::Columnar { x: &x, y: &y })
        .unwrap();

    let messages = decode_all(rx.try_iter());
    let edge_names: Vec<_> = messages[0].as_frame().unwrap().table.column_names().collect();
    assert_eq!(edge_names, vec!["bundle", "edge"]);
    let table = &messages[1].as_frame().unwrap().table;
    let node_names: Vec<_> = table.column_names().collect();
    assert_eq!(node_names, vec!["x", "y", "id"]);
    assert_eq!(table.column("y").unwrap().as_f32().unwrap(), &y);
}

#[test]
fn test_summary_serializes_to_json() {
    let graph = scenario_graph();
    let (channel, _rx) = StreamChannel::in_process(16);

    let mut session = Session::new(SessionOptions::default());
    session.open(&graph, DefaultMapper, channel).unwrap();
    let summary = stream_layout(&mut session, &mut JitterLayout::default(), &graph, 3).unwrap();

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["iterations"], 3);
    assert_eq!(json["channel"]["sent"], 5);
    assert!(summary.duration().is_some());
}
