//! Core data types for layoutstream-rs
//!
//! This module contains the columnar table model used for every frame that
//! crosses the wire, plus the typed row views consumers decode into.
//!
//! # Main Types
//!
//! - [`ColumnType`] - Supported column element types (int, float32, string)
//! - [`Column`] - A single typed column stored as one contiguous vector
//! - [`Table`] - An ordered set of equal-length named columns
//! - [`NodeTable`] / [`EdgeTable`] - Validated static tables cached per session
//! - [`PositionTable`] - Per-iteration `x`/`y` coordinates
//! - [`NodeSnapshot`] / [`EdgeDescriptor`] - Row views over decoded frames
//!
//! # Row Order
//!
//! Node positions are joined to the static node columns by row position, not
//! by key. Every table built from a layout step must therefore keep the row
//! order of the static node table it was derived from.

use crate::error::{Result, StreamError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Node identifier column
pub const COL_ID: &str = "id";
/// Node x coordinate column
pub const COL_X: &str = "x";
/// Node y coordinate column
pub const COL_Y: &str = "y";
/// Categorical color column (nodes and edges)
pub const COL_COLOR: &str = "color";
/// Node size column
pub const COL_SIZE: &str = "size";
/// Edge identifier column
pub const COL_EDGE: &str = "edge";
/// Edge bundle column
pub const COL_BUNDLE: &str = "bundle";
/// Optional edge source node column
pub const COL_SRC: &str = "src";
/// Optional edge destination node column
pub const COL_DST: &str = "dst";

/// Element type of a [`Column`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// 64-bit signed integer
    Int,
    /// 32-bit IEEE 754 float
    Float32,
    /// UTF-8 string (categorical values, string identifiers)
    Str,
}

impl ColumnType {
    /// Wire tag for this column type
    pub fn tag(self) -> u8 {
        match self {
            ColumnType::Int => 1,
            ColumnType::Float32 => 2,
            ColumnType::Str => 3,
        }
    }

    /// Parse a wire tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ColumnType::Int),
            2 => Some(ColumnType::Float32),
            3 => Some(ColumnType::Str),
            _ => None,
        }
    }

    /// Display name for the type
    pub fn display_name(self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float32 => "float32",
            ColumnType::Str => "string",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A single typed column
#[derive(Debug, Clone)]
pub enum Column {
    Int(Vec<i64>),
    Float32(Vec<f32>),
    Str(Vec<String>),
}

impl Column {
    /// Number of rows in the column
    pub fn len(&self) -> usize {
        match self {
            Column::Int(v) => v.len(),
            Column::Float32(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    /// Whether the column has no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of the column
    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Int(_) => ColumnType::Int,
            Column::Float32(_) => ColumnType::Float32,
            Column::Str(_) => ColumnType::Str,
        }
    }

    pub fn as_int(&self) -> Option<&[i64]> {
        match self {
            Column::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Column::Float32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&[String]> {
        match self {
            Column::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Read row `index` as a node identifier (int and string columns only)
    pub fn node_id(&self, index: usize) -> Option<NodeId> {
        match self {
            Column::Int(v) => v.get(index).copied().map(NodeId::Int),
            Column::Str(v) => v.get(index).cloned().map(NodeId::Str),
            Column::Float32(_) => None,
        }
    }

    /// Read row `index` as a categorical value (int and string columns only)
    pub fn category(&self, index: usize) -> Option<Category> {
        match self {
            Column::Int(v) => v.get(index).copied().map(Category::Int),
            Column::Str(v) => v.get(index).cloned().map(Category::Str),
            Column::Float32(_) => None,
        }
    }

    /// Read row `index` as a number, widening ints and floats to f64
    pub fn numeric(&self, index: usize) -> Option<f64> {
        match self {
            Column::Int(v) => v.get(index).map(|&n| n as f64),
            Column::Float32(v) => v.get(index).map(|&n| n as f64),
            Column::Str(_) => None,
        }
    }
}

/// Float columns compare by bit pattern so that NaN payloads and signed
/// zeros must survive a round trip unchanged.
impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Column::Int(a), Column::Int(b)) => a == b,
            (Column::Float32(a), Column::Float32(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Column::Str(a), Column::Str(b)) => a == b,
            _ => false,
        }
    }
}

/// Identifier of a node: integer or string, unique within a session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeId {
    Int(i64),
    Str(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Int(n) => write!(f, "{}", n),
            NodeId::Str(s) => f.write_str(s),
        }
    }
}

/// A categorical value such as a color or bundle: integer code or label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Int(i64),
    Str(String),
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Int(n) => write!(f, "{}", n),
            Category::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Category {
    fn from(n: i64) -> Self {
        Category::Int(n)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Category::Str(s.to_string())
    }
}

/// An ordered set of named, equal-length columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<(String, Column)>,
    num_rows: usize,
}

impl Table {
    /// Create an empty table with no columns
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Table::push_column`]
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        self.push_column(name, column)?;
        Ok(self)
    }

    /// Append a column. Its length must match the existing row count and
    /// its name must not already be present.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.column(&name).is_some() {
            return Err(StreamError::schema(format!("duplicate column '{}'", name)));
        }
        if !self.columns.is_empty() && column.len() != self.num_rows {
            return Err(StreamError::schema(format!(
                "column '{}' has {} rows, table has {}",
                name,
                column.len(),
                self.num_rows
            )));
        }
        self.num_rows = column.len();
        self.columns.push((name, column));
        Ok(())
    }

    /// Set the row count of a table that has no columns yet
    pub(crate) fn set_row_count(&mut self, rows: usize) -> Result<()> {
        if !self.columns.is_empty() {
            return Err(StreamError::schema(
                "row count is fixed by the columns once any are present",
            ));
        }
        self.num_rows = rows;
        Ok(())
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// Look up a column by name, failing with a schema mismatch if absent
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| StreamError::schema(format!("missing column '{}'", name)))
    }

    /// Column names in order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Columns in order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Copy the named columns into a new table, in the requested order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let mut out = Table::new();
        for name in names {
            let name = name.as_ref();
            out.push_column(name, self.require(name)?.clone())?;
        }
        // Zero selected columns still describes the same number of rows
        if names.is_empty() {
            out.set_row_count(self.num_rows)?;
        }
        Ok(out)
    }

    /// Horizontally join two tables by row position
    pub fn hconcat(mut self, other: Table) -> Result<Table> {
        if !self.columns.is_empty() && !other.columns.is_empty() && self.num_rows != other.num_rows
        {
            return Err(StreamError::schema(format!(
                "cannot join tables with {} and {} rows",
                self.num_rows, other.num_rows
            )));
        }
        for (name, column) in other.columns {
            self.push_column(name, column)?;
        }
        Ok(self)
    }
}

fn check_id_column(table: &Table, name: &str) -> Result<()> {
    match table.require(name)?.column_type() {
        ColumnType::Int | ColumnType::Str => Ok(()),
        other => Err(StreamError::schema(format!(
            "column '{}' must be int or string, got {}",
            name, other
        ))),
    }
}

fn check_type(table: &Table, name: &str, allowed: &[ColumnType]) -> Result<()> {
    let ty = table.require(name)?.column_type();
    if allowed.contains(&ty) {
        Ok(())
    } else {
        Err(StreamError::schema(format!(
            "column '{}' has unsupported type {}",
            name, ty
        )))
    }
}

/// Static node attributes for a session: `id`, `color`, `size`
///
/// Node ids are unique. Extra columns are carried through untouched and may
/// be selected by name when framing.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTable(Table);

impl NodeTable {
    /// Validate a table as a static node table
    pub fn new(table: Table) -> Result<Self> {
        check_id_column(&table, COL_ID)?;
        check_type(&table, COL_COLOR, &[ColumnType::Int, ColumnType::Str])?;
        check_type(&table, COL_SIZE, &[ColumnType::Int, ColumnType::Float32])?;
        for reserved in [COL_X, COL_Y] {
            if table.column(reserved).is_some() {
                return Err(StreamError::schema(format!(
                    "static node table must not carry per-iteration column '{}'",
                    reserved
                )));
            }
        }

        let ids = table.require(COL_ID)?;
        let mut seen = HashSet::with_capacity(table.num_rows());
        for row in 0..table.num_rows() {
            if let Some(id) = ids.node_id(row) {
                if !seen.insert(id.clone()) {
                    return Err(StreamError::schema(format!("duplicate node id {}", id)));
                }
            }
        }
        Ok(Self(table))
    }

    /// Build from integer ids, integer colors and integer sizes
    pub fn from_columns(ids: Vec<i64>, colors: Vec<i64>, sizes: Vec<i64>) -> Result<Self> {
        let table = Table::new()
            .with_column(COL_ID, Column::Int(ids))?
            .with_column(COL_COLOR, Column::Int(colors))?
            .with_column(COL_SIZE, Column::Int(sizes))?;
        Self::new(table)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.0.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn table(&self) -> &Table {
        &self.0
    }

    pub fn into_table(self) -> Table {
        self.0
    }

    /// The set of node identifiers
    pub fn id_set(&self) -> HashSet<NodeId> {
        let ids = match self.0.column(COL_ID) {
            Some(c) => c,
            None => return HashSet::new(),
        };
        (0..self.len()).filter_map(|i| ids.node_id(i)).collect()
    }
}

/// Static edge attributes for a session: `edge`, `bundle`, `color`,
/// optionally `src`/`dst` endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeTable(Table);

impl EdgeTable {
    /// Validate a table as a static edge table
    pub fn new(table: Table) -> Result<Self> {
        check_id_column(&table, COL_EDGE)?;
        check_type(&table, COL_BUNDLE, &[ColumnType::Int, ColumnType::Str])?;
        check_type(&table, COL_COLOR, &[ColumnType::Int, ColumnType::Str])?;
        match (table.column(COL_SRC), table.column(COL_DST)) {
            (Some(_), Some(_)) => {
                check_id_column(&table, COL_SRC)?;
                check_id_column(&table, COL_DST)?;
            }
            (None, None) => {}
            _ => {
                return Err(StreamError::schema(
                    "edge endpoints need both 'src' and 'dst' columns",
                ))
            }
        }
        Ok(Self(table))
    }

    /// Build from integer edge ids, endpoints, bundles and colors
    pub fn from_columns(
        edges: Vec<i64>,
        src: Vec<i64>,
        dst: Vec<i64>,
        bundles: Vec<i64>,
        colors: Vec<i64>,
    ) -> Result<Self> {
        let table = Table::new()
            .with_column(COL_EDGE, Column::Int(edges))?
            .with_column(COL_SRC, Column::Int(src))?
            .with_column(COL_DST, Column::Int(dst))?
            .with_column(COL_BUNDLE, Column::Int(bundles))?
            .with_column(COL_COLOR, Column::Int(colors))?;
        Self::new(table)
    }

    /// An edge table with zero rows
    pub fn empty() -> Self {
        Self(Table {
            columns: vec![
                (COL_EDGE.to_string(), Column::Int(Vec::new())),
                (COL_BUNDLE.to_string(), Column::Int(Vec::new())),
                (COL_COLOR.to_string(), Column::Int(Vec::new())),
            ],
            num_rows: 0,
        })
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.0.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn table(&self) -> &Table {
        &self.0
    }

    /// Endpoint pairs as row indices into `nodes`, if this table carries endpoints
    pub fn endpoint_rows(&self, nodes: &NodeTable) -> Result<Option<Vec<(usize, usize)>>> {
        let (src, dst) = match (self.0.column(COL_SRC), self.0.column(COL_DST)) {
            (Some(s), Some(d)) => (s, d),
            _ => return Ok(None),
        };
        let ids = nodes.table().require(COL_ID)?;
        let index: std::collections::HashMap<NodeId, usize> = (0..nodes.len())
            .filter_map(|row| ids.node_id(row).map(|id| (id, row)))
            .collect();

        let mut pairs = Vec::with_capacity(self.len());
        for row in 0..self.len() {
            let lookup = |column: &Column| -> Result<usize> {
                let id = column
                    .node_id(row)
                    .ok_or_else(|| StreamError::schema("edge endpoint is not an id"))?;
                index.get(&id).copied().ok_or_else(|| {
                    StreamError::schema(format!("edge {} references unknown node {}", row, id))
                })
            };
            pairs.push((lookup(src)?, lookup(dst)?));
        }
        Ok(Some(pairs))
    }

    /// Check that every endpoint references a node of `nodes`
    pub fn validate_against(&self, nodes: &NodeTable) -> Result<()> {
        self.endpoint_rows(nodes).map(|_| ())
    }
}

/// Per-iteration coordinates, float32, one row per node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionTable {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
}

impl PositionTable {
    pub fn new(x: Vec<f32>, y: Vec<f32>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(StreamError::schema(format!(
                "x has {} rows but y has {}",
                x.len(),
                y.len()
            )));
        }
        Ok(Self { x, y })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Convert into `x`/`y` float32 columns
    pub fn into_table(self) -> Result<Table> {
        Table::new()
            .with_column(COL_X, Column::Float32(self.x))?
            .with_column(COL_Y, Column::Float32(self.y))
    }
}

/// One node row of a decoded node frame
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    pub color: Category,
    pub size: f64,
}

impl NodeSnapshot {
    /// Materialize rows from a frame table carrying `id`, `x`, `y`, `color`, `size`
    pub fn rows(table: &Table) -> Result<Vec<NodeSnapshot>> {
        let ids = table.require(COL_ID)?;
        let xs = float_column(table, COL_X)?;
        let ys = float_column(table, COL_Y)?;
        let colors = table.require(COL_COLOR)?;
        let sizes = table.require(COL_SIZE)?;

        (0..table.num_rows())
            .map(|row| {
                Ok(NodeSnapshot {
                    id: ids
                        .node_id(row)
                        .ok_or_else(|| StreamError::schema("node id column is not an id"))?,
                    x: xs[row],
                    y: ys[row],
                    color: category(colors, COL_COLOR, row)?,
                    size: sizes
                        .numeric(row)
                        .ok_or_else(|| StreamError::schema("node size is not numeric"))?,
                })
            })
            .collect()
    }
}

/// One edge row of a decoded edge frame
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeDescriptor {
    pub edge: NodeId,
    pub bundle: Category,
    pub color: Category,
}

impl EdgeDescriptor {
    /// Materialize rows from a frame table carrying `edge`, `bundle`, `color`
    pub fn rows(table: &Table) -> Result<Vec<EdgeDescriptor>> {
        let edges = table.require(COL_EDGE)?;
        let bundles = table.require(COL_BUNDLE)?;
        let colors = table.require(COL_COLOR)?;

        (0..table.num_rows())
            .map(|row| {
                Ok(EdgeDescriptor {
                    edge: edges
                        .node_id(row)
                        .ok_or_else(|| StreamError::schema("edge column is not an id"))?,
                    bundle: category(bundles, COL_BUNDLE, row)?,
                    color: category(colors, COL_COLOR, row)?,
                })
            })
            .collect()
    }
}

fn float_column<'a>(table: &'a Table, name: &str) -> Result<&'a [f32]> {
    table
        .require(name)?
        .as_f32()
        .ok_or_else(|| StreamError::schema(format!("column '{}' must be float32", name)))
}

fn category(column: &Column, name: &str, row: usize) -> Result<Category> {
    column
        .category(row)
        .ok_or_else(|| StreamError::schema(format!("column '{}' must be int or string", name)))
}

/// Output of the shaping step: the graph a layout runs over, as static tables
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedGraph {
    pub nodes: NodeTable,
    pub edges: EdgeTable,
}

impl ShapedGraph {
    /// Pair node and edge tables, checking edge endpoints against the node set
    pub fn new(nodes: NodeTable, edges: EdgeTable) -> Result<Self> {
        edges.validate_against(&nodes)?;
        Ok(Self { nodes, edges })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }
}
