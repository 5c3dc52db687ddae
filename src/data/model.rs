use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::derive::UrgencyCategory;
use super::schema::{ColumnKind, KnownColumns, RawTable, Schema, names};
use crate::error::ParseError;

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Using `BTreeMap` / `BTreeSet` downstream so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Category(String),
    Integer(i64),
    Decimal(f64),
    /// Missing in the source, or a derived value that is undefined.
    Absent,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Absent => 0,
                Integer(_) => 1,
                Decimal(_) => 2,
                Category(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Absent, Absent) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Decimal(a), Decimal(b)) => a.total_cmp(b),
            (Category(a), Category(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Category(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Decimal(f) => f.to_bits().hash(state),
            Value::Absent => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Category(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Absent => write!(f, "NA"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Category(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Category(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// NaN reads as absent and `-0.0` is stored as `0.0`, so equal decimals
/// also order and hash equal.
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        if v.is_nan() {
            Value::Absent
        } else if v == 0.0 {
            Value::Decimal(0.0)
        } else {
            Value::Decimal(v)
        }
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Value::Absent, Value::from)
    }
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Numeric view of the value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Decimal(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integer view of the value; whole decimals (`2023.0`) are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Decimal(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Category(s) => Some(s),
            _ => None,
        }
    }

    /// The column kind this value belongs to, `None` for absent cells.
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Value::Category(_) => Some(ColumnKind::Category),
            Value::Integer(_) => Some(ColumnKind::Integer),
            Value::Decimal(_) => Some(ColumnKind::Decimal),
            Value::Absent => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row
// ---------------------------------------------------------------------------

/// One row of the dataset. Values are positional, aligned with the
/// dataset's [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub(crate) values: Vec<Value>,
}

const ABSENT: Value = Value::Absent;

impl Record {
    /// Value at a column position; out-of-range positions read as absent.
    pub fn get(&self, column: usize) -> &Value {
        self.values.get(column).unwrap_or(&ABSENT)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Numeric cell of an optional column, as resolved by [`KnownColumns`].
    pub fn decimal(&self, column: Option<usize>) -> Option<f64> {
        column.and_then(|c| self.get(c).as_f64())
    }

    pub fn integer(&self, column: Option<usize>) -> Option<i64> {
        column.and_then(|c| self.get(c).as_i64())
    }

    /// Present cell of an optional column (any kind).
    pub fn present(&self, column: Option<usize>) -> Option<&Value> {
        column.map(|c| self.get(c)).filter(|v| !v.is_absent())
    }

    /// Urgency bucket of this row, if the dataset derived one.
    pub fn urgency(&self, known: &KnownColumns) -> Option<UrgencyCategory> {
        known
            .urgency_category
            .and_then(|c| self.get(c).as_str())
            .and_then(UrgencyCategory::from_label)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset: raw columns plus every applicable derived
/// column, with pre-computed column indices.
///
/// Immutable once built; filtering produces views over it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub(crate) schema: Schema,
    pub(crate) known: KnownColumns,
    pub(crate) records: Vec<Record>,
    /// For each non-decimal column the sorted set of present values.
    pub(crate) unique_values: BTreeMap<String, BTreeSet<Value>>,
}

impl Dataset {
    /// Build the dataset from a parsed table, deriving feature columns.
    pub fn from_table(table: RawTable) -> Result<Self, ParseError> {
        super::derive::derive_dataset(table)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Typed positions of the recognised columns.
    pub fn known(&self) -> &KnownColumns {
        &self.known
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    /// Value of `column` in `row`; `None` when either does not exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.schema.position(column)?;
        self.records.get(row).map(|r| r.get(col))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.schema.columns().iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.position(name).is_some()
    }

    /// Sorted distinct present values of a non-decimal column.
    pub fn unique_values(&self, column: &str) -> Option<&BTreeSet<Value>> {
        self.unique_values.get(column)
    }

    /// The sector dimension: `Sector` if present, else `Industry`.
    pub fn sector_column(&self) -> Option<&str> {
        self.known
            .sector
            .map(|c| self.schema.column(c).name.as_str())
    }

    /// Categorical columns offered as filter dimensions, in display order.
    pub fn filter_dimensions(&self) -> Vec<&str> {
        let mut dims: Vec<&str> = self.sector_column().into_iter().collect();
        if self.known.skill_category.is_some() {
            dims.push(names::SKILL_CATEGORY);
        }
        dims
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
