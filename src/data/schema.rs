use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::model::Value;
use crate::error::ParseError;

/// Recognised column names.
pub mod names {
    pub const SECTOR: &str = "Sector";
    pub const INDUSTRY: &str = "Industry";
    pub const SKILL_CATEGORY: &str = "Skill_Category";
    pub const AI_ADOPTION_RATE: &str = "AI_Adoption_Rate";
    pub const SKILL_DEPRECIATION_RATE: &str = "Skill_Depreciation_Rate";
    pub const YEARS_TO_OBSOLESCENCE: &str = "Years_to_50_Percent_Obsolescence";
    pub const RESKILLING_TIME_MONTHS: &str = "Reskilling_Time_Months";
    pub const YEAR: &str = "Year";

    pub const ACCELERATION_INDEX: &str = "Acceleration_Index";
    pub const URGENCY_CATEGORY: &str = "Urgency_Category";
    pub const VIABILITY_RATIO: &str = "Reskilling_Viability_Ratio";

    /// Recognised columns that must hold numbers when present.
    pub const NUMERIC: [&str; 5] = [
        AI_ADOPTION_RATE,
        SKILL_DEPRECIATION_RATE,
        YEARS_TO_OBSOLESCENCE,
        RESKILLING_TIME_MONTHS,
        YEAR,
    ];
}

/// Cell text that pandas-style readers treat as a missing value.
const MISSING_TOKENS: [&str; 8] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

pub(crate) fn is_missing_token(s: &str) -> bool {
    MISSING_TOKENS.contains(&s.trim())
}

// ---------------------------------------------------------------------------
// Column descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Integer,
    Decimal,
    Category,
}

impl ColumnKind {
    /// Kind of a column holding values of both `self` and `other`.
    pub fn unify(self, other: ColumnKind) -> ColumnKind {
        use ColumnKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Category, _) | (_, Category) => Category,
            _ => Decimal,
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, ColumnKind::Category)
    }

    /// Kind a single text cell would have on its own.
    fn of_text(s: &str) -> ColumnKind {
        let t = s.trim();
        if t.parse::<i64>().is_ok() {
            ColumnKind::Integer
        } else if t.parse::<f64>().is_ok() {
            ColumnKind::Decimal
        } else {
            ColumnKind::Category
        }
    }

    /// Convert text into a value of this kind.
    ///
    /// Missing-value tokens become [`Value::Absent`]. Text that does not fit a
    /// numeric kind is kept as a category so it never equals a number.
    pub fn parse(self, raw: &str) -> Value {
        if is_missing_token(raw) {
            return Value::Absent;
        }
        let t = raw.trim();
        match self {
            ColumnKind::Integer => match t.parse::<i64>() {
                Ok(i) => Value::Integer(i),
                Err(_) => match t.parse::<f64>() {
                    Ok(v) if v.fract() == 0.0 && v.is_finite() => Value::Integer(v as i64),
                    _ => Value::Category(raw.to_string()),
                },
            },
            ColumnKind::Decimal => match t.parse::<f64>() {
                Ok(v) => Value::from(v),
                Err(_) => Value::Category(raw.to_string()),
            },
            ColumnKind::Category => Value::Category(raw.to_string()),
        }
    }

    /// Re-express an already typed value as this kind.
    fn coerce(self, value: Value) -> Value {
        match (self, value) {
            (_, Value::Absent) => Value::Absent,
            (ColumnKind::Decimal, Value::Integer(i)) => Value::Decimal(i as f64),
            (ColumnKind::Decimal, Value::Decimal(v)) => Value::from(v),
            (ColumnKind::Category, v @ (Value::Integer(_) | Value::Decimal(_))) => {
                Value::Category(v.to_string())
            }
            (_, v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnOrigin {
    /// Read from the source.
    Raw,
    /// Computed at load time from other columns.
    Derived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
    pub origin: ColumnOrigin,
}

/// Ordered column list with a name index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    columns: Vec<ColumnDef>,
    index: BTreeMap<String, usize>,
}

impl Schema {
    pub(crate) fn push(&mut self, def: ColumnDef) -> usize {
        let pos = self.columns.len();
        self.index.insert(def.name.clone(), pos);
        self.columns.push(def);
        pos
    }

    /// Swap the descriptor at `pos`; names are kept in sync.
    pub(crate) fn replace(&mut self, pos: usize, def: ColumnDef) {
        self.index.remove(&self.columns[pos].name);
        self.index.insert(def.name.clone(), pos);
        self.columns[pos] = def;
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.position(name).map(|p| &self.columns[p])
    }

    /// Descriptor at a position obtained from this schema.
    pub fn column(&self, pos: usize) -> &ColumnDef {
        &self.columns[pos]
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ---------------------------------------------------------------------------
// KnownColumns – typed schema descriptor
// ---------------------------------------------------------------------------

/// Positions of every recognised column, resolved once at load time.
/// `None` means the column is not part of this dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KnownColumns {
    /// `Sector`, or `Industry` when there is no `Sector` column.
    pub sector: Option<usize>,
    pub skill_category: Option<usize>,
    pub ai_adoption_rate: Option<usize>,
    pub skill_depreciation_rate: Option<usize>,
    pub years_to_obsolescence: Option<usize>,
    pub reskilling_time_months: Option<usize>,
    pub year: Option<usize>,

    pub acceleration_index: Option<usize>,
    pub urgency_category: Option<usize>,
    pub viability_ratio: Option<usize>,
}

impl KnownColumns {
    /// Resolve the raw (source) columns; derived positions are filled in by
    /// the deriver.
    pub(crate) fn resolve_raw(schema: &Schema) -> Self {
        KnownColumns {
            sector: schema
                .position(names::SECTOR)
                .or_else(|| schema.position(names::INDUSTRY)),
            skill_category: schema.position(names::SKILL_CATEGORY),
            ai_adoption_rate: schema.position(names::AI_ADOPTION_RATE),
            skill_depreciation_rate: schema.position(names::SKILL_DEPRECIATION_RATE),
            years_to_obsolescence: schema.position(names::YEARS_TO_OBSOLESCENCE),
            reskilling_time_months: schema.position(names::RESKILLING_TIME_MONTHS),
            year: schema.position(names::YEAR),
            ..KnownColumns::default()
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – parsed source before derivation
// ---------------------------------------------------------------------------

/// A header plus uniformly-typed rows, as read from any source format.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub(crate) headers: Vec<String>,
    pub(crate) kinds: Vec<ColumnKind>,
    pub(crate) rows: Vec<Vec<Value>>,
}

impl RawTable {
    /// Build from text cells (CSV), inferring each column's kind over the
    /// whole column: all integers → integer, all numbers → decimal, else
    /// category.
    pub fn from_text_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ParseError> {
        check_headers(&headers)?;
        check_widths(headers.len(), rows.iter().map(Vec::len))?;

        let kinds: Vec<ColumnKind> = (0..headers.len())
            .map(|col| {
                rows.iter()
                    .map(|r| r[col].as_str())
                    .filter(|s| !is_missing_token(s))
                    .map(ColumnKind::of_text)
                    .reduce(ColumnKind::unify)
                    // all-missing columns read as decimal, like an all-NaN float column
                    .unwrap_or(ColumnKind::Decimal)
            })
            .collect();

        let rows = rows
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| kind.parse(cell))
                    .collect()
            })
            .collect();

        Ok(RawTable {
            headers,
            kinds,
            rows,
        })
    }

    /// Build from already typed cells (JSON, Parquet), unifying mixed kinds
    /// per column.
    pub fn from_value_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, ParseError> {
        check_headers(&headers)?;
        check_widths(headers.len(), rows.iter().map(Vec::len))?;

        let kinds: Vec<ColumnKind> = (0..headers.len())
            .map(|col| {
                rows.iter()
                    .filter_map(|r| r[col].kind())
                    .reduce(ColumnKind::unify)
                    .unwrap_or(ColumnKind::Decimal)
            })
            .collect();

        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| kind.coerce(cell))
                    .collect()
            })
            .collect();

        Ok(RawTable {
            headers,
            kinds,
            rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn kinds(&self) -> &[ColumnKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn check_headers(headers: &[String]) -> Result<(), ParseError> {
    if headers.is_empty() {
        return Err(ParseError::MissingHeader);
    }
    let mut seen = BTreeSet::new();
    for h in headers {
        if !seen.insert(h.as_str()) {
            return Err(ParseError::DuplicateColumn(h.clone()));
        }
    }
    Ok(())
}

fn check_widths(expected: usize, widths: impl Iterator<Item = usize>) -> Result<(), ParseError> {
    for (row, found) in widths.enumerate() {
        if found != expected {
            return Err(ParseError::RaggedRow {
                row,
                expected,
                found,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn infers_kinds_over_whole_column() {
        let table = RawTable::from_text_rows(
            headers(&["Year", "Rate", "Sector", "Empty"]),
            text(&[&["2020", "1", "Tech", ""], &["2021", "2.5", "42", "NA"]]),
        )
        .unwrap();

        assert_eq!(
            table.kinds(),
            &[
                ColumnKind::Integer,
                ColumnKind::Decimal,
                ColumnKind::Category,
                ColumnKind::Decimal
            ]
        );
        assert_eq!(table.rows[0][1], Value::Decimal(1.0));
        assert_eq!(table.rows[1][2], Value::from("42"));
        assert_eq!(table.rows[0][3], Value::Absent);
    }

    #[test]
    fn missing_tokens_are_absent_in_numeric_columns() {
        let table = RawTable::from_text_rows(
            headers(&["Rate"]),
            text(&[&["0.5"], &["NaN"], &["null"], &[" "]]),
        )
        .unwrap();
        assert_eq!(table.kinds(), &[ColumnKind::Decimal]);
        assert_eq!(
            table.rows.iter().map(|r| r[0].clone()).collect::<Vec<_>>(),
            vec![Value::Decimal(0.5), Value::Absent, Value::Absent, Value::Absent]
        );
    }

    #[test]
    fn rejects_duplicate_and_missing_headers() {
        let dup = RawTable::from_text_rows(headers(&["A", "A"]), vec![]);
        assert!(matches!(dup, Err(ParseError::DuplicateColumn(c)) if c == "A"));

        let none = RawTable::from_text_rows(vec![], vec![]);
        assert!(matches!(none, Err(ParseError::MissingHeader)));
    }

    #[test]
    fn rejects_ragged_rows() {
        let result = RawTable::from_value_rows(
            headers(&["A", "B"]),
            vec![vec![Value::Integer(1), Value::Integer(2)], vec![Value::Integer(3)]],
        );
        assert!(matches!(
            result,
            Err(ParseError::RaggedRow { row: 1, expected: 2, found: 1 })
        ));
    }

    #[test]
    fn unifies_mixed_value_columns() {
        let table = RawTable::from_value_rows(
            headers(&["Mixed", "Text"]),
            vec![
                vec![Value::Integer(1), Value::Integer(7)],
                vec![Value::Decimal(2.5), Value::from("seven")],
            ],
        )
        .unwrap();
        assert_eq!(table.kinds(), &[ColumnKind::Decimal, ColumnKind::Category]);
        assert_eq!(table.rows[0][0], Value::Decimal(1.0));
        assert_eq!(table.rows[0][1], Value::from("7"));
    }

    #[test]
    fn parse_keeps_unfit_text_as_category() {
        assert_eq!(ColumnKind::Integer.parse("2023"), Value::Integer(2023));
        assert_eq!(ColumnKind::Integer.parse("2023.0"), Value::Integer(2023));
        assert_eq!(ColumnKind::Integer.parse("soon"), Value::from("soon"));
        assert_eq!(ColumnKind::Decimal.parse("NA"), Value::Absent);
        assert_eq!(ColumnKind::Category.parse("Engineering"), Value::from("Engineering"));
    }

    #[test]
    fn sector_falls_back_to_industry() {
        let mut schema = Schema::default();
        schema.push(ColumnDef {
            name: names::INDUSTRY.to_string(),
            kind: ColumnKind::Category,
            origin: ColumnOrigin::Raw,
        });
        assert_eq!(KnownColumns::resolve_raw(&schema).sector, Some(0));

        schema.push(ColumnDef {
            name: names::SECTOR.to_string(),
            kind: ColumnKind::Category,
            origin: ColumnOrigin::Raw,
        });
        assert_eq!(KnownColumns::resolve_raw(&schema).sector, Some(1));
    }
}
