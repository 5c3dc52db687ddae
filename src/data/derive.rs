use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Serialize, Serializer};

use super::model::{Dataset, Record, Value};
use super::schema::{ColumnDef, ColumnKind, ColumnOrigin, KnownColumns, RawTable, Schema, names};
use crate::error::ParseError;

// ---------------------------------------------------------------------------
// Urgency bins
// ---------------------------------------------------------------------------

/// Four-level ordinal bucket of obsolescence speed, most urgent first.
///
/// Bins are closed on the lower bound: `(0, 2)`, `[2, 5)`, `[5, 10)`,
/// `[10, ∞]`. Positive infinity falls in the last bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UrgencyCategory {
    Critical,
    High,
    Moderate,
    Low,
}

impl UrgencyCategory {
    pub const ALL: [UrgencyCategory; 4] = [
        UrgencyCategory::Critical,
        UrgencyCategory::High,
        UrgencyCategory::Moderate,
        UrgencyCategory::Low,
    ];

    pub fn label(self) -> &'static str {
        match self {
            UrgencyCategory::Critical => "Critical (<2y)",
            UrgencyCategory::High => "High (2-5y)",
            UrgencyCategory::Moderate => "Moderate (5-10y)",
            UrgencyCategory::Low => "Low (>10y)",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Bucket a years-to-half-obsolescence value. NaN and values at or
    /// below zero are not binnable.
    pub fn from_years(years: f64) -> Option<Self> {
        if years.is_nan() || years <= 0.0 {
            return None;
        }
        Some(if years < 2.0 {
            UrgencyCategory::Critical
        } else if years < 5.0 {
            UrgencyCategory::High
        } else if years < 10.0 {
            UrgencyCategory::Moderate
        } else {
            UrgencyCategory::Low
        })
    }
}

impl fmt::Display for UrgencyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for UrgencyCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Per-row derivations
//
// Pure functions of a row's raw cells. Undefined results are absent, never
// errors.
// ---------------------------------------------------------------------------

/// `AI_Adoption_Rate × Skill_Depreciation_Rate`.
pub fn acceleration_index(adoption_rate: Option<f64>, depreciation_rate: Option<f64>) -> Option<f64> {
    Some(adoption_rate? * depreciation_rate?)
}

pub fn urgency_category(years_to_obsolescence: Option<f64>) -> Option<UrgencyCategory> {
    years_to_obsolescence.and_then(UrgencyCategory::from_years)
}

/// `(Years_to_50_Percent_Obsolescence × 12) / Reskilling_Time_Months`;
/// absent when the denominator is absent or zero.
pub fn viability_ratio(years_to_obsolescence: Option<f64>, reskilling_months: Option<f64>) -> Option<f64> {
    let months = reskilling_months?;
    if months == 0.0 {
        return None;
    }
    let ratio = years_to_obsolescence? * 12.0 / months;
    ratio.is_finite().then_some(ratio)
}

// ---------------------------------------------------------------------------
// Dataset construction
// ---------------------------------------------------------------------------

pub(crate) fn derive_dataset(table: RawTable) -> Result<Dataset, ParseError> {
    let RawTable {
        headers,
        kinds,
        rows,
    } = table;

    let mut schema = Schema::default();
    for (name, kind) in headers.into_iter().zip(kinds) {
        schema.push(ColumnDef {
            name,
            kind,
            origin: ColumnOrigin::Raw,
        });
    }

    check_numeric_inputs(&schema, &rows)?;

    let mut known = KnownColumns::resolve_raw(&schema);
    let raw = known;

    if raw.ai_adoption_rate.is_some() && raw.skill_depreciation_rate.is_some() {
        known.acceleration_index = Some(add_derived(&mut schema, names::ACCELERATION_INDEX, ColumnKind::Decimal));
    }
    if raw.years_to_obsolescence.is_some() {
        known.urgency_category = Some(add_derived(&mut schema, names::URGENCY_CATEGORY, ColumnKind::Category));
    }
    if raw.years_to_obsolescence.is_some() && raw.reskilling_time_months.is_some() {
        known.viability_ratio = Some(add_derived(&mut schema, names::VIABILITY_RATIO, ColumnKind::Decimal));
    }

    log::debug!(
        "derived columns: acceleration_index={} urgency_category={} viability_ratio={}",
        known.acceleration_index.is_some(),
        known.urgency_category.is_some(),
        known.viability_ratio.is_some()
    );

    let width = schema.len();
    let records: Vec<Record> = rows
        .into_iter()
        .map(|values| {
            let mut record = Record { values };
            record.values.resize(width, Value::Absent);
            derive_row(&mut record, &raw, &known);
            record
        })
        .collect();

    let unique_values = collect_unique_values(&schema, &records);

    Ok(Dataset {
        schema,
        known,
        records,
        unique_values,
    })
}

/// Recognised numeric columns must not hold text.
fn check_numeric_inputs(schema: &Schema, rows: &[Vec<Value>]) -> Result<(), ParseError> {
    for name in names::NUMERIC {
        let Some(pos) = schema.position(name) else {
            continue;
        };
        if schema.column(pos).kind.is_numeric() {
            continue;
        }
        let value = rows
            .iter()
            .map(|r| &r[pos])
            .find(|v| v.as_f64().is_none() && !v.is_absent())
            .map(Value::to_string)
            .unwrap_or_default();
        return Err(ParseError::NonNumeric {
            column: name.to_string(),
            value,
        });
    }
    Ok(())
}

/// Append a derived column, or take over a source column of the same name.
fn add_derived(schema: &mut Schema, name: &str, kind: ColumnKind) -> usize {
    let def = ColumnDef {
        name: name.to_string(),
        kind,
        origin: ColumnOrigin::Derived,
    };
    match schema.position(name) {
        Some(pos) => {
            log::warn!("source column '{name}' is replaced by the derived column of the same name");
            schema.replace(pos, def);
            pos
        }
        None => schema.push(def),
    }
}

fn derive_row(record: &mut Record, raw: &KnownColumns, known: &KnownColumns) {
    let years = record.decimal(raw.years_to_obsolescence);

    if let Some(col) = known.acceleration_index {
        let index = acceleration_index(
            record.decimal(raw.ai_adoption_rate),
            record.decimal(raw.skill_depreciation_rate),
        );
        record.values[col] = Value::from(index);
    }
    if let Some(col) = known.urgency_category {
        record.values[col] = urgency_category(years)
            .map_or(Value::Absent, |c| Value::from(c.label()));
    }
    if let Some(col) = known.viability_ratio {
        let ratio = viability_ratio(years, record.decimal(raw.reskilling_time_months));
        record.values[col] = Value::from(ratio);
    }
}

fn collect_unique_values(schema: &Schema, records: &[Record]) -> BTreeMap<String, BTreeSet<Value>> {
    schema
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, def)| def.kind != ColumnKind::Decimal)
        .map(|(pos, def)| {
            let values = records
                .iter()
                .map(|r| r.get(pos))
                .filter(|v| !v.is_absent())
                .cloned()
                .collect();
            (def.name.clone(), values)
        })
        .collect()
}
