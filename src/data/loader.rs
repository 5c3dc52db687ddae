use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float16Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, Value};
use super::schema::RawTable;
use crate::error::{DatasetError, ParseError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a dataset from a file and derive its feature columns.
/// Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row plus one row per record (the primary format)
/// * `.json`    – `[{ "Skill_Category": "...", "Year": 2023, ... }, ...]`
/// * `.parquet` – one column per field, flat primitive types
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => {
            // Surface a missing file as such, whatever its extension.
            std::fs::metadata(path).map_err(|e| DatasetError::not_found(path, e))?;
            Err(DatasetError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: other.to_string(),
            })
        }
    }?;

    log::info!(
        "loaded {} rows x {} columns from {}",
        dataset.len(),
        dataset.schema().len(),
        path.display()
    );
    Ok(dataset)
}

/// Open a source for reading. Anything other than a regular file, such as
/// a directory named `data.csv`, is unreadable.
fn open(path: &Path) -> Result<File> {
    let meta = std::fs::metadata(path).map_err(|e| DatasetError::not_found(path, e))?;
    if !meta.is_file() {
        return Err(DatasetError::not_found(
            path,
            std::io::Error::other("not a regular file"),
        ));
    }
    File::open(path).map_err(|e| DatasetError::not_found(path, e))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Dataset> {
    let file = open(path)?;
    parse_csv(file).map_err(|e| DatasetError::parse(path, e))
}

/// Parse CSV text with a header row. Column kinds are inferred over each
/// whole column.
pub fn parse_csv<R: Read>(reader: R) -> std::result::Result<Dataset, ParseError> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Dataset::from_table(RawTable::from_text_rows(headers, rows)?)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<Dataset> {
    let mut text = String::new();
    open(path)?
        .read_to_string(&mut text)
        .map_err(|e| DatasetError::not_found(path, e))?;
    parse_json(&text).map_err(|e| DatasetError::parse(path, e))
}

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Skill_Category": "Data", "Years_to_50_Percent_Obsolescence": 2.5 },
///   { "Skill_Category": "Design", "Reskilling_Time_Months": 6 }
/// ]
/// ```
///
/// The header is the union of keys in first-seen order; a key missing from
/// a record is absent.
pub fn parse_json(text: &str) -> std::result::Result<Dataset, ParseError> {
    let root: JsonValue = serde_json::from_str(text)?;

    let records = root
        .as_array()
        .ok_or_else(|| ParseError::Malformed("expected top-level JSON array".to_string()))?;

    let mut headers: Vec<String> = Vec::new();
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| ParseError::Malformed(format!("record {i} is not a JSON object")))?;
        for key in obj.keys() {
            if !positions.contains_key(key) {
                positions.insert(key.clone(), headers.len());
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            let mut row = vec![Value::Absent; headers.len()];
            for (key, val) in obj {
                row[positions[key]] = json_to_value(val);
            }
            row
        })
        .collect();

    Dataset::from_table(RawTable::from_value_rows(headers, rows)?)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Category(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::from(f)
            } else {
                Value::Category(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Category(b.to_string()),
        JsonValue::Null => Value::Absent,
        other => Value::Category(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per field.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = open(path)?;
    read_parquet(file).map_err(|e| DatasetError::parse(path, e))
}

fn read_parquet(file: File) -> std::result::Result<Dataset, ParseError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let columns = batch.columns();
        for row in 0..batch.num_rows() {
            rows.push(columns.iter().map(|col| extract_value(col, row)).collect());
        }
    }

    Dataset::from_table(RawTable::from_value_rows(headers, rows)?)
}

// -- Parquet / Arrow helpers --

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Absent;
    }
    match col.data_type() {
        DataType::Utf8 => Value::Category(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::Category(col.as_string::<i64>().value(row).to_string()),
        DataType::Int8 => Value::Integer(col.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => Value::Integer(col.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::Integer(col.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => Value::Integer(col.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => Value::Integer(col.as_primitive::<UInt32Type>().value(row).into()),
        DataType::UInt64 => {
            let v = col.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v).map_or(Value::Decimal(v as f64), Value::Integer)
        }
        DataType::Float16 => Value::from(col.as_primitive::<Float16Type>().value(row).to_f64()),
        DataType::Float32 => Value::from(f64::from(col.as_primitive::<Float32Type>().value(row))),
        DataType::Float64 => Value::from(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Value::Category(col.as_boolean().value(row).to_string()),
        // Scaled decimals print exactly, so read them back through their text.
        DataType::Decimal128(..) | DataType::Decimal256(..) => {
            match array_value_to_string(col, row) {
                Ok(s) => match s.parse::<f64>() {
                    Ok(v) => Value::from(v),
                    Err(_) => Value::Category(s),
                },
                Err(_) => Value::Category(format!("{:?}", col.data_type())),
            }
        }
        other => match array_value_to_string(col, row) {
            Ok(s) => Value::Category(s),
            Err(_) => Value::Category(format!("{other:?}")),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{Decimal128Array, Float64Array, Int64Array, StringArray, UInt64Array};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::data::schema::{ColumnKind, names};

    const CSV: &str = "\
Skill_Category,Sector,Year,AI_Adoption_Rate,Skill_Depreciation_Rate,Years_to_50_Percent_Obsolescence,Reskilling_Time_Months
Engineering,Tech,2023,0.8,0.3,1.5,6
Design,Media,2024,0.4,,7,0
";

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn csv_loads_raw_and_derived_columns() {
        let ds = parse_csv(CSV.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.schema().len(), 10);
        assert_eq!(ds.schema().get(names::YEAR).unwrap().kind, ColumnKind::Integer);
        assert_eq!(ds.value(0, names::URGENCY_CATEGORY), Some(&Value::from("Critical (<2y)")));
        assert_eq!(ds.value(1, names::ACCELERATION_INDEX), Some(&Value::Absent));
        assert_eq!(ds.value(1, names::VIABILITY_RATIO), Some(&Value::Absent));
    }

    #[test]
    fn csv_with_ragged_row_is_a_parse_error() {
        let err = parse_csv("A,B\n1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::Csv(_)));
    }

    #[test]
    fn empty_csv_has_no_header() {
        let err = parse_csv("".as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::MissingHeader));
    }

    #[test]
    fn json_records_union_keys() {
        let ds = parse_json(
            r#"[
                {"Skill_Category": "Data", "Years_to_50_Percent_Obsolescence": 2.5},
                {"Skill_Category": "Design", "Reskilling_Time_Months": 6, "Years_to_50_Percent_Obsolescence": null}
            ]"#,
        )
        .unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(1, names::YEARS_TO_OBSOLESCENCE), Some(&Value::Absent));
        assert_eq!(ds.value(0, names::RESKILLING_TIME_MONTHS), Some(&Value::Absent));
        assert_eq!(ds.value(0, names::URGENCY_CATEGORY), Some(&Value::from("High (2-5y)")));
    }

    #[test]
    fn json_columns_keep_first_seen_key_order() {
        let ds = parse_json(
            r#"[
                {"Skill_Category": "Data", "AI_Adoption_Rate": 1.0, "Skill_Depreciation_Rate": 0.5},
                {"Year": 2024, "Skill_Category": "Design"}
            ]"#,
        )
        .unwrap();
        let columns: Vec<&str> = ds.column_names().collect();
        assert_eq!(
            columns,
            vec![
                names::SKILL_CATEGORY,
                names::AI_ADOPTION_RATE,
                names::SKILL_DEPRECIATION_RATE,
                names::YEAR,
                names::ACCELERATION_INDEX,
            ]
        );
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        assert!(matches!(parse_json("{}"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse_json("[1, 2]"), Err(ParseError::Malformed(_))));
        assert!(matches!(parse_json("[{"), Err(ParseError::Json(_))));
    }

    #[test]
    fn dispatches_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_file(&dir, "data.CSV", CSV.as_bytes());
        assert_eq!(load_file(&csv).unwrap().len(), 2);

        let json = write_file(&dir, "data.json", br#"[{"Year": 2020}]"#);
        assert_eq!(load_file(&json).unwrap().len(), 1);

        let txt = write_file(&dir, "data.txt", b"whatever");
        assert!(matches!(
            load_file(&txt),
            Err(DatasetError::UnsupportedFormat { extension, .. }) if extension == "txt"
        ));
    }

    #[test]
    fn missing_source_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["absent.csv", "absent.json", "absent.parquet", "absent.xlsx"] {
            let err = load_file(&dir.path().join(name)).unwrap_err();
            assert!(err.is_not_found(), "{name}: {err}");
        }
    }

    #[test]
    fn directory_source_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["folder.csv", "folder.json", "folder.parquet"] {
            let path = dir.path().join(name);
            std::fs::create_dir(&path).unwrap();
            let err = load_file(&path).unwrap_err();
            assert!(err.is_not_found(), "{name}: {err}");
        }
    }

    fn write_parquet(path: &Path, schema: Arc<Schema>, columns: Vec<ArrayRef>) {
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn parquet_unsigned_and_decimal_columns_are_numeric() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Year", DataType::UInt64, true),
            Field::new("Years_to_50_Percent_Obsolescence", DataType::Decimal128(5, 1), true),
        ]));
        let years = Decimal128Array::from(vec![Some(25_i128), None])
            .with_precision_and_scale(5, 1)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("y.parquet");
        write_parquet(
            &path,
            schema,
            vec![Arc::new(UInt64Array::from(vec![Some(2023), Some(2024)])), Arc::new(years)],
        );

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.schema().get(names::YEAR).unwrap().kind, ColumnKind::Integer);
        assert_eq!(ds.value(0, names::YEAR), Some(&Value::Integer(2023)));
        assert_eq!(ds.value(0, names::YEARS_TO_OBSOLESCENCE), Some(&Value::Decimal(2.5)));
        assert_eq!(ds.value(0, names::URGENCY_CATEGORY), Some(&Value::from("High (2-5y)")));
        assert_eq!(ds.value(1, names::YEARS_TO_OBSOLESCENCE), Some(&Value::Absent));
    }

    #[test]
    fn unsigned_values_beyond_i64_become_decimals() {
        let col: ArrayRef = Arc::new(UInt64Array::from(vec![7, u64::MAX]));
        assert_eq!(extract_value(&col, 0), Value::Integer(7));
        assert_eq!(extract_value(&col, 1), Value::Decimal(u64::MAX as f64));
    }

    #[test]
    fn parquet_columns_map_to_kinds() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Skill_Category", DataType::Utf8, true),
            Field::new("Year", DataType::Int64, true),
            Field::new("Years_to_50_Percent_Obsolescence", DataType::Float64, true),
            Field::new("Reskilling_Time_Months", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![Some("Data"), None])),
                Arc::new(Int64Array::from(vec![Some(2023), Some(2024)])),
                Arc::new(Float64Array::from(vec![Some(2.0), Some(12.0)])),
                Arc::new(Float64Array::from(vec![Some(12.0), None])),
            ],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(1, names::SKILL_CATEGORY), Some(&Value::Absent));
        assert_eq!(ds.value(0, names::YEAR), Some(&Value::Integer(2023)));
        assert_eq!(ds.value(0, names::VIABILITY_RATIO), Some(&Value::Decimal(2.0)));
        assert_eq!(ds.value(1, names::URGENCY_CATEGORY), Some(&Value::from("Low (>10y)")));
    }
}
