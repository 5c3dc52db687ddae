use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use skill_halflife::data::schema::names;

/// One synthetic skill observation. `None` fields are written as missing.
struct Row {
    skill_id: i64,
    sector: &'static str,
    skill_category: &'static str,
    year: i64,
    ai_adoption_rate: Option<f64>,
    skill_depreciation_rate: Option<f64>,
    years_to_obsolescence: Option<f64>,
    reskilling_time_months: Option<f64>,
}

const SECTORS: [&str; 5] = ["Technology", "Finance", "Healthcare", "Manufacturing", "Education"];

/// Category name and its baseline annual depreciation rate.
const CATEGORIES: [(&str, f64); 6] = [
    ("Programming", 0.30),
    ("Data Analysis", 0.25),
    ("Design", 0.20),
    ("Customer Service", 0.22),
    ("Project Management", 0.10),
    ("Clinical Practice", 0.06),
];

const YEARS: std::ops::RangeInclusive<i64> = 2018..=2025;

/// Share of numeric cells left empty, so loaders see missing values.
const MISSING_RATE: f64 = 0.03;

fn maybe(rng: &mut StdRng, value: f64) -> Option<f64> {
    (rng.random::<f64>() >= MISSING_RATE).then_some(value)
}

fn round(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn generate(rng: &mut StdRng) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut skill_id = 0;

    for sector in SECTORS {
        for (category, base_rate) in CATEGORIES {
            for year in YEARS {
                // AI adoption rises over time; depreciation follows adoption.
                let progress = (year - YEARS.start()) as f64 / 7.0;
                let adoption = (15.0 + 60.0 * progress + rng.random_range(-10.0..10.0)).clamp(1.0, 99.0);
                let depreciation =
                    (base_rate * (1.0 + adoption / 100.0) + rng.random_range(-0.03..0.03)).max(0.02);
                let half_life = std::f64::consts::LN_2 / depreciation;
                // A few programmes have no formal duration recorded (0 months).
                let reskilling = if rng.random_bool(0.02) {
                    0.0
                } else {
                    f64::from(rng.random_range(2..=36_u8))
                };

                rows.push(Row {
                    skill_id,
                    sector,
                    skill_category: category,
                    year,
                    ai_adoption_rate: maybe(rng, round(adoption, 1)),
                    skill_depreciation_rate: maybe(rng, round(depreciation, 3)),
                    years_to_obsolescence: maybe(rng, round(half_life, 2)),
                    reskilling_time_months: maybe(rng, reskilling),
                });
                skill_id += 1;
            }
        }
    }
    rows
}

const HEADER: [&str; 8] = [
    "Skill_ID",
    names::SECTOR,
    names::SKILL_CATEGORY,
    names::YEAR,
    names::AI_ADOPTION_RATE,
    names::SKILL_DEPRECIATION_RATE,
    names::YEARS_TO_OBSOLESCENCE,
    names::RESKILLING_TIME_MONTHS,
];

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record(HEADER)?;
    for r in rows {
        writer.write_record([
            r.skill_id.to_string(),
            r.sector.to_string(),
            r.skill_category.to_string(),
            r.year.to_string(),
            cell(r.ai_adoption_rate),
            cell(r.skill_depreciation_rate),
            cell(r.years_to_obsolescence),
            cell(r.reskilling_time_months),
        ])?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let float = |f: fn(&Row) -> Option<f64>| -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<Float64Array>())
    };

    let fields: Vec<Field> = HEADER
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let data_type = match i {
                0 | 3 => DataType::Int64,
                1 | 2 => DataType::Utf8,
                _ => DataType::Float64,
            };
            Field::new(*name, data_type, true)
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.skill_id))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.sector))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.skill_category))),
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.year))),
        float(|r| r.ai_adoption_rate),
        float(|r| r.skill_depreciation_rate),
        float(|r| r.years_to_obsolescence),
        float(|r| r.reskilling_time_months),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("skill_half_life_ai.csv"));

    let mut rng = StdRng::seed_from_u64(42);
    let rows = generate(&mut rng);

    let ext = output_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => write_csv(&output_path, &rows)?,
        "parquet" | "pq" => write_parquet(&output_path, &rows)?,
        other => bail!("Unsupported output extension: .{other}"),
    }

    println!("Wrote {} skill records to {}", rows.len(), output_path.display());
    Ok(())
}
