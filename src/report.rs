use std::fmt;

use crate::summary::Summary;

fn opt(value: Option<f64>, precision: usize, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.precision$}{unit}"),
        None => "n/a".to_string(),
    }
}

/// Plain-text form of a [`Summary`]: the KPI block and the grouped series.
/// Sections whose inputs are missing from the dataset are skipped.
pub struct TextReport<'a>(pub &'a Summary);

pub fn render_text(summary: &Summary) -> String {
    TextReport(summary).to_string()
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        writeln!(out, "Active Filters: {} of {} records", s.matched, s.total)?;
        writeln!(out)?;

        let k = &s.kpis;
        writeln!(out, "Key indicators")?;
        writeln!(out, "  Median skill half-life   {}", opt(k.median_half_life, 1, " years"))?;
        writeln!(out, "  Critical skills          {}", opt(k.critical_share_pct, 1, "%"))?;
        writeln!(out, "  Avg reskilling duration  {}", opt(k.mean_reskilling_months, 0, " months"))?;
        writeln!(out, "  Reskilling viable        {}", opt(k.viable_share_pct, 1, "%"))?;

        if !s.urgency_distribution.is_empty() {
            writeln!(out)?;
            writeln!(out, "Urgency profile")?;
            for u in &s.urgency_distribution {
                writeln!(out, "  {:<18} {}", u.category.label(), u.count)?;
            }
        }

        if !s.viability_by_category.is_empty() {
            writeln!(out)?;
            writeln!(out, "Reskilling viability by skill category")?;
            for c in &s.viability_by_category {
                writeln!(
                    out,
                    "  {:<24} ratio {}  reskilling {}  half-life {}",
                    c.skill_category,
                    opt(c.mean_viability_ratio, 2, ""),
                    opt(c.mean_reskilling_months, 1, "m"),
                    opt(c.mean_half_life, 1, "y"),
                )?;
            }
        }

        if !s.half_life_trend.is_empty() {
            writeln!(out)?;
            writeln!(out, "Half-life by year")?;
            for t in &s.half_life_trend {
                writeln!(
                    out,
                    "  {}  mean {:.2}  median {:.2}  std {}",
                    t.year,
                    t.half_life.mean,
                    t.half_life.median,
                    opt(t.half_life.std_dev, 2, ""),
                )?;
            }
        }

        if let Some(r) = s.adoption_depreciation_correlation {
            writeln!(out)?;
            writeln!(out, "AI adoption vs. skill depreciation: r = {r:.3}")?;
        }
        Ok(())
    }
}
