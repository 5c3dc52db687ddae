use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use super::model::{Dataset, Record, Value};

// ---------------------------------------------------------------------------
// Filter predicate: one selection per column
// ---------------------------------------------------------------------------

/// What a single column is filtered on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No constraint on this column.
    All,
    /// Keep rows whose value equals this one exactly.
    Only(Value),
}

impl Selection {
    pub fn only(value: impl Into<Value>) -> Self {
        Selection::Only(value.into())
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Selection::Only(_))
    }
}

/// Per-column selection state: maps column_name → selection.
/// A column absent from the map, or mapped to [`Selection::All`], is not
/// filtered.
pub type Selections = BTreeMap<String, Selection>;

/// Return indices of rows that pass all active selections, in input order.
///
/// A row passes a column selection when:
/// * The selection is [`Selection::All`] → passes (no constraint)
/// * The column is not in the dataset's schema → passes (selection ignored)
/// * The row's value equals the selected value → passes
///
/// Absent cells never match, not even a selected [`Value::Absent`].
pub fn filtered_indices(dataset: &Dataset, selections: &Selections) -> Vec<usize> {
    // Resolve column names once, not per row.
    let active: Vec<(usize, &Value)> = selections
        .iter()
        .filter_map(|(col, selection)| {
            let Selection::Only(wanted) = selection else {
                return None;
            };
            match dataset.schema().position(col) {
                Some(pos) => Some((pos, wanted)),
                None => {
                    log::debug!("ignoring selection on unknown column '{col}'");
                    None
                }
            }
        })
        .collect();

    dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| {
            active.iter().all(|&(pos, wanted)| {
                let value = record.get(pos);
                !value.is_absent() && value == wanted
            })
        })
        .map(|(i, _)| i)
        .collect()
}

/// Apply `selections` to `dataset`, producing a read-only view.
pub fn filter<'a>(dataset: &'a Dataset, selections: &Selections) -> View<'a> {
    View::new(dataset, Cow::Owned(filtered_indices(dataset, selections)))
}

// ---------------------------------------------------------------------------
// View – filtered rows over an unmodified dataset
// ---------------------------------------------------------------------------

/// Rows of a dataset that passed a filter, in their original order.
#[derive(Debug, Clone)]
pub struct View<'a> {
    dataset: &'a Dataset,
    indices: Cow<'a, [usize]>,
}

impl<'a> View<'a> {
    pub(crate) fn new(dataset: &'a Dataset, indices: Cow<'a, [usize]>) -> Self {
        View { dataset, indices }
    }

    /// A view that keeps every row.
    pub fn all(dataset: &'a Dataset) -> Self {
        View::new(dataset, Cow::Owned((0..dataset.len()).collect()))
    }

    /// The underlying, unfiltered dataset.
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Row positions in the underlying dataset.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let records = self.dataset.records();
        self.indices.iter().map(move |&i| &records[i])
    }

    /// Number of rows that passed the filter.
    pub fn matched_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of rows in the unfiltered dataset.
    pub fn total_count(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl fmt::Display for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} records", self.matched_count(), self.total_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv;
    use crate::data::schema::names;

    /// 100 rows; every row with `i % 10 < 3` is Engineering (30 rows),
    /// sectors alternate Tech / Health.
    fn hundred_rows() -> Dataset {
        let mut csv = String::from("Id,Skill_Category,Sector,Years_to_50_Percent_Obsolescence\n");
        for i in 0..100 {
            let category = if i % 10 < 3 { "Engineering" } else { "Design" };
            let sector = if i % 2 == 0 { "Tech" } else { "Health" };
            let years = if i % 4 == 0 { "1" } else { "6" };
            csv.push_str(&format!("{i},{category},{sector},{years}\n"));
        }
        parse_csv(csv.as_bytes()).unwrap()
    }

    fn ids(view: &View<'_>) -> Vec<i64> {
        view.records().map(|r| r.get(0).as_i64().unwrap()).collect()
    }

    #[test]
    fn single_selection_keeps_matching_rows_in_order() {
        let ds = hundred_rows();
        let selections = Selections::from([(
            names::SKILL_CATEGORY.to_string(),
            Selection::only("Engineering"),
        )]);

        let view = filter(&ds, &selections);
        assert_eq!(view.matched_count(), 30);
        assert_eq!(view.total_count(), 100);
        let ids = ids(&view);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(&ids[..4], &[0, 1, 2, 10]);
        assert_eq!(view.to_string(), "30 of 100 records");
    }

    #[test]
    fn selections_compose_with_and() {
        let ds = hundred_rows();
        let selections = Selections::from([
            (names::SKILL_CATEGORY.to_string(), Selection::only("Engineering")),
            (names::SECTOR.to_string(), Selection::only("Tech")),
        ]);
        let view = filter(&ds, &selections);
        // i % 10 in {0, 2} → 20 rows
        assert_eq!(view.matched_count(), 20);
        assert!(ids(&view).iter().all(|i| i % 2 == 0 && i % 10 < 3));
    }

    #[test]
    fn unknown_column_and_wildcard_are_no_ops() {
        let ds = hundred_rows();
        let selections = Selections::from([
            ("Region".to_string(), Selection::only("EU")),
            (names::SECTOR.to_string(), Selection::All),
        ]);
        let view = filter(&ds, &selections);
        assert_eq!(view.matched_count(), 100);
        assert_eq!(view.indices(), View::all(&ds).indices());
    }

    #[test]
    fn no_match_is_an_empty_view() {
        let ds = hundred_rows();
        let selections = Selections::from([(
            names::SKILL_CATEGORY.to_string(),
            Selection::only("engineering"),
        )]);
        let view = filter(&ds, &selections);
        assert!(view.is_empty());
        assert_eq!(view.total_count(), 100);
    }

    #[test]
    fn derived_columns_are_filterable() {
        let ds = hundred_rows();
        let selections = Selections::from([(
            names::URGENCY_CATEGORY.to_string(),
            Selection::only("Critical (<2y)"),
        )]);
        assert_eq!(filter(&ds, &selections).matched_count(), 25);
    }

    #[test]
    fn absent_cells_never_match() {
        let ds = parse_csv("Skill_Category,Year\nData,2020\n,2021\n".as_bytes()).unwrap();
        let selections = Selections::from([(
            names::SKILL_CATEGORY.to_string(),
            Selection::Only(Value::Absent),
        )]);
        assert!(filter(&ds, &selections).is_empty());

        let by_year = Selections::from([(names::YEAR.to_string(), Selection::only(2021_i64))]);
        assert_eq!(filter(&ds, &by_year).indices(), &[1]);
    }

    #[test]
    fn repeated_filters_are_independent() {
        let ds = hundred_rows();
        let before = ds.clone();
        let a = Selections::from([(names::SECTOR.to_string(), Selection::only("Tech"))]);
        let b = Selections::from([(names::SECTOR.to_string(), Selection::only("Health"))]);

        let first = filter(&ds, &a).indices().to_vec();
        let _ = filter(&ds, &b);
        assert_eq!(filter(&ds, &a).indices(), first.as_slice());
        assert_eq!(ds, before);
    }
}
