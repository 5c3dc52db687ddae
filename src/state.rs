use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::data::cache::DatasetCache;
use crate::data::filter::{Selection, Selections, View, filtered_indices};
use crate::data::model::Dataset;
use crate::data::schema::names;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// The full interactive state, independent of any front end: which source
/// is loaded, what is selected, and which rows are visible.
#[derive(Debug)]
pub struct Session {
    cache: DatasetCache,
    source: PathBuf,

    /// Loaded dataset, shared with the cache.
    dataset: Arc<Dataset>,

    /// Per-column filter selections.
    selections: Selections,

    /// Indices of rows passing the current selections (cached).
    visible_indices: Vec<usize>,
}

impl Session {
    /// Load `source` through a fresh cache.
    pub fn open(source: impl Into<PathBuf>) -> Result<Self> {
        Self::with_cache(DatasetCache::new(), source)
    }

    /// Load `source` through an existing cache.
    pub fn with_cache(mut cache: DatasetCache, source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let dataset = cache.get_or_load(&source)?;
        let visible_indices = (0..dataset.len()).collect();
        Ok(Session {
            cache,
            source,
            dataset,
            selections: Selections::new(),
            visible_indices,
        })
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    /// Set one column's selection and recompute visible rows.
    pub fn set_selection(&mut self, column: impl Into<String>, selection: Selection) {
        self.selections.insert(column.into(), selection);
        self.refilter();
    }

    /// Replace all selections at once.
    pub fn set_selections(&mut self, selections: Selections) {
        self.selections = selections;
        self.refilter();
    }

    /// Select on the sector dimension (`Sector`, else `Industry`).
    /// Returns `false` when the dataset has neither column.
    pub fn select_sector(&mut self, selection: Selection) -> bool {
        match self.dataset.sector_column().map(str::to_string) {
            Some(column) => {
                self.set_selection(column, selection);
                true
            }
            None => false,
        }
    }

    pub fn select_skill_category(&mut self, selection: Selection) {
        self.set_selection(names::SKILL_CATEGORY, selection);
    }

    pub fn clear_selection(&mut self, column: &str) {
        if self.selections.remove(column).is_some() {
            self.refilter();
        }
    }

    pub fn clear_all(&mut self) {
        self.selections.clear();
        self.refilter();
    }

    /// Rows passing the current selections.
    pub fn view(&self) -> View<'_> {
        View::new(&self.dataset, Cow::Borrowed(self.visible_indices.as_slice()))
    }

    /// Re-read the source unconditionally and re-apply the selections.
    pub fn reload(&mut self) -> Result<()> {
        self.dataset = self.cache.reload(&self.source)?;
        self.refilter();
        Ok(())
    }

    /// Pick up source changes, if any. Returns whether the dataset changed.
    pub fn refresh(&mut self) -> Result<bool> {
        let dataset = self.cache.get_or_load(&self.source)?;
        if Arc::ptr_eq(&dataset, &self.dataset) {
            return Ok(false);
        }
        self.dataset = dataset;
        self.refilter();
        Ok(true)
    }

    /// `"Active Filters: N of M records"`.
    pub fn status_line(&self) -> String {
        format!("Active Filters: {}", self.view())
    }

    /// Recompute `visible_indices` after a selection or dataset change.
    fn refilter(&mut self) {
        self.visible_indices = filtered_indices(&self.dataset, &self.selections);
    }
}
