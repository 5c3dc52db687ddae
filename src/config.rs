use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use crate::data::filter::{Selection, Selections};
use crate::data::model::{Dataset, Value};
use crate::data::schema::names;

/// File read when neither `--data` nor the environment names one.
pub const DEFAULT_DATA_PATH: &str = "skill_half_life_ai.csv";
pub const DATA_PATH_ENV: &str = "SKILL_HALFLIFE_DATA";
/// Selection value meaning "no filter" for `--sector` / `--category`.
pub const WILDCARD: &str = "All";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Which column a command-line filter applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterTarget {
    /// `Sector`, else `Industry`, whichever the dataset has.
    Sector,
    Column(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterArg {
    pub target: FilterTarget,
    pub value: String,
    /// Whether [`WILDCARD`] means "no filter" for this argument.
    pub wildcard: bool,
}

/// Configuration for one run of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub filters: Vec<FilterArg>,
    pub format: OutputFormat,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            filters: Vec::new(),
            format: OutputFormat::Text,
        }
    }
}

pub fn command() -> Command {
    Command::new("skill-halflife")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Skill half-life dataset: derived metrics, filters and KPIs")
        .arg(
            Arg::new("data")
                .long("data")
                .env(DATA_PATH_ENV)
                .default_value(DEFAULT_DATA_PATH)
                .value_parser(value_parser!(PathBuf))
                .help("Dataset file (.csv, .json or .parquet)"),
        )
        .arg(
            Arg::new("sector")
                .long("sector")
                .help("Keep one sector (Sector, else Industry column); 'All' for no filter"),
        )
        .arg(
            Arg::new("category")
                .long("category")
                .help("Keep one Skill_Category; 'All' for no filter"),
        )
        .arg(
            Arg::new("filter")
                .long("filter")
                .action(ArgAction::Append)
                .value_parser(parse_column_value)
                .value_name("COLUMN=VALUE")
                .help("Keep rows whose COLUMN equals VALUE exactly (repeatable)"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Report format"),
        )
}

fn parse_column_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected COLUMN=VALUE, got '{s}'")),
    }
}

impl DashboardConfig {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let mut filters = Vec::new();
        if let Some(value) = matches.get_one::<String>("sector") {
            filters.push(FilterArg {
                target: FilterTarget::Sector,
                value: value.clone(),
                wildcard: true,
            });
        }
        if let Some(value) = matches.get_one::<String>("category") {
            filters.push(FilterArg {
                target: FilterTarget::Column(names::SKILL_CATEGORY.to_string()),
                value: value.clone(),
                wildcard: true,
            });
        }
        if let Some(pairs) = matches.get_many::<(String, String)>("filter") {
            filters.extend(pairs.map(|(column, value)| FilterArg {
                target: FilterTarget::Column(column.clone()),
                value: value.clone(),
                wildcard: false,
            }));
        }

        let format = match matches.get_one::<String>("format").map(String::as_str) {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Text,
        };

        DashboardConfig {
            data_path: matches
                .get_one::<PathBuf>("data")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            filters,
            format,
        }
    }

    /// Parse an argument list (first item is the program name).
    pub fn try_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = command().try_get_matches_from(args)?;
        Ok(Self::from_matches(&matches))
    }

    /// Resolve the filter arguments against a loaded dataset.
    ///
    /// Values are read with the target column's type, so `Year=2023`
    /// matches an integer column. A sector filter on a dataset without a
    /// sector column is dropped.
    pub fn selections(&self, dataset: &Dataset) -> Selections {
        let mut selections = Selections::new();
        for arg in &self.filters {
            let column = match &arg.target {
                FilterTarget::Sector => match dataset.sector_column() {
                    Some(c) => c.to_string(),
                    None => {
                        log::debug!("dataset has no sector column; ignoring --sector");
                        continue;
                    }
                },
                FilterTarget::Column(c) => c.clone(),
            };

            let selection = if arg.wildcard && arg.value == WILDCARD {
                Selection::All
            } else {
                let value = match dataset.schema().get(&column) {
                    Some(def) => def.kind.parse(&arg.value),
                    None => Value::Category(arg.value.clone()),
                };
                Selection::Only(value)
            };
            selections.insert(column, selection);
        }
        selections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv;

    fn config(args: &[&str]) -> DashboardConfig {
        let mut argv = vec!["skill-halflife"];
        argv.extend_from_slice(args);
        DashboardConfig::try_from_args(argv).unwrap()
    }

    #[test]
    fn parses_filters_and_format() {
        let cfg = config(&[
            "--data",
            "skills.csv",
            "--sector",
            "Tech",
            "--filter",
            "Year=2023",
            "--filter",
            "Region=EU=West",
            "--format",
            "json",
        ]);
        assert_eq!(cfg.data_path, PathBuf::from("skills.csv"));
        assert_eq!(cfg.format, OutputFormat::Json);
        assert_eq!(cfg.filters.len(), 3);
        assert_eq!(cfg.filters[0].target, FilterTarget::Sector);
        assert_eq!(cfg.filters[2].value, "EU=West");
    }

    #[test]
    fn rejects_filter_without_column() {
        let err = DashboardConfig::try_from_args(["skill-halflife", "--filter", "=x"]);
        assert!(err.is_err());
        let err = DashboardConfig::try_from_args(["skill-halflife", "--format", "xml"]);
        assert!(err.is_err());
    }

    #[test]
    fn selections_use_column_types() {
        let ds = parse_csv("Industry,Skill_Category,Year\nTech,Data,2023\n".as_bytes()).unwrap();
        let cfg = config(&[
            "--sector",
            "Tech",
            "--category",
            "All",
            "--filter",
            "Year=2023",
            "--filter",
            "Region=EU",
        ]);
        let selections = cfg.selections(&ds);

        assert_eq!(selections["Industry"], Selection::only("Tech"));
        assert_eq!(selections["Skill_Category"], Selection::All);
        assert_eq!(selections["Year"], Selection::Only(Value::Integer(2023)));
        assert_eq!(selections["Region"], Selection::only("EU"));
    }

    #[test]
    fn sector_filter_without_sector_column_is_dropped() {
        let ds = parse_csv("Skill_Category\nData\n".as_bytes()).unwrap();
        let cfg = config(&["--sector", "Tech"]);
        assert!(cfg.selections(&ds).is_empty());
    }

    #[test]
    fn wildcard_only_applies_to_dimension_flags() {
        let ds = parse_csv("Skill_Category\nAll\n".as_bytes()).unwrap();
        let cfg = config(&["--filter", "Skill_Category=All"]);
        assert_eq!(cfg.selections(&ds)["Skill_Category"], Selection::only("All"));
    }
}
