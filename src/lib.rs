pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod state;
pub mod summary;

pub use data::filter::{Selection, Selections, View, filter};
pub use data::loader::load_file;
pub use data::model::{Dataset, Record, Value};
pub use error::{DatasetError, ParseError};
pub use state::Session;
