//! # worldlife
//!
//! Cleaning and reporting over the WHO life expectancy dataset: one row per
//! country and year with mortality, GDP, schooling and immunization indicators.
//!
//! The pipeline runs in three stages over an owned [`Table`]:
//!
//! 1. [`eda::Explorer`] summarises the raw data (year range, missing values,
//!    per-country averages).
//! 2. [`clean::Cleaner`] audits negative values, fills or drops missing life
//!    expectancy, removes duplicate country-years, backfills Status and
//!    interpolates gaps between adjacent years.
//! 3. [`eda_statistics::Aggregator`] builds the reporting views (composite
//!    ranking, trends, growth).
//!
//! ```no_run
//! use worldlife::{load_table, Cleaner, PipelineConfig, Report};
//!
//! # fn main() -> worldlife::Result<()> {
//! let config = PipelineConfig::load(None)?;
//! let mut table = load_table("data/worldlifexpectancy.csv")?;
//! let cleaning = Cleaner::new(&config).run(&mut table);
//! println!("{} duplicates removed", cleaning.duplicates_removed);
//! println!("{}", Report::build(&table, &config));
//! # Ok(())
//! # }
//! ```

pub mod clean;
pub mod config;
pub mod eda;
pub mod eda_statistics;
pub mod error;
pub mod load_clean;
pub mod logging;
pub mod models;
pub mod report;
pub mod stats;
pub mod year_eda;

pub use clean::{CleaningReport, Cleaner};
pub use config::{MissingValuePolicy, NegativeValuePolicy, PipelineConfig};
pub use eda::Explorer;
pub use eda_statistics::{Aggregator, ChangeDirection};
pub use error::{PipelineError, Result};
pub use load_clean::{load_table, read_table, save_table, write_table};
pub use models::{Field, LifeExpectancyRecord, Status, Table};
pub use report::Report;
