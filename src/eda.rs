//! Read-only exploration of a loaded table.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::Serialize;
use statrs::statistics::{Data, Distribution, Max, Median, Min};

use crate::error::{PipelineError, Result};
use crate::models::{Field, Table};
use crate::stats::mean_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetBounds {
    pub min_year: i32,
    pub max_year: i32,
    pub country_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryAverage {
    pub country: String,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub field: Field,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

pub struct Explorer<'a> {
    table: &'a Table,
}

impl<'a> Explorer<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self { table }
    }

    /// First year, last year and number of distinct countries.
    pub fn dataset_bounds(&self) -> Option<DatasetBounds> {
        let records = self.table.records();
        let min_year = records.iter().map(|r| r.year).min()?;
        let max_year = records.iter().map(|r| r.year).max()?;
        Some(DatasetBounds {
            min_year,
            max_year,
            country_count: self.table.country_index().len(),
        })
    }

    pub fn null_counts(&self, fields: &[Field]) -> BTreeMap<Field, usize> {
        fields
            .iter()
            .map(|&field| {
                let missing = self
                    .table
                    .records()
                    .iter()
                    .filter(|r| r.is_missing(field))
                    .count();
                (field, missing)
            })
            .collect()
    }

    /// Same as [`Explorer::null_counts`] for field names given as text.
    pub fn null_counts_by_name<S: AsRef<str>>(&self, names: &[S]) -> Result<BTreeMap<Field, usize>> {
        let fields = names
            .iter()
            .map(|name| name.as_ref().parse::<Field>())
            .collect::<Result<Vec<_>>>()?;
        Ok(self.null_counts(&fields))
    }

    /// Mean of `field` per country, highest first. Countries without any value
    /// for the field come last.
    pub fn per_country_average(&self, field: Field) -> Result<Vec<CountryAverage>> {
        if !field.is_numeric() {
            return Err(PipelineError::NonNumericField(field));
        }
        let records = self.table.records();
        let mut averages: Vec<CountryAverage> = self
            .table
            .country_index()
            .into_iter()
            .map(|(country, positions)| CountryAverage {
                country: country.to_owned(),
                average: mean_of(positions.iter().map(|&pos| records[pos].value(field))),
            })
            .collect();
        // country_index is already sorted by name, and the sort is stable
        averages.sort_by_key(|a| std::cmp::Reverse(a.average.map(OrderedFloat)));
        Ok(averages)
    }

    /// Count, mean, median, standard deviation and range of a numeric field.
    pub fn describe(&self, field: Field) -> Result<Option<FieldSummary>> {
        if !field.is_numeric() {
            return Err(PipelineError::NonNumericField(field));
        }
        let values: Vec<f64> = self
            .table
            .records()
            .iter()
            .filter_map(|r| r.value(field))
            .collect();
        if values.is_empty() {
            return Ok(None);
        }

        let count = values.len();
        let data = Data::new(values);
        Ok(Some(FieldSummary {
            field,
            count,
            mean: data.mean().unwrap_or(f64::NAN),
            median: data.median(),
            std_dev: data.std_dev(),
            min: data.min(),
            max: data.max(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LifeExpectancyRecord, Status};

    fn sample() -> Table {
        let mut records = Vec::new();
        for (country, year, le, status) in [
            ("Chad", 2000, Some(50.0), Status::Developing),
            ("Chad", 2001, Some(52.0), Status::Unknown),
            ("Peru", 2001, Some(70.0), Status::Developing),
            ("Peru", 2003, None, Status::Developing),
            ("Niue", 2002, None, Status::Unknown),
        ] {
            let mut record = LifeExpectancyRecord::new(country, year);
            record.life_expectancy = le;
            record.status = status;
            records.push(record);
        }
        Table::from_records(records)
    }

    #[test]
    fn bounds_cover_years_and_countries() {
        let table = sample();
        let bounds = Explorer::new(&table).dataset_bounds().unwrap();
        assert_eq!(
            bounds,
            DatasetBounds {
                min_year: 2000,
                max_year: 2003,
                country_count: 3
            }
        );
        assert_eq!(Explorer::new(&Table::default()).dataset_bounds(), None);
    }

    #[test]
    fn null_counts_treat_unknown_status_as_missing() {
        let table = sample();
        let counts = Explorer::new(&table).null_counts(&[Field::LifeExpectancy, Field::Status, Field::Country]);
        assert_eq!(counts[&Field::LifeExpectancy], 2);
        assert_eq!(counts[&Field::Status], 2);
        assert_eq!(counts[&Field::Country], 0);
    }

    #[test]
    fn null_counts_reject_unknown_names() {
        let table = sample();
        let err = Explorer::new(&table)
            .null_counts_by_name(&["Lifeexpectancy", "Happiness"])
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownField(name) if name == "Happiness"));
    }

    #[test]
    fn per_country_average_sorts_descending_with_empty_last() {
        let table = sample();
        let averages = Explorer::new(&table)
            .per_country_average(Field::LifeExpectancy)
            .unwrap();
        let listed: Vec<(&str, Option<f64>)> = averages
            .iter()
            .map(|a| (a.country.as_str(), a.average))
            .collect();
        assert_eq!(listed, vec![("Peru", Some(70.0)), ("Chad", Some(51.0)), ("Niue", None)]);

        assert!(matches!(
            Explorer::new(&table).per_country_average(Field::Status),
            Err(PipelineError::NonNumericField(Field::Status))
        ));
    }

    #[test]
    fn describe_summarises_present_values() {
        let table = sample();
        let summary = Explorer::new(&table)
            .describe(Field::LifeExpectancy)
            .unwrap()
            .unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.median, 52.0);
        assert_eq!(summary.min, 50.0);
        assert_eq!(summary.max, 70.0);
        assert!((summary.mean - 57.333).abs() < 1e-3);
    }
}
