//! Country-level reporting views.
//!
//! Averages follow SQL semantics: missing values are skipped, an average with no
//! inputs is `None`, arithmetic on a `None` stays `None`, and `None` sorts last.
//! Reported numbers are rounded to one decimal; anything derived from them is
//! computed from the unrounded values first.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use ndarray::Array1;
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::config::CompositeWeights;
use crate::models::{LifeExpectancyRecord, Table};
use crate::stats::{mean_of, pearson, round1};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeScore {
    pub country: String,
    pub avg_life_expectancy: Option<f64>,
    pub avg_gdp: Option<f64>,
    pub avg_schooling: Option<f64>,
    pub immunization_rate: Option<f64>,
    pub composite_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearCountryAverage {
    pub year: i32,
    pub country: String,
    pub avg_life_expectancy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenditureRow {
    pub country: String,
    pub avg_expenditure: Option<f64>,
    pub avg_life_expectancy: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDirection {
    Improvement,
    Decline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifeExpectancyChange {
    pub country: String,
    pub change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetChange {
    pub country: String,
    pub first_year: i32,
    pub last_year: i32,
    pub change: f64,
}

fn descending(value: Option<f64>) -> Reverse<Option<OrderedFloat<f64>>> {
    Reverse(value.map(OrderedFloat))
}

/// Sort key that puts `None` after every value in ascending order.
fn ascending_none_last(value: Option<f64>) -> (bool, Option<OrderedFloat<f64>>) {
    (value.is_none(), value.map(OrderedFloat))
}

pub struct Aggregator<'a> {
    pub(crate) table: &'a Table,
    weights: CompositeWeights,
}

impl<'a> Aggregator<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self::with_weights(table, CompositeWeights::default())
    }

    pub fn with_weights(table: &'a Table, weights: CompositeWeights) -> Self {
        Self { table, weights }
    }

    /// Rows of each country, countries in name order.
    fn countries(&self) -> Vec<(&'a str, Vec<&'a LifeExpectancyRecord>)> {
        let records = self.table.records();
        self.table
            .country_index()
            .into_iter()
            .map(|(country, positions)| {
                (country, positions.iter().map(|&pos| &records[pos]).collect())
            })
            .collect()
    }

    /// Countries ranked by the weighted blend of life expectancy, GDP, schooling
    /// and immunization averages.
    pub fn composite_ranking(&self) -> Vec<CompositeScore> {
        let w = self.weights;
        let mut ranking: Vec<CompositeScore> = self
            .countries()
            .into_iter()
            .map(|(country, rows)| {
                let le = mean_of(rows.iter().map(|r| r.life_expectancy));
                let gdp = mean_of(rows.iter().map(|r| r.gdp));
                let schooling = mean_of(rows.iter().map(|r| r.schooling));
                let immunization = mean_of(rows.iter().map(|r| r.immunization_rate()));
                let score = (|| {
                    Some(
                        w.life_expectancy * le?
                            + w.gdp * gdp?
                            + w.schooling * schooling?
                            + w.immunization * immunization?,
                    )
                })();
                CompositeScore {
                    country: country.to_owned(),
                    avg_life_expectancy: le.map(round1),
                    avg_gdp: gdp.map(round1),
                    avg_schooling: schooling.map(round1),
                    immunization_rate: immunization.map(round1),
                    composite_score: score.map(round1),
                }
            })
            .collect();
        ranking.sort_by_key(|c| descending(c.composite_score));
        ranking
    }

    /// Average life expectancy per (year, country), ordered by year and then by
    /// average, cut to `n` rows overall.
    pub fn top_n_by_year(&self, n: usize) -> Vec<YearCountryAverage> {
        let mut groups: BTreeMap<(i32, &str), Vec<Option<f64>>> = BTreeMap::new();
        for record in self.table.records() {
            groups
                .entry((record.year, record.country.as_str()))
                .or_default()
                .push(record.life_expectancy);
        }

        let mut rows: Vec<YearCountryAverage> = groups
            .into_iter()
            .map(|((year, country), values)| YearCountryAverage {
                year,
                country: country.to_owned(),
                avg_life_expectancy: mean_of(values).map(round1),
            })
            .collect();
        rows.sort_by_key(|r| (r.year, descending(r.avg_life_expectancy)));
        rows.truncate(n);
        rows
    }

    /// Average health expenditure next to average life expectancy, highest
    /// expenditure first.
    pub fn expenditure_correlation(&self) -> Vec<ExpenditureRow> {
        let mut rows: Vec<ExpenditureRow> = self
            .expenditure_pairs()
            .into_iter()
            .map(|(country, expenditure, le)| ExpenditureRow {
                country: country.to_owned(),
                avg_expenditure: expenditure.map(round1),
                avg_life_expectancy: le.map(round1),
            })
            .collect();
        rows.sort_by_key(|r| descending(r.avg_expenditure));
        rows
    }

    /// Pearson coefficient between the per-country expenditure and life
    /// expectancy averages, over countries that have both.
    pub fn expenditure_correlation_coefficient(&self) -> Option<f64> {
        let (x, y): (Vec<f64>, Vec<f64>) = self
            .expenditure_pairs()
            .into_iter()
            .filter_map(|(_, expenditure, le)| Some((expenditure?, le?)))
            .unzip();
        let x = Array1::from_vec(x);
        let y = Array1::from_vec(y);
        pearson(&x.view(), &y.view())
    }

    fn expenditure_pairs(&self) -> Vec<(&'a str, Option<f64>, Option<f64>)> {
        self.countries()
            .into_iter()
            .map(|(country, rows)| {
                (
                    country,
                    mean_of(rows.iter().map(|r| r.percentage_expenditure)),
                    mean_of(rows.iter().map(|r| r.life_expectancy)),
                )
            })
            .collect()
    }

    /// Spread between the highest and lowest life expectancy of each country.
    ///
    /// The spread is never negative, so the `Decline` view (spread below zero) is
    /// always empty. It cannot tell a rise from a fall; see [`Aggregator::net_change`]
    /// for a direction-aware measure.
    pub fn largest_change(&self, direction: ChangeDirection) -> Vec<LifeExpectancyChange> {
        let mut rows: Vec<LifeExpectancyChange> = self
            .countries()
            .into_iter()
            .map(|(country, rows)| {
                let values: Vec<f64> = rows.iter().filter_map(|r| r.life_expectancy).collect();
                let max = values.iter().copied().map(OrderedFloat).max();
                let min = values.iter().copied().map(OrderedFloat).min();
                let change = max.zip(min).map(|(max, min)| round1(max.0 - min.0));
                LifeExpectancyChange {
                    country: country.to_owned(),
                    change,
                }
            })
            .collect();

        match direction {
            ChangeDirection::Improvement => rows.sort_by_key(|r| descending(r.change)),
            ChangeDirection::Decline => {
                rows.retain(|r| r.change.is_some_and(|c| c < 0.0));
                rows.sort_by_key(|r| ascending_none_last(r.change));
            }
        }
        rows
    }

    /// Life expectancy in each country's last reported year minus its first,
    /// biggest declines first.
    pub fn net_change(&self) -> Vec<NetChange> {
        let mut rows: Vec<NetChange> = self
            .countries()
            .into_iter()
            .filter_map(|(country, rows)| {
                let known: Vec<(i32, u64, f64)> = rows
                    .iter()
                    .filter_map(|r| Some((r.year, r.row_id, r.life_expectancy?)))
                    .collect();
                let first = known.iter().min_by_key(|(year, id, _)| (*year, *id))?;
                let last = known.iter().max_by_key(|(year, id, _)| (*year, Reverse(*id)))?;
                Some(NetChange {
                    country: country.to_owned(),
                    first_year: first.0,
                    last_year: last.0,
                    change: round1(last.2 - first.2),
                })
            })
            .collect();
        rows.sort_by_key(|r| OrderedFloat(r.change));
        rows
    }
}
