//! Year-level views: the global trend and year-over-year growth.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::eda_statistics::Aggregator;
use crate::stats::{mean, mean_of, round1};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearAverage {
    pub year: i32,
    pub avg_life_expectancy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyGrowth {
    pub year: i32,
    pub avg_life_expectancy: Option<f64>,
    /// Change from the previous year present in the data. `None` for the first.
    pub growth: Option<f64>,
}

impl Aggregator<'_> {
    /// Unrounded global average per year, ascending.
    fn year_averages(&self) -> Vec<(i32, Option<f64>)> {
        let mut years: BTreeMap<i32, Vec<Option<f64>>> = BTreeMap::new();
        for record in self.table.records() {
            years.entry(record.year).or_default().push(record.life_expectancy);
        }
        years
            .into_iter()
            .map(|(year, values)| (year, mean_of(values)))
            .collect()
    }

    pub fn global_trend(&self) -> Vec<YearAverage> {
        self.year_averages()
            .into_iter()
            .map(|(year, avg)| YearAverage {
                year,
                avg_life_expectancy: avg.map(round1),
            })
            .collect()
    }

    /// Each year's global average minus the previous present year's. Gaps in the
    /// year sequence are bridged, not filled.
    pub fn yearly_growth(&self) -> Vec<YearlyGrowth> {
        let mut previous: Option<f64> = None;
        self.year_averages()
            .into_iter()
            .map(|(year, avg)| {
                let growth = avg.zip(previous).map(|(current, prev)| current - prev);
                previous = avg;
                YearlyGrowth {
                    year,
                    avg_life_expectancy: avg.map(round1),
                    growth: growth.map(round1),
                }
            })
            .collect()
    }

    /// Mean of the yearly growth values as a percentage string (`value × 100`,
    /// two decimals, `%` suffix).
    pub fn overall_average_growth(&self) -> Option<String> {
        let growth: Vec<f64> = self
            .yearly_growth()
            .into_iter()
            .filter_map(|g| g.growth)
            .collect();
        mean(&growth).map(|avg| format!("{:.2}%", avg * 100.0))
    }
}

#[cfg(test)]
mod tests {
    use crate::eda_statistics::Aggregator;
    use crate::models::{LifeExpectancyRecord, Table};

    use super::*;

    fn table(rows: &[(&str, i32, Option<f64>)]) -> Table {
        Table::from_records(
            rows.iter()
                .map(|&(country, year, le)| LifeExpectancyRecord {
                    life_expectancy: le,
                    ..LifeExpectancyRecord::new(country, year)
                })
                .collect(),
        )
    }

    #[test]
    fn global_trend_is_ordered_by_year() {
        let table = table(&[
            ("Peru", 2001, Some(71.0)),
            ("Chad", 2000, Some(50.0)),
            ("Peru", 2000, Some(70.0)),
            ("Chad", 2001, None),
        ]);
        let trend = Aggregator::new(&table).global_trend();
        assert_eq!(
            trend,
            vec![
                YearAverage {
                    year: 2000,
                    avg_life_expectancy: Some(60.0)
                },
                YearAverage {
                    year: 2001,
                    avg_life_expectancy: Some(71.0)
                },
            ]
        );
    }

    #[test]
    fn growth_is_the_delta_to_the_previous_year() {
        let table = table(&[
            ("Chad", 2000, Some(69.0)),
            ("Peru", 2000, Some(71.0)),
            ("Chad", 2001, Some(70.5)),
            ("Peru", 2001, Some(72.5)),
        ]);
        let growth = Aggregator::new(&table).yearly_growth();
        assert_eq!(growth[0].growth, None);
        assert_eq!(growth[1].avg_life_expectancy, Some(71.5));
        assert_eq!(growth[1].growth, Some(1.5));
    }

    #[test]
    fn growth_bridges_missing_years() {
        let table = table(&[
            ("Chad", 2000, Some(60.0)),
            ("Chad", 2003, Some(62.0)),
            ("Chad", 2004, Some(61.0)),
        ]);
        let growth: Vec<(i32, Option<f64>)> = Aggregator::new(&table)
            .yearly_growth()
            .into_iter()
            .map(|g| (g.year, g.growth))
            .collect();
        assert_eq!(growth, vec![(2000, None), (2003, Some(2.0)), (2004, Some(-1.0))]);
    }

    #[test]
    fn overall_growth_is_a_percentage_string() {
        let table = table(&[
            ("Chad", 2000, Some(60.0)),
            ("Chad", 2001, Some(60.5)),
            ("Chad", 2002, Some(61.5)),
        ]);
        // growth 0.5 and 1.0, mean 0.75
        assert_eq!(
            Aggregator::new(&table).overall_average_growth().as_deref(),
            Some("75.00%")
        );
        assert_eq!(Aggregator::new(&Table::default()).overall_average_growth(), None);
    }
}
