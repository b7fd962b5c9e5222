//! Row-level cleaning.
//!
//! Type coercion and the header rename happen while loading (see `load_clean`).
//! Everything here works on an already typed [`Table`] and runs in a fixed order:
//! negative-value audit, mean imputation or deletion of incomplete rows, duplicate
//! removal, Status backfill, adjacent-year interpolation. Every step is a set
//! update that is a no-op when nothing matches, so running the cleaner twice
//! changes nothing the second time.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{MissingValuePolicy, NegativeValuePolicy, PipelineConfig};
use crate::models::{Field, LifeExpectancyRecord, Status, Table};
use crate::stats::{mean_of, round1};

/// A row holding at least one negative value in an audited column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NegativeFinding {
    pub row_id: u64,
    pub country: String,
    pub year: i32,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub negative_values: Vec<NegativeFinding>,
    pub negatives_cleared: usize,
    pub imputed: usize,
    pub dropped: usize,
    pub duplicates_removed: usize,
    pub statuses_filled: usize,
    pub interpolated: usize,
}

impl CleaningReport {
    /// Number of values or rows the run changed.
    pub fn changes(&self) -> usize {
        self.negatives_cleared
            + self.imputed
            + self.dropped
            + self.duplicates_removed
            + self.statuses_filled
            + self.interpolated
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Cleaner {
    missing_values: MissingValuePolicy,
    negative_values: NegativeValuePolicy,
}

impl Cleaner {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            missing_values: config.missing_values,
            negative_values: config.negative_values,
        }
    }

    pub fn with_policies(missing_values: MissingValuePolicy, negative_values: NegativeValuePolicy) -> Self {
        Self {
            missing_values,
            negative_values,
        }
    }

    pub fn run(&self, table: &mut Table) -> CleaningReport {
        let mut report = CleaningReport {
            negative_values: negative_values(table),
            ..Default::default()
        };
        if !report.negative_values.is_empty() {
            warn!(rows = report.negative_values.len(), "rows with negative values");
        }
        if self.negative_values == NegativeValuePolicy::Nullify {
            report.negatives_cleared = nullify_negative_values(table);
        }

        match self.missing_values {
            MissingValuePolicy::ImputeMean => report.imputed = impute_life_expectancy_mean(table),
            MissingValuePolicy::DropIncomplete => report.dropped = drop_incomplete_rows(table),
            MissingValuePolicy::InterpolateOnly => {}
        }

        report.duplicates_removed = remove_duplicates(table);
        report.statuses_filled = backfill_status(table);
        report.interpolated = interpolate_life_expectancy(table);

        info!(
            rows = table.len(),
            changes = report.changes(),
            policy = ?self.missing_values,
            "cleaning finished"
        );
        report
    }
}

/// Rows where life expectancy, adult mortality, infant deaths or under-five
/// deaths is below zero. Detection only.
pub fn negative_values(table: &Table) -> Vec<NegativeFinding> {
    table
        .records()
        .iter()
        .filter_map(|record| {
            let fields: Vec<Field> = Field::NON_NEGATIVE
                .into_iter()
                .filter(|&field| record.value(field).is_some_and(|v| v < 0.0))
                .collect();
            (!fields.is_empty()).then(|| NegativeFinding {
                row_id: record.row_id,
                country: record.country.clone(),
                year: record.year,
                fields,
            })
        })
        .collect()
}

/// Clears every negative value in the audited columns. Returns the number of
/// values cleared.
pub fn nullify_negative_values(table: &mut Table) -> usize {
    let mut cleared = 0;
    for record in table.records_mut() {
        for field in Field::NON_NEGATIVE {
            if record.value(field).is_some_and(|v| v < 0.0) {
                record.clear(field);
                cleared += 1;
            }
        }
    }
    if cleared > 0 {
        info!(cleared, "cleared negative values");
    }
    cleared
}

/// Fills missing life expectancy with the mean of the known values. The mean is
/// taken once before any row changes, so every filled row gets the same value.
pub fn impute_life_expectancy_mean(table: &mut Table) -> usize {
    let Some(mean) = mean_of(table.records().iter().map(|r| r.life_expectancy)) else {
        return 0;
    };

    let mut imputed = 0;
    for record in table.records_mut() {
        if record.life_expectancy.is_none() {
            record.life_expectancy = Some(mean);
            imputed += 1;
        }
    }
    if imputed > 0 {
        info!(imputed, mean, "imputed missing life expectancy");
    }
    imputed
}

/// Deletes rows missing life expectancy or GDP.
pub fn drop_incomplete_rows(table: &mut Table) -> usize {
    let dropped = table.retain(|r| r.life_expectancy.is_some() && r.gdp.is_some());
    if dropped > 0 {
        info!(dropped, "deleted rows missing life expectancy or GDP");
    }
    dropped
}

/// Keeps one row per (Country, Year): the one with the lowest row id.
pub fn remove_duplicates(table: &mut Table) -> usize {
    let duplicates: HashSet<u64> = {
        let records = table.records();
        table
            .key_index()
            .into_values()
            .filter(|positions| positions.len() > 1)
            .flat_map(|positions| {
                positions
                    .into_iter()
                    .map(|pos| records[pos].row_id)
                    .sorted()
                    .skip(1)
            })
            .collect()
    };
    if duplicates.is_empty() {
        return 0;
    }

    let removed = table.retain(|r| !duplicates.contains(&r.row_id));
    info!(removed, "removed duplicate country-year rows");
    removed
}

/// Sets the Status of every row with an empty Status to the Status known for its
/// country. Rows that already carry a Status are left alone.
pub fn backfill_status(table: &mut Table) -> usize {
    let resolved: HashMap<String, Status> = {
        let records = table.records();
        table
            .country_index()
            .into_iter()
            .filter_map(|(country, positions)| {
                let rows: Vec<&LifeExpectancyRecord> =
                    positions.iter().map(|&pos| &records[pos]).collect();
                resolve_status(country, &rows).map(|status| (country.to_owned(), status))
            })
            .collect()
    };

    let mut filled = 0;
    for record in table.records_mut() {
        if record.status.is_known() {
            continue;
        }
        if let Some(&status) = resolved.get(&record.country) {
            record.status = status;
            filled += 1;
        }
    }
    if filled > 0 {
        info!(filled, "backfilled missing status");
    }
    filled
}

/// The Status a country's empty rows should receive. When both labels appear the
/// more frequent one wins; on a tie the label of the earliest year wins.
fn resolve_status(country: &str, rows: &[&LifeExpectancyRecord]) -> Option<Status> {
    let known: Vec<&LifeExpectancyRecord> = rows
        .iter()
        .copied()
        .filter(|r| r.status.is_known())
        .collect();
    let earliest = known.iter().min_by_key(|r| (r.year, r.row_id))?.status;

    let counts = known.iter().counts_by(|r| r.status);
    if counts.len() == 1 {
        return Some(earliest);
    }

    let developing = counts.get(&Status::Developing).copied().unwrap_or(0);
    let developed = counts.get(&Status::Developed).copied().unwrap_or(0);
    let chosen = match developing.cmp(&developed) {
        std::cmp::Ordering::Greater => Status::Developing,
        std::cmp::Ordering::Less => Status::Developed,
        std::cmp::Ordering::Equal => earliest,
    };
    warn!(country, developing, developed, chosen = %chosen, "conflicting status values");
    Some(chosen)
}

/// Fills a missing life expectancy with the mean of the previous and next year,
/// rounded to one decimal, when both are known. Neighbours are read from the
/// table as it was before this step, so filled values never chain.
pub fn interpolate_life_expectancy(table: &mut Table) -> usize {
    let updates: Vec<(usize, f64)> = {
        let known: HashMap<(&str, i32), f64> = table
            .records()
            .iter()
            .filter_map(|r| Some(((r.country.as_str(), r.year), r.life_expectancy?)))
            .collect();

        table
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.life_expectancy.is_none())
            .filter_map(|(pos, r)| {
                let prev = known.get(&(r.country.as_str(), r.year.checked_sub(1)?))?;
                let next = known.get(&(r.country.as_str(), r.year.checked_add(1)?))?;
                Some((pos, round1((prev + next) / 2.0)))
            })
            .collect()
    };

    let records = table.records_mut();
    for &(pos, value) in &updates {
        debug!(country = %records[pos].country, year = records[pos].year, value, "interpolated");
        records[pos].life_expectancy = Some(value);
    }
    if !updates.is_empty() {
        info!(interpolated = updates.len(), "interpolated life expectancy from adjacent years");
    }
    updates.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(country: &str, year: i32, le: Option<f64>) -> LifeExpectancyRecord {
        LifeExpectancyRecord {
            life_expectancy: le,
            gdp: Some(100.0),
            ..LifeExpectancyRecord::new(country, year)
        }
    }

    fn with_status(mut record: LifeExpectancyRecord, status: Status) -> LifeExpectancyRecord {
        record.status = status;
        record
    }

    #[test]
    fn interpolates_between_adjacent_years() {
        let mut table = Table::from_records(vec![
            row("United States", 2000, Some(70.0)),
            row("United States", 2001, None),
            row("United States", 2002, Some(74.0)),
        ]);

        assert_eq!(interpolate_life_expectancy(&mut table), 1);
        assert_eq!(table.records()[1].life_expectancy, Some(72.0));
    }

    #[test]
    fn interpolation_needs_both_neighbours_and_does_not_chain() {
        let mut table = Table::from_records(vec![
            row("Peru", 2000, Some(70.0)),
            row("Peru", 2001, None),
            row("Peru", 2002, None),
            row("Peru", 2003, Some(73.0)),
            row("Chile", 2005, None),
            row("Chile", 2006, Some(75.0)),
        ]);

        assert_eq!(interpolate_life_expectancy(&mut table), 0);
        assert!(table.records().iter().filter(|r| r.life_expectancy.is_none()).count() == 3);
    }

    #[test]
    fn interpolated_value_is_rounded_to_one_decimal() {
        let mut table = Table::from_records(vec![
            row("Chad", 2010, Some(50.0)),
            row("Chad", 2011, None),
            row("Chad", 2012, Some(50.5)),
        ]);
        interpolate_life_expectancy(&mut table);
        assert_eq!(table.records()[1].life_expectancy, Some(50.3));
    }

    #[test]
    fn mean_imputation_uses_the_pre_update_mean() {
        let mut table = Table::from_records(vec![
            row("Chad", 2010, Some(50.0)),
            row("Chad", 2011, None),
            row("Peru", 2010, Some(70.0)),
            row("Peru", 2011, None),
        ]);

        assert_eq!(impute_life_expectancy_mean(&mut table), 2);
        assert_eq!(table.records()[1].life_expectancy, Some(60.0));
        assert_eq!(table.records()[3].life_expectancy, Some(60.0));
    }

    #[test]
    fn mean_imputation_without_known_values_is_a_noop() {
        let mut table = Table::from_records(vec![row("Chad", 2010, None)]);
        assert_eq!(impute_life_expectancy_mean(&mut table), 0);
        assert_eq!(table.records()[0].life_expectancy, None);
    }

    #[test]
    fn drop_incomplete_removes_rows_missing_le_or_gdp() {
        let mut no_gdp = row("Peru", 2010, Some(70.0));
        no_gdp.gdp = None;
        let mut table = Table::from_records(vec![
            row("Chad", 2010, Some(50.0)),
            row("Chad", 2011, None),
            no_gdp,
        ]);

        assert_eq!(drop_incomplete_rows(&mut table), 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].country, "Chad");
    }

    #[test]
    fn duplicates_keep_the_lowest_row_id() {
        let mut table = Table::from_records(vec![
            row("Chad", 2010, Some(50.0)),
            row("Chad", 2010, Some(51.0)),
            row("Peru", 2010, Some(70.0)),
            row("Chad", 2010, Some(52.0)),
        ]);

        assert_eq!(remove_duplicates(&mut table), 2);
        let ids: Vec<u64> = table.records().iter().map(|r| r.row_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(table.records()[0].life_expectancy, Some(50.0));
        assert!(table.key_index().values().all(|positions| positions.len() == 1));
    }

    #[test]
    fn backfill_copies_the_known_status() {
        let mut table = Table::from_records(vec![
            with_status(row("Chad", 2010, None), Status::Developing),
            row("Chad", 2011, None),
            row("Peru", 2011, None),
        ]);

        assert_eq!(backfill_status(&mut table), 1);
        assert_eq!(table.records()[1].status, Status::Developing);
        assert_eq!(table.records()[2].status, Status::Unknown);
    }

    #[test]
    fn backfill_conflicts_resolve_by_majority_then_earliest_year() {
        let mut table = Table::from_records(vec![
            with_status(row("Chile", 2000, None), Status::Developed),
            with_status(row("Chile", 2001, None), Status::Developing),
            with_status(row("Chile", 2002, None), Status::Developing),
            row("Chile", 2003, None),
            with_status(row("Greece", 2001, None), Status::Developing),
            with_status(row("Greece", 2000, None), Status::Developed),
            row("Greece", 2002, None),
        ]);

        assert_eq!(backfill_status(&mut table), 2);
        assert_eq!(table.records()[3].status, Status::Developing);
        assert_eq!(table.records()[6].status, Status::Developed);
        // known values are never rewritten
        assert_eq!(table.records()[0].status, Status::Developed);
    }

    #[test]
    fn negative_audit_lists_offending_fields() {
        let mut bad = row("Chad", 2010, Some(50.0));
        bad.adult_mortality = Some(-3);
        bad.under_five_deaths = Some(-1);
        let mut table = Table::from_records(vec![row("Peru", 2010, Some(70.0)), bad]);

        let findings = negative_values(&table);
        assert_eq!(
            findings,
            vec![NegativeFinding {
                row_id: 2,
                country: "Chad".to_owned(),
                year: 2010,
                fields: vec![Field::AdultMortality, Field::UnderFiveDeaths],
            }]
        );
        // detection alone changes nothing
        assert_eq!(table.records()[1].adult_mortality, Some(-3));

        assert_eq!(nullify_negative_values(&mut table), 2);
        assert!(negative_values(&table).is_empty());
    }

    #[test]
    fn full_run_is_idempotent() {
        let mut table = Table::from_records(vec![
            with_status(row("Chad", 2010, Some(50.0)), Status::Developing),
            row("Chad", 2011, None),
            row("Chad", 2012, Some(52.0)),
            row("Chad", 2012, Some(53.0)),
            row("Peru", 2010, None),
        ]);
        let cleaner = Cleaner::with_policies(MissingValuePolicy::InterpolateOnly, NegativeValuePolicy::Report);

        let first = cleaner.run(&mut table);
        assert_eq!(first.duplicates_removed, 1);
        assert_eq!(first.statuses_filled, 2);
        assert_eq!(first.interpolated, 1);
        let after_first = table.clone();

        let second = cleaner.run(&mut table);
        assert_eq!(second.changes(), 0);
        assert_eq!(table, after_first);
    }

    #[test]
    fn drop_policy_does_not_impute() {
        let mut table = Table::from_records(vec![row("Chad", 2010, Some(50.0)), row("Chad", 2011, None)]);
        let report = Cleaner::with_policies(MissingValuePolicy::DropIncomplete, NegativeValuePolicy::Report)
            .run(&mut table);

        assert_eq!(report.dropped, 1);
        assert_eq!(report.imputed, 0);
        assert_eq!(table.len(), 1);
    }
}
