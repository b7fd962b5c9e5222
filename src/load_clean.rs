//! CSV loading and saving.
//!
//! Loading is where the schema-level cleaning happens: header names are normalized
//! (`under-fivedeaths` becomes `under_fivedeaths`, the WHO export's spaced names are
//! collapsed) and every numeric cell is coerced. A cell that is not a number fails
//! the whole load, since every later stage assumes numeric columns.

use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::{Field, LifeExpectancyRecord, Status, Table};

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "Year")]
    year: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Lifeexpectancy", default)]
    life_expectancy: String,
    #[serde(rename = "AdultMortality", default)]
    adult_mortality: String,
    #[serde(rename = "infantdeaths", default)]
    infant_deaths: String,
    #[serde(rename = "under_fivedeaths", default)]
    under_five_deaths: String,
    #[serde(rename = "GDP", default)]
    gdp: String,
    #[serde(rename = "percentageexpenditure", default)]
    percentage_expenditure: String,
    #[serde(rename = "Schooling", default)]
    schooling: String,
    #[serde(rename = "Polio", default)]
    polio: String,
    #[serde(rename = "Diphtheria", default)]
    diphtheria: String,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Country")]
    country: &'a str,
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "Lifeexpectancy")]
    life_expectancy: Option<f64>,
    #[serde(rename = "AdultMortality")]
    adult_mortality: Option<i64>,
    #[serde(rename = "infantdeaths")]
    infant_deaths: Option<i64>,
    #[serde(rename = "under_fivedeaths")]
    under_five_deaths: Option<i64>,
    #[serde(rename = "GDP")]
    gdp: Option<f64>,
    #[serde(rename = "percentageexpenditure")]
    percentage_expenditure: Option<f64>,
    #[serde(rename = "Schooling")]
    schooling: Option<f64>,
    #[serde(rename = "Polio")]
    polio: Option<f64>,
    #[serde(rename = "Diphtheria")]
    diphtheria: Option<f64>,
}

impl<'a> From<&'a LifeExpectancyRecord> for CsvRow<'a> {
    fn from(record: &'a LifeExpectancyRecord) -> Self {
        Self {
            country: &record.country,
            year: record.year,
            status: record.status.as_str(),
            life_expectancy: record.life_expectancy,
            adult_mortality: record.adult_mortality,
            infant_deaths: record.infant_deaths,
            under_five_deaths: record.under_five_deaths,
            gdp: record.gdp,
            percentage_expenditure: record.percentage_expenditure,
            schooling: record.schooling,
            polio: record.polio,
            diphtheria: record.diphtheria,
        }
    }
}

/// Maps every recognised header onto its canonical column name. Unrecognised
/// headers are kept as they are and ignored by the loader.
pub fn normalize_headers(headers: &StringRecord) -> StringRecord {
    headers
        .iter()
        .map(|header| match header.parse::<Field>() {
            Ok(field) => {
                let canonical = field.column_name();
                if header != canonical {
                    info!(from = header, to = canonical, "renamed column");
                }
                canonical
            }
            Err(_) => header,
        })
        .collect()
}

pub fn load_table(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let table = read_records(&mut rdr)?;
    info!(path = %path.display(), rows = table.len(), "loaded dataset");
    Ok(table)
}

pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    read_records(&mut rdr)
}

fn read_records<R: Read>(rdr: &mut csv::Reader<R>) -> Result<Table> {
    let headers = normalize_headers(rdr.headers()?);
    for required in [Field::Country, Field::Year] {
        if !headers.iter().any(|h| h == required.column_name()) {
            return Err(PipelineError::MissingColumn(required.column_name()));
        }
    }
    rdr.set_headers(headers);

    let mut records = Vec::new();
    for (i, result) in rdr.deserialize().enumerate() {
        let raw: RawRecord = result?;
        records.push(coerce(raw, i as u64 + 1)?);
    }
    Ok(Table::from_records(records))
}

/// Type coercion for one row. `row` is the 1-based data row used in errors.
fn coerce(raw: RawRecord, row: u64) -> Result<LifeExpectancyRecord> {
    let year = parse_int(&raw.year, row, Field::Year)?.ok_or_else(|| {
        PipelineError::TypeConversion {
            row,
            field: Field::Year,
            value: raw.year.clone(),
        }
    })?;
    let year = i32::try_from(year).map_err(|_| PipelineError::TypeConversion {
        row,
        field: Field::Year,
        value: raw.year.clone(),
    })?;

    Ok(LifeExpectancyRecord {
        row_id: row,
        country: raw.country.trim().to_owned(),
        year,
        status: Status::parse(&raw.status),
        life_expectancy: parse_float(&raw.life_expectancy, row, Field::LifeExpectancy)?,
        adult_mortality: parse_int(&raw.adult_mortality, row, Field::AdultMortality)?,
        infant_deaths: parse_int(&raw.infant_deaths, row, Field::InfantDeaths)?,
        under_five_deaths: parse_int(&raw.under_five_deaths, row, Field::UnderFiveDeaths)?,
        gdp: parse_float(&raw.gdp, row, Field::Gdp)?,
        percentage_expenditure: parse_float(
            &raw.percentage_expenditure,
            row,
            Field::PercentageExpenditure,
        )?,
        schooling: parse_float(&raw.schooling, row, Field::Schooling)?,
        polio: parse_float(&raw.polio, row, Field::Polio)?,
        diphtheria: parse_float(&raw.diphtheria, row, Field::Diphtheria)?,
    })
}

fn parse_float(raw: &str, row: u64, field: Field) -> Result<Option<f64>> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(PipelineError::TypeConversion {
            row,
            field,
            value: raw.to_owned(),
        }),
    }
}

/// Integer columns accept float text (`"263.0"`); fractions round half away from zero.
fn parse_int(raw: &str, row: u64, field: Field) -> Result<Option<i64>> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if let Ok(v) = value.parse::<i64>() {
        return Ok(Some(v));
    }
    match parse_float(raw, row, field)? {
        Some(v) if v.abs() < i64::MAX as f64 => {
            if v.fract() != 0.0 {
                debug!(row, %field, value, "rounded fractional integer value");
            }
            Ok(Some(v.round() as i64))
        }
        Some(_) => Err(PipelineError::TypeConversion {
            row,
            field,
            value: raw.to_owned(),
        }),
        None => Ok(None),
    }
}

pub fn save_table(table: &Table, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
    write_records(table, &mut wtr)?;
    info!(path = %path.display(), rows = table.len(), "saved dataset");
    Ok(())
}

pub fn write_table<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);
    write_records(table, &mut wtr)
}

fn write_records<W: Write>(table: &Table, wtr: &mut csv::Writer<W>) -> Result<()> {
    if table.is_empty() {
        // serialize() writes the header with the first row; keep the schema anyway
        wtr.write_record(Field::ALL.iter().map(|f| f.column_name()))?;
    }
    for record in table.records() {
        wtr.serialize(CsvRow::from(record))?;
    }
    wtr.flush()?;
    Ok(())
}
