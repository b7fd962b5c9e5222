use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::PipelineError;

/// Development status as reported by the WHO export. An empty cell is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    Developing,
    Developed,
    #[default]
    Unknown,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Developing => "Developing",
            Status::Developed => "Developed",
            Status::Unknown => "",
        }
    }

    pub fn is_known(self) -> bool {
        self != Status::Unknown
    }

    /// Anything other than the two known labels is treated as missing.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Developing" => Status::Developing,
            "Developed" => Status::Developed,
            _ => Status::Unknown,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Field {
    Country,
    Year,
    Status,
    LifeExpectancy,
    AdultMortality,
    InfantDeaths,
    UnderFiveDeaths,
    Gdp,
    PercentageExpenditure,
    Schooling,
    Polio,
    Diphtheria,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::Country,
        Field::Year,
        Field::Status,
        Field::LifeExpectancy,
        Field::AdultMortality,
        Field::InfantDeaths,
        Field::UnderFiveDeaths,
        Field::Gdp,
        Field::PercentageExpenditure,
        Field::Schooling,
        Field::Polio,
        Field::Diphtheria,
    ];

    /// Fields checked by the negative-value audit.
    pub const NON_NEGATIVE: [Field; 4] = [
        Field::LifeExpectancy,
        Field::AdultMortality,
        Field::InfantDeaths,
        Field::UnderFiveDeaths,
    ];

    /// Canonical CSV header.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::Country => "Country",
            Field::Year => "Year",
            Field::Status => "Status",
            Field::LifeExpectancy => "Lifeexpectancy",
            Field::AdultMortality => "AdultMortality",
            Field::InfantDeaths => "infantdeaths",
            Field::UnderFiveDeaths => "under_fivedeaths",
            Field::Gdp => "GDP",
            Field::PercentageExpenditure => "percentageexpenditure",
            Field::Schooling => "Schooling",
            Field::Polio => "Polio",
            Field::Diphtheria => "Diphtheria",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Field::Country | Field::Status)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Field {
    type Err = PipelineError;

    /// Accepts the canonical header, the WHO export spelling, or a snake_case name.
    /// Matching ignores case, whitespace, `-` and `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        let field = match key.as_str() {
            "country" => Field::Country,
            "year" => Field::Year,
            "status" => Field::Status,
            "lifeexpectancy" => Field::LifeExpectancy,
            "adultmortality" => Field::AdultMortality,
            "infantdeaths" => Field::InfantDeaths,
            "underfivedeaths" => Field::UnderFiveDeaths,
            "gdp" => Field::Gdp,
            "percentageexpenditure" => Field::PercentageExpenditure,
            "schooling" => Field::Schooling,
            "polio" => Field::Polio,
            "diphtheria" => Field::Diphtheria,
            _ => return Err(PipelineError::UnknownField(s.to_owned())),
        };
        Ok(field)
    }
}

/// One country-year observation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LifeExpectancyRecord {
    pub row_id: u64,
    pub country: String,
    pub year: i32,
    pub status: Status,
    pub life_expectancy: Option<f64>,
    pub adult_mortality: Option<i64>,
    pub infant_deaths: Option<i64>,
    pub under_five_deaths: Option<i64>,
    pub gdp: Option<f64>,
    pub percentage_expenditure: Option<f64>,
    pub schooling: Option<f64>,
    pub polio: Option<f64>,
    pub diphtheria: Option<f64>,
}

impl LifeExpectancyRecord {
    pub fn new(country: impl Into<String>, year: i32) -> Self {
        Self {
            country: country.into(),
            year,
            ..Default::default()
        }
    }

    /// Numeric view of a field. `None` for missing values and for Country/Status.
    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::Country | Field::Status => None,
            Field::Year => Some(f64::from(self.year)),
            Field::LifeExpectancy => self.life_expectancy,
            Field::AdultMortality => self.adult_mortality.map(|v| v as f64),
            Field::InfantDeaths => self.infant_deaths.map(|v| v as f64),
            Field::UnderFiveDeaths => self.under_five_deaths.map(|v| v as f64),
            Field::Gdp => self.gdp,
            Field::PercentageExpenditure => self.percentage_expenditure,
            Field::Schooling => self.schooling,
            Field::Polio => self.polio,
            Field::Diphtheria => self.diphtheria,
        }
    }

    pub fn is_missing(&self, field: Field) -> bool {
        match field {
            Field::Country => self.country.trim().is_empty(),
            Field::Status => !self.status.is_known(),
            _ => self.value(field).is_none(),
        }
    }

    /// Mean of Polio and Diphtheria coverage; missing if either is missing.
    pub fn immunization_rate(&self) -> Option<f64> {
        Some((self.polio? + self.diphtheria?) / 2.0)
    }

    pub(crate) fn clear(&mut self, field: Field) {
        match field {
            Field::LifeExpectancy => self.life_expectancy = None,
            Field::AdultMortality => self.adult_mortality = None,
            Field::InfantDeaths => self.infant_deaths = None,
            Field::UnderFiveDeaths => self.under_five_deaths = None,
            Field::Gdp => self.gdp = None,
            Field::PercentageExpenditure => self.percentage_expenditure = None,
            Field::Schooling => self.schooling = None,
            Field::Polio => self.polio = None,
            Field::Diphtheria => self.diphtheria = None,
            Field::Country | Field::Year | Field::Status => {}
        }
    }
}

/// The in-memory dataset. Rows keep their load order; row ids are assigned here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    records: Vec<LifeExpectancyRecord>,
}

impl Table {
    /// Takes ownership of the records and numbers them 1.. in the given order.
    pub fn from_records(mut records: Vec<LifeExpectancyRecord>) -> Self {
        for (i, record) in records.iter_mut().enumerate() {
            record.row_id = i as u64 + 1;
        }
        Self { records }
    }

    pub fn records(&self) -> &[LifeExpectancyRecord] {
        &self.records
    }

    pub(crate) fn records_mut(&mut self) -> &mut [LifeExpectancyRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keeps the rows matching `keep` and returns how many were deleted.
    pub(crate) fn retain<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&LifeExpectancyRecord) -> bool,
    {
        let before = self.records.len();
        self.records.retain(keep);
        before - self.records.len()
    }

    /// Row positions grouped by Country, in row order.
    pub fn country_index(&self) -> BTreeMap<&str, Vec<usize>> {
        let mut index: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (pos, record) in self.records.iter().enumerate() {
            index.entry(record.country.as_str()).or_default().push(pos);
        }
        index
    }

    /// Row positions grouped by (Country, Year), in row order.
    pub fn key_index(&self) -> HashMap<(&str, i32), Vec<usize>> {
        let mut index: HashMap<(&str, i32), Vec<usize>> = HashMap::new();
        for (pos, record) in self.records.iter().enumerate() {
            index
                .entry((record.country.as_str(), record.year))
                .or_default()
                .push(pos);
        }
        index
    }
}
