use std::fmt;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::eda_statistics::{
    Aggregator, ChangeDirection, CompositeScore, ExpenditureRow, LifeExpectancyChange, NetChange,
    YearCountryAverage,
};
use crate::models::Table;
use crate::year_eda::{YearAverage, YearlyGrowth};

/// Every aggregation view of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub composite_ranking: Vec<CompositeScore>,
    pub global_trend: Vec<YearAverage>,
    pub top_n_by_year: Vec<YearCountryAverage>,
    pub expenditure_correlation: Vec<ExpenditureRow>,
    pub expenditure_correlation_coefficient: Option<f64>,
    pub largest_improvement: Vec<LifeExpectancyChange>,
    pub largest_decline: Vec<LifeExpectancyChange>,
    pub net_change: Vec<NetChange>,
    pub yearly_growth: Vec<YearlyGrowth>,
    pub overall_average_growth: Option<String>,
}

impl Report {
    pub fn build(table: &Table, config: &PipelineConfig) -> Self {
        let aggregator = Aggregator::with_weights(table, config.weights);
        Self {
            composite_ranking: aggregator.composite_ranking(),
            global_trend: aggregator.global_trend(),
            top_n_by_year: aggregator.top_n_by_year(config.top_n),
            expenditure_correlation: aggregator.expenditure_correlation(),
            expenditure_correlation_coefficient: aggregator.expenditure_correlation_coefficient(),
            largest_improvement: aggregator.largest_change(ChangeDirection::Improvement),
            largest_decline: aggregator.largest_change(ChangeDirection::Decline),
            net_change: aggregator.net_change(),
            yearly_growth: aggregator.yearly_growth(),
            overall_average_growth: aggregator.overall_average_growth(),
        }
    }
}

struct Num(Option<f64>);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:>10.1}"),
            None => write!(f, "{:>10}", "-"),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Composite ranking:")?;
        writeln!(f, "{:<32}{:>10}{:>10}{:>10}{:>10}{:>10}", "Country", "LE", "GDP", "School", "Immun", "Score")?;
        for row in &self.composite_ranking {
            writeln!(
                f,
                "{:<32}{}{}{}{}{}",
                row.country,
                Num(row.avg_life_expectancy),
                Num(row.avg_gdp),
                Num(row.avg_schooling),
                Num(row.immunization_rate),
                Num(row.composite_score)
            )?;
        }

        writeln!(f, "\nGlobal trend:")?;
        for row in &self.global_trend {
            writeln!(f, "{:<32}{}", row.year, Num(row.avg_life_expectancy))?;
        }

        writeln!(f, "\nTop {} by year:", self.top_n_by_year.len())?;
        for row in &self.top_n_by_year {
            writeln!(f, "{:<6}{:<26}{}", row.year, row.country, Num(row.avg_life_expectancy))?;
        }

        writeln!(f, "\nHealth expenditure vs life expectancy:")?;
        for row in &self.expenditure_correlation {
            writeln!(
                f,
                "{:<32}{}{}",
                row.country,
                Num(row.avg_expenditure),
                Num(row.avg_life_expectancy)
            )?;
        }
        match self.expenditure_correlation_coefficient {
            Some(r) => writeln!(f, "Pearson r: {r:.3}")?,
            None => writeln!(f, "Pearson r: -")?,
        }

        writeln!(f, "\nLargest life expectancy spread:")?;
        for row in &self.largest_improvement {
            writeln!(f, "{:<32}{}", row.country, Num(row.change))?;
        }
        writeln!(f, "Countries in decline by spread: {}", self.largest_decline.len())?;

        writeln!(f, "\nNet change, first to last year:")?;
        for row in &self.net_change {
            writeln!(
                f,
                "{:<32}{}-{}{}",
                row.country,
                row.first_year,
                row.last_year,
                Num(Some(row.change))
            )?;
        }

        writeln!(f, "\nYearly growth:")?;
        for row in &self.yearly_growth {
            writeln!(f, "{:<32}{}{}", row.year, Num(row.avg_life_expectancy), Num(row.growth))?;
        }
        write!(
            f,
            "Overall average growth: {}",
            self.overall_average_growth.as_deref().unwrap_or("-")
        )
    }
}
