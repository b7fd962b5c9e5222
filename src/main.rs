use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use worldlife::{
    load_table, logging, save_table, CleaningReport, Cleaner, Explorer, Field, PipelineConfig,
    Report, Table,
};

#[derive(Parser)]
#[command(name = "worldlife", about = "Clean and report on the world life expectancy dataset")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise the dataset without changing it
    Explore {
        /// Input CSV file
        input: PathBuf,

        /// Field to average per country. Repeatable. Defaults to Lifeexpectancy.
        #[arg(short, long = "field")]
        fields: Vec<String>,
    },
    /// Clean the dataset and write the result
    Clean {
        /// Input CSV file
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print every reporting view of an already clean dataset
    Report {
        /// Input CSV file
        input: PathBuf,

        /// Row limit of the top-by-year view
        #[arg(long)]
        top: Option<usize>,

        /// Print JSON instead of text tables
        #[arg(long)]
        json: bool,
    },
    /// Clean, write the cleaned dataset, then report on it
    Run {
        /// Input CSV file
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Row limit of the top-by-year view
        #[arg(long)]
        top: Option<usize>,

        /// Print JSON instead of text tables
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = PipelineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    info!(?config, "configuration loaded");

    match cli.command {
        Commands::Explore { input, fields } => {
            let table = load(&input)?;
            explore(&table, &fields)?;
        }
        Commands::Clean { input, output } => {
            let mut table = load(&input)?;
            let cleaning = Cleaner::new(&config).run(&mut table);
            print_cleaning(&cleaning);
            save(&table, &output)?;
        }
        Commands::Report { input, top, json } => {
            if let Some(top) = top {
                config.top_n = top;
            }
            let table = load(&input)?;
            let report = Report::build(&table, &config);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
        Commands::Run {
            input,
            output,
            top,
            json,
        } => {
            if let Some(top) = top {
                config.top_n = top;
            }
            let mut table = load(&input)?;
            let cleaning = Cleaner::new(&config).run(&mut table);
            save(&table, &output)?;
            let report = Report::build(&table, &config);
            if json {
                let combined = serde_json::json!({ "cleaning": cleaning, "report": report });
                println!("{}", serde_json::to_string_pretty(&combined)?);
            } else {
                print_cleaning(&cleaning);
                println!("\n{report}");
            }
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<Table> {
    load_table(path).with_context(|| format!("Failed to load dataset from {}", path.display()))
}

fn save(table: &Table, path: &Path) -> Result<()> {
    save_table(table, path).with_context(|| format!("Failed to write dataset to {}", path.display()))
}

fn explore(table: &Table, names: &[String]) -> Result<()> {
    let explorer = Explorer::new(table);

    match explorer.dataset_bounds() {
        Some(bounds) => println!(
            "Years {}-{}, {} countries, {} rows",
            bounds.min_year,
            bounds.max_year,
            bounds.country_count,
            table.len()
        ),
        None => println!("Dataset is empty"),
    }

    println!("\nMissing values:");
    for (field, count) in explorer.null_counts(&Field::ALL) {
        println!("{:<24}{count:>8}", field.column_name());
    }

    let fields = if names.is_empty() {
        vec![Field::LifeExpectancy]
    } else {
        names
            .iter()
            .map(|name| name.parse::<Field>())
            .collect::<worldlife::Result<Vec<_>>>()?
    };

    for field in fields {
        if let Some(summary) = explorer.describe(field)? {
            println!(
                "\n{field}: n={} mean={:.2} median={:.2} std={} min={:.2} max={:.2}",
                summary.count,
                summary.mean,
                summary.median,
                summary
                    .std_dev
                    .map(|s| format!("{s:.2}"))
                    .unwrap_or_else(|| "-".to_owned()),
                summary.min,
                summary.max
            );
        }
        println!("Average {field} per country:");
        for row in explorer.per_country_average(field)? {
            match row.average {
                Some(avg) => println!("{:<32}{avg:>10.2}", row.country),
                None => println!("{:<32}{:>10}", row.country, "-"),
            }
        }
    }
    Ok(())
}

fn print_cleaning(report: &CleaningReport) {
    println!("Cleaning summary:");
    println!("  rows with negative values: {}", report.negative_values.len());
    for finding in &report.negative_values {
        let fields: Vec<&str> = finding.fields.iter().map(|f| f.column_name()).collect();
        println!(
            "    row {} {} {}: {}",
            finding.row_id,
            finding.country,
            finding.year,
            fields.join(", ")
        );
    }
    println!("  negative values cleared:   {}", report.negatives_cleared);
    println!("  values imputed:            {}", report.imputed);
    println!("  incomplete rows dropped:   {}", report.dropped);
    println!("  duplicates removed:        {}", report.duplicates_removed);
    println!("  statuses backfilled:       {}", report.statuses_filled);
    println!("  values interpolated:       {}", report.interpolated);
}
