use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Explore Texas school district, campus, and spending data", long_about = None)]
pub struct Cli {
    /// YAML config file with dataset URLs (environment variables win)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report which logical fields were detected in a dataset's headers
    Probe(ProbeArgs),
    /// Statewide aggregates over the district table
    Stats(StatsArgs),
    /// Search, sort, and page through the district list
    Districts(DistrictsArgs),
    /// Show one district: overview, campuses, and boundary availability
    District(DistrictArgs),
    /// Search, sort, and page through the campus list
    Campuses(CampusesArgs),
    /// Show one campus
    Campus(CampusArgs),
    /// Filter, sort, and page a district's spending line items
    Spending(SpendingArgs),
    /// Emit GeoJSON for a district boundary or its campus points
    Geo(GeoArgs),
    /// Talk to the backend API
    Api(ApiArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum Dataset {
    Districts,
    Campuses,
    Spending,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Which dataset's headers to probe
    #[arg(value_enum)]
    pub dataset: Dataset,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Compute per-student spending from the data instead of the published figure
    #[arg(long)]
    pub computed: bool,
}

#[derive(Debug, Args)]
pub struct DistrictsArgs {
    /// Free-text search over name, id, and county; a bare number matches ids
    #[arg(short = 'q', long)]
    pub search: Option<String>,
    /// Restrict to one or more counties
    #[arg(long = "county", action = clap::ArgAction::Append)]
    pub counties: Vec<String>,
    /// Sort key: name, county, enrollment, or spending
    #[arg(long, default_value = "name")]
    pub sort: String,
    /// Sort descending
    #[arg(long)]
    pub desc: bool,
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Rows per page
    #[arg(long = "page-size", default_value_t = 25)]
    pub page_size: usize,
    /// Write the full filtered result as CSV instead of a table
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DistrictArgs {
    /// District number, in any textual form
    pub id: String,
}

#[derive(Debug, Args)]
pub struct CampusesArgs {
    /// Free-text search over campus name, id, and district
    #[arg(short = 'q', long)]
    pub search: Option<String>,
    /// Restrict to one or more letter grades
    #[arg(long = "grade", action = clap::ArgAction::Append)]
    pub grades: Vec<String>,
    /// Sort key: name, district, or score
    #[arg(long, default_value = "name")]
    pub sort: String,
    /// Sort descending
    #[arg(long)]
    pub desc: bool,
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Rows per page
    #[arg(long = "page-size", default_value_t = 25)]
    pub page_size: usize,
    /// Write the full filtered result as CSV instead of a table
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CampusArgs {
    /// Campus number, in any textual form
    pub id: String,
}

#[derive(Debug, Args)]
pub struct SpendingArgs {
    /// District number whose line items to show
    pub district: String,
    /// Free-text search over vendor, description, and category
    #[arg(short = 'q', long)]
    pub search: Option<String>,
    /// Restrict to one or more categories
    #[arg(long = "category", action = clap::ArgAction::Append)]
    pub categories: Vec<String>,
    /// Inclusive lower amount bound; non-numeric input disables it
    #[arg(long = "min-amount")]
    pub min_amount: Option<String>,
    /// Inclusive upper amount bound; non-numeric input disables it
    #[arg(long = "max-amount")]
    pub max_amount: Option<String>,
    /// Inclusive start date (e.g. 2024-01-01)
    #[arg(long)]
    pub from: Option<String>,
    /// Inclusive end date; extends to the end of that day
    #[arg(long)]
    pub to: Option<String>,
    /// Sort key: date, amount, vendor, or category
    #[arg(long, default_value = "date")]
    pub sort: String,
    /// Sort descending
    #[arg(long)]
    pub desc: bool,
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Rows per page
    #[arg(long = "page-size", default_value_t = 25)]
    pub page_size: usize,
    /// Write the full filtered result as CSV instead of a table
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct GeoArgs {
    /// District number, in any textual form
    pub id: String,
    /// Emit the district's campus points instead of its boundary
    #[arg(long)]
    pub campuses: bool,
}

#[derive(Debug, Args)]
pub struct ApiArgs {
    #[command(subcommand)]
    pub command: ApiCommand,
}

#[derive(Debug, Subcommand)]
pub enum ApiCommand {
    /// Detect and print the API path prefix
    Probe,
    /// List districts from the API
    Districts,
    /// Fetch one district from the API
    District {
        /// District number, in any textual form
        id: String,
    },
    /// Fetch one campus from the API
    Campus {
        /// Campus number, in any textual form
        id: String,
    },
    /// Fetch statewide statistics from the API
    Stats,
    /// Fetch the district boundary collection from the API
    Geo,
}
