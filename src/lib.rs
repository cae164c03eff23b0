pub mod api;
pub mod canon;
pub mod cli;
pub mod config;
pub mod datasets;
pub mod fetch;
pub mod fields;
pub mod geo;
pub mod index;
pub mod output;
pub mod query;
pub mod stats;
pub mod store;
pub mod tabular;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, warn};

use crate::{
    api::ApiClient,
    canon::canon_id,
    cli::{ApiCommand, Cli, Commands, Dataset},
    config::DataConfig,
    fetch::{FetchError, Fetcher},
    output::{PLACEHOLDER, fmt_int, fmt_money, fmt_pct, print_table, write_csv},
    query::{QueryParams, QueryResult, SortDir, parse_date},
    stats::{PerStudentSpending, StatSummary},
    store::DataStore,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("lonestar_ledger", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub async fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = DataConfig::load(cli.config.as_deref())?;
    let store = DataStore::new(config, Fetcher::new());
    match cli.command {
        Commands::Probe(args) => handle_probe(&store, &args).await,
        Commands::Stats(args) => handle_stats(&store, &args).await,
        Commands::Districts(args) => handle_districts(&store, &args).await,
        Commands::District(args) => handle_district(&store, &args).await,
        Commands::Campuses(args) => handle_campuses(&store, &args).await,
        Commands::Campus(args) => handle_campus(&store, &args).await,
        Commands::Spending(args) => handle_spending(&store, &args).await,
        Commands::Geo(args) => handle_geo(&store, &args).await,
        Commands::Api(args) => handle_api(&store, &args).await,
    }
}

fn field_table(described: Vec<(&'static str, Option<&str>)>) -> Vec<Vec<String>> {
    described
        .into_iter()
        .map(|(label, header)| {
            vec![
                label.to_string(),
                header.unwrap_or(PLACEHOLDER).to_string(),
            ]
        })
        .collect()
}

async fn handle_probe(store: &DataStore, args: &cli::ProbeArgs) -> Result<()> {
    let rows = match args.dataset {
        Dataset::Districts => {
            let districts = store.districts().await?;
            field_table(districts.fields.describe(&districts.table.headers))
        }
        Dataset::Campuses => {
            let campuses = store.campuses().await?;
            field_table(campuses.fields.describe(&campuses.table.headers))
        }
        Dataset::Spending => {
            let spending = store.spending().await?;
            field_table(spending.fields.describe(&spending.headers))
        }
    };
    print_table(&["field".to_string(), "header".to_string()], &rows);
    Ok(())
}

async fn handle_stats(store: &DataStore, args: &cli::StatsArgs) -> Result<()> {
    let districts = store.districts().await?;
    let summary: StatSummary = if args.computed {
        stats::aggregate(
            &districts.table,
            &districts.fields,
            PerStudentSpending::Computed,
        )
    } else {
        districts.stats.clone()
    };

    let rows = vec![
        vec!["districts".to_string(), fmt_int(Some(summary.district_count as f64))],
        vec!["total spending".to_string(), fmt_money(Some(summary.total_spending))],
        vec!["enrollment".to_string(), fmt_int(Some(summary.enrollment_total))],
        vec![
            "per-student spending".to_string(),
            fmt_money(Some(summary.per_student_spending)),
        ],
        vec![
            "district debt".to_string(),
            fmt_money(Some(summary.district_debt_total)),
        ],
        vec![
            "per-pupil debt (avg)".to_string(),
            fmt_money(Some(summary.per_pupil_debt_avg as f64)),
        ],
        vec![
            "teacher salary (avg)".to_string(),
            fmt_money(Some(summary.teacher_salary_avg as f64)),
        ],
        vec![
            "principal salary (avg)".to_string(),
            fmt_money(Some(summary.principal_salary_avg as f64)),
        ],
        vec![
            "superintendent salary (avg)".to_string(),
            fmt_money(Some(summary.superintendent_salary_avg as f64)),
        ],
    ];
    print_table(&["metric".to_string(), "value".to_string()], &rows);
    Ok(())
}

fn sort_dir(desc: bool) -> SortDir {
    if desc { SortDir::Desc } else { SortDir::Asc }
}

/// Runs the same query twice when exporting: the export covers the whole
/// filtered set, the table view only the requested page.
fn query_for_export(params: &QueryParams, total_hint: usize) -> QueryParams {
    QueryParams {
        page: 1,
        page_size: total_hint.max(1),
        ..params.clone()
    }
}

async fn handle_districts(store: &DataStore, args: &cli::DistrictsArgs) -> Result<()> {
    let districts = store.districts().await?;
    let entities = districts.entities();
    let params = QueryParams {
        text: args.search.clone(),
        categories: args.counties.clone(),
        sort_key: Some(args.sort.clone()),
        sort_dir: sort_dir(args.desc),
        page: args.page,
        page_size: args.page_size,
        ..QueryParams::default()
    };

    let headers: Vec<String> = ["id", "name", "county", "enrollment", "spending"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let to_row = |d: &datasets::DistrictEntity| {
        vec![
            d.raw_id.clone(),
            d.name.clone(),
            d.county.clone(),
            fmt_int(d.enrollment),
            fmt_money(d.total_spending),
        ]
    };

    if let Some(path) = &args.output {
        let result = query::run_query(&entities, &query_for_export(&params, entities.len()));
        let rows: Vec<Vec<String>> = result.items.iter().map(|d| to_row(d)).collect();
        let file = std::fs::File::create(path)
            .with_context(|| format!("Creating output file {path:?}"))?;
        write_csv(file, &headers, &rows)?;
        println!("wrote {} district(s) to {}", rows.len(), path.display());
        return Ok(());
    }

    let result = query::run_query(&entities, &params);
    let rows: Vec<Vec<String>> = result.items.iter().map(|d| to_row(d)).collect();
    print_table(&headers, &rows);
    print_footer(&result, args.page);
    Ok(())
}

fn print_footer<T>(result: &QueryResult<'_, T>, page: usize) {
    println!(
        "{} of {} result(s), page {}",
        result.items.len(),
        result.total_count,
        page.max(1)
    );
}

async fn handle_district(store: &DataStore, args: &cli::DistrictArgs) -> Result<()> {
    let districts = store.districts().await?;
    let Some(row) = districts.find(&args.id) else {
        println!("District not found: {}", args.id);
        return Ok(());
    };
    let table = &districts.table;
    let fields = &districts.fields;
    let cell = |column| table.cell(row, column);
    let money = |column| fmt_money(cell(column).and_then(stats::parse_amount));

    let name = cell(fields.name).unwrap_or("District");
    let code = cell(fields.id).unwrap_or(&args.id);
    println!("{name} ({code})");
    if let Some(county) = cell(fields.county) {
        println!("{county} County");
    }
    println!();

    let overview = vec![
        vec!["total spending".to_string(), money(fields.total_spending)],
        vec![
            "enrollment".to_string(),
            fmt_int(cell(fields.enrollment).and_then(stats::parse_amount)),
        ],
        vec![
            "per-student spending".to_string(),
            fmt_money(stats::row_per_student_spending(table, fields, row)),
        ],
        vec!["district debt".to_string(), money(fields.district_debt)],
        vec!["per-pupil debt".to_string(), money(fields.per_pupil_debt)],
        vec!["avg teacher salary".to_string(), money(fields.teacher_salary)],
        vec!["avg principal salary".to_string(), money(fields.principal_salary)],
        vec![
            "superintendent salary".to_string(),
            money(fields.superintendent_salary),
        ],
    ];
    print_table(&["metric".to_string(), "value".to_string()], &overview);

    // Campus roster and boundary are additive: their datasets may be
    // unconfigured or unreachable without sinking the district view.
    match store.campuses().await {
        Ok(campuses) => {
            let roster = campuses.for_district(&args.id);
            println!();
            if roster.is_empty() {
                println!("No campuses on file for this district.");
            } else {
                let rows: Vec<Vec<String>> = roster
                    .iter()
                    .map(|c| {
                        vec![
                            c.raw_id.clone(),
                            c.name.clone(),
                            fmt_int(c.score),
                            c.grade.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                        ]
                    })
                    .collect();
                print_table(
                    &["campus".to_string(), "name".to_string(), "score".to_string(), "grade".to_string()],
                    &rows,
                );
            }
        }
        Err(err) => warn!("campus roster unavailable: {err}"),
    }

    if store.config().districts_geojson.is_some() {
        match store.districts_geojson().await {
            Ok(collection) => {
                let found =
                    geo::find_feature(&collection, &geo::GEO_DISTRICT_ID, &canon_id(&args.id))
                        .is_some();
                println!();
                if found {
                    println!("Boundary geometry: available (see `geo {}`)", canon_id(&args.id));
                } else {
                    println!("Boundary geometry: none on file");
                }
            }
            Err(err) => warn!("boundary lookup unavailable: {err}"),
        }
    }
    Ok(())
}

async fn handle_campuses(store: &DataStore, args: &cli::CampusesArgs) -> Result<()> {
    let campuses = store.campuses().await?;
    let entities = campuses.entities();
    let params = QueryParams {
        text: args.search.clone(),
        categories: args.grades.clone(),
        sort_key: Some(args.sort.clone()),
        sort_dir: sort_dir(args.desc),
        page: args.page,
        page_size: args.page_size,
        ..QueryParams::default()
    };

    let headers: Vec<String> = ["id", "name", "district", "score", "grade"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let to_row = |c: &datasets::CampusEntity| {
        vec![
            c.raw_id.clone(),
            c.name.clone(),
            if c.district_name.is_empty() {
                c.district_raw.clone()
            } else {
                c.district_name.clone()
            },
            fmt_int(c.score),
            c.grade.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
        ]
    };

    if let Some(path) = &args.output {
        let result = query::run_query(&entities, &query_for_export(&params, entities.len()));
        let rows: Vec<Vec<String>> = result.items.iter().map(|c| to_row(c)).collect();
        let file = std::fs::File::create(path)
            .with_context(|| format!("Creating output file {path:?}"))?;
        write_csv(file, &headers, &rows)?;
        println!("wrote {} campus(es) to {}", rows.len(), path.display());
        return Ok(());
    }

    let result = query::run_query(&entities, &params);
    let rows: Vec<Vec<String>> = result.items.iter().map(|c| to_row(c)).collect();
    print_table(&headers, &rows);
    print_footer(&result, args.page);
    Ok(())
}

async fn handle_campus(store: &DataStore, args: &cli::CampusArgs) -> Result<()> {
    let campuses = store.campuses().await?;
    let Some(row) = campuses.find(&args.id) else {
        println!("Campus not found: {}", args.id);
        return Ok(());
    };
    let table = &campuses.table;
    let fields = &campuses.fields;
    let cell = |column| table.cell(row, column);

    let name = cell(fields.campus_name).unwrap_or("Campus");
    let code = cell(fields.campus_id).unwrap_or(&args.id);
    println!("{name} ({code})");
    if let Some(district) = cell(fields.district_name).or(cell(fields.district_id)) {
        println!("District: {district}");
    }
    println!();

    let number = |column| fmt_int(cell(column).and_then(stats::parse_amount));
    let money = |column| fmt_money(cell(column).and_then(stats::parse_amount));
    let details = vec![
        vec!["score".to_string(), number(fields.campus_score)],
        vec![
            "grade".to_string(),
            cell(fields.campus_grade)
                .map(|g| g.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
        ],
        vec![
            "reading on grade level".to_string(),
            fmt_pct(cell(fields.reading_ogr)),
        ],
        vec!["math on grade level".to_string(), fmt_pct(cell(fields.math_ogr))],
        vec!["teachers".to_string(), number(fields.teacher_count)],
        vec!["administrators".to_string(), number(fields.admin_count)],
        vec!["avg teacher salary".to_string(), money(fields.avg_teach_sal)],
        vec!["avg admin salary".to_string(), money(fields.avg_admin_sal)],
    ];
    print_table(&["metric".to_string(), "value".to_string()], &details);
    Ok(())
}

async fn handle_spending(store: &DataStore, args: &cli::SpendingArgs) -> Result<()> {
    let spending = store.spending().await?;
    let records: Vec<datasets::SpendingRecord> = spending
        .for_district(&args.district)
        .into_iter()
        .cloned()
        .collect();

    let params = QueryParams {
        text: args.search.clone(),
        categories: args.categories.clone(),
        min_amount: args.min_amount.as_deref().and_then(|v| v.trim().parse().ok()),
        max_amount: args.max_amount.as_deref().and_then(|v| v.trim().parse().ok()),
        from_date: args.from.as_deref().and_then(parse_date),
        to_date: args.to.as_deref().and_then(parse_date),
        sort_key: Some(args.sort.clone()),
        sort_dir: sort_dir(args.desc),
        page: args.page,
        page_size: args.page_size,
    };

    let headers: Vec<String> = ["date", "vendor", "category", "amount", "description"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let to_row = |r: &datasets::SpendingRecord| {
        vec![
            if r.date_raw.is_empty() {
                PLACEHOLDER.to_string()
            } else {
                r.date_raw.clone()
            },
            r.vendor.clone(),
            r.category.clone(),
            fmt_money(Some(r.amount)),
            r.description.clone(),
        ]
    };

    if let Some(path) = &args.output {
        let result = query::run_query(&records, &query_for_export(&params, records.len()));
        let rows: Vec<Vec<String>> = result.items.iter().map(|r| to_row(r)).collect();
        let file = std::fs::File::create(path)
            .with_context(|| format!("Creating output file {path:?}"))?;
        write_csv(file, &headers, &rows)?;
        println!("wrote {} line item(s) to {}", rows.len(), path.display());
        return Ok(());
    }

    let result = query::run_query(&records, &params);
    let rows: Vec<Vec<String>> = result.items.iter().map(|r| to_row(r)).collect();
    print_table(&headers, &rows);
    print_footer(&result, args.page);
    Ok(())
}

async fn handle_geo(store: &DataStore, args: &cli::GeoArgs) -> Result<()> {
    let id = canon_id(&args.id);

    if args.campuses {
        // Prefer a configured campus point file; synthesize from the campus
        // CSV's coordinate columns otherwise.
        if store.config().campuses_geojson.is_some() {
            match store.campuses_geojson().await {
                Ok(collection) => {
                    let matched = geo::filter_features(&collection, &geo::GEO_DISTRICT_ID, &id);
                    if !matched.is_empty() {
                        println!("{}", serde_json::to_string_pretty(&matched)?);
                        return Ok(());
                    }
                }
                Err(err) => warn!("campus GeoJSON unavailable, falling back to CSV: {err}"),
            }
        }
        let campuses = store.campuses().await?;
        return match campuses.point_features(&args.id) {
            Some(points) => {
                println!("{}", serde_json::to_string_pretty(&points)?);
                Ok(())
            }
            None => {
                println!("No geometry available for district {id}");
                Ok(())
            }
        };
    }

    let collection = store.districts_geojson().await?;
    match geo::find_feature(&collection, &geo::GEO_DISTRICT_ID, &id) {
        Some(feature) => {
            let single = geo::FeatureCollection::from_features(vec![feature.clone()]);
            println!("{}", serde_json::to_string_pretty(&single)?);
        }
        None => println!("No geometry available for district {id}"),
    }
    Ok(())
}

async fn handle_api(store: &DataStore, args: &cli::ApiArgs) -> Result<()> {
    let base = store.config().require_api_base()?;
    let client = ApiClient::new(base, Fetcher::new());

    match &args.command {
        ApiCommand::Probe => {
            let prefix = client.prefix().await;
            if prefix.is_empty() {
                println!("API prefix: (none)");
            } else {
                println!("API prefix: {prefix}");
            }
        }
        ApiCommand::Districts => {
            let districts = client.list_districts().await?;
            let rows: Vec<Vec<String>> = districts
                .iter()
                .map(|d| {
                    vec![
                        d.canonical_id().unwrap_or_else(|| PLACEHOLDER.to_string()),
                        d.name.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                        d.county.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                        fmt_int(d.enrollment),
                    ]
                })
                .collect();
            print_table(
                &["id".to_string(), "name".to_string(), "county".to_string(), "enrollment".to_string()],
                &rows,
            );
        }
        ApiCommand::District { id } => match client.district(id).await {
            Ok(district) => {
                let rows = vec![
                    vec![
                        "id".to_string(),
                        district.canonical_id().unwrap_or_else(|| PLACEHOLDER.to_string()),
                    ],
                    vec![
                        "name".to_string(),
                        district.name.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                    ],
                    vec![
                        "county".to_string(),
                        district.county.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                    ],
                    vec!["spending".to_string(), fmt_money(district.total_spending)],
                    vec!["enrollment".to_string(), fmt_int(district.enrollment)],
                ];
                print_table(&["field".to_string(), "value".to_string()], &rows);
            }
            Err(FetchError::Http { status: 404, .. }) => {
                println!("District not found: {id}");
            }
            Err(err) => return Err(err.into()),
        },
        ApiCommand::Campus { id } => match client.campus(id).await {
            Ok(campus) => {
                let rows = vec![
                    vec![
                        "id".to_string(),
                        campus.canonical_id().unwrap_or_else(|| PLACEHOLDER.to_string()),
                    ],
                    vec![
                        "name".to_string(),
                        campus.name.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                    ],
                    vec!["score".to_string(), fmt_int(campus.score)],
                    vec![
                        "grade".to_string(),
                        campus.grade.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                    ],
                ];
                print_table(&["field".to_string(), "value".to_string()], &rows);
            }
            Err(FetchError::Http { status: 404, .. }) => {
                println!("Campus not found: {id}");
            }
            Err(err) => return Err(err.into()),
        },
        ApiCommand::Stats => {
            let stats = client.state_stats().await?;
            let count = |v: Option<u64>| v.map(|n| fmt_int(Some(n as f64)))
                .unwrap_or_else(|| PLACEHOLDER.to_string());
            let rows = vec![
                vec!["districts".to_string(), count(stats.districts)],
                vec!["campuses".to_string(), count(stats.campuses)],
                vec!["total spending".to_string(), fmt_money(stats.total_spending)],
                vec!["enrollment".to_string(), fmt_int(stats.enrollment)],
                vec![
                    "per-student spending".to_string(),
                    fmt_money(stats.per_student_spending),
                ],
            ];
            print_table(&["metric".to_string(), "value".to_string()], &rows);
        }
        ApiCommand::Geo => {
            let collection = client.districts_geojson().await?;
            println!("{}", serde_json::to_string_pretty(&collection)?);
        }
    }
    Ok(())
}
