// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod table;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use serde_json::Value;
use sift_grid::{
    CellValue, ColumnFilter, FilterOperator, GridEngine, GridOptions, GridState, PaginationState,
    SortDirection, SortSpec,
};
use sift_llm::{
    AiQueryResult, MAX_EXAMPLES, QueryPipeline, apply_to_engine, build_provider,
    schema_with_examples,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

/// Logs go to stderr, filtered by `SIFT_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("SIFT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `sift --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    if options.check_only {
        if config.ai_enabled() {
            build_provider(&config.provider_config()?).with_context(|| {
                format!(
                    "invalid [ai] config in {}; fix provider/base_url/model values",
                    options.config_path.display()
                )
            })?;
            config.invoke_options()?;
        }
        if let Some(path) = &options.table_path {
            table::load_table(path)?;
        }
        return Ok(());
    }

    let table_path = options
        .table_path
        .as_ref()
        .ok_or_else(|| anyhow!("--table <path> is required; run with --help for usage"))?;
    let table = table::load_table(table_path)?;

    let grid_options = GridOptions {
        features: config.grid_features(),
        initial_state: GridState {
            pagination: PaginationState {
                page_index: 0,
                page_size: options.page_size.unwrap_or_else(|| config.page_size()),
            },
            ..GridState::default()
        },
        ..GridOptions::default()
    }
    .with_row_id(table::row_id);
    let mut engine = GridEngine::with_options(table.rows, table.columns, grid_options);

    if !options.sorting.is_empty() {
        engine.set_sorting(options.sorting.clone())?;
    }
    for filter in &options.filters {
        engine.set_column_filter_with(&filter.column_id, filter.operator, filter.value.clone())?;
    }
    if let Some(term) = &options.search {
        engine.set_global_filter(term.as_str())?;
    }

    if let Some(query) = &options.ask {
        ask(&config, &mut engine, query)?;
    }

    if let Some(page) = options.page {
        engine.set_page_index(page - 1)?;
        let info = engine.get_pagination_info();
        if page > info.page_count.max(1) {
            tracing::warn!(
                page,
                pages = info.page_count,
                "page out of range, showing last page"
            );
        }
    }

    if options.json {
        let document = table::render_json(&engine);
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print!("{}", table::render_text(&engine));
    }
    Ok(())
}

fn ask(config: &Config, engine: &mut GridEngine<Value>, query: &str) -> Result<()> {
    if !config.ai_enabled() {
        bail!("--ask needs AI enabled; set [ai] enabled = true in the config");
    }
    let provider = build_provider(&config.provider_config()?)
        .context("invalid [ai] config; run `sift --check` for details")?;
    let mut pipeline = QueryPipeline::new(Arc::from(provider), config.invoke_options()?);

    let schema = schema_with_examples(engine.columns(), engine.rows(), MAX_EXAMPLES);
    let result = pipeline.run(query, &schema);
    eprintln!("{}", summarize(&result));

    let threshold = config.confidence_threshold();
    if apply_to_engine(&result, engine, threshold)? {
        return Ok(());
    }
    if result.is_success() {
        eprintln!(
            "ai: confidence {:.2} is below {threshold:.2}; showing the table without it",
            result.confidence
        );
    }
    Ok(())
}

fn summarize(result: &AiQueryResult) -> String {
    if let Some(error) = &result.error {
        return format!("ai: query failed: {error}");
    }
    let filters: Vec<String> = result
        .filters
        .iter()
        .map(|filter| {
            format!(
                "{} {} {}",
                filter.column_id,
                filter.operator.as_str(),
                filter.value.display()
            )
            .trim_end()
            .to_owned()
        })
        .collect();
    let sorting: Vec<String> = result
        .sorting
        .iter()
        .map(|sort| format!("{} {}", sort.column_id, sort.direction.as_str()))
        .collect();
    format!(
        "ai: filters [{}], sorting [{}], confidence {:.2}",
        filters.join("; "),
        sorting.join(", "),
        result.confidence
    )
}

#[derive(Debug, Clone, PartialEq)]
struct CliOptions {
    config_path: PathBuf,
    table_path: Option<PathBuf>,
    sorting: Vec<SortSpec>,
    filters: Vec<ColumnFilter>,
    search: Option<String>,
    page: Option<usize>,
    page_size: Option<usize>,
    ask: Option<String>,
    json: bool,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        table_path: None,
        sorting: Vec::new(),
        filters: Vec::new(),
        search: None,
        page: None,
        page_size: None,
        ask: None,
        json: false,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let path = next_value(&mut iter, "--config", "a file path")?;
                options.config_path = PathBuf::from(path);
            }
            "--table" => {
                let path = next_value(&mut iter, "--table", "a file path")?;
                options.table_path = Some(PathBuf::from(path));
            }
            "--sort" => {
                let raw = next_value(&mut iter, "--sort", "<column>[:asc|:desc]")?;
                let sort = parse_sort(&raw)?;
                options
                    .sorting
                    .retain(|existing| existing.column_id != sort.column_id);
                options.sorting.push(sort);
            }
            "--filter" => {
                let raw = next_value(&mut iter, "--filter", "<column>:<operator>[:<value>]")?;
                options.filters.push(parse_filter(&raw)?);
            }
            "--search" => {
                options.search = Some(next_value(&mut iter, "--search", "a search term")?);
            }
            "--page" => {
                let raw = next_value(&mut iter, "--page", "a page number")?;
                options.page = Some(parse_positive(&raw, "--page")?);
            }
            "--page-size" => {
                let raw = next_value(&mut iter, "--page-size", "a row count")?;
                options.page_size = Some(parse_positive(&raw, "--page-size")?);
            }
            "--ask" => {
                options.ask = Some(next_value(&mut iter, "--ask", "a question")?);
            }
            "--json" => {
                options.json = true;
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn next_value<I, S>(iter: &mut I, flag: &str, what: &str) -> Result<String>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    iter.next()
        .map(|value| value.as_ref().to_owned())
        .ok_or_else(|| anyhow!("{flag} requires {what}"))
}

fn parse_sort(raw: &str) -> Result<SortSpec> {
    let (column_id, direction) = match raw.rsplit_once(':') {
        Some((column_id, direction)) => {
            let direction = SortDirection::parse(direction).ok_or_else(|| {
                anyhow!("invalid sort direction {direction:?} in {raw:?}; use asc or desc")
            })?;
            (column_id, direction)
        }
        None => (raw, SortDirection::Asc),
    };
    if column_id.is_empty() {
        bail!("--sort needs a column id, got {raw:?}");
    }
    Ok(SortSpec::new(column_id, direction))
}

/// `<column>:<operator>[:<value>]`. The value is read as JSON when it parses
/// (`42`, `true`, `[1,2]`), otherwise as text.
fn parse_filter(raw: &str) -> Result<ColumnFilter> {
    let mut parts = raw.splitn(3, ':');
    let column_id = parts.next().unwrap_or_default();
    let operator_name = parts.next().unwrap_or_default();
    if column_id.is_empty() || operator_name.is_empty() {
        bail!("--filter expects <column>:<operator>[:<value>], got {raw:?}");
    }
    let operator = FilterOperator::parse(operator_name).ok_or_else(|| {
        let known: Vec<&str> = FilterOperator::ALL
            .iter()
            .map(|operator| operator.as_str())
            .collect();
        anyhow!(
            "unknown filter operator {operator_name:?}; use one of: {}",
            known.join(", ")
        )
    })?;
    let value = match parts.next() {
        Some(value) => serde_json::from_str::<Value>(value)
            .map(|json| CellValue::from_json(&json))
            .unwrap_or_else(|_| CellValue::from(value)),
        None if operator.takes_value() => {
            bail!("--filter {raw:?} needs a value for operator {operator_name:?}")
        }
        None => CellValue::Null,
    };
    Ok(ColumnFilter::new(column_id, operator, value))
}

fn parse_positive(raw: &str, flag: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => bail!("{flag} expects a positive integer, got {raw:?}"),
    }
}

fn print_help() {
    println!("sift: filter, sort, and page JSON tables");
    println!("  --config <path>                 Use a specific config path");
    println!("  --table <path>                  JSON table: {{\"columns\": [...], \"rows\": [...]}}");
    println!("  --sort <col>[:asc|:desc]        Sort by a column (repeatable, first wins ties)");
    println!("  --filter <col>:<op>[:<value>]   Filter a column (repeatable)");
    println!("  --search <term>                 Match across all filterable columns");
    println!("  --page <n>                      Show page n (1-based)");
    println!("  --page-size <n>                 Rows per page");
    println!("  --ask <question>                Translate a question into filters and sorting");
    println!("  --json                          Print the page as JSON");
    println!("  --print-config-path             Print resolved config path");
    println!("  --print-example-config          Print a v1 config template");
    println!("  --check                         Validate config, AI provider, and table");
    println!("  --help                          Show this help");
}
