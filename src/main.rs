use anyhow::{Context, Result};
use bebras_dashboard::dashboard::Dashboard;
use bebras_dashboard::filter::{Dimension, FilterSelection};
use bebras_dashboard::models::Config;
use bebras_dashboard::report;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let filter_arg = |id: &'static str, long: &'static str, help: &'static str| {
        Arg::new(id)
            .long(long)
            .value_name("VALUE")
            .help(help)
            .action(ArgAction::Append)
            .value_delimiter(',')
    };

    Command::new("bebras-dashboard")
        .version("0.1")
        .about("Summary statistics over Bebras Challenge results")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("dashboard.toml"),
        )
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .value_name("FILE")
                .help("Results table, overrides data_file from the config"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Directory for report files, overrides output_directory"),
        )
        .arg(filter_arg("province", "province", "Keep only these provinces"))
        .arg(filter_arg("city", "city", "Keep only these cities/regencies"))
        .arg(filter_arg("category", "category", "Keep only these categories"))
        .arg(filter_arg("grade", "grade", "Keep only these grades"))
        .arg(
            Arg::new("top-k")
                .long("top-k")
                .value_name("N")
                .help("Number of top participants to list")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("top-schools")
                .long("top-schools")
                .value_name("N")
                .help("Number of schools to rank (5-30)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print results as JSON instead of the text summary")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-options")
                .long("list-options")
                .help("List the values each filter offers and exit")
                .action(ArgAction::SetTrue),
        )
}

fn selection_from(matches: &ArgMatches) -> FilterSelection {
    let mut selection = FilterSelection::new();
    for (id, dimension) in [
        ("province", Dimension::Province),
        ("city", Dimension::City),
        ("category", Dimension::Category),
        ("grade", Dimension::Grade),
    ] {
        if let Some(values) = matches.get_many::<String>(id) {
            selection = selection.with(
                dimension,
                values.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
            );
        }
    }
    selection
}

fn load_config(config_file: &str) -> Result<Config> {
    if Path::new(config_file).exists() {
        info!(file = config_file, "loading configuration");
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to read configuration: {}", config_file))
    } else {
        let config = Config::default();
        config
            .save_to_file(config_file)
            .with_context(|| format!("Failed to write default configuration: {}", config_file))?;
        println!("📝 Created default configuration file: {}", config_file);
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("dashboard.toml");
    let mut config = load_config(config_file)?;

    if let Some(data) = matches.get_one::<String>("data") {
        config.data_file = data.clone();
    }
    if let Some(output) = matches.get_one::<String>("output") {
        config.output_directory = Some(output.clone());
    }
    if let Some(top_k) = matches.get_one::<usize>("top-k") {
        config.top_k = *top_k;
    }
    if let Some(top_schools) = matches.get_one::<usize>("top-schools") {
        config.top_schools = *top_schools;
    }

    let dashboard = Dashboard::open(&config)
        .with_context(|| format!("Cannot start without the results table ({})", config.data_file))?;

    let requested = selection_from(&matches);
    let selection = dashboard.options().cascade(&requested);
    let mut notices = dashboard.notices().to_vec();
    for notice in dashboard.options().ignored(&requested) {
        warn!(%notice, "filter value dropped");
        notices.push(notice);
    }

    if matches.get_flag("list-options") {
        print!("{}", report::render_options(dashboard.options(), &selection));
        return Ok(());
    }

    let results = dashboard.recompute(&selection);

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", report::render_summary(&results, &selection, &notices));
    }

    if let Some(output_dir) = &config.output_directory {
        let view = dashboard.view(&selection);
        report::write_reports(&results, &view, &selection, &notices, Path::new(output_dir))?;
        println!("📂 Reports written to: {}", output_dir);
    }

    Ok(())
}
