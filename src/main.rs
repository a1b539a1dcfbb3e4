use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{arg, value_parser, ArgMatches, Command};
use colored::Colorize;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use etfscope::allocation::{self, DEFAULT_LIMIT};
use etfscope::etf::{catalog_stats, filter_catalog, CatalogFilter, EtfField, FundProfile};
use etfscope::evolution::{self, DEFAULT_TOP_N};
use etfscope::history::{parse_iso_date, snapshot_dates, snapshot_summary};
use etfscope::holding::CategoricalField;
use etfscope::overlap::DEFAULT_MAX_SHARED;
use etfscope::report::{self, ExportFormat};
use etfscope::source::DataSource;
use etfscope::table::{paginate, search, sort_by_field, HoldingField, SortDirection, DEFAULT_PAGE_SIZE};

const APP_NAME: &str = "etfscope";
const CONFIG_NAME: &str = "config";

#[derive(Serialize, Deserialize)]
struct Config {
    data_dir: String,
    allocation_limit: usize,
    evolution_top_n: usize,
    compare_max_items: usize,
    page_size: usize,
    cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            allocation_limit: DEFAULT_LIMIT,
            evolution_top_n: DEFAULT_TOP_N,
            compare_max_items: DEFAULT_MAX_SHARED,
            page_size: DEFAULT_PAGE_SIZE,
            cache_ttl_secs: 300,
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    parse_iso_date(value).ok_or_else(|| format!("expected a date like 2024-03-31, got {value}"))
}

fn etf_arg(name: &'static str) -> clap::Arg {
    arg!(<ETF> "ETF id or ticker").id(name).value_name(name)
}

fn by_arg() -> clap::Arg {
    arg!(--by <FIELD> "Group by sector, asset_class, region or currency")
        .value_parser(CategoricalField::from_str)
}

fn cli() -> Command {
    Command::new("etfscope")
        .about("Browse ETF holdings, allocations and overlaps")
        .arg_required_else_help(true)
        .arg(arg!(--"data-dir" <DIR> "Directory with etfs.json and histories/").global(true))
        .subcommand(Command::new("config").about("Print the path to the config file"))
        .subcommand(
            Command::new("list")
                .about("List the ETF catalog")
                .arg(arg!(--search <TERM> "Filter by name or ticker"))
                .arg(arg!(--currency <CURRENCY> "Only funds in this currency"))
                .arg(arg!(--"fund-type" <TYPE> "Only funds of this type"))
                .arg(
                    arg!(--sort <COLUMN> "Sort by name, ticker, aum, ter or last_update")
                        .value_parser(EtfField::from_str),
                )
                .arg(arg!(--asc "Sort ascending")),
        )
        .subcommand(
            Command::new("info")
                .about("Show the profile of an ETF and a summary of its holdings")
                .arg(etf_arg("ETF"))
                .arg(arg!(--date <DATE> "Snapshot date, latest if omitted").value_parser(parse_date)),
        )
        .subcommand(
            Command::new("holdings")
                .about("Show the holdings of an ETF")
                .arg(etf_arg("ETF"))
                .arg(arg!(--date <DATE> "Snapshot date, latest if omitted").value_parser(parse_date))
                .arg(arg!(--search <TERM> "Filter by name or ticker"))
                .arg(
                    arg!(--sort <COLUMN> "Sort by ticker, name, sector, region, currency, weight, market_value or price")
                        .value_parser(HoldingField::from_str),
                )
                .arg(arg!(--asc "Sort ascending"))
                .arg(arg!(--page <N> "Page number").value_parser(value_parser!(usize))),
        )
        .subcommand(
            Command::new("allocation")
                .about("Show how an ETF is allocated across categories")
                .arg(etf_arg("ETF"))
                .arg(by_arg())
                .arg(arg!(--date <DATE> "Snapshot date, latest if omitted").value_parser(parse_date))
                .arg(arg!(--limit <N> "Number of slices including Others").value_parser(value_parser!(usize)))
                .arg(arg!(--"no-others" "Drop the tail instead of folding it into Others"))
                .arg(arg!(--export <FORMAT> "Print as csv or json").value_parser(ExportFormat::from_str)),
        )
        .subcommand(
            Command::new("evolution")
                .about("Show how the allocation of an ETF changed over time")
                .arg(etf_arg("ETF"))
                .arg(by_arg())
                .arg(arg!(--top <N> "Number of categories").value_parser(value_parser!(usize))),
        )
        .subcommand(
            Command::new("compare")
                .about("Compare the holdings of two ETFs")
                .arg(etf_arg("ETF1"))
                .arg(etf_arg("ETF2"))
                .arg(arg!(--date1 <DATE> "Snapshot date of the first ETF").value_parser(parse_date))
                .arg(arg!(--date2 <DATE> "Snapshot date of the second ETF").value_parser(parse_date))
                .arg(arg!(--max <N> "Number of shared holdings shown").value_parser(value_parser!(usize))),
        )
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_source(cfg: &Config, matches: &ArgMatches) -> DataSource {
    let data_dir = matches
        .get_one::<String>("data-dir")
        .cloned()
        .unwrap_or_else(|| cfg.data_dir.clone());
    DataSource::new(data_dir, Duration::from_secs(cfg.cache_ttl_secs))
}

fn direction(matches: &ArgMatches) -> SortDirection {
    if matches.get_flag("asc") {
        SortDirection::Asc
    } else {
        SortDirection::Desc
    }
}

fn etf_key<'a>(matches: &'a ArgMatches, id: &str) -> &'a str {
    matches.get_one::<String>(id).map(String::as_str).unwrap_or_default()
}

fn list(cfg: &Config, matches: &ArgMatches) -> Result<()> {
    let mut source = open_source(cfg, matches);
    let catalog = source.catalog().wrap_err("Could not load the ETF catalog")?;

    let filter = CatalogFilter {
        search: matches.get_one::<String>("search").cloned().unwrap_or_default(),
        currency: matches.get_one::<String>("currency").cloned(),
        fund_type: matches.get_one::<String>("fund-type").cloned(),
        sort_by: matches.get_one::<EtfField>("sort").copied().unwrap_or_default(),
        order: direction(matches),
    };
    let found = filter_catalog(&catalog, &filter);
    if found.is_empty() {
        println!("No ETFs found.");
        return Ok(());
    }

    println!("{}", report::catalog_table(&found));
    if let Some(stats) = catalog_stats(&catalog) {
        println!("{}", report::catalog_summary(&stats));
    }
    Ok(())
}

fn info(cfg: &Config, matches: &ArgMatches) -> Result<()> {
    let mut source = open_source(cfg, matches);
    let key = etf_key(matches, "ETF");
    let etf = source.etf(key).wrap_err("Could not look up the ETF")?;

    println!("{} {}", etf.get_ticker().bold(), etf.get_name());
    println!("{}", report::fund_info_table(&etf));

    let histories = source
        .histories(etf.get_id())
        .wrap_err_with(|| format!("Could not load the history of {}", etf.get_ticker()))?;
    let dates = snapshot_dates(&histories);
    if dates.is_empty() {
        println!("No holdings history.");
        return Ok(());
    }
    let listed: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
    println!("Snapshots: {}", listed.join(", "));

    let date = matches.get_one::<NaiveDate>("date").copied();
    let snapshot = source
        .history_at(etf.get_id(), date)
        .wrap_err_with(|| format!("Could not load the holdings of {}", etf.get_ticker()))?;
    match snapshot_summary(&snapshot) {
        Some(summary) => {
            println!("Portfolio as of {}", snapshot.get_date());
            println!("{}", report::snapshot_summary_table(&summary));
        }
        None => println!("No holdings on {}.", snapshot.get_date()),
    }
    Ok(())
}

fn holdings(cfg: &Config, matches: &ArgMatches) -> Result<()> {
    let mut source = open_source(cfg, matches);
    let key = etf_key(matches, "ETF");
    let etf = source.etf(key).wrap_err("Could not look up the ETF")?;
    let date = matches.get_one::<NaiveDate>("date").copied();
    let snapshot = source
        .history_at(etf.get_id(), date)
        .wrap_err_with(|| format!("Could not load the holdings of {}", etf.get_ticker()))?;

    let term = matches.get_one::<String>("search").map(String::as_str).unwrap_or_default();
    let mut found = search(snapshot.holdings(), term);
    let field = matches.get_one::<HoldingField>("sort").copied().unwrap_or_default();
    sort_by_field(&mut found, field, direction(matches));

    let page_no = matches.get_one::<usize>("page").copied().unwrap_or(1);
    let page = paginate(&found, page_no, cfg.page_size);

    println!(
        "{} {} as of {}",
        etf.get_ticker().bold(),
        etf.get_name(),
        snapshot.get_date()
    );
    println!("{}", report::holdings_table(&page));
    println!("{}", report::page_footer(&page));
    Ok(())
}

fn allocation(cfg: &Config, matches: &ArgMatches) -> Result<()> {
    let mut source = open_source(cfg, matches);
    let key = etf_key(matches, "ETF");
    let etf = source.etf(key).wrap_err("Could not look up the ETF")?;
    let date = matches.get_one::<NaiveDate>("date").copied();
    let snapshot = source
        .history_at(etf.get_id(), date)
        .wrap_err_with(|| format!("Could not load the holdings of {}", etf.get_ticker()))?;

    let field = matches.get_one::<CategoricalField>("by").copied().unwrap_or_default();
    let limit = matches.get_one::<usize>("limit").copied().unwrap_or(cfg.allocation_limit);
    let include_others = !matches.get_flag("no-others");
    let allocation = allocation::aggregate(snapshot.holdings(), field, limit, include_others);

    if let Some(format) = matches.get_one::<ExportFormat>("export") {
        let exported =
            report::export_allocation(&allocation, *format).wrap_err("Could not export the allocation")?;
        println!("{exported}");
        return Ok(());
    }
    if allocation.is_empty() {
        println!("{} has no holdings on {}.", etf.get_ticker(), snapshot.get_date());
        return Ok(());
    }

    println!(
        "{} of {} as of {}",
        field.label().bold(),
        etf.get_ticker(),
        snapshot.get_date()
    );
    report::draw_pie_chart(&allocation);
    println!("{}", report::allocation_table(&allocation, field));
    println!("{}", report::allocation_summary(&allocation));
    Ok(())
}

fn evolution(cfg: &Config, matches: &ArgMatches) -> Result<()> {
    let mut source = open_source(cfg, matches);
    let key = etf_key(matches, "ETF");
    let etf = source.etf(key).wrap_err("Could not look up the ETF")?;
    let histories = source
        .histories(etf.get_id())
        .wrap_err_with(|| format!("Could not load the history of {}", etf.get_ticker()))?;

    let field = matches.get_one::<CategoricalField>("by").copied().unwrap_or_default();
    let top_n = matches.get_one::<usize>("top").copied().unwrap_or(cfg.evolution_top_n);
    let series = evolution::project(&histories, field, top_n);
    if series.dates.is_empty() {
        println!("{} has no history.", etf.get_ticker());
        return Ok(());
    }

    println!("{} of {} over time", field.label().bold(), etf.get_ticker());
    println!("{}", report::evolution_table(&series));
    Ok(())
}

fn compare(cfg: &Config, matches: &ArgMatches) -> Result<()> {
    let mut source = open_source(cfg, matches);
    let comparison = source
        .compare(
            etf_key(matches, "ETF1"),
            etf_key(matches, "ETF2"),
            matches.get_one::<NaiveDate>("date1").copied(),
            matches.get_one::<NaiveDate>("date2").copied(),
        )
        .wrap_err("Could not compare the ETFs")?;
    let max_items = matches.get_one::<usize>("max").copied().unwrap_or(cfg.compare_max_items);

    let ticker1 = comparison.etf1.get_ticker();
    let ticker2 = comparison.etf2.get_ticker();
    println!("{}", report::comparison_summary(&comparison));
    print!(
        "{}",
        report::profile_lines(&FundProfile::between(&comparison.etf1, &comparison.etf2))
    );

    let shared = comparison.result.top_shared(max_items);
    if shared.is_empty() {
        println!("No shared holdings.");
    } else {
        println!("{}", report::overlap_table(&shared, ticker1, ticker2));
    }

    println!("Only in {}", ticker1.bold());
    println!("{}", report::unique_table(&comparison.result.unique_etf1, max_items));
    println!("Only in {}", ticker2.bold());
    println!("{}", report::unique_table(&comparison.result.unique_etf2, max_items));
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let cfg: Config = confy::load(APP_NAME, CONFIG_NAME).wrap_err("Could not load the config file")?;

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("config", _)) => {
            let path = confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
                .wrap_err("Could not locate the config file")?;
            println!("Your config file is located here: \n{}", path.display());
            Ok(())
        }
        Some(("list", m)) => list(&cfg, m),
        Some(("info", m)) => info(&cfg, m),
        Some(("holdings", m)) => holdings(&cfg, m),
        Some(("allocation", m)) => allocation(&cfg, m),
        Some(("evolution", m)) => evolution(&cfg, m),
        Some(("compare", m)) => compare(&cfg, m),
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli() {
        let matches = cli().get_matches_from(vec!["etfscope", "allocation", "IWDA"]);
        assert_eq!(matches.subcommand_name(), Some("allocation"));
    }

    #[test]
    fn test_cli_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn test_allocation_args() {
        let matches = cli().get_matches_from(vec![
            "etfscope", "allocation", "IWDA", "--by", "region", "--limit", "5", "--no-others",
            "--export", "json",
        ]);
        let (_, m) = matches.subcommand().unwrap();
        assert_eq!(etf_key(m, "ETF"), "IWDA");
        assert_eq!(m.get_one::<CategoricalField>("by"), Some(&CategoricalField::Region));
        assert_eq!(m.get_one::<usize>("limit"), Some(&5));
        assert!(m.get_flag("no-others"));
        assert_eq!(m.get_one::<ExportFormat>("export"), Some(&ExportFormat::Json));
    }

    #[test]
    fn test_compare_args() {
        let matches = cli().get_matches_from(vec![
            "etfscope", "compare", "IWDA", "VWCE", "--date1", "2024-03-31", "--data-dir", "/tmp/etfs",
        ]);
        let (_, m) = matches.subcommand().unwrap();
        assert_eq!(etf_key(m, "ETF1"), "IWDA");
        assert_eq!(etf_key(m, "ETF2"), "VWCE");
        assert_eq!(
            m.get_one::<NaiveDate>("date1").copied(),
            NaiveDate::from_ymd_opt(2024, 3, 31)
        );
        assert!(m.get_one::<NaiveDate>("date2").is_none());
        assert_eq!(m.get_one::<String>("data-dir").map(String::as_str), Some("/tmp/etfs"));
    }

    #[test]
    fn test_info_args() {
        let matches = cli().get_matches_from(vec!["etfscope", "info", "IWDA", "--date", "2024-03-31"]);
        let (name, m) = matches.subcommand().unwrap();
        assert_eq!(name, "info");
        assert_eq!(etf_key(m, "ETF"), "IWDA");
        assert_eq!(m.get_one::<NaiveDate>("date").copied(), NaiveDate::from_ymd_opt(2024, 3, 31));
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(cli()
            .try_get_matches_from(vec!["etfscope", "allocation", "IWDA", "--by", "colour"])
            .is_err());
        assert!(cli()
            .try_get_matches_from(vec!["etfscope", "holdings", "IWDA", "--date", "31.03.2024"])
            .is_err());
    }

    #[test]
    fn test_open_source_prefers_flag() {
        let cfg = Config::default();
        let matches = cli().get_matches_from(vec!["etfscope", "list", "--data-dir", "/srv/etfs"]);
        let (_, m) = matches.subcommand().unwrap();
        assert_eq!(open_source(&cfg, m).root(), std::path::Path::new("/srv/etfs"));

        let matches = cli().get_matches_from(vec!["etfscope", "list"]);
        let (_, m) = matches.subcommand().unwrap();
        assert_eq!(open_source(&cfg, m).root(), std::path::Path::new("./data"));
    }
}
