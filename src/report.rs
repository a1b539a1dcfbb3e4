//! Terminal rendering and export of the computed views.

use crate::allocation::Allocation;
use crate::etf::{CatalogStats, Etf, FundProfile};
use crate::evolution::TimeSeries;
use crate::history::SnapshotSummary;
use crate::holding::{CategoricalField, Holding};
use crate::overlap::OverlapEntry;
use crate::source::Comparison;
use crate::stats::{chart_stats, format_compact_number, format_percentage};
use crate::table::{sort_by_field, HoldingField, Page, SortDirection};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, CellAlignment, ContentArrangement, Table};
use piechart::{Chart, Color};
use serde::Serialize;
use std::fmt::Write;
use std::str::FromStr;

const PALETTE: [Color; 8] = [
    Color::Blue,
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Purple,
    Color::Cyan,
    Color::White,
    Color::Black,
];

/// `count` chart colours, repeating the palette when it runs out.
pub fn chart_colors(count: usize) -> Vec<Color> {
    (0..count).map(|i| PALETTE[i % PALETTE.len()]).collect()
}

fn new_table(width: u16) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(width);
    table
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn percent(value: f64) -> Cell {
    right(format_percentage(value, 2))
}

fn or_dash(value: f64) -> String {
    if value > 0.0 {
        format!("{value:.2}")
    } else {
        "-".to_string()
    }
}

pub fn draw_pie_chart(allocation: &Allocation) {
    let colors = chart_colors(allocation.len());
    let data: Vec<piechart::Data> = allocation
        .iter()
        .zip(colors)
        .map(|((label, value), color)| piechart::Data {
            label: label.to_string(),
            value: value as f32,
            color: Some(color.into()),
            fill: '•',
        })
        .collect();

    Chart::new()
        .legend(true)
        .radius(9)
        .aspect_ratio(3)
        .draw(&data);
}

pub fn allocation_table(allocation: &Allocation, field: CategoricalField) -> Table {
    let mut table = new_table(80);
    table.set_header(header(&[field.label(), "Weight"]));
    for (label, value) in allocation.iter() {
        table.add_row(vec![Cell::new(label), percent(value)]);
    }
    table.add_row(vec![
        Cell::new("TOTAL").add_attribute(Attribute::Bold),
        percent(allocation.total()).add_attribute(Attribute::Bold),
    ]);
    table
}

/// One line with the spread of the allocation values.
pub fn allocation_summary(allocation: &Allocation) -> String {
    let stats = chart_stats(&allocation.values);
    format!(
        "{} categories, largest {}, smallest {}, median {}",
        allocation.len(),
        format_percentage(stats.max, 2),
        format_percentage(stats.min, 2),
        format_percentage(stats.median, 2),
    )
}

pub fn holdings_table(page: &Page<&Holding>) -> Table {
    let mut table = new_table(120);
    table.set_header(header(&[
        "Ticker", "Name", "Sector", "Region", "Weight", "Value", "Nominal", "Price",
    ]));
    for holding in &page.items {
        table.add_row(vec![
            Cell::new(holding.get_ticker()),
            Cell::new(holding.get_name()),
            Cell::new(holding.category(CategoricalField::Sector)),
            Cell::new(holding.category(CategoricalField::Region)),
            percent(holding.get_weight()),
            right(or_dash(holding.get_market_value())),
            right(or_dash(holding.get_nominal())),
            right(or_dash(holding.get_price())),
        ]);
    }
    table
}

pub fn page_footer<T>(page: &Page<T>) -> String {
    format!(
        "Page {} of {} ({} holdings)",
        page.current_page,
        page.total_pages.max(1),
        page.total_count
    )
}

pub fn catalog_table(etfs: &[&Etf]) -> Table {
    let mut table = new_table(120);
    table.set_header(header(&[
        "Ticker", "Name", "Type", "Currency", "TER", "AUM", "Updated",
    ]));
    for etf in etfs {
        let updated = etf
            .get_last_update()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(etf.get_ticker()).add_attribute(Attribute::Bold),
            Cell::new(etf.get_name()),
            Cell::new(etf.get_fund_type()),
            Cell::new(etf.get_currency()),
            percent(etf.get_ter()),
            right(format_compact_number(etf.get_aum())),
            right(updated),
        ]);
    }
    table
}

pub fn catalog_summary(stats: &CatalogStats) -> String {
    format!(
        "Total AUM {}, average TER {}, {} currencies, {} fund types",
        format_compact_number(stats.total_aum),
        format_percentage(stats.avg_ter, 2),
        stats.unique_currencies,
        stats.unique_fund_types,
    )
}

fn text_or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn metric_table(rows: Vec<(&str, String)>) -> Table {
    let mut table = new_table(80);
    table.set_header(header(&["Metric", "Value"]));
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), right(value)]);
    }
    table
}

/// Key facts of a fund.
pub fn fund_info_table(etf: &Etf) -> Table {
    let distribution_yield = match etf.get_distribution_return() {
        "" | "-" => "None".to_string(),
        value => format!("{value}%"),
    };
    let updated = etf
        .get_last_update()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    metric_table(vec![
        ("Total Expense Ratio", format_percentage(etf.get_ter(), 2)),
        (
            "Assets Under Management",
            format!("{} {}", format_compact_number(etf.get_aum()), etf.get_currency()),
        ),
        ("Fund Domicile", text_or_dash(etf.get_located_in())),
        ("Base Currency", text_or_dash(etf.get_currency())),
        ("Fund Classification", text_or_dash(etf.get_fund_type())),
        ("Share Class", text_or_dash(etf.get_class())),
        ("Distribution Method", text_or_dash(etf.get_return_method())),
        ("Distribution Yield", distribution_yield),
        ("Last Updated", updated),
    ])
}

pub fn snapshot_summary_table(summary: &SnapshotSummary) -> Table {
    metric_table(vec![
        ("Total Holdings", summary.total_holdings.to_string()),
        ("Total Weight", format_percentage(summary.total_weight, 2)),
        (
            "Top Holding",
            format!("{} ({})", summary.top_ticker, format_percentage(summary.top_weight, 2)),
        ),
        ("Top 10 Concentration", format_percentage(summary.top10_weight, 2)),
        ("Sectors", summary.sectors.to_string()),
        ("Regions", summary.regions.to_string()),
        ("Market Value", or_dash(summary.total_market_value)),
        ("Notional Value", or_dash(summary.total_notional_value)),
    ])
}

pub fn overlap_table(shared: &[&OverlapEntry], ticker1: &str, ticker2: &str) -> Table {
    let mut table = new_table(120);
    table.set_header(header(&["Ticker", "Name", ticker1, ticker2, "Overlap"]));
    for entry in shared {
        table.add_row(vec![
            Cell::new(&entry.ticker),
            Cell::new(&entry.name),
            percent(entry.weight_etf1),
            percent(entry.weight_etf2),
            percent(entry.overlap_weight).add_attribute(Attribute::Bold),
        ]);
    }
    table
}

/// The `max_items` largest positions held by only one of the two funds.
pub fn unique_table(holdings: &[Holding], max_items: usize) -> Table {
    let mut largest: Vec<&Holding> = holdings.iter().collect();
    sort_by_field(&mut largest, HoldingField::Weight, SortDirection::Desc);
    largest.truncate(max_items);

    let mut table = new_table(80);
    table.set_header(header(&["Ticker", "Name", "Weight"]));
    for holding in largest {
        table.add_row(vec![
            Cell::new(holding.get_ticker()),
            Cell::new(holding.get_name()),
            percent(holding.get_weight()),
        ]);
    }
    table
}

pub fn comparison_summary(comparison: &Comparison) -> String {
    let result = &comparison.result;
    format!(
        "{} ({}) vs {} ({}): {} overlap across {} shared holdings, {} / {} unique",
        comparison.etf1.get_ticker().bold(),
        comparison.date1,
        comparison.etf2.get_ticker().bold(),
        comparison.date2,
        format_percentage(result.total_overlap, 2).bold(),
        result.overlap_count(),
        result.unique_etf1.len(),
        result.unique_etf2.len(),
    )
}

pub fn profile_lines(profile: &FundProfile) -> String {
    let mut out = String::new();
    for similarity in &profile.similarities {
        let _ = writeln!(out, "{} {}", "✓".green(), similarity);
    }
    for difference in &profile.differences {
        let _ = writeln!(out, "{} {}", "✗".red(), difference);
    }
    out
}

pub fn evolution_table(series: &TimeSeries) -> Table {
    let mut columns = vec!["Date"];
    columns.extend(series.labels());

    let mut table = new_table(160);
    table.set_header(header(&columns));
    for (i, date) in series.dates.iter().enumerate() {
        let mut row = vec![Cell::new(date)];
        row.extend(series.series.iter().map(|s| percent(s.values[i])));
        table.add_row(row);
    }
    table
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("Unknown export format: {other}")),
        }
    }
}

#[derive(Serialize)]
struct ExportRow<'a> {
    category: &'a str,
    value: f64,
    percentage: String,
}

pub fn export_allocation(allocation: &Allocation, format: ExportFormat) -> Result<String, serde_json::Error> {
    match format {
        ExportFormat::Json => {
            let rows: Vec<ExportRow<'_>> = allocation
                .iter()
                .map(|(category, value)| ExportRow {
                    category,
                    value,
                    percentage: format_percentage(value, 2),
                })
                .collect();
            serde_json::to_string_pretty(&rows)
        }
        ExportFormat::Csv => {
            let mut out = String::from("Category,Value,Percentage");
            for (category, value) in allocation.iter() {
                let _ = write!(
                    out,
                    "\n\"{}\",{},{}",
                    category.replace('"', "\"\""),
                    value,
                    format_percentage(value, 2)
                );
            }
            Ok(out)
        }
    }
}
