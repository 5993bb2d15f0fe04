pub mod report;
pub mod run;

use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use tagger_sync::Summary;

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "error type")]
    error_type: String,
    #[tabled(rename = "count")]
    count: usize,
}

/// Per-type failure counts, every type listed even at zero.
pub(crate) fn print_summary(summary: &Summary) {
    let rows: Vec<SummaryRow> = summary
        .iter()
        .map(|(error_type, count)| SummaryRow {
            error_type: error_type.to_string(),
            count,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());

    let total = summary.total();
    let headline = format!("Error summary ({total} total)");
    if total == 0 {
        println!("{}", headline.green().bold());
    } else {
        println!("{}", headline.yellow().bold());
    }
    println!("{table}");
}
