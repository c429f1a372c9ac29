//! Output formatters for run reports

use anyhow::Result;
use colored::*;
use nationwide_core::RunReport;

/// Print the run summary in human-readable format with colors
pub fn print_human(report: &RunReport) {
    println!(
        "{}",
        format!("Nationwide report: {}", report.output.display()).bold()
    );
    if let Some(date) = &report.report_date {
        println!("  {} {}", "Inventory date:".bold(), date.cyan());
    }
    println!();

    println!("{}", "Rows:".bold().underline());
    println!("  {} {}", "Read:".bold(), report.input_rows);
    println!("  {} {}", "Written:".green().bold(), report.written_rows);
    print_count("Duplicates:", report.duplicates, false);
    print_count("Unresolved codes:", report.unresolved, true);
    print_count("Malformed:", report.malformed, true);
    print_count("Blank:", report.blank, false);
    print_count("MSRP n/a:", report.msrp_not_available, false);

    let warnings = &report.parse_warnings;
    if warnings.total() > 0 {
        println!();
        println!("{}", "Numbers written as 0:".yellow().bold().underline());
        for (field, count) in [
            ("year", warnings.year),
            ("miles", warnings.miles),
            ("price", warnings.price),
            ("msrp", warnings.msrp),
        ] {
            if count > 0 {
                println!("  {} {}", format!("{}:", field).yellow(), count);
            }
        }
    }

    println!();
    if report.has_warnings() {
        println!("{}", "✓ Report written with warnings".yellow().bold());
    } else {
        println!("{}", "✓ Report written".green().bold());
    }
}

fn print_count(label: &str, count: usize, warn: bool) {
    if count == 0 {
        return;
    }
    let label = if warn {
        label.yellow().bold()
    } else {
        label.bright_black().bold()
    };
    println!("  {} {}", label, count);
}

/// Print the run summary in JSON format
pub fn print_json(report: &RunReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
