use crate::error::CliError;
use engine::flow::FlowReport;

pub fn print_report_json(report: &FlowReport) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report).map_err(CliError::JsonSerialize)?;
    println!("{json}");
    Ok(())
}

pub fn print_report_table(report: &FlowReport) {
    println!("Flow '{}' finished:", report.flow);
    println!("-----------------------------");
    println!("{:<16} {}", "Rows loaded", report.rows_loaded);
    println!("{:<16} {}", "Batches", report.batches);
    println!("{:<16} {} ms", "Elapsed", report.elapsed_ms);
}
