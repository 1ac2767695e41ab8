//! Output formatting - Human and JSON renderings of command results
//!
//! Commands write through an [`OutputFormatter`] chosen by the global
//! `--json` flag. Records are rendered as labelled fields or one line per
//! record in human mode, and as their stored document layout in JSON mode.

use tfm_core::domain::AuditRecord;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {
        // Human formatter doesn't print JSON
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

/// One-line description of a record for listings
pub fn record_line(record: &AuditRecord) -> String {
    format!(
        "#{:<5} {:<12} {}  {}  (modified {})",
        record.sequence(),
        record.state().as_str(),
        record.id(),
        record.owner().id,
        record.last_modified_at().format("%Y-%m-%d %H:%M:%S")
    )
}

/// Prints a single record in the selected format
pub fn print_record(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    title: &str,
    record: &AuditRecord,
) {
    if format == OutputFormat::Json {
        formatter.print_json(&serde_json::to_value(record).unwrap_or_default());
        return;
    }

    formatter.success(title);
    formatter.info(&format!("Id:         {}", record.id()));
    formatter.info(&format!("Sequence:   {}", record.sequence()));
    formatter.info(&format!("State:      {}", record.state()));
    formatter.info(&format!("Owner:      {}", record.owner().id));
    formatter.info(&format!(
        "Created:    {}",
        record.created_at().format("%Y-%m-%d %H:%M:%S")
    ));
    formatter.info(&format!(
        "Modified:   {}",
        record.last_modified_at().format("%Y-%m-%d %H:%M:%S")
    ));
    formatter.info(&format!("Categories: {}", record.answers().len()));
    if let Some(summary) = record.summary() {
        formatter.info(&format!("Assets:     {}", summary.total_assets));
        if let Some(date) = &summary.formatted_date {
            formatter.info(&format!("Completed:  {}", date));
        }
    }
}

/// Prints a list of records in the selected format
pub fn print_records(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    title: &str,
    records: &[AuditRecord],
) {
    if format == OutputFormat::Json {
        let json = serde_json::json!({
            "count": records.len(),
            "records": records,
        });
        formatter.print_json(&json);
        return;
    }

    if records.is_empty() {
        formatter.info("No records found.");
        return;
    }

    formatter.success(&format!("{} ({} records)", title, records.len()));
    for record in records {
        formatter.info(&record_line(record));
    }
}
