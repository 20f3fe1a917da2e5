//! Output formatting for CLI commands.

use colored::Colorize;
use serde::Serialize;
use serde_json::{json, Value};
use tabled::{Table, Tabled};

const CLI_SCHEMA_VERSION: &str = "minikeda.cli.v1";

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

/// Print data in the specified format.
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No items found.".dimmed());
            } else {
                println!("{}", Table::new(data));
            }
        }
        OutputFormat::Json => println!("{}", format_json(data)),
    }
}

/// Print a single item as JSON.
pub fn print_single<T: Serialize>(data: &T) {
    println!("{}", format_json(data));
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "Warning:".yellow().bold(), message);
}

/// Print a titled block of raw tool output.
pub fn print_section(title: &str, body: &str) {
    println!("{}", format!("== {title} ==").bold());
    if body.trim().is_empty() {
        println!("{}", "(no output)".dimmed());
    } else {
        println!("{}", body.trim_end());
    }
    println!();
}

#[derive(Debug, Serialize)]
pub struct ReceiptNextStep {
    pub label: &'static str,
    pub cmd: String,
}

pub struct Receipt<'a, T: Serialize> {
    pub message: String,
    pub status: &'a str,
    pub kind: &'a str,
    pub resource_key: &'a str,
    pub resource: &'a T,
    pub next: &'a [ReceiptNextStep],
}

/// `{"receipt": {kind, status, next, <resource_key>: resource}}`.
pub fn receipt_value<T: Serialize>(
    status: &str,
    kind: &str,
    resource_key: &str,
    resource: &T,
    next: &[ReceiptNextStep],
) -> Value {
    let mut receipt = json!({ "kind": kind, "status": status, "next": next });
    receipt[resource_key] = serde_json::to_value(resource).unwrap_or(Value::Null);
    json!({ "receipt": receipt })
}

pub fn print_receipt<T: Serialize>(format: OutputFormat, receipt: Receipt<'_, T>) {
    match format {
        OutputFormat::Table => {
            print_success(&receipt.message);
            for step in receipt.next {
                print_info(&format!("{}: {}", step.label, step.cmd));
            }
        }
        OutputFormat::Json => {
            let out = receipt_value(
                receipt.status,
                receipt.kind,
                receipt.resource_key,
                receipt.resource,
                receipt.next,
            );
            print_single(&out);
        }
    }
}

/// Every JSON document the CLI prints.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a, T: ?Sized> {
    schema_version: &'static str,
    data: &'a T,
}

fn format_json<T: Serialize + ?Sized>(data: &T) -> String {
    // Going through `Value` sorts object keys (its map is a BTreeMap).
    let value = serde_json::to_value(Envelope {
        schema_version: CLI_SCHEMA_VERSION,
        data,
    })
    .unwrap_or(Value::Null);
    serde_json::to_string_pretty(&value).unwrap_or_default()
}
