use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::flatten;

/// Format output as a two-column table using the tabled crate.
pub fn print_table(value: &Value) {
    let body = value.get("result").unwrap_or(value);

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (field, val) in flatten(body) {
        builder.push_record([field, val]);
    }
    println!("{}", Table::from(builder));

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = value.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
