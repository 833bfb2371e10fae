use serde_json::Value;
use std::io;

use super::flatten;

/// Write the result envelope as two-column `field,value` CSV to stdout.
///
/// Nested objects become dotted field names; long arrays are reported by length.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let body = value.get("result").unwrap_or(value);
    let _ = wtr.write_record(["field", "value"]);
    for (field, val) in flatten(body) {
        let _ = wtr.write_record([field.as_str(), val.as_str()]);
    }
    if let Some(Value::Array(warnings)) = value.get("warnings") {
        for w in warnings.iter().filter_map(Value::as_str) {
            let _ = wtr.write_record(["warning", w]);
        }
    }

    let _ = wtr.flush();
}
