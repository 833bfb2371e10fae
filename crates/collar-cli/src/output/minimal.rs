use serde_json::Value;

use super::format_scalar;

/// Dotted paths of the headline figure for each command, in priority order.
const HEADLINE_PATHS: [&str; 3] = [
    "summary.collar_value.per_share",
    "statistics.mean",
    "band",
];

/// Print just the headline figure of the result.
pub fn print_minimal(value: &Value) {
    let body = value.get("result").unwrap_or(value);

    for path in HEADLINE_PATHS {
        if let Some(found) = lookup(body, path) {
            if !found.is_null() {
                println!("{}", format_scalar(found));
                return;
            }
        }
    }

    println!("{}", format_scalar(body));
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, key| v.get(key))
}
