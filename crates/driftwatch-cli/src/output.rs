use driftwatch_core::Envelope;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(envelope: &Envelope<Value>, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => println!("{}", to_json(envelope, pretty)?),
        OutputFormat::Table => print!("{}", render_table(envelope)?),
    }

    Ok(())
}

fn to_json(envelope: &Envelope<Value>, pretty: bool) -> Result<String, CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(envelope)?
    } else {
        serde_json::to_string(envelope)?
    };
    Ok(payload)
}

fn render_table(envelope: &Envelope<Value>) -> Result<String, CliError> {
    let mut out = String::new();
    out.push_str(&format!("request_id  : {}\n", envelope.meta.request_id));
    out.push_str(&format!("schema      : {}\n", envelope.meta.schema_version));
    out.push_str(&format!("generated_at: {}\n", envelope.meta.generated_at));
    out.push_str(&format!("latency_ms  : {}\n", envelope.meta.latency_ms));

    if !envelope.meta.warnings.is_empty() {
        out.push_str("warnings:\n");
        for warning in &envelope.meta.warnings {
            out.push_str(&format!("  - {warning}\n"));
        }
    }

    match outlier_rows(&envelope.data) {
        Some(rows) => out.push_str(&rows),
        None => {
            out.push_str("data:\n");
            let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
            for line in pretty_data.lines() {
                out.push_str(&format!("  {line}\n"));
            }
        }
    }

    if !envelope.errors.is_empty() {
        out.push_str("errors:\n");
        for error in &envelope.errors {
            out.push_str(&format!("  - {}: {}\n", error.code, error.message));
        }
    }

    Ok(out)
}

/// Snapshot payloads get a ranked table instead of raw JSON.
fn outlier_rows(data: &Value) -> Option<String> {
    let outliers = data.get("outliers")?.as_array()?;

    let mut out = String::new();
    let threshold = data
        .get("threshold")
        .and_then(Value::as_f64)
        .map_or_else(|| String::from("unbounded"), |value| format!("{value:.6}"));
    out.push_str(&format!("threshold   : {threshold}\n"));
    out.push_str(&format!(
        "{:>4}  {:<20} {:>5} {:>10} {:>12} {:>12}\n",
        "rank", "symbol", "score", "weight", "last", "deviation"
    ));

    let benchmark = data.get("benchmark").filter(|value| !value.is_null());
    let unranked_benchmark = benchmark.filter(|value| value["rank"].as_u64() == Some(0));
    for row in outliers.iter().chain(unranked_benchmark) {
        let rank = match row["rank"].as_u64() {
            Some(0) | None => String::from("-"),
            Some(rank) => rank.to_string(),
        };
        let marker = if row["benchmark"].as_bool() == Some(true) {
            " *"
        } else {
            ""
        };
        out.push_str(&format!(
            "{:>4}  {:<20} {:>5} {:>10.3} {:>12.6} {:>12.6}{marker}\n",
            rank,
            row["symbol"].as_str().unwrap_or_default(),
            row["score"].as_u64().unwrap_or_default(),
            row["weight"].as_f64().unwrap_or_default(),
            row["last_value"].as_f64().unwrap_or_default(),
            row["deviation"].as_f64().unwrap_or_default(),
        ));
    }

    if outliers.is_empty() {
        out.push_str("  (no symbol above threshold)\n");
    }
    Some(out)
}
