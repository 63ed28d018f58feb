use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tera::{Tera, Value};

fn weight_formatter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value.as_f64() {
        Some(weight) => Ok(Value::String(format!("{weight:.2}"))),
        None => Err(tera::Error::msg("Could not format weight")),
    }
}

fn day_formatter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value.as_str().map(str::parse::<DateTime<Utc>>) {
        Some(Ok(at)) => Ok(Value::String(at.format("%Y-%m-%d").to_string())),
        _ => Err(tera::Error::msg("Could not format date")),
    }
}

/// Templates are compiled into the binary.
pub fn load() -> tera::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../../templates/base.html")),
        ("index.html", include_str!("../../templates/index.html")),
        ("catch_form.html", include_str!("../../templates/catch_form.html")),
        ("leaderboard.html", include_str!("../../templates/leaderboard.html")),
        ("feed.html", include_str!("../../templates/feed.html")),
        ("admin.html", include_str!("../../templates/admin.html")),
        ("status.html", include_str!("../../templates/status.html")),
    ])?;
    tera.register_filter("lbs", weight_formatter);
    tera.register_filter("day", day_formatter);
    Ok(tera)
}
