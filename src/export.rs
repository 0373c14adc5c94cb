//! CSV rendering of extracted expenses.

use anyhow::{Context, Result};

use crate::expenses::ExtractedData;

/// One row per item plus a trailing `TOTAL` row. `data.total` is written as is;
/// callers recompute it first if items were edited.
pub fn to_csv(data: &ExtractedData) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let date = data.date.format("%Y-%m-%d").to_string();

    writer.write_record(["date", "merchant", "description", "category", "amount"])?;
    for item in &data.items {
        let amount = format!("{:.2}", item.amount);
        writer.write_record([
            date.as_str(),
            data.merchant.as_str(),
            item.description.as_str(),
            item.category.as_str(),
            amount.as_str(),
        ])?;
    }
    let total = format!("{:.2}", data.total);
    writer.write_record([date.as_str(), data.merchant.as_str(), "TOTAL", "", total.as_str()])?;

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}
