//! Turns raw receipt text into itemised expenses.
//!
//! Pure functions, no async. Each line carrying a two-decimal amount becomes
//! one item; the parse never fails and never returns an empty item list.

use chrono::{Local, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const PLACEHOLDER_DESCRIPTION: &str = "Extracted content (no structured data found)";
pub const UNKNOWN_MERCHANT: &str = "Unknown";
const FALLBACK_DESCRIPTION: &str = "Item";

lazy_static! {
    /// ASCII digits, one `.` or `,`, exactly two digits. No sign, no grouping.
    static ref AMOUNT: Regex = Regex::new(r"[0-9]+[.,][0-9]{2}").unwrap();

    static ref DATE_DMY: Regex = Regex::new(
        r"\b([0-9]{1,2})[./\-]([0-9]{1,2})[./\-]([0-9]{4}|[0-9]{2})\b"
    ).unwrap();

    static ref DATE_YMD: Regex = Regex::new(
        r"\b([0-9]{4})[./\-]([0-9]{1,2})[./\-]([0-9]{1,2})\b"
    ).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExpenseCategory {
    #[serde(rename = "Food & Beverage")]
    FoodAndBeverage,
    Transportation,
    Accommodation,
    #[serde(rename = "Office Supplies")]
    OfficeSupplies,
    #[default]
    Other,
}

impl ExpenseCategory {
    /// Display name, identical to the serialised form.
    pub fn as_str(self) -> &'static str {
        match self {
            ExpenseCategory::FoodAndBeverage => "Food & Beverage",
            ExpenseCategory::Transportation => "Transportation",
            ExpenseCategory::Accommodation => "Accommodation",
            ExpenseCategory::OfficeSupplies => "Office Supplies",
            ExpenseCategory::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub category: ExpenseCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub items: Vec<ExpenseItem>,
    pub total: Decimal,
    pub date: NaiveDate,
    pub merchant: String,
}

impl ExtractedData {
    /// Reset `total` to the exact sum of the current item amounts.
    pub fn recompute_total(&mut self) -> Decimal {
        self.total = self.items.iter().map(|i| i.amount).sum();
        self.total
    }
}

/// Parse raw text, defaulting the date to today.
pub fn parse(raw_text: &str) -> ExtractedData {
    parse_with_date(raw_text, Local::now().date_naive())
}

/// Parse raw text; `today` is used when no date is found in the text.
pub fn parse_with_date(raw_text: &str, today: NaiveDate) -> ExtractedData {
    let lines: Vec<&str> = raw_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut items: Vec<ExpenseItem> = lines.iter().filter_map(|l| parse_line(l)).collect();
    let total: Decimal = items.iter().map(|i| i.amount).sum();

    if items.is_empty() {
        items.push(ExpenseItem {
            description: PLACEHOLDER_DESCRIPTION.to_string(),
            amount: Decimal::ZERO,
            category: ExpenseCategory::Other,
        });
    }

    ExtractedData {
        items,
        total,
        date: detect_date(raw_text).unwrap_or(today),
        merchant: guess_merchant(&lines).unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
    }
}

/// One item per line, governed by the first amount token only.
fn parse_line(line: &str) -> Option<ExpenseItem> {
    let m = AMOUNT.find(line)?;
    // a signed amount is not an amount
    if line[..m.start()].ends_with('-') {
        return None;
    }
    let amount = Decimal::from_str(&m.as_str().replace(',', ".")).ok()?;

    let rest = format!("{}{}", &line[..m.start()], &line[m.end()..]);
    let rest = rest.trim();
    let description = if rest.is_empty() {
        FALLBACK_DESCRIPTION.to_string()
    } else {
        rest.to_string()
    };

    Some(ExpenseItem {
        description,
        amount,
        category: ExpenseCategory::Other,
    })
}

/// First valid calendar date in the text, day-first before year-first.
fn detect_date(text: &str) -> Option<NaiveDate> {
    let dmy = DATE_DMY.captures_iter(text).find_map(|caps| {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = parse_year(&caps[3])?;
        NaiveDate::from_ymd_opt(year, month, day)
    });

    dmy.or_else(|| {
        DATE_YMD.captures_iter(text).find_map(|caps| {
            let year: i32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            let day: u32 = caps[3].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })
    })
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    Some(if s.len() == 2 { 2000 + year } else { year })
}

/// Receipts usually open with the shop name.
fn guess_merchant(lines: &[&str]) -> Option<String> {
    let first = lines.first()?;
    let cleaned = first
        .trim_matches(|c: char| matches!(c, '#' | '*' | '|' | '_') || c.is_whitespace())
        .to_string();

    if AMOUNT.is_match(&cleaned) || detect_date(&cleaned).is_some() {
        return None;
    }
    if cleaned.chars().filter(|c| c.is_alphabetic()).count() < 2 {
        return None;
    }
    Some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_simple_item() {
        let data = parse_with_date("Coffee 4.50", day());
        assert_eq!(data.items.len(), 1);
        assert_eq!(data.items[0].description, "Coffee");
        assert_eq!(data.items[0].amount, dec("4.50"));
        assert_eq!(data.items[0].category, ExpenseCategory::Other);
        assert_eq!(data.total, dec("4.50"));
    }

    #[test]
    fn test_comma_separator_removed_verbatim() {
        let data = parse_with_date("Taxi fare, 12,00 EUR", day());
        assert_eq!(data.items[0].description, "Taxi fare,  EUR");
        assert_eq!(data.items[0].amount, dec("12.00"));
    }

    #[test]
    fn test_no_amounts_yields_placeholder() {
        let data = parse_with_date("Thank you\nfor shopping\n\n", day());
        assert_eq!(data.items.len(), 1);
        assert_eq!(data.items[0].description, PLACEHOLDER_DESCRIPTION);
        assert_eq!(data.items[0].amount, Decimal::ZERO);
        assert_eq!(data.total, Decimal::ZERO);
    }

    #[test]
    fn test_empty_input_yields_placeholder() {
        let data = parse_with_date("", day());
        assert_eq!(data.items.len(), 1);
        assert_eq!(data.merchant, UNKNOWN_MERCHANT);
        assert_eq!(data.date, day());
    }

    #[test]
    fn test_first_match_governs() {
        let data = parse_with_date("2x 1.25 = 2.50", day());
        assert_eq!(data.items.len(), 1);
        assert_eq!(data.items[0].amount, dec("1.25"));
        assert_eq!(data.items[0].description, "2x  = 2.50");
    }

    #[test]
    fn test_amount_only_line_gets_fallback_description() {
        let data = parse_with_date("   9.99  ", day());
        assert_eq!(data.items[0].description, "Item");
    }

    #[test]
    fn test_single_decimal_digit_not_matched() {
        let data = parse_with_date("Tip 3.5", day());
        assert_eq!(data.items[0].description, PLACEHOLDER_DESCRIPTION);
    }

    #[test]
    fn test_negative_amount_line_is_skipped() {
        let data = parse_with_date("Soup 3.40\nDiscount -2.00", day());
        assert_eq!(data.items.len(), 1);
        assert_eq!(data.items[0].description, "Soup");
        assert_eq!(data.total, dec("3.40"));
    }

    #[test]
    fn test_non_ascii_digits_do_not_shadow_amount() {
        let data = parse_with_date("Chai \u{0664}.\u{0665}\u{0660} 3.00", day());
        assert_eq!(data.items.len(), 1);
        assert_eq!(data.items[0].amount, dec("3.00"));
        assert_eq!(data.items[0].description, "Chai \u{0664}.\u{0665}\u{0660}");
        assert_eq!(data.total, dec("3.00"));

        let data = parse_with_date("Tea \u{FF14}.\u{FF15}\u{FF10}", day());
        assert_eq!(data.items[0].description, PLACEHOLDER_DESCRIPTION);
    }

    #[test]
    fn test_total_is_sum_of_matches() {
        let text = "SUPERMARKET\nBread 2.10\nMilk 1,35\nno price here\nCheese 7.05";
        let data = parse_with_date(text, day());
        assert_eq!(data.items.len(), 3);
        assert_eq!(data.total, dec("10.50"));
        let sum: Decimal = data.items.iter().map(|i| i.amount).sum();
        assert_eq!(data.total, sum);
    }

    #[test]
    fn test_overflowing_amount_is_skipped() {
        let data = parse_with_date("Huge 99999999999999999999999999999999.00\nTea 2.00", day());
        assert_eq!(data.items.len(), 1);
        assert_eq!(data.items[0].description, "Tea");
    }

    #[test]
    fn test_recompute_total_after_edit() {
        let mut data = parse_with_date("A 1.00\nB 2.00", day());
        data.items[1].amount = dec("5.25");
        assert_eq!(data.recompute_total(), dec("6.25"));
        assert_eq!(data.recompute_total(), dec("6.25"));
        assert_eq!(data.total, dec("6.25"));
    }

    #[test]
    fn test_date_detection() {
        let data = parse_with_date("Shop\nDate: 17/05/2024\nTea 2.00", day());
        assert_eq!(data.date, NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());

        let data = parse_with_date("2023-12-31 receipt", day());
        assert_eq!(data.date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

        let data = parse_with_date("on 31-02-2024 nothing valid", day());
        assert_eq!(data.date, day());
    }

    #[test]
    fn test_merchant_guess() {
        let data = parse_with_date("# Café Central\nEspresso 2.20", day());
        assert_eq!(data.merchant, "Café Central");

        let data = parse_with_date("Espresso 2.20\nCafé Central", day());
        assert_eq!(data.merchant, UNKNOWN_MERCHANT);

        let data = parse_with_date("12/01/2024\nEspresso 2.20", day());
        assert_eq!(data.merchant, UNKNOWN_MERCHANT);
    }

    #[test]
    fn test_category_serializes_with_display_names() {
        let json = serde_json::to_string(&ExpenseCategory::FoodAndBeverage).unwrap();
        assert_eq!(json, "\"Food & Beverage\"");
        let parsed: ExpenseCategory = serde_json::from_str("\"Office Supplies\"").unwrap();
        assert_eq!(parsed, ExpenseCategory::OfficeSupplies);
    }

    #[test]
    fn test_display_name_matches_serialized_form() {
        for category in [
            ExpenseCategory::FoodAndBeverage,
            ExpenseCategory::Transportation,
            ExpenseCategory::Accommodation,
            ExpenseCategory::OfficeSupplies,
            ExpenseCategory::Other,
        ] {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
    }
}
