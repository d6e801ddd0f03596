//! Monthly cost aggregation for forecast charts

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Item;

/// One dated cost entry
#[derive(Debug, Clone, PartialEq)]
pub struct CostRecord {
    pub date: NaiveDate,
    pub amount: f64,
    pub category: String,
}

impl CostRecord {
    /// Read a record from a dataset row
    ///
    /// `date` may be `YYYY-MM-DD` or `YYYY-MM`; `amount` may be a number or a
    /// numeric string. A missing category becomes `Other`.
    pub fn from_item(
        item: &Item,
        date_field: &str,
        amount_field: &str,
        category_field: &str,
    ) -> Option<Self> {
        let date = parse_month_date(item.get(date_field)?.as_str()?)?;
        let amount = match item.get(amount_field)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s
                .trim()
                .trim_start_matches('$')
                .replace(',', "")
                .parse::<f64>()
                .ok()?,
            _ => return None,
        };
        let category = item
            .get(category_field)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("Other")
            .to_string();
        Some(Self {
            date,
            amount,
            category,
        })
    }
}

fn parse_month_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok())
}

/// Year and month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// `2024-03`
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// Chart-ready dataset: one value per month for each category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCostChart {
    pub months: Vec<YearMonth>,
    /// Category name and its per-month values, alphabetical by category
    pub series: Vec<(String, Vec<f64>)>,
    pub totals: Vec<f64>,
}

impl MonthlyCostChart {
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn grand_total(&self) -> f64 {
        self.totals.iter().sum()
    }

    pub fn labels(&self) -> Vec<String> {
        self.months.iter().map(YearMonth::label).collect()
    }
}

/// Sum records per category and month
///
/// Months run contiguously from the earliest to the latest record month; gaps
/// are filled with zero so every series lines up with `months`.
pub fn aggregate_monthly(records: &[CostRecord]) -> MonthlyCostChart {
    let mut sums: BTreeMap<String, BTreeMap<YearMonth, f64>> = BTreeMap::new();
    let mut first: Option<YearMonth> = None;
    let mut last: Option<YearMonth> = None;

    for record in records {
        let ym = YearMonth::of(record.date);
        first = Some(first.map_or(ym, |f| f.min(ym)));
        last = Some(last.map_or(ym, |l| l.max(ym)));
        *sums
            .entry(record.category.clone())
            .or_default()
            .entry(ym)
            .or_insert(0.0) += record.amount;
    }

    let (Some(first), Some(last)) = (first, last) else {
        return MonthlyCostChart::default();
    };

    let mut months = Vec::new();
    let mut cursor = first;
    while cursor <= last {
        months.push(cursor);
        cursor = cursor.next();
    }

    let series: Vec<(String, Vec<f64>)> = sums
        .into_iter()
        .map(|(category, by_month)| {
            let values = months
                .iter()
                .map(|m| by_month.get(m).copied().unwrap_or(0.0))
                .collect();
            (category, values)
        })
        .collect();

    let totals: Vec<f64> = (0..months.len())
        .map(|i| series.iter().map(|(_, values)| values[i]).sum::<f64>())
        .collect();

    MonthlyCostChart {
        months,
        series,
        totals,
    }
}
