//! Exchange-rate snapshots, historical series and derived conversions.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CurrencyCode;
use crate::error::RateError;

/// A base currency's full set of rates as of one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    pub base_currency: CurrencyCode,
    pub as_of: NaiveDate,
    pub rates: BTreeMap<String, Decimal>,
}

impl RateSnapshot {
    /// Returns the rate for `target`, if the provider quoted one.
    pub fn rate_for(&self, target: &CurrencyCode) -> Option<Decimal> {
        self.rates.get(target.as_str()).copied()
    }
}

/// Rates for one date within a historical series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub date: NaiveDate,
    pub rates: BTreeMap<String, Decimal>,
}

/// Rates for a base currency over a date range, ordered by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSeries {
    pub base_currency: CurrencyCode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub points: Vec<RatePoint>,
}

impl HistoricalSeries {
    /// Slices `points` to `[(page - 1) * page_size, page * page_size)`,
    /// clamped to the available length. Pages past the end are empty.
    ///
    /// `page` and `page_size` are 1-based and must already be validated.
    pub fn paginate(self, page: u32, page_size: u32) -> HistoricalPage {
        let total_points = self.points.len();
        let size = page_size as usize;
        let start = (page.saturating_sub(1) as usize)
            .saturating_mul(size)
            .min(total_points);
        let end = start.saturating_add(size).min(total_points);

        HistoricalPage {
            base_currency: self.base_currency,
            start_date: self.start_date,
            end_date: self.end_date,
            page,
            page_size,
            total_points,
            points: self.points[start..end].to_vec(),
        }
    }
}

/// One page of a historical series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPage {
    pub base_currency: CurrencyCode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub page: u32,
    pub page_size: u32,
    pub total_points: usize,
    pub points: Vec<RatePoint>,
}

/// Result of converting an amount between two currencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub amount: Decimal,
    pub rate: Decimal,
    pub converted_amount: Decimal,
}

impl ConversionResult {
    /// Computes `converted_amount = amount * rate`.
    pub fn compute(
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
        rate: Decimal,
    ) -> Result<Self, RateError> {
        let converted_amount = amount
            .checked_mul(rate)
            .ok_or_else(|| RateError::Validation("Amount is too large to convert".into()))?;

        Ok(Self {
            from,
            to,
            amount,
            rate,
            converted_amount,
        })
    }
}
