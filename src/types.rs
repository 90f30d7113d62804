//! Common datatypes supporting functions throughout Spendview

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::Error;

/// The number of decimals to track for all amounts
pub const DECIMAL_SCALE: u32 = 4;

/// Date layouts accepted in the `date` column, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A calendar month, the unit used for grouping and filtering by time.
///
/// Textually represented as `YYYY-MM`, both in [`Display`] and when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Creates a month key.
    /// # Errors
    /// [`Error::InvalidMonthKey`] if `month` is not in `1..=12`
    pub fn new(year: i32, month: u32) -> Result<Self, Error> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidMonthKey(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// Returns the year
    #[must_use]
    #[inline]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Returns the month of the year, starting at 1
    #[must_use]
    #[inline]
    pub fn month(&self) -> u32 {
        self.month
    }
}

impl From<NaiveDate> for MonthKey {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMonthKey(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.chars().chain(month.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A single line of a financial report
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Transaction {
    /// When the transaction happened. Rows without one are dated on the processing date.
    #[serde(default, deserialize_with = "deserialize_option_date")]
    pub date: Option<NaiveDate>,
    /// Grouping label, not unique
    #[serde(default)]
    pub category: Option<String>,
    /// Label of the specific item
    #[serde(default)]
    pub title: Option<String>,
    /// Signed amount in currency units, with [`DECIMAL_SCALE`] scale
    #[serde(default, deserialize_with = "deserialize_option_decimal")]
    pub amount: Option<Decimal>,
}

impl Transaction {
    /// Creates a transaction with every field present
    #[must_use]
    pub fn new(date: NaiveDate, category: &str, title: &str, mut amount: Decimal) -> Self {
        amount.rescale(DECIMAL_SCALE);
        Self {
            date: Some(date),
            category: Some(category.to_string()),
            title: Some(title.to_string()),
            amount: Some(amount),
        }
    }
}

/// Function to help [`serde`] deserialize from a string into a [`Decimal`] with [`DECIMAL_SCALE`] scale
fn deserialize_option_decimal<'de, D>(value: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = rust_decimal::serde::str_option::deserialize(value)?;
    Ok(amount.map(|mut amount: Decimal| {
        amount.rescale(DECIMAL_SCALE);
        amount
    }))
}

/// Function to help [`serde`] deserialize a date cell, tolerating a trailing time of day
fn deserialize_option_date<'de, D>(value: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let text: Option<String> = Option::deserialize(value)?;
    match text.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_date(text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized date '{text}'"))),
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|datetime| datetime.date())
        })
}

/// An in-memory report: its rows, and whether the source had a `date` column at all.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionTable {
    pub(crate) has_date_column: bool,
    pub(crate) rows: Vec<Transaction>,
}

impl TransactionTable {
    /// Creates a table whose rows carry their own dates
    #[must_use]
    pub fn new(rows: Vec<Transaction>) -> Self {
        Self {
            has_date_column: true,
            rows,
        }
    }

    /// Creates a table from a source that had no `date` column. Any dates on the rows are
    /// ignored and every row is dated on the processing date.
    #[must_use]
    pub fn without_date_column(rows: Vec<Transaction>) -> Self {
        Self {
            has_date_column: false,
            rows,
        }
    }

    /// Returns whether the source had a `date` column
    #[must_use]
    #[inline]
    pub fn has_date_column(&self) -> bool {
        self.has_date_column
    }

    /// Returns the rows in their original order
    #[must_use]
    #[inline]
    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    /// Returns the number of rows
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the table has no rows
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct months present in the table, ascending, dating undated rows today
    #[must_use]
    pub fn months(&self) -> Vec<MonthKey> {
        self.months_on(Local::now().date_naive())
    }

    /// Distinct months present in the table, ascending, dating undated rows on `today`
    #[must_use]
    pub fn months_on(&self, today: NaiveDate) -> Vec<MonthKey> {
        let mut months: Vec<MonthKey> = self.dated_rows(today).map(|(month, _)| month).collect();
        months.sort_unstable();
        months.dedup();
        months
    }

    /// Pairs every row with its month, resolving missing dates to `today`
    pub(crate) fn dated_rows(
        &self,
        today: NaiveDate,
    ) -> impl Iterator<Item = (MonthKey, &Transaction)> + '_ {
        let has_date_column = self.has_date_column;
        self.rows.iter().map(move |row| {
            let date = match row.date {
                Some(date) if has_date_column => date,
                _ => today,
            };
            (MonthKey::from(date), row)
        })
    }
}

impl FromIterator<Transaction> for TransactionTable {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Sum of amounts for one (month, category) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCategoryTotal {
    /// The month
    pub month: MonthKey,
    /// The category; `None` groups rows that had no category
    pub category: Option<String>,
    /// Sum of amounts
    pub amount: Decimal,
}

/// Sum of amounts for one category across all months
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    /// The category; `None` groups rows that had no category
    pub category: Option<String>,
    /// Sum of amounts
    pub amount: Decimal,
}

/// One of the most expensive items of a month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopItem {
    /// Title of the transaction
    pub title: Option<String>,
    /// Amount of the transaction
    pub amount: Decimal,
}

/// The derived aggregates of one aggregation call.
///
/// See [`analyze`](crate::ops::analyze) for how each field is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultBundle {
    pub(crate) total_amount: Decimal,
    pub(crate) monthly_category_totals: Vec<MonthlyCategoryTotal>,
    pub(crate) category_totals: Vec<CategoryTotal>,
    pub(crate) top_5_items_by_month: BTreeMap<MonthKey, Vec<TopItem>>,
}

impl Default for ResultBundle {
    /// The empty result, with a zero total at [`DECIMAL_SCALE`] like any computed total
    fn default() -> Self {
        Self {
            total_amount: Decimal::new(0, DECIMAL_SCALE),
            monthly_category_totals: Vec::new(),
            category_totals: Vec::new(),
            top_5_items_by_month: BTreeMap::new(),
        }
    }
}

impl ResultBundle {
    /// Returns the sum of all amounts that survived the month filter
    #[must_use]
    #[inline]
    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    /// Returns per (month, category) sums, ordered by month then category
    #[must_use]
    #[inline]
    pub fn monthly_category_totals(&self) -> &[MonthlyCategoryTotal] {
        &self.monthly_category_totals
    }

    /// Returns per category sums, ordered by category
    #[must_use]
    #[inline]
    pub fn category_totals(&self) -> &[CategoryTotal] {
        &self.category_totals
    }

    /// Returns the up to five largest items of each month, largest first
    #[must_use]
    #[inline]
    pub fn top_5_items_by_month(&self) -> &BTreeMap<MonthKey, Vec<TopItem>> {
        &self.top_5_items_by_month
    }
}

/// A non-fatal condition noticed while aggregating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// The table had no `date` column, so every row was dated on `substituted`
    MissingDateColumn {
        /// The processing date used in place of the missing dates
        substituted: NaiveDate,
    },
    /// A sum exceeded the range of [`Decimal`] and was clamped to its limit, so the
    /// affected totals are not exact
    AmountOverflow,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::MissingDateColumn { substituted } => write!(
                f,
                "'date' column not found, using {substituted} for every transaction"
            ),
            Diagnostic::AmountOverflow => {
                write!(f, "amounts too large to sum exactly, totals were clamped")
            }
        }
    }
}

/// Output of [`analyze_on`](crate::ops::analyze_on): the results along with any diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// The computed aggregates
    pub bundle: ResultBundle,
    /// Conditions the caller may want to log
    pub diagnostics: Vec<Diagnostic>,
}

/// How the monthly totals should be charted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    /// Bar chart
    #[default]
    Bar,
    /// Line chart
    Line,
    /// Pie chart
    Pie,
}

impl Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
        };
        f.write_str(name)
    }
}

impl FromStr for ChartType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(ChartType::Bar),
            "line" => Ok(ChartType::Line),
            "pie" => Ok(ChartType::Pie),
            _ => Err(Error::InvalidChartType(s.to_string())),
        }
    }
}

/// The persisted view selection.
///
/// Fields are optional: [`Preferences::default`] is the empty record returned when nothing
/// has been saved yet. Use [`Preferences::selected_months_or`] and
/// [`Preferences::chart_type_or_default`] to resolve missing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Months to show, in the order they were selected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_months: Option<Vec<MonthKey>>,
    /// Chart type to show
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<ChartType>,
}

impl Preferences {
    /// Creates the first-run record: every available month, shown as a bar chart
    #[must_use]
    pub fn with_defaults(all_months: &[MonthKey]) -> Self {
        Self {
            selected_months: Some(all_months.to_vec()),
            chart_type: Some(ChartType::default()),
        }
    }

    /// Returns the stored selection, or `all_months` if none is stored or it is empty
    #[must_use]
    pub fn selected_months_or(&self, all_months: &[MonthKey]) -> Vec<MonthKey> {
        match &self.selected_months {
            Some(months) if !months.is_empty() => months.clone(),
            _ => all_months.to_vec(),
        }
    }

    /// Returns the stored chart type, or [`ChartType::Bar`]
    #[must_use]
    #[inline]
    pub fn chart_type_or_default(&self) -> ChartType {
        self.chart_type.unwrap_or_default()
    }
}
