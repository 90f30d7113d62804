use std::collections::{BTreeMap, BTreeSet};

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::types::{
    Analysis, CategoryTotal, Diagnostic, MonthKey, MonthlyCategoryTotal, ResultBundle, TopItem,
    TransactionTable, DECIMAL_SCALE,
};

/// How many items are kept per month in [`ResultBundle::top_5_items_by_month`]
pub const TOP_ITEMS_PER_MONTH: usize = 5;

/// Computes the aggregates of `table`, restricted to the months in `month_filter`.
///
/// A missing or empty filter keeps every row. Rows from a table without a `date` column
/// are dated today; the resulting [`Diagnostic`]s are logged as warnings. See [`analyze_on`]
/// for the details of each aggregate.
pub fn analyze(table: &TransactionTable, month_filter: Option<&[MonthKey]>) -> ResultBundle {
    let Analysis {
        bundle,
        diagnostics,
    } = analyze_on(table, month_filter, Local::now().date_naive());
    for diagnostic in &diagnostics {
        warn!("{diagnostic}");
    }
    bundle
}

/// Computes the aggregates of `table` using `today` as the date of any undated row.
///
/// After filtering by month:
/// - `total_amount` sums every amount
/// - `monthly_category_totals` sums per (month, category), ordered by month then category
/// - `category_totals` sums per category, ordered by category
/// - `top_5_items_by_month` keeps the largest [`TOP_ITEMS_PER_MONTH`] amounts of each month,
///   largest first, with equal amounts kept in their original row order
///
/// Missing amounts add nothing to the sums and are never ranked. Rows without a category are
/// grouped together under `None`. A sum that does not fit in a [`Decimal`] is clamped to
/// [`Decimal::MAX`] or [`Decimal::MIN`] and reported as [`Diagnostic::AmountOverflow`].
pub fn analyze_on(
    table: &TransactionTable,
    month_filter: Option<&[MonthKey]>,
    today: NaiveDate,
) -> Analysis {
    let mut diagnostics = Vec::new();
    if !table.has_date_column() {
        diagnostics.push(Diagnostic::MissingDateColumn { substituted: today });
    }

    let filter: Option<BTreeSet<MonthKey>> = month_filter
        .filter(|months| !months.is_empty())
        .map(|months| months.iter().copied().collect());
    debug!(
        rows = table.len(),
        "Selected months: {}",
        filter.as_ref().map_or_else(
            || "all".to_string(),
            |months| months.iter().map(MonthKey::to_string).collect::<Vec<_>>().join(", ")
        )
    );

    let zero = Decimal::new(0, DECIMAL_SCALE);
    let mut total_amount = zero;
    let mut monthly: BTreeMap<(MonthKey, Option<&str>), Decimal> = BTreeMap::new();
    let mut categories: BTreeMap<Option<&str>, Decimal> = BTreeMap::new();
    let mut items: BTreeMap<MonthKey, Vec<TopItem>> = BTreeMap::new();
    let mut kept = 0usize;
    let mut overflowed = false;

    let rows = table
        .dated_rows(today)
        .filter(|(month, _)| filter.as_ref().map_or(true, |f| f.contains(month)));
    for (month, row) in rows {
        kept += 1;
        let amount = row.amount.unwrap_or(zero);
        let category = row.category.as_deref();
        overflowed |= accumulate(&mut total_amount, amount);
        overflowed |= accumulate(monthly.entry((month, category)).or_insert(zero), amount);
        overflowed |= accumulate(categories.entry(category).or_insert(zero), amount);
        let month_items = items.entry(month).or_default();
        if let Some(amount) = row.amount {
            month_items.push(TopItem {
                title: row.title.clone(),
                amount,
            });
        }
    }
    debug!(rows = kept, "Filtered transactions");
    if overflowed {
        diagnostics.push(Diagnostic::AmountOverflow);
    }

    // `sort_by` is stable, so equal amounts stay in row order
    for month_items in items.values_mut() {
        month_items.sort_by(|a, b| b.amount.cmp(&a.amount));
        month_items.truncate(TOP_ITEMS_PER_MONTH);
    }

    let bundle = ResultBundle {
        total_amount,
        monthly_category_totals: monthly
            .into_iter()
            .map(|((month, category), amount)| MonthlyCategoryTotal {
                month,
                category: category.map(str::to_string),
                amount,
            })
            .collect(),
        category_totals: categories
            .into_iter()
            .map(|(category, amount)| CategoryTotal {
                category: category.map(str::to_string),
                amount,
            })
            .collect(),
        top_5_items_by_month: items,
    };
    Analysis {
        bundle,
        diagnostics,
    }
}

/// Adds `amount` to `sum`, clamping at the limits of [`Decimal`].
///
/// Returns `true` if the exact sum was out of range.
fn accumulate(sum: &mut Decimal, amount: Decimal) -> bool {
    match sum.checked_add(amount) {
        Some(total) => {
            *sum = total;
            false
        }
        None => {
            *sum = sum.saturating_add(amount);
            true
        }
    }
}
