use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use spendview::io::{load_transactions_from_csv, write_json};
use spendview::types::{ChartType, MonthKey, Preferences, TransactionTable};
use spendview::{analyze, analyze_on, Error, PreferenceStore};
use tempfile::TempDir;

const REPORT_CSV: &[u8] = b"date,category,title,amount
2024-01-05,food,Groceries,50
2024-01-07,food,Restaurant,120
2024-01-09,transport,Train,35.5
2024-01-12,food,Bakery,8.25
2024-01-20,fun,Concert,75
2024-01-22,transport,Taxi,35.5
2024-01-28,food,Market,60
2024-02-01,rent,February,1000
2024-02-14,fun,Dinner,95.75
2024-03-02,food,Groceries,44.10
";

fn load() -> TransactionTable {
    load_transactions_from_csv(&mut Cursor::new(REPORT_CSV)).unwrap()
}

fn month(s: &str) -> MonthKey {
    s.parse().unwrap()
}

fn titles(table: &TransactionTable, key: &str) -> Vec<String> {
    analyze(table, None).top_5_items_by_month()[&month(key)]
        .iter()
        .map(|item| item.title.clone().unwrap())
        .collect()
}

#[test]
fn test_report_totals_reconcile() {
    let table = load();
    let bundle = analyze(&table, None);
    assert_eq!(bundle.total_amount(), dec!(1524.10));
    let monthly: Decimal = bundle
        .monthly_category_totals()
        .iter()
        .map(|t| t.amount)
        .sum();
    let categories: Decimal = bundle.category_totals().iter().map(|t| t.amount).sum();
    assert_eq!(monthly, bundle.total_amount());
    assert_eq!(categories, bundle.total_amount());
    assert_eq!(
        bundle
            .category_totals()
            .iter()
            .map(|t| t.category.as_deref().unwrap())
            .collect::<Vec<_>>(),
        vec!["food", "fun", "rent", "transport"]
    );
}

#[test]
fn test_top_five_per_month() {
    let table = load();
    // Train and Taxi tie; Train comes first in the report
    assert_eq!(
        titles(&table, "2024-01"),
        vec!["Restaurant", "Concert", "Market", "Groceries", "Train"]
    );
    assert_eq!(titles(&table, "2024-02"), vec!["February", "Dinner"]);
    let bundle = analyze(&table, None);
    for items in bundle.top_5_items_by_month().values() {
        assert!(items.len() <= 5);
        assert!(items.windows(2).all(|pair| pair[0].amount >= pair[1].amount));
    }
}

#[test]
fn test_month_selection() {
    let table = load();
    assert_eq!(
        table.months(),
        vec![month("2024-01"), month("2024-02"), month("2024-03")]
    );
    let selection = [month("2024-02"), month("2024-03")];
    let bundle = analyze(&table, Some(&selection[..]));
    assert_eq!(bundle.total_amount(), dec!(1139.85));
    assert_eq!(
        bundle.top_5_items_by_month().keys().copied().collect::<Vec<_>>(),
        selection.to_vec()
    );

    let elsewhere = [month("1999-12")];
    let bundle = analyze(&table, Some(&elsewhere[..]));
    assert_eq!(bundle.total_amount(), Decimal::ZERO);
    assert!(bundle.monthly_category_totals().is_empty());
    assert!(bundle.category_totals().is_empty());
    assert!(bundle.top_5_items_by_month().is_empty());
}

#[test]
fn test_report_without_dates() {
    let mut cursor = Cursor::new(&b"category,title,amount\nfood,A,5\nrent,B,7\n"[..]);
    let table = load_transactions_from_csv(&mut cursor).unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
    let analysis = analyze_on(&table, None, today);
    assert_eq!(analysis.diagnostics.len(), 1);
    assert_eq!(analysis.bundle.total_amount(), dec!(12));
    assert_eq!(
        analysis
            .bundle
            .top_5_items_by_month()
            .keys()
            .copied()
            .collect::<Vec<_>>(),
        vec![month("2025-07")]
    );
}

/// Collects formatted log output in memory
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_missing_date_column_warns_once() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        let mut cursor = Cursor::new(&b"category,title,amount\nfood,A,5\n"[..]);
        let table = load_transactions_from_csv(&mut cursor).unwrap();
        analyze(&table, None);
    });
    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert_eq!(output.matches("'date' column not found").count(), 1, "{output}");
}

#[test]
fn test_bundle_json() {
    let table = load();
    let mut output = vec![];
    write_json(&mut output, &analyze(&table, None)).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(
        object.keys().map(String::as_str).collect::<Vec<_>>(),
        vec![
            "category_totals",
            "monthly_category_totals",
            "top_5_items_by_month",
            "total_amount"
        ]
    );
    assert_eq!(
        value["top_5_items_by_month"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>(),
        vec!["2024-01", "2024-02", "2024-03"]
    );
}

#[test]
fn test_preferences_across_sessions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dashboard_config.json");
    let table = load();

    // First session: nothing stored yet, so everything is shown as a bar chart
    let first = PreferenceStore::new(&path);
    let stored = first.load().unwrap();
    assert_eq!(stored, Preferences::default());
    assert_eq!(stored.selected_months_or(&table.months()), table.months());
    assert_eq!(stored.chart_type_or_default(), ChartType::Bar);

    let chosen = Preferences {
        selected_months: Some(vec![month("2024-02")]),
        chart_type: Some(ChartType::Pie),
    };
    first.save(&chosen).unwrap();

    // Second session, fresh store on the same location
    let second = PreferenceStore::new(&path);
    let stored = second.load().unwrap();
    assert_eq!(stored, chosen);
    let selection = stored.selected_months_or(&table.months());
    assert_eq!(analyze(&table, Some(selection.as_slice())).total_amount(), dec!(1095.75));

    std::fs::write(&path, "{\"selected_months\": 12}").unwrap();
    assert!(matches!(
        second.load(),
        Err(Error::MalformedPersistedState { .. })
    ));
}
