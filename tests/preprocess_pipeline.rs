//! Integration tests for the data side of the pipeline:
//! preprocessing, balancing, and feature selection working together.

use bookcast::balance::Smote;
use bookcast::config::ProcessingConfig;
use bookcast::data::{Column, Frame, LABEL_COLUMN};
use bookcast::preprocess::{ID_COLUMN, INDEX_COLUMN, Preprocessor};
use bookcast::select::{FeatureSelector, RandomForestParams};

/// Selector sized for test data.
fn selector(k: usize) -> FeatureSelector {
    FeatureSelector::with_params(
        k,
        RandomForestParams {
            n_trees: 30,
            max_depth: 10,
            ..Default::default()
        },
    )
}

// =============================================================================
// Synthetic booking data
// =============================================================================

/// (name, multiplier, offset, modulus) with mutually independent patterns.
const NUMERIC_COLUMNS: [(&str, u64, u64, u64); 12] = [
    ("lead_time", 37, 11, 23),
    ("avg_price_per_room", 53, 7, 19),
    ("no_of_adults", 17, 3, 17),
    ("no_of_children", 29, 5, 13),
    ("no_of_weekend_nights", 41, 2, 11),
    ("no_of_week_nights", 13, 9, 7),
    ("arrival_month", 19, 1, 29),
    ("arrival_date", 23, 8, 31),
    ("repeated_guest", 47, 4, 37),
    ("no_of_previous_cancellations", 7, 6, 41),
    ("no_of_previous_bookings_not_canceled", 31, 10, 43),
    ("no_of_special_requests", 11, 12, 47),
];

/// A raw split with identifier columns, text categoricals, and a 10%
/// positive-class rate (`Canceled` on every tenth row).
fn raw_split(n: usize, offset: u64) -> Frame {
    let at = |i: usize| offset + i as u64;

    let mut columns = vec![
        Column::numeric(INDEX_COLUMN, (0..n).map(|i| i as f32).collect()),
        Column::text(ID_COLUMN, (0..n).map(|i| format!("INN{:05}", at(i))).collect()),
    ];
    for (name, a, b, m) in NUMERIC_COLUMNS {
        columns.push(Column::numeric(
            name,
            (0..n).map(|i| ((at(i) * a + b) % m) as f32).collect(),
        ));
    }
    columns.push(Column::text(
        "type_of_meal_plan",
        (0..n)
            .map(|i| {
                match (at(i) * 7) % 3 {
                    0 => "meal_plan_1",
                    1 => "meal_plan_2",
                    _ => "meal_plan_3",
                }
                .to_string()
            })
            .collect(),
    ));
    columns.push(Column::text(
        "room_type_reserved",
        (0..n)
            .map(|i| {
                if (at(i) * 11) % 4 < 2 {
                    "room_type_1"
                } else {
                    "room_type_2"
                }
                .to_string()
            })
            .collect(),
    ));
    columns.push(Column::text(
        LABEL_COLUMN,
        (0..n)
            .map(|i| {
                if i % 10 == 0 { "Canceled" } else { "Not_Canceled" }.to_string()
            })
            .collect(),
    ));
    Frame::new(columns).unwrap()
}

fn processing(number_of_features: usize) -> ProcessingConfig {
    ProcessingConfig {
        categorical_columns: vec![
            "type_of_meal_plan".into(),
            "room_type_reserved".into(),
            LABEL_COLUMN.into(),
        ],
        numerical_columns: NUMERIC_COLUMNS.iter().map(|(name, ..)| name.to_string()).collect(),
        skewness_threshold: 5.0,
        number_of_features,
    }
}

fn label_counts(frame: &Frame) -> (usize, usize) {
    let labels = frame
        .column(LABEL_COLUMN)
        .unwrap()
        .numeric_values()
        .unwrap();
    let positives = labels.iter().filter(|&&v| v == 1.0).count();
    (labels.len() - positives, positives)
}

// =============================================================================
// Preprocessing properties
// =============================================================================

#[test]
fn preprocess_output_has_no_identifier_columns_or_duplicates() {
    let mut preprocessor = Preprocessor::new(processing(10));
    let cleaned = preprocessor.fit_transform(raw_split(200, 0)).unwrap();

    assert!(!cleaned.contains(INDEX_COLUMN));
    assert!(!cleaned.contains(ID_COLUMN));

    // Deduplicating again must be a no-op.
    let rows = cleaned.n_rows();
    assert_eq!(cleaned.dedup_rows().n_rows(), rows);
}

#[test]
fn label_encoding_is_a_bijection_over_observed_values() {
    let mut preprocessor = Preprocessor::new(processing(10));
    preprocessor.fit_transform(raw_split(200, 0)).unwrap();
    let encoder = preprocessor.encoder().unwrap();

    for column in ["type_of_meal_plan", "room_type_reserved", LABEL_COLUMN] {
        let classes = encoder.classes(column).unwrap();
        let decoded: Vec<&str> = (0..classes.len())
            .map(|code| encoder.decode(column, code).unwrap())
            .collect();
        let mut recovered: Vec<&str> = decoded.clone();
        recovered.sort_unstable();
        recovered.dedup();
        assert_eq!(recovered.len(), classes.len(), "codes must decode uniquely");
        for value in classes {
            assert!(decoded.contains(&value.as_str()));
        }
    }
}

#[test]
fn all_columns_are_numeric_after_preprocessing() {
    let mut preprocessor = Preprocessor::new(processing(10));
    let cleaned = preprocessor.fit_transform(raw_split(150, 0)).unwrap();
    for column in cleaned.columns() {
        assert!(column.is_numeric(), "column {} stayed text", column.name());
    }
}

// =============================================================================
// End-to-end scenario: 1000 rows, 900/100, two categorical columns
// =============================================================================

#[test]
fn thousand_row_scenario_balances_selects_and_projects() {
    let train_raw = raw_split(1000, 0);
    let test_raw = raw_split(400, 5000);

    let mut preprocessor = Preprocessor::new(processing(10));
    let train = preprocessor.fit_transform(train_raw).unwrap();
    let test = preprocessor.transform(test_raw).unwrap();

    // 900/100 class split survives preprocessing (rows are all distinct).
    assert_eq!(label_counts(&train), (100, 900));

    // Balancing: equal counts, originals untouched, only appended rows new.
    let smote = Smote::default();
    let balanced = smote.balance(&train, LABEL_COLUMN).unwrap();
    assert_eq!(label_counts(&balanced), (900, 900));
    assert!(balanced.n_rows() >= train.n_rows());
    let prefix: Vec<usize> = (0..train.n_rows()).collect();
    assert_eq!(balanced.take_rows(&prefix), train);

    // Selecting k=10 leaves exactly 11 columns, all from the input.
    let (selected, ranking) = selector(10).select(&balanced, LABEL_COLUMN).unwrap();
    assert_eq!(selected.n_cols(), 11);
    for name in selected.column_names() {
        assert!(balanced.contains(&name));
    }
    assert!(ranking.len() >= 10);

    // The test split follows the same preprocessing + balancing, then is
    // projected onto the train selection: identical column set and order.
    let test_balanced = smote.balance(&test, LABEL_COLUMN).unwrap();
    let projected = test_balanced
        .select_columns(&selected.column_names())
        .unwrap();
    assert_eq!(projected.column_names(), selected.column_names());
}

#[test]
fn projection_fails_loudly_when_a_selected_column_is_missing() {
    let mut preprocessor = Preprocessor::new(processing(5));
    let train = preprocessor.fit_transform(raw_split(300, 0)).unwrap();
    let balanced = Smote::default().balance(&train, LABEL_COLUMN).unwrap();
    let (selected, _) = selector(5).select(&balanced, LABEL_COLUMN).unwrap();

    // Simulate a test split that lost one of the selected columns.
    let first_selected = selected.column_names()[0].clone();
    let crippled = balanced.clone().drop_columns(&[first_selected.as_str()]);
    assert!(crippled.select_columns(&selected.column_names()).is_err());
}
