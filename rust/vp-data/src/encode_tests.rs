use crate::encode::{OneHotEncoder, StandardScaler, MIN_STD};
use crate::DataError;

#[test]
fn fit_sorts_and_dedups_vocabulary() {
    let enc = OneHotEncoder::fit("agent", ["Sova", "Jett", "Sova", "Omen"]);
    assert_eq!(enc.categories(), &["Jett", "Omen", "Sova"]);
    assert_eq!(enc.len(), 3);
}

#[test]
fn encode_decode_round_trip() {
    let enc = OneHotEncoder::fit("agent", ["Jett", "Omen", "Sova"]);
    for cat in ["Jett", "Omen", "Sova"] {
        let mut v = vec![0.0f32; enc.len()];
        enc.encode_into(cat, &mut v).unwrap();
        assert_eq!(v.iter().sum::<f32>(), 1.0);
        assert_eq!(enc.decode(&v).unwrap(), cat);
    }
}

#[test]
fn unknown_category_is_an_error() {
    let enc = OneHotEncoder::fit("agent", ["Jett", "Omen"]);
    let mut v = vec![0.0f32; enc.len()];
    match enc.encode_into("Harbor", &mut v) {
        Err(DataError::UnknownCategory { encoder, category }) => {
            assert_eq!(encoder, "agent");
            assert_eq!(category, "Harbor");
        }
        other => panic!("expected unknown category, got {other:?}"),
    }
}

#[test]
fn fixed_vocabulary_preserves_order_and_rejects_duplicates() {
    let enc =
        OneHotEncoder::with_vocabulary("map", vec!["Bind".into(), "Ascent".into()]).unwrap();
    assert_eq!(enc.categories(), &["Bind", "Ascent"]);
    assert_eq!(enc.index_of("Ascent").unwrap(), 1);

    let dup = OneHotEncoder::with_vocabulary("map", vec!["Bind".into(), "Bind".into()]);
    assert!(dup.is_err());
}

#[test]
fn decode_rejects_wrong_width() {
    let enc = OneHotEncoder::fit("agent", ["Jett", "Omen"]);
    assert!(matches!(enc.decode(&[1.0]), Err(DataError::Shape(_))));
}

#[test]
fn scaler_standardizes_columns() {
    let rows: Vec<Vec<f64>> = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
    let sc = StandardScaler::fit(rows.iter().map(|r| r.as_slice())).unwrap();
    assert_eq!(sc.mean(), &[2.0, 10.0]);
    // Second column has zero variance; its std is floored, not zero.
    assert_eq!(sc.std()[0], 1.0);
    assert_eq!(sc.std()[1], MIN_STD);

    let mut out = [0.0f32; 2];
    sc.transform_into(&[3.0, 10.0], &mut out).unwrap();
    assert_eq!(out[0], 1.0);
    assert_eq!(out[1], 0.0);
}

#[test]
fn transform_is_pure_given_fitted_parameters() {
    let rows: Vec<Vec<f64>> = vec![vec![1.0, 2.0], vec![5.0, 6.0], vec![9.0, 4.0]];
    let sc = StandardScaler::fit(rows.iter().map(|r| r.as_slice())).unwrap();
    let mut a = [0.0f32; 2];
    let mut b = [0.0f32; 2];
    sc.transform_into(&[4.0, 3.0], &mut a).unwrap();
    sc.transform_into(&[4.0, 3.0], &mut b).unwrap();
    assert_eq!(a, b);
}

#[test]
fn scaler_round_trips_through_parts() {
    let rows: Vec<Vec<f64>> = vec![vec![1.0], vec![2.0], vec![3.0]];
    let sc = StandardScaler::fit(rows.iter().map(|r| r.as_slice())).unwrap();
    let rebuilt = StandardScaler::from_parts(sc.mean().to_vec(), sc.std().to_vec()).unwrap();
    let mut a = [0.0f32; 1];
    let mut b = [0.0f32; 1];
    sc.transform_into(&[2.5], &mut a).unwrap();
    rebuilt.transform_into(&[2.5], &mut b).unwrap();
    assert_eq!(a, b);
}

#[test]
fn scaler_rejects_ragged_rows() {
    let rows: Vec<Vec<f64>> = vec![vec![1.0, 2.0], vec![3.0]];
    assert!(StandardScaler::fit(rows.iter().map(|r| r.as_slice())).is_err());
}
