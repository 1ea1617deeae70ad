mod common;

use galv_tvn::{
    columns::{ColumnType, DataType, load_column_types},
    data::{RawValue, Value},
    mapping::{
        ColumnMap, DbMapEntry, DbMapping, MapEntry, Mapping, RequiredColumns, apply_mapping,
        convert_column, safe_set_mapping,
    },
    rank::{applicable_mappings, applicable_stored_mappings, best_mapping, rank_mappings},
    summary::ColumnSummary,
};

use common::fixture_path;

fn load_fixture_mapping() -> Mapping {
    let types = load_column_types(&fixture_path("column_types.json")).unwrap();
    let contents = std::fs::read_to_string(fixture_path("mapping_db.json")).unwrap();
    let db: DbMapping = serde_json::from_str(&contents).unwrap();
    Mapping::from_db(&db, &types)
}

#[test]
fn amps_and_volts_are_renamed_and_rescaled() {
    let summary = ColumnSummary::new()
        .with_column("Amps", vec![RawValue::from("0.00"), RawValue::from("1.00")])
        .with_column("Volts", vec![RawValue::from("3.5"), RawValue::from("3.6")]);
    let mut mapping = Mapping::<ColumnType>::blank();
    mapping.map.insert(
        "Amps".to_string(),
        MapEntry::new(ColumnType::new(3, "Current_A", DataType::Float).required())
            .rescaled(0.0, 1000.0),
    );
    mapping.map.insert(
        "Volts".to_string(),
        MapEntry::new(ColumnType::new(2, "Voltage_V", DataType::Float).required()),
    );

    let preview = apply_mapping(&summary, &mapping, &RequiredColumns::default()).unwrap();
    assert_eq!(preview.headers(), vec!["Current_A", "Voltage_V"]);
    assert_eq!(
        preview.columns["Current_A"],
        vec![Some(Value::Float(0.0)), Some(Value::Float(1000.0))]
    );
    assert_eq!(
        preview.columns["Voltage_V"],
        vec![Some(Value::Float(3.5)), Some(Value::Float(3.6))]
    );
    assert!(!preview.is_valid);
    assert_eq!(preview.missing_required_columns, vec!["ElapsedTime_s"]);
}

#[test]
fn fixture_mapping_previews_the_fixture_summary() {
    let contents = std::fs::read_to_string(fixture_path("summary.json")).unwrap();
    let summary: ColumnSummary = serde_json::from_str(&contents).unwrap();
    let mapping = load_fixture_mapping();

    let preview = apply_mapping(&summary, &mapping, &RequiredColumns::default()).unwrap();
    assert!(preview.is_valid);
    assert_eq!(
        preview.headers(),
        vec!["ElapsedTime_s", "Current_A", "Voltage_V", "Note"]
    );
    assert_eq!(
        preview.display_rows(),
        vec![
            vec!["0", "0", "3.5", "rest"],
            vec!["1.5", "1000", "3.6", "charge"],
        ]
    );
}

#[test]
fn only_current_is_never_valid() {
    let mut mapping = Mapping::<ColumnType>::blank();
    mapping.map.insert(
        "I".to_string(),
        MapEntry::new(ColumnType::new(3, "Current_A", DataType::Float).required()),
    );
    for (idx, name) in ["Temperature_K", "Step", "Comment", "Power_W"].iter().enumerate() {
        mapping.map.insert(
            format!("extra{idx}"),
            MapEntry::new(ColumnType::new(10 + idx as u64, *name, DataType::Float)),
        );
    }
    let validated = mapping.validated(&RequiredColumns::default());
    assert!(!validated.is_valid);
    assert_eq!(
        validated.missing_required_columns,
        vec!["ElapsedTime_s", "Voltage_V"]
    );
}

#[test]
fn colliding_renames_gain_underscores() {
    let mut map = ColumnMap::new();
    map.insert(
        "Foo".to_string(),
        MapEntry::new(ColumnType::new(1, "Foo", DataType::Float)),
    );
    map.insert(
        "Bar".to_string(),
        MapEntry::new(ColumnType::new(2, "Other", DataType::Float)).renamed("Foo"),
    );
    map.insert(
        "Baz".to_string(),
        MapEntry::new(ColumnType::new(3, "Another", DataType::Float)).renamed("_Foo"),
    );
    let raw = ["Foo", "Bar", "Baz"];
    let first = safe_set_mapping(&map, &raw);
    let second = safe_set_mapping(&map, &raw);
    assert_eq!(first, second);

    let names: Vec<&str> = first.values().map(MapEntry::output_name).collect();
    assert_eq!(names, vec!["Foo", "_Foo", "__Foo"]);
}

#[test]
fn renames_never_take_an_underscored_raw_column() {
    let summary = ColumnSummary::new()
        .with_column("Foo", vec![RawValue::from("1")])
        .with_column("_Foo", vec![RawValue::from("2")])
        .with_column("Bar", vec![RawValue::from("3")]);
    let mut mapping = Mapping::<ColumnType>::blank();
    mapping.map.insert(
        "Bar".to_string(),
        MapEntry::new(ColumnType::new(7, "Other", DataType::Float)).renamed("Foo"),
    );

    let resolved = mapping.with_safe_map(mapping.map.clone(), &summary.column_names());
    assert_eq!(resolved.map["Bar"].output_name(), "__Foo");

    let preview = apply_mapping(&summary, &resolved, &RequiredColumns::default()).unwrap();
    assert_eq!(preview.headers(), vec!["Foo", "_Foo", "__Foo"]);
    assert_eq!(preview.columns["__Foo"], vec![Some(Value::Float(3.0))]);
}

#[test]
fn renames_never_reuse_an_assigned_prefixed_name() {
    let mut map = ColumnMap::new();
    map.insert(
        "A".to_string(),
        MapEntry::new(ColumnType::new(1, "Foo", DataType::Float)),
    );
    map.insert(
        "B".to_string(),
        MapEntry::new(ColumnType::new(2, "__Foo", DataType::Float)),
    );
    map.insert(
        "C".to_string(),
        MapEntry::new(ColumnType::new(3, "Other", DataType::Float)).renamed("Foo"),
    );
    let raw = ["A", "B", "C"];
    let resolved = safe_set_mapping(&map, &raw);
    let names: Vec<&str> = resolved.values().map(MapEntry::output_name).collect();
    assert_eq!(names, vec!["Foo", "__Foo", "___Foo"]);
    assert_eq!(safe_set_mapping(&resolved, &raw), resolved);
}

#[test]
fn unresolved_duplicate_names_are_an_error() {
    let summary = ColumnSummary::new()
        .with_column("Foo", vec![RawValue::from("1")])
        .with_column("Bar", vec![RawValue::from("2")]);
    let mut mapping = Mapping::<ColumnType>::blank();
    mapping.map.insert(
        "Bar".to_string(),
        MapEntry::new(ColumnType::new(7, "Other", DataType::Float)).renamed("Foo"),
    );
    let err = apply_mapping(&summary, &mapping, &RequiredColumns::default()).unwrap_err();
    assert!(err.to_string().contains("'Foo'"));
}

#[test]
fn unknown_data_types_stop_the_preview() {
    let summary = ColumnSummary::new().with_column("Z", vec![RawValue::from("1")]);
    let mut mapping = Mapping::<ColumnType>::blank();
    mapping.map.insert(
        "Z".to_string(),
        MapEntry::new(ColumnType::new(
            1,
            "Impedance",
            DataType::Unknown("complex".to_string()),
        )),
    );
    let err = apply_mapping(&summary, &mapping, &RequiredColumns::default()).unwrap_err();
    assert!(err.to_string().contains("complex"));
}

#[test]
fn datetime_columns_parse_text_and_millis() {
    let entry = MapEntry::new(ColumnType::new(9, "Timestamp", DataType::DateTime));
    let converted = convert_column(
        &[
            RawValue::from("2024-03-01T10:00:00Z"),
            RawValue::from(0_i64),
            RawValue::from("not a date"),
        ],
        Some(&entry),
    )
    .unwrap();
    let shown: Vec<String> = converted
        .iter()
        .map(|v| v.as_ref().map(Value::as_display).unwrap_or_default())
        .collect();
    assert_eq!(
        shown,
        vec!["2024-03-01T10:00:00.000Z", "1970-01-01T00:00:00.000Z", ""]
    );
}

#[test]
fn stored_mappings_rank_for_a_file() {
    let types = load_column_types(&fixture_path("column_types.json")).unwrap();
    let contents = std::fs::read_to_string(fixture_path("mappings.json")).unwrap();
    let stored: Vec<DbMapping> = serde_json::from_str(&contents).unwrap();
    let mappings: Vec<Mapping> = stored
        .iter()
        .map(|db| Mapping::from_db(db, &types))
        .collect();

    let columns = ["Time", "Amps", "Volts", "Note"];
    let ranked = rank_mappings(applicable_mappings(
        &columns,
        &mappings,
        &RequiredColumns::default(),
    ));
    let names: Vec<&str> = ranked.iter().map(|c| c.mapping.name.as_str()).collect();
    assert_eq!(names, vec!["Arbin", "Maccor", "Volts only"]);
    assert_eq!(best_mapping(&ranked).unwrap().mapping.name, "Arbin");

    let volts_only = rank_mappings(applicable_mappings(
        &["Volts"],
        &mappings,
        &RequiredColumns::default(),
    ));
    assert_eq!(volts_only.len(), 1);
    assert!(best_mapping(&volts_only).is_none());
}

#[test]
fn stored_mappings_are_judged_before_unknown_types_drop_out() {
    let types = load_column_types(&fixture_path("column_types.json")).unwrap();
    let contents = std::fs::read_to_string(fixture_path("mappings.json")).unwrap();
    let mut stored: Vec<DbMapping> = serde_json::from_str(&contents).unwrap();
    assert_eq!(stored[0].name, "Maccor");
    stored[0]
        .map
        .insert("Ghost".to_string(), DbMapEntry::new(404));

    let columns = ["Time", "Amps", "Volts", "Note"];
    let ranked = rank_mappings(applicable_stored_mappings(
        &columns,
        &stored,
        &types,
        &RequiredColumns::default(),
    ));
    let names: Vec<&str> = ranked.iter().map(|c| c.mapping.name.as_str()).collect();
    assert_eq!(names, vec!["Arbin", "Volts only"]);
}

#[test]
fn custom_required_columns_change_validity() {
    let mapping = load_fixture_mapping();
    let required = RequiredColumns::new(["Voltage_V", "Temperature_K"]);
    assert!(!mapping.is_valid_for(&required));
    assert_eq!(
        mapping.missing_required_columns(&required),
        vec!["Temperature_K"]
    );
}
