//! Choosing a mapping for a file.
//!
//! Candidates are ranked valid first, then by how many of the file's columns
//! they leave unmapped, then by name. Only a valid top candidate is ever
//! offered as the best mapping.

use std::cmp::Ordering;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    columns::ColumnType,
    mapping::{DbMapping, Mapping, RequiredColumns},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicableMapping<C = ColumnType> {
    pub mapping: Mapping<C>,
    /// File columns the mapping does not mention.
    pub missing: usize,
}

/// Whether every raw column the mapping names is present in the file.
pub fn is_applicable<C>(mapping: &Mapping<C>, file_columns: &[&str]) -> bool {
    mapping
        .map
        .keys()
        .all(|column| file_columns.contains(&column.as_str()))
}

pub fn count_missing<C>(mapping: &Mapping<C>, file_columns: &[&str]) -> usize {
    file_columns
        .iter()
        .filter(|column| !mapping.map.contains_key(**column))
        .count()
}

/// Applicable candidates with validity recomputed against `required`.
pub fn applicable_mappings(
    file_columns: &[&str],
    mappings: &[Mapping],
    required: &RequiredColumns,
) -> Vec<ApplicableMapping> {
    mappings
        .iter()
        .filter(|mapping| is_applicable(*mapping, file_columns))
        .map(|mapping| ApplicableMapping {
            mapping: mapping.validated(required),
            missing: count_missing(mapping, file_columns),
        })
        .collect()
}

/// Like [`applicable_mappings`] for stored mappings. Applicability and the
/// unmapped count are judged on the stored rules, before rules naming an
/// unknown column type are dropped during id resolution.
pub fn applicable_stored_mappings(
    file_columns: &[&str],
    stored: &[DbMapping],
    types: &[ColumnType],
    required: &RequiredColumns,
) -> Vec<ApplicableMapping> {
    stored
        .iter()
        .filter(|db| is_applicable(*db, file_columns))
        .map(|db| ApplicableMapping {
            mapping: Mapping::from_db(db, types).validated(required),
            missing: count_missing(db, file_columns),
        })
        .collect()
}

fn compare<C>(a: &ApplicableMapping<C>, b: &ApplicableMapping<C>) -> Ordering {
    b.mapping
        .is_valid
        .cmp(&a.mapping.is_valid)
        .then(a.missing.cmp(&b.missing))
        .then_with(|| {
            a.mapping
                .name
                .to_lowercase()
                .cmp(&b.mapping.name.to_lowercase())
        })
        .then_with(|| a.mapping.name.cmp(&b.mapping.name))
}

pub fn rank_mappings<C>(candidates: Vec<ApplicableMapping<C>>) -> Vec<ApplicableMapping<C>> {
    candidates.into_iter().sorted_by(compare).collect()
}

pub fn best_mapping<C>(candidates: &[ApplicableMapping<C>]) -> Option<&ApplicableMapping<C>> {
    candidates
        .iter()
        .min_by(|a, b| compare(a, b))
        .filter(|candidate| candidate.mapping.is_valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        columns::DataType,
        mapping::{DbMapEntry, MapEntry},
    };

    fn mapping(name: &str, columns: &[(&str, &str)]) -> Mapping {
        let mut mapping = Mapping::blank();
        mapping.name = name.to_string();
        for (idx, (raw, canonical)) in columns.iter().enumerate() {
            mapping.map.insert(
                raw.to_string(),
                MapEntry::new(ColumnType::new(idx as u64, *canonical, DataType::Float)),
            );
        }
        mapping
    }

    const FULL: [(&str, &str); 3] = [("t", "ElapsedTime_s"), ("v", "Voltage_V"), ("i", "Current_A")];

    #[test]
    fn inapplicable_mappings_are_excluded() {
        let candidates = vec![mapping("a", &FULL), mapping("b", &[("zzz", "Voltage_V")])];
        let applicable =
            applicable_mappings(&["t", "v", "i", "T"], &candidates, &RequiredColumns::default());
        assert_eq!(applicable.len(), 1);
        assert_eq!(applicable[0].missing, 1);
        assert!(applicable[0].mapping.is_valid);
    }

    #[test]
    fn ranking_prefers_valid_then_fewer_missing_then_name() {
        let columns = ["t", "v", "i", "T"];
        let mut fuller = FULL.to_vec();
        fuller.push(("T", "Temperature_K"));
        let candidates = vec![
            mapping("zeta", &FULL),
            mapping("partial", &[("v", "Voltage_V")]),
            mapping("Alpha", &FULL),
            mapping("omega", &fuller),
        ];
        let ranked = rank_mappings(applicable_mappings(
            &columns,
            &candidates,
            &RequiredColumns::default(),
        ));
        let names: Vec<&str> = ranked.iter().map(|c| c.mapping.name.as_str()).collect();
        assert_eq!(names, vec!["omega", "Alpha", "zeta", "partial"]);
    }

    #[test]
    fn invalid_mappings_are_never_best() {
        let columns = ["v"];
        let candidates = vec![mapping("only volts", &[("v", "Voltage_V")])];
        let applicable = applicable_mappings(&columns, &candidates, &RequiredColumns::default());
        assert_eq!(applicable[0].missing, 0);
        assert!(best_mapping(&applicable).is_none());
    }

    #[test]
    fn stored_rules_with_unknown_types_still_need_their_column() {
        let types = vec![
            ColumnType::new(1, "ElapsedTime_s", DataType::Float).required(),
            ColumnType::new(2, "Voltage_V", DataType::Float).required(),
            ColumnType::new(3, "Current_A", DataType::Float).required(),
        ];
        let mut stored = DbMapping::blank();
        stored.name = "with ghost".to_string();
        for (raw, id) in [("t", 1), ("v", 2), ("i", 3), ("ghost", 99)] {
            stored.map.insert(raw.to_string(), DbMapEntry::new(id));
        }

        let required = RequiredColumns::default();
        let stored = [stored];
        assert!(applicable_stored_mappings(&["t", "v", "i"], &stored, &types, &required).is_empty());

        let applicable =
            applicable_stored_mappings(&["t", "v", "i", "ghost", "T"], &stored, &types, &required);
        assert_eq!(applicable.len(), 1);
        assert_eq!(applicable[0].missing, 1);
        assert_eq!(applicable[0].mapping.map.len(), 3);
        assert!(applicable[0].mapping.is_valid);
    }
}
