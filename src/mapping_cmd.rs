use anyhow::{Context, Result, anyhow};
use itertools::Itertools;
use log::{debug, info};

use crate::{
    cli::{MappingInputArgs, RankArgs, RenameArgs},
    columns::{ColumnType, load_column_types},
    config::EngineConfig,
    io_utils,
    mapping::{DbMapping, Mapping},
    rank::{applicable_stored_mappings, best_mapping, rank_mappings},
    summary::ColumnSummary,
    table,
};

/// Loads the mapping named on the command line in its in-memory form.
pub fn load_mapping(args: &MappingInputArgs) -> Result<Mapping> {
    if args.db {
        let types_path = args
            .column_types
            .as_ref()
            .ok_or_else(|| anyhow!("--db mappings need --column-types to resolve ids"))?;
        let types = load_column_types(types_path)?;
        let db: DbMapping = io_utils::read_structured(&args.mapping)
            .with_context(|| format!("Loading mapping from {:?}", args.mapping))?;
        debug!(
            "Resolving {} rule(s) against {} column type(s)",
            db.map.len(),
            types.len()
        );
        Ok(Mapping::from_db(&db, &types))
    } else {
        io_utils::read_structured::<Mapping<ColumnType>>(&args.mapping)
            .with_context(|| format!("Loading mapping from {:?}", args.mapping))
    }
}

pub fn rank(args: &RankArgs) -> Result<()> {
    let config = EngineConfig::load_or_default(args.config.as_deref())?;
    let types = load_column_types(&args.column_types)?;
    let stored: Vec<DbMapping> = io_utils::read_structured(&args.mappings)
        .with_context(|| format!("Loading mappings from {:?}", args.mappings))?;
    let columns = args
        .columns
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>();
    let ranked = rank_mappings(applicable_stored_mappings(
        &columns,
        &stored,
        &types,
        &config.required(),
    ));
    info!(
        "{} of {} mapping(s) apply to {} column(s)",
        ranked.len(),
        stored.len(),
        columns.len()
    );

    let rows = ranked
        .iter()
        .enumerate()
        .map(|(idx, candidate)| {
            vec![
                (idx + 1).to_string(),
                candidate.mapping.name.clone(),
                if candidate.mapping.is_valid { "yes" } else { "no" }.to_string(),
                candidate.missing.to_string(),
                candidate.mapping.missing_required_columns.iter().join(", "),
            ]
        })
        .collect::<Vec<_>>();
    let headers = ["rank", "name", "valid", "unmapped", "missing required"].map(String::from);
    table::print_table(&headers, &rows);

    match best_mapping(&ranked) {
        Some(best) => println!("Best mapping: {}", best.mapping.name),
        None => println!("No valid mapping applies"),
    }
    Ok(())
}

pub fn rename(args: &RenameArgs) -> Result<()> {
    let summary: ColumnSummary = io_utils::read_structured(&args.input)
        .with_context(|| format!("Loading column summary from {:?}", args.input))?;
    let mapping = load_mapping(&args.mapping)?;
    let raw_columns = summary.column_names();
    let resolved = mapping.with_safe_map(mapping.map.clone(), &raw_columns);

    let renamed = resolved
        .map
        .iter()
        .filter(|(column, entry)| mapping.map.get(*column).map(|e| &e.name) != Some(&entry.name))
        .count();
    info!("Adjusted {renamed} rule name(s) in {:?}", args.mapping.mapping);

    let output = args.output.output.as_deref();
    if args.mapping.db {
        io_utils::write_json(output, &resolved.to_db(), args.output.compact)
    } else {
        io_utils::write_json(output, &resolved, args.output.compact)
    }
}
