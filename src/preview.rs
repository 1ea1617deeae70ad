use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;

use crate::{
    cli::PreviewArgs, config::EngineConfig, io_utils, mapping::apply_mapping, mapping_cmd,
    summary::ColumnSummary, table,
};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let config = EngineConfig::load_or_default(args.config.as_deref())?;
    let summary: ColumnSummary = io_utils::read_structured(&args.input)
        .with_context(|| format!("Loading column summary from {:?}", args.input))?;
    let loaded = mapping_cmd::load_mapping(&args.mapping)?;
    let mapping = loaded.with_safe_map(loaded.map.clone(), &summary.column_names());

    let preview = apply_mapping(&summary.truncate(args.rows), &mapping, &config.required())
        .with_context(|| format!("Applying mapping {:?}", args.mapping.mapping))?;
    table::print_table(&preview.headers(), &preview.display_rows());
    info!(
        "Displayed {} row(s) across {} column(s) from {:?}",
        preview.row_count(),
        preview.columns.len(),
        args.input
    );

    if preview.is_valid {
        println!("Mapping is valid");
    } else {
        println!(
            "Mapping is missing required column(s): {}",
            preview.missing_required_columns.iter().join(", ")
        );
    }
    Ok(())
}
