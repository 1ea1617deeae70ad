//! File I/O shared by every subcommand.
//!
//! Inputs are JSON or YAML documents chosen by extension (`.yaml`/`.yml` are
//! YAML, anything else JSON). The `-` path reads stdin as JSON. Outputs are
//! JSON written to a file or stdout.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml")
    )
}

pub fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Deserializes a JSON or YAML document from `path`.
pub fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = open_input(path)?;
    if is_yaml(path) {
        serde_yaml::from_reader(reader).with_context(|| format!("Parsing YAML from {path:?}"))
    } else {
        serde_json::from_reader(reader).with_context(|| format!("Parsing JSON from {path:?}"))
    }
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) if !is_dash(p) => Ok(Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        ))),
        _ => Ok(Box::new(io::stdout())),
    }
}

pub fn write_json<T: Serialize + ?Sized>(path: Option<&Path>, value: &T, compact: bool) -> Result<()> {
    let mut writer = open_output(path)?;
    let written = if compact {
        serde_json::to_writer(&mut writer, value)
    } else {
        serde_json::to_writer_pretty(&mut writer, value)
    };
    written.context("Serializing JSON output")?;
    writeln!(writer)?;
    writer.flush().context("Flushing output")?;
    Ok(())
}
