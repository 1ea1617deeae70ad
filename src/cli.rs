use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{resource::ResourceKind, tvn::TypeTag};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Encode Galv resources as typed values and preview column mappings",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Encode a resource's JSON as a TypeValueNotation wrapper
    Encode(EncodeArgs),
    /// Decode TypeValueNotation back to plain JSON
    Decode(DecodeArgs),
    /// Check that a document is valid TypeValueNotation
    Validate(ValidateArgs),
    /// Convert a typed value (or one field of a wrapper) to another type
    Coerce(CoerceArgs),
    /// List column types in a formatted table
    Columns(ColumnsArgs),
    /// Preview a file's columns after applying a mapping
    Preview(PreviewArgs),
    /// Rank the mappings that apply to a file's columns
    Rank(RankArgs),
    /// Resolve rename collisions in a mapping
    Rename(RenameArgs),
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Emit single-line JSON instead of pretty-printed output
    #[arg(long)]
    pub compact: bool,
}

#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Resource JSON or YAML file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Resource kind whose field schema supplies type hints, e.g. CELL
    #[arg(short = 'k', long = "kind", value_parser = parse_resource_kind)]
    pub kind: Option<ResourceKind>,
    /// Field schema YAML overriding the builtin table
    #[arg(short = 's', long = "schema")]
    pub schema: Option<PathBuf>,
    /// Engine configuration YAML
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// TypeValueNotation JSON or YAML file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// TypeValueNotation JSON or YAML file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Require value types to match their tags and reject unknown tags
    #[arg(long)]
    pub strict: bool,
    /// Log the reason a document is rejected
    #[arg(short = 'v', long)]
    pub verbose: bool,
    /// Accept single nodes only, not whole-resource wrappers
    #[arg(long = "no-wrappers")]
    pub no_wrappers: bool,
}

#[derive(Debug, Args)]
pub struct CoerceArgs {
    /// Typed value (or wrapper, with --field) JSON file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Target type tag, e.g. `number` or `galv_CELL`
    #[arg(short = 't', long = "to", value_parser = parse_type_tag)]
    pub to: TypeTag,
    /// Convert only this field of a wrapper
    #[arg(short = 'f', long = "field")]
    pub field: Option<String>,
    /// Engine configuration YAML supplying the API base URL
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Column type list JSON or YAML file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct MappingInputArgs {
    /// Mapping JSON or YAML file
    #[arg(short = 'm', long = "mapping")]
    pub mapping: PathBuf,
    /// Column type list used to resolve column type ids
    #[arg(short = 't', long = "column-types")]
    pub column_types: Option<PathBuf>,
    /// The mapping stores column type ids rather than column type objects
    #[arg(long)]
    pub db: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Column summary JSON or YAML file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    #[command(flatten)]
    pub mapping: MappingInputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Engine configuration YAML supplying required columns
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RankArgs {
    /// The file's raw column names
    #[arg(short = 'C', long = "columns", value_delimiter = ',', required = true)]
    pub columns: Vec<String>,
    /// JSON or YAML list of stored mappings
    #[arg(short = 'm', long = "mappings")]
    pub mappings: PathBuf,
    /// Column type list used to resolve column type ids
    #[arg(short = 't', long = "column-types")]
    pub column_types: PathBuf,
    /// Engine configuration YAML supplying required columns
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Column summary JSON or YAML file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    #[command(flatten)]
    pub mapping: MappingInputArgs,
    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn parse_type_tag(value: &str) -> Result<TypeTag, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Type tag cannot be empty".to_string());
    }
    Ok(TypeTag::parse(trimmed))
}

pub fn parse_resource_kind(value: &str) -> Result<ResourceKind, String> {
    value.parse::<ResourceKind>().map_err(|err| err.to_string())
}
