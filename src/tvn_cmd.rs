use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info, warn};
use serde_json::Value;

use crate::{
    cli::{CoerceArgs, DecodeArgs, EncodeArgs, ValidateArgs},
    coerce,
    config::EngineConfig,
    io_utils,
    schema::SchemaRegistry,
    tvn::{
        self, Tvn, TypedValue, from_type_value_notation, to_type_value_notation_wrapper,
        validate_tvn, validate_tvn_wrapper,
    },
};

pub fn encode(args: &EncodeArgs) -> Result<()> {
    let config = EngineConfig::load_or_default(args.config.as_deref())?;
    let input: Value = io_utils::read_structured(&args.input)?;
    let Value::Object(object) = input else {
        bail!("{:?} must contain a JSON object to encode", args.input);
    };

    let schemas = match &args.schema {
        Some(path) => SchemaRegistry::load(path)?,
        None => config.schemas()?,
    };
    let schema = match args.kind {
        Some(kind) => Some(
            schemas
                .get(kind)
                .ok_or_else(|| anyhow!("No field schema for resource kind {kind}"))?,
        ),
        None => None,
    };

    let prepared = match schema {
        Some(schema) => {
            let mut merged = schema.defaults();
            merged.extend(object);
            schema.apply_transformations(&merged)
        }
        None => object,
    };
    let wrapper = to_type_value_notation_wrapper(&prepared, schema);
    info!(
        "Encoded {} field(s) from {:?}{}",
        wrapper.len(),
        args.input,
        args.kind
            .map(|kind| format!(" as {}", kind.display_name()))
            .unwrap_or_default()
    );
    io_utils::write_json(args.output.output.as_deref(), &wrapper, args.output.compact)
}

pub fn decode(args: &DecodeArgs) -> Result<()> {
    let input: Value = io_utils::read_structured(&args.input)?;
    let native = from_type_value_notation(&input)
        .with_context(|| format!("Decoding {:?}", args.input))?;
    io_utils::write_json(args.output.output.as_deref(), &native, args.output.compact)
}

pub fn validate(args: &ValidateArgs) -> Result<()> {
    let input: Value = io_utils::read_structured(&args.input)?;
    let Err(node_diagnostic) = validate_tvn(&input, args.strict) else {
        info!("{:?} is a valid TypeValueNotation node", args.input);
        return Ok(());
    };
    let wrapper_result = if args.no_wrappers {
        None
    } else {
        Some(validate_tvn_wrapper(&input, args.strict))
    };
    let diagnostic = match wrapper_result {
        Some(Ok(())) => {
            info!("{:?} is a valid TypeValueNotation wrapper", args.input);
            return Ok(());
        }
        // Objects shaped like a node are reported against the node rules.
        Some(Err(wrapper_diagnostic)) if input.is_object() && !looks_like_node(&input) => {
            wrapper_diagnostic
        }
        _ => node_diagnostic,
    };
    if args.verbose {
        warn!("{diagnostic}");
    }
    bail!(
        "{:?} is not valid {}TypeValueNotation: {diagnostic}",
        args.input,
        if args.strict { "strict " } else { "" }
    )
}

fn looks_like_node(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|object| object.contains_key("type") && object.contains_key("value"))
}

pub fn coerce(args: &CoerceArgs) -> Result<()> {
    let config = EngineConfig::load_or_default(args.config.as_deref())?;
    let registry = config.registry();
    let input: Value = io_utils::read_structured(&args.input)?;
    debug!("Coercing {:?} to '{}'", args.input, args.to);

    let output = match &args.field {
        Some(field) => {
            let Tvn::Wrapper(wrapper) = tvn::parse_type_value_notation(&input)
                .with_context(|| format!("Reading wrapper from {:?}", args.input))?
            else {
                bail!("{:?} holds a single node; --field needs a wrapper", args.input);
            };
            let converted = coerce::convert_wrapper_field(&wrapper, field, &args.to, &registry)?;
            info!("Converted field '{field}' to '{}'", args.to);
            Value::Object(tvn::wrapper_to_json(&converted))
        }
        None => {
            let node = TypedValue::from_json(&input)
                .with_context(|| format!("Reading typed value from {:?}", args.input))?;
            let converted = coerce::convert(&node, &args.to, &registry)?;
            info!("Converted '{}' value to '{}'", node.tag, args.to);
            converted.to_json()
        }
    };
    io_utils::write_json(args.output.output.as_deref(), &output, args.output.compact)
}
