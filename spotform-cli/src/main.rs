use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};

use spotform_core::data::ResourceData;
use spotform_core::provider::{Provider, ResourceType};
use spotform_core::resource::{Value, attributes_from_json};
use spotform_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use spotform_provider_spotinst::SpotinstProvider;

#[derive(Parser)]
#[command(name = "spotform")]
#[command(about = "Map configuration documents to Spotinst API objects and back", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// JSON output style
    #[arg(long, global = true, env = "SPOTFORM_OUTPUT", value_enum, default_value = "pretty")]
    output: OutputStyle,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the attribute schema of a resource type
    Schema {
        /// Resource type (e.g., ocean_aws)
        resource: String,
    },
    /// Validate a configuration document
    Validate {
        /// Resource type (e.g., ocean_aws)
        resource: String,
        /// Path to the configuration JSON
        file: PathBuf,
    },
    /// Expand a configuration document into an API request
    Expand {
        /// Resource type (e.g., ocean_aws)
        resource: String,
        /// Path to the configuration JSON
        file: PathBuf,

        /// Build an update request containing only changed fields
        #[arg(long)]
        update: bool,

        /// Prior state JSON to compare against for --update
        #[arg(long, requires = "update")]
        state: Option<PathBuf>,

        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },
    /// Flatten an API response into a configuration document
    Flatten {
        /// Resource type (e.g., ocean_aws)
        resource: String,
        /// Path to the API response JSON
        file: PathBuf,

        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },
    /// Show the difference between a configuration and an API response
    Diff {
        /// Resource type (e.g., ocean_aws)
        resource: String,
        /// Path to the configuration JSON
        config: PathBuf,
        /// Path to the API response JSON
        response: PathBuf,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputStyle {
    Pretty,
    Compact,
}

/// Output options for printed JSON documents
#[derive(Debug, Clone)]
struct OutputConfig {
    /// Print everything on one line
    compact: bool,

    /// Number of spaces for indentation (default: 2)
    indent_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compact: false,
            indent_size: 2,
        }
    }
}

impl OutputConfig {
    fn new(style: OutputStyle, compact: bool) -> Self {
        Self {
            compact: compact || style == OutputStyle::Compact,
            ..Default::default()
        }
    }

    fn render(&self, document: &serde_json::Value) -> Result<String, String> {
        if self.compact {
            return serde_json::to_string(document).map_err(|e| e.to_string());
        }

        let indent = " ".repeat(self.indent_size);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        document
            .serialize(&mut serializer)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buf).map_err(|e| e.to_string())
    }
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let provider = SpotinstProvider::new();
    let output = cli.output;

    let result = match cli.command {
        Commands::Schema { resource } => run_schema(&provider, &resource),
        Commands::Validate { resource, file } => run_validate(&provider, &resource, &file),
        Commands::Expand {
            resource,
            file,
            update,
            state,
            compact,
        } => run_expand(
            &provider,
            &resource,
            &file,
            update,
            state.as_deref(),
            &OutputConfig::new(output, compact),
        ),
        Commands::Flatten {
            resource,
            file,
            compact,
        } => run_flatten(
            &provider,
            &resource,
            &file,
            &OutputConfig::new(output, compact),
        ),
        Commands::Diff {
            resource,
            config,
            response,
        } => run_diff(&provider, &resource, &config, &response),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "spotform", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn find_resource_type(
    provider: &impl Provider,
    name: &str,
) -> Result<Box<dyn ResourceType>, String> {
    provider.resource_type(name).ok_or_else(|| {
        let known: Vec<&str> = provider
            .resource_types()
            .iter()
            .map(|t| t.name())
            .collect();
        format!(
            "Unknown resource type '{}' for provider {} (available: {})",
            name,
            provider.name(),
            known.join(", ")
        )
    })
}

fn load_json(path: &Path) -> Result<serde_json::Value, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn load_attributes(path: &Path) -> Result<HashMap<String, Value>, String> {
    let document = load_json(path)?;
    attributes_from_json(&document).map_err(|e| format!("{}: {}", path.display(), e))
}

fn validate_config(schema: &ResourceSchema, attributes: &HashMap<String, Value>) -> Result<(), String> {
    schema.validate(attributes).map_err(|errors| {
        errors
            .iter()
            .map(|e| format!("{}: {}", schema.resource_type, e))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// Build the API request for a configuration, or the update request when a
/// prior state is given
fn expand_document(
    resource_type: &dyn ResourceType,
    config: HashMap<String, Value>,
    prior: Option<HashMap<String, Value>>,
) -> Result<serde_json::Value, String> {
    let schema = resource_type.schema();
    validate_config(&schema, &config)?;

    let data = ResourceData::new(schema).with_config(config);
    let request = match prior {
        Some(prior) => resource_type.expand_update(&data.with_state(prior)),
        None => resource_type.expand_create(&data),
    };
    request.map_err(|e| format_provider_error(&e))
}

/// Flatten an API response into a configuration document
fn flatten_document(
    resource_type: &dyn ResourceType,
    response: &serde_json::Value,
) -> Result<serde_json::Value, String> {
    let mut data = ResourceData::new(resource_type.schema());
    resource_type
        .flatten(response, &mut data)
        .map_err(|e| format_provider_error(&e))?;
    Ok(data.to_json())
}

/// Configuration as a flattened document would present it: normalized, with
/// every unset attribute at its zero value
fn normalized_config(schema: ResourceSchema, config: HashMap<String, Value>) -> serde_json::Value {
    let mut data = ResourceData::new(schema.clone()).with_config(config);
    for name in schema.attribute_names() {
        if data.get(name).is_none() {
            let zero = schema.attributes[name].attr_type.zero_value();
            if let Err(e) = data.set(name, zero) {
                log::warn!("{}: {}", name, e);
            }
        }
    }
    data.to_json()
}

/// Field errors already render their own causes, so only the first is appended
fn format_provider_error(error: &dyn std::error::Error) -> String {
    match error.source() {
        Some(cause) => format!("{}: {}", error, cause),
        None => error.to_string(),
    }
}

fn run_schema(provider: &impl Provider, resource: &str) -> Result<(), String> {
    let resource_type = find_resource_type(provider, resource)?;
    let schema = resource_type.schema();
    println!("{}", schema.resource_type.bold());
    print!("{}", format_schema(&schema));
    Ok(())
}

fn format_schema(schema: &ResourceSchema) -> String {
    let mut out = String::new();
    for name in schema.attribute_names() {
        format_attribute(&schema.attributes[name], 1, &mut out);
    }
    out
}

fn format_attribute(attr: &AttributeSchema, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{}{}: {}", indent, attr.name, type_label(&attr.attr_type)));

    let flags = attr.flags();
    if !flags.is_empty() {
        out.push_str(&format!(" ({})", flags));
    }
    if let Some(max) = attr.max_items {
        out.push_str(&format!(" [max {}]", max));
    }
    if let Some(provider_name) = &attr.provider_name {
        out.push_str(&format!(" -> {}", provider_name));
    }
    out.push('\n');

    if let Some(attributes) = block_attributes(&attr.attr_type) {
        let mut names: Vec<&String> = attributes.keys().collect();
        names.sort_unstable();
        for name in names {
            format_attribute(&attributes[name], depth + 1, out);
        }
    }
}

fn type_label(attr_type: &AttributeType) -> String {
    match attr_type {
        AttributeType::List(inner) => format!("List<{}>", type_label(inner)),
        AttributeType::Set(inner) => format!("Set<{}>", type_label(inner)),
        AttributeType::Block(_) => "Block".to_string(),
        other => other.to_string(),
    }
}

fn block_attributes(attr_type: &AttributeType) -> Option<&HashMap<String, AttributeSchema>> {
    match attr_type {
        AttributeType::Block(attributes) => Some(attributes),
        AttributeType::List(inner) | AttributeType::Set(inner) => block_attributes(inner),
        _ => None,
    }
}

fn run_validate(provider: &impl Provider, resource: &str, file: &Path) -> Result<(), String> {
    let resource_type = find_resource_type(provider, resource)?;
    let config = load_attributes(file)?;

    validate_config(&resource_type.schema(), &config)?;
    println!("{}", "Configuration is valid.".green().bold());
    Ok(())
}

fn run_expand(
    provider: &impl Provider,
    resource: &str,
    file: &Path,
    update: bool,
    state: Option<&Path>,
    output: &OutputConfig,
) -> Result<(), String> {
    let resource_type = find_resource_type(provider, resource)?;
    let config = load_attributes(file)?;
    let prior = match (update, state) {
        (true, Some(state)) => Some(load_attributes(state)?),
        (true, None) => Some(HashMap::new()),
        (false, _) => None,
    };

    let request = expand_document(resource_type.as_ref(), config, prior)?;
    println!("{}", output.render(&request)?);
    Ok(())
}

fn run_flatten(
    provider: &impl Provider,
    resource: &str,
    file: &Path,
    output: &OutputConfig,
) -> Result<(), String> {
    let resource_type = find_resource_type(provider, resource)?;
    let response = load_json(file)?;

    let document = flatten_document(resource_type.as_ref(), &response)?;
    println!("{}", output.render(&document)?);
    Ok(())
}

fn run_diff(
    provider: &impl Provider,
    resource: &str,
    config_path: &Path,
    response_path: &Path,
) -> Result<(), String> {
    let resource_type = find_resource_type(provider, resource)?;
    let config = load_attributes(config_path)?;
    let response = load_json(response_path)?;

    let desired = normalized_config(resource_type.schema(), config);
    let actual = flatten_document(resource_type.as_ref(), &response)?;

    if desired == actual {
        println!("{}", "No differences.".green());
        return Ok(());
    }

    let output = OutputConfig::default();
    print_diff(
        resource_type.name(),
        &output.render(&desired)?,
        &output.render(&actual)?,
    );
    Ok(())
}

fn print_diff(resource: &str, desired: &str, actual: &str) {
    println!("{} {}:", "Diff for".cyan().bold(), resource);

    let diff = TextDiff::from_lines(desired, actual);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => " ".normal(),
        };
        print!("{}{}", sign, change);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;
    use tempfile::NamedTempFile;

    use super::*;

    fn json_file(document: &serde_json::Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", document).unwrap();
        file
    }

    fn ocean() -> Box<dyn ResourceType> {
        find_resource_type(&SpotinstProvider::new(), "ocean_aws").unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn state_requires_update() {
        let result = Cli::try_parse_from([
            "spotform", "expand", "ocean_aws", "config.json", "--state", "prior.json",
        ]);
        assert!(result.is_err());

        let result = Cli::try_parse_from([
            "spotform", "expand", "ocean_aws", "config.json", "--update", "--state", "prior.json",
        ]);
        assert!(result.is_ok());
    }

    #[test]
    fn unknown_resource_type_lists_available() {
        let err = find_resource_type(&SpotinstProvider::new(), "elastigroup_gcp").err().expect("expected unknown resource type error");
        assert_eq!(
            err,
            "Unknown resource type 'elastigroup_gcp' for provider spotinst (available: elastigroup_azure, ocean_aws)"
        );
    }

    #[test]
    fn output_config_styles() {
        let document = json!({"cluster": {"name": "dev"}});

        let compact = OutputConfig::new(OutputStyle::Pretty, true);
        assert_eq!(compact.render(&document).unwrap(), r#"{"cluster":{"name":"dev"}}"#);

        let pretty = OutputConfig::new(OutputStyle::Pretty, false);
        assert_eq!(
            pretty.render(&document).unwrap(),
            "{\n  \"cluster\": {\n    \"name\": \"dev\"\n  }\n}"
        );

        assert!(OutputConfig::new(OutputStyle::Compact, false).compact);
    }

    #[test]
    fn load_attributes_reports_path() {
        let file = json_file(&json!(["not", "an", "object"]));
        let err = load_attributes(file.path()).unwrap_err();
        assert!(err.starts_with(&file.path().display().to_string()));

        let mut broken = NamedTempFile::new().unwrap();
        write!(broken, "{{").unwrap();
        assert!(load_json(broken.path()).unwrap_err().starts_with("Failed to parse"));
    }

    #[test]
    fn expand_validates_first() {
        let file = json_file(&json!({"image_id": "ami-1", "colour": "red"}));
        let config = load_attributes(file.path()).unwrap();

        let err = expand_document(ocean().as_ref(), config, None).unwrap_err();
        let lines: Vec<&str> = err.lines().collect();
        assert_eq!(
            lines,
            vec![
                "ocean_aws: Required attribute 'security_groups' is missing",
                "ocean_aws: Unknown attribute 'colour'",
            ]
        );
    }

    #[test]
    fn expand_create_and_update() {
        let config = attributes_from_json(&json!({
            "image_id": "ami-2",
            "security_groups": ["sg-1"]
        }))
        .unwrap();
        let prior = attributes_from_json(&json!({
            "image_id": "ami-1",
            "security_groups": ["sg-1"]
        }))
        .unwrap();

        let create = expand_document(ocean().as_ref(), config.clone(), None).unwrap();
        assert_eq!(
            create,
            json!({"cluster": {"compute": {"launchSpecification": {
                "imageId": "ami-2",
                "securityGroupIds": ["sg-1"]
            }}}})
        );

        let update = expand_document(ocean().as_ref(), config, Some(prior)).unwrap();
        assert_eq!(
            update,
            json!({"cluster": {"compute": {"launchSpecification": {"imageId": "ami-2"}}}})
        );
    }

    #[test]
    fn flatten_errors_include_cause() {
        let err = flatten_document(ocean().as_ref(), &json!({"cluster": []})).unwrap_err();
        assert!(err.starts_with("[ocean_aws] Failed to parse SDK response: "));
    }

    #[test]
    fn normalized_config_matches_flattened_response() {
        let config = attributes_from_json(&json!({"security_groups": ["sg-1"]})).unwrap();
        let desired = normalized_config(ocean().schema(), config);
        let actual = flatten_document(
            ocean().as_ref(),
            &json!({"cluster": {"compute": {"launchSpecification": {"securityGroupIds": ["sg-1"]}}}}),
        )
        .unwrap();
        assert_eq!(desired, actual);
    }

    #[test]
    fn schema_tree_lists_nested_blocks() {
        let schema = ocean().schema();
        let tree = format_schema(&schema);

        assert!(tree.contains("  image_id: String (optional) -> imageId\n"));
        assert!(tree.contains(
            "  instance_metadata_options: List<Block> (optional) [max 1] -> instanceMetadataOptions\n"
        ));
        assert!(tree.contains("    http_tokens: String (required)\n"));
        assert!(tree.contains("  root_volume_size: PositiveInt (optional) -> rootVolumeSize\n"));
    }
}
