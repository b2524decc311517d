//! Component runtime CLI
//!
//! Entry point for the `component-runtime` command-line tool. Reports go to
//! stdout as JSON; logs and errors go to stderr.

use clap::{Parser, Subcommand};
use component_runtime::declaration::{Declarations, InspectReport, ResolveReport, SourceInfo};
use component_runtime::{InitOptions, Options, Runtime, TracingSubsystems};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "component-runtime")]
#[command(about = "Declare components and inspect instance construction", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Construct an instance of a component and print what happened
    Inspect {
        /// Declaration file (TOML)
        file: PathBuf,

        /// Component to instantiate
        #[arg(long, short = 'c')]
        component: String,

        /// Runtime config file, layered over the file's [runtime] table
        #[arg(long)]
        config: Option<PathBuf>,

        /// Record perf marks
        #[arg(long)]
        performance: bool,

        /// Production mode (no dev proxy, no perf marks)
        #[arg(long)]
        production: bool,

        /// Mount target passed as `el`
        #[arg(long)]
        el: Option<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the resolved options of a component constructor
    Resolve {
        /// Declaration file (TOML)
        file: PathBuf,

        /// Component to resolve
        #[arg(long, short = 'c')]
        component: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List the components declared in a file
    List {
        /// Declaration file (TOML)
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect {
            file,
            component,
            config,
            performance,
            production,
            el,
            pretty,
        } => {
            let overrides = cli_overrides(performance, production);
            run_inspect(&file, &component, config.as_deref(), overrides, el, pretty)
        }
        Commands::Resolve {
            file,
            component,
            pretty,
        } => run_resolve(&file, &component, pretty),
        Commands::List { file } => run_list(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Flags that were set on the command line, as a config layer
fn cli_overrides(performance: bool, production: bool) -> Option<Value> {
    let mut map = Map::new();
    if performance {
        map.insert("performance".to_string(), Value::Bool(true));
    }
    if production {
        map.insert("production".to_string(), Value::Bool(true));
    }
    (!map.is_empty()).then_some(Value::Object(map))
}

fn run_inspect(
    file: &Path,
    component: &str,
    config_path: Option<&Path>,
    overrides: Option<Value>,
    el: Option<String>,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let declarations = Declarations::from_file(file)?;
    let config = declarations.runtime_config(config_path, overrides)?;
    let runtime = Runtime::with_subsystems(config, TracingSubsystems);
    let components = declarations.build(&runtime)?;
    let ctor = components.require(component)?;

    let options = match el {
        Some(el) => Options::new().with("el", el),
        None => Options::new(),
    };
    let vm = runtime.construct(ctor, Some(InitOptions::User(options)))?;

    let report = InspectReport::build(
        component,
        &vm,
        SourceInfo::of(&declarations),
        runtime.perf().measures(),
    )?;
    println!("{}", report.to_json(pretty)?);
    Ok(())
}

fn run_resolve(file: &Path, component: &str, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let declarations = Declarations::from_file(file)?;
    let config = declarations.runtime_config(None, None)?;
    let runtime = Runtime::new(config);
    let components = declarations.build(&runtime)?;
    let ctor = components.require(component)?;

    let report = ResolveReport::build(component, ctor, runtime.strategies(), SourceInfo::of(&declarations))?;
    println!("{}", report.to_json(pretty)?);
    Ok(())
}

fn run_list(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let declarations = Declarations::from_file(file)?;
    let components: Vec<Value> = declarations
        .file
        .components
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "extends": c.extends,
                "fields": c.fields.keys().collect::<Vec<_>>(),
            })
        })
        .collect();
    println!("{}", json!({ "components": components, "digest": declarations.digest }));
    Ok(())
}
