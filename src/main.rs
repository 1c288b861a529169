//! Command-line interface for xmlobject

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use xmlobject::loaders::Loader;
#[cfg(feature = "cli")]
use xmlobject::locations::Location;
#[cfg(feature = "cli")]
use xmlobject::objects::ElementProxy;
#[cfg(feature = "cli")]
use xmlobject::{Configuration, NodeId, ObjectTree};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xmlobject")]
#[command(author, version, about = "XML object marshalling tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Unmarshall a document into objects and marshall it back
    Roundtrip {
        /// Path to the XML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Configuration document to load (repeatable)
        #[arg(short, long = "config", value_name = "CONFIG")]
        config: Vec<PathBuf>,

        /// Handle elements without providers as generic element proxies
        #[arg(long)]
        proxy_unknown: bool,

        /// Rebuild the DOM from the objects instead of reusing the parsed one
        #[arg(long)]
        rebuild: bool,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the IDs resolvable from the document root
    Ids {
        /// Path to the XML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Configuration document to load (repeatable)
        #[arg(short, long = "config", value_name = "CONFIG")]
        config: Vec<PathBuf>,

        /// Handle elements without providers as generic element proxies
        #[arg(long)]
        proxy_unknown: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Roundtrip {
            file,
            config,
            proxy_unknown,
            rebuild,
            pretty,
            output,
        } => cmd_roundtrip(file, config, proxy_unknown, rebuild, pretty, output),
        Commands::Ids {
            file,
            config,
            proxy_unknown,
        } => cmd_ids(file, config, proxy_unknown),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn build_configuration(
    config_files: Vec<PathBuf>,
    proxy_unknown: bool,
) -> Result<Configuration, Box<dyn std::error::Error>> {
    let mut config = Configuration::new();
    if proxy_unknown {
        config.set_default_providers(Some(ElementProxy::providers()));
    }

    let loader = Loader::new();
    for path in config_files {
        config.load_from(&loader, &Location::Path(path))?;
    }
    Ok(config)
}

#[cfg(feature = "cli")]
fn unmarshall_file(
    config: &Configuration,
    tree: &mut ObjectTree,
    file: &PathBuf,
) -> Result<NodeId, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file)?;
    let document = config.parse_document(&content)?;
    let root = document.root().ok_or("document has no root element")?;
    Ok(config.unmarshall(tree, root)?)
}

#[cfg(feature = "cli")]
fn cmd_roundtrip(
    file: PathBuf,
    config_files: Vec<PathBuf>,
    proxy_unknown: bool,
    rebuild: bool,
    pretty: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_configuration(config_files, proxy_unknown)?;
    let mut tree = ObjectTree::new();
    let root = unmarshall_file(&config, &mut tree, &file)?;

    if rebuild {
        for node in tree.descendants(root)? {
            tree.mark_dirty(node)?;
        }
    }

    let document = xmlobject::marshalling::marshall_document(&config, &mut tree, root)?;
    let xml = if pretty {
        document.to_pretty_string()?
    } else {
        document.to_xml_string()?
    };

    if let Some(output_path) = output {
        fs::write(&output_path, &xml)?;
        eprintln!("Output written to: {}", output_path.display());
    } else {
        println!("{}", xml);
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_ids(
    file: PathBuf,
    config_files: Vec<PathBuf>,
    proxy_unknown: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_configuration(config_files, proxy_unknown)?;
    let mut tree = ObjectTree::new();
    let root = unmarshall_file(&config, &mut tree, &file)?;

    let mut ids: Vec<(&str, NodeId)> = tree.get(root)?.id_index().iter().collect();
    ids.sort_by(|a, b| a.0.cmp(b.0));

    if ids.is_empty() {
        println!("No IDs found in {}", file.display());
        return Ok(());
    }

    for (id, node) in ids {
        println!("{}\t{}", id, element_path(&tree, node)?);
    }
    Ok(())
}

/// `/a:Root/b:Child[2]`-style path of a node
#[cfg(feature = "cli")]
fn element_path(tree: &ObjectTree, node: NodeId) -> Result<String, Box<dyn std::error::Error>> {
    let mut segments = Vec::new();
    for current in tree.ancestors(node)? {
        let object = tree.get(current)?;
        let mut segment = object.element_name().prefixed_name();
        if let Some(parent) = object.parent() {
            let siblings = tree.children(parent)?;
            let position = siblings
                .iter()
                .filter(|s| {
                    tree.get(*s)
                        .map(|o| o.element_name() == object.element_name())
                        .unwrap_or(false)
                })
                .position(|s| s == current)
                .unwrap_or(0);
            segment = format!("{}[{}]", segment, position + 1);
        }
        segments.push(segment);
    }
    segments.reverse();
    Ok(format!("/{}", segments.join("/")))
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
