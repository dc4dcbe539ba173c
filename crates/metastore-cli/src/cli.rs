use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "metastore",
    about = "Inspect and edit a namespaced metadata store on disk",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the `metastore/` folder (overrides the config file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// TOML store configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List namespaces
    Namespaces,
    /// Create a namespace
    CreateNamespace(NamespaceArgs),
    /// Delete an empty namespace
    DeleteNamespace(NamespaceArgs),
    /// List the element types of a namespace
    Types(NamespaceArgs),
    /// Create an element type
    CreateType(CreateTypeArgs),
    /// Delete an element type that holds no elements
    DeleteType(TypeArgs),
    /// List the elements of an element type
    Elements(ElementsArgs),
    /// Create an element with string attributes
    CreateElement(CreateElementArgs),
    /// Show one element
    Show(ShowArgs),
    /// Delete an element
    DeleteElement(ElementArgs),
}

#[derive(Args)]
pub struct NamespaceArgs {
    pub namespace: String,
}

#[derive(Args)]
pub struct TypeArgs {
    pub namespace: String,
    /// Element type id
    pub type_id: String,
}

#[derive(Args)]
pub struct CreateTypeArgs {
    pub namespace: String,
    pub name: String,
    /// Id of the new type; defaults to its name
    #[arg(long)]
    pub id: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct ElementsArgs {
    #[command(flatten)]
    pub element_type: TypeArgs,
    /// Report unreadable element files instead of failing on the first
    #[arg(long)]
    pub keep_going: bool,
}

#[derive(Args)]
pub struct CreateElementArgs {
    #[command(flatten)]
    pub element_type: TypeArgs,
    pub name: String,
    /// Id of the new element; defaults to its name
    #[arg(long)]
    pub id: Option<String>,
    /// Child attribute as `key=value`; may be repeated
    #[arg(short, long = "attr")]
    pub attrs: Vec<String>,
}

#[derive(Args)]
pub struct ElementArgs {
    #[command(flatten)]
    pub element_type: TypeArgs,
    /// Element id
    pub element: String,
}

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub element: ElementArgs,
    /// Treat the element argument as a name instead of an id
    #[arg(long)]
    pub by_name: bool,
}
