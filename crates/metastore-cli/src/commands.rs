use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use metastore_store::{ListOptions, MetaStore, StoreConfig, XmlMetaStore};
use metastore_types::{Attribute, AttributeNode, Element, ElementType};
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let store = open_store(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Namespaces => cmd_namespaces(&store, format),
        Command::CreateNamespace(args) => {
            store.create_namespace(&args.namespace)?;
            println!("{} Created namespace {}", "✓".green().bold(), args.namespace.yellow());
            Ok(())
        }
        Command::DeleteNamespace(args) => {
            store.delete_namespace(&args.namespace)?;
            println!("{} Deleted namespace {}", "✓".green().bold(), args.namespace.yellow());
            Ok(())
        }
        Command::Types(args) => cmd_types(&store, &args.namespace, format),
        Command::CreateType(args) => cmd_create_type(&store, args),
        Command::DeleteType(args) => {
            let element_type = type_or_bare(&store, &args)?;
            store.delete_element_type(&args.namespace, &element_type)?;
            println!("{} Deleted element type {}", "✓".green().bold(), args.type_id.yellow());
            Ok(())
        }
        Command::Elements(args) => cmd_elements(&store, args, format),
        Command::CreateElement(args) => cmd_create_element(&store, args),
        Command::Show(args) => cmd_show(&store, args, format),
        Command::DeleteElement(args) => {
            let element_type = type_or_bare(&store, &args.element_type)?;
            store.delete_element(&args.element_type.namespace, &element_type, &args.element)?;
            println!("{} Deleted element {}", "✓".green().bold(), args.element.yellow());
            Ok(())
        }
    }
}

fn open_store(cli: &Cli) -> anyhow::Result<XmlMetaStore> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::new("."),
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    debug!(root = %config.root.display(), "opening store");
    XmlMetaStore::open(&config).context("opening store")
}

fn resolve_type(store: &XmlMetaStore, args: &TypeArgs) -> anyhow::Result<ElementType> {
    store
        .get_element_type(&args.namespace, &args.type_id)?
        .ok_or_else(|| anyhow!("element type {}/{} not found", args.namespace, args.type_id))
}

/// The stored element type, or one carrying only the id so deletes of
/// missing entries stay no-ops.
fn type_or_bare(store: &XmlMetaStore, args: &TypeArgs) -> anyhow::Result<ElementType> {
    Ok(store
        .get_element_type(&args.namespace, &args.type_id)?
        .unwrap_or_else(|| ElementType::new(&args.namespace, &args.type_id).with_id(&args.type_id)))
}

/// Split a `key=value` attribute argument.
fn parse_attr(arg: &str) -> anyhow::Result<Attribute> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("attribute {arg:?} is not of the form key=value"))?;
    if key.is_empty() {
        bail!("attribute {arg:?} has an empty key");
    }
    Ok(Attribute::new(key).with_value(value))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_namespaces(store: &XmlMetaStore, format: OutputFormat) -> anyhow::Result<()> {
    let namespaces = store.get_namespaces()?;
    if format == OutputFormat::Json {
        return print_json(&namespaces);
    }
    if namespaces.is_empty() {
        println!("No namespaces.");
    }
    for ns in &namespaces {
        println!("{}", ns.bold());
    }
    Ok(())
}

fn cmd_types(store: &XmlMetaStore, namespace: &str, format: OutputFormat) -> anyhow::Result<()> {
    let types = store.get_element_types(namespace)?;
    if format == OutputFormat::Json {
        return print_json(&types);
    }
    if types.is_empty() {
        println!("No element types in {}.", namespace.yellow());
    }
    for t in &types {
        print!("{}  {}", t.effective_id().bold(), t.name);
        match &t.description {
            Some(description) => println!("  {}", description.dimmed()),
            None => println!(),
        }
    }
    Ok(())
}

fn cmd_create_type(store: &XmlMetaStore, args: CreateTypeArgs) -> anyhow::Result<()> {
    let mut element_type = ElementType::new(&args.namespace, &args.name);
    element_type.id = args.id;
    element_type.description = args.description;
    let created = store.create_element_type(&args.namespace, &element_type)?;
    println!(
        "{} Created element type {} ({})",
        "✓".green().bold(),
        created.effective_id().yellow(),
        created.name
    );
    Ok(())
}

fn cmd_elements(store: &XmlMetaStore, args: ElementsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let element_type = resolve_type(store, &args.element_type)?;
    let mut errors = Vec::new();
    let elements = store.get_elements_with(
        &args.element_type.namespace,
        &element_type,
        ListOptions::default(),
        args.keep_going.then_some(&mut errors),
    )?;
    if format == OutputFormat::Json {
        print_json(&elements)?;
    } else {
        if elements.is_empty() {
            println!("No elements in {}.", args.element_type.type_id.yellow());
        }
        for e in &elements {
            println!(
                "{}  {}",
                e.id.as_deref().unwrap_or_default().bold(),
                e.name.as_deref().unwrap_or_default()
            );
        }
    }
    for err in &errors {
        eprintln!("{} {err}", "skipped:".red());
    }
    Ok(())
}

fn cmd_create_element(store: &XmlMetaStore, args: CreateElementArgs) -> anyhow::Result<()> {
    let element_type = resolve_type(store, &args.element_type)?;
    let mut element = Element::new(&args.name);
    element.id = args.id;
    for arg in &args.attrs {
        element.add_child(parse_attr(arg)?);
    }
    let created = store.create_element(&args.element_type.namespace, &element_type, &element)?;
    println!(
        "{} Created element {}",
        "✓".green().bold(),
        created.id.as_deref().unwrap_or_default().yellow()
    );
    Ok(())
}

fn cmd_show(store: &XmlMetaStore, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let target = &args.element;
    let namespace = &target.element_type.namespace;
    let element_type = resolve_type(store, &target.element_type)?;
    let found = if args.by_name {
        store.get_element_by_name(namespace, &element_type, &target.element)?
    } else {
        store.get_element(namespace, &element_type, &target.element)?
    };
    let element = found.ok_or_else(|| anyhow!("element {} not found", target.element))?;

    if format == OutputFormat::Json {
        return print_json(&element);
    }
    println!(
        "Element {} ({})",
        element.id.as_deref().unwrap_or_default().yellow().bold(),
        element.name.as_deref().unwrap_or_default()
    );
    if let Some(owner) = element.owner() {
        println!("  Owner: {} [{}]", owner.name.bold(), owner.owner_type.as_str());
    }
    for entry in element.owner_permissions() {
        let permissions: Vec<&str> = entry.permissions.iter().map(|p| p.as_str()).collect();
        println!("  Grant: {} -> {}", entry.owner.name, permissions.join(", ").cyan());
    }
    for child in element.children().iter() {
        print_attribute(child, 1);
    }
    Ok(())
}

fn print_attribute(attribute: &Attribute, depth: usize) {
    let indent = "  ".repeat(depth);
    match &attribute.value {
        Some(value) => println!(
            "{indent}{} = {} {}",
            attribute.id.bold(),
            value,
            format!("({})", value.value_type()).dimmed()
        ),
        None => println!("{indent}{}", attribute.id.bold()),
    }
    for child in attribute.children.iter() {
        print_attribute(child, depth + 1);
    }
}
