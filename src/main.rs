use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use ucikit::export::{quote, to_string};
use ucikit::journal::history;
use ucikit::settings::load_from_path;
use ucikit::{
    parse_package, Change, Context, DuplicatePolicy, ExportOptions, Package, Settings, UciError,
    UciPath, Value,
};

#[derive(Parser)]
#[command(name = "ucikit")]
#[command(about = "Read and edit UCI configuration files", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Directory holding the config files
    #[arg(short, long, global = true)]
    confdir: Option<PathBuf>,

    /// Directory for staged changes
    #[arg(short = 'P', long, global = true)]
    savedir: Option<PathBuf>,

    /// Extra history directory to replay (repeatable)
    #[arg(long = "history-path", global = true)]
    history_paths: Vec<PathBuf>,

    /// Skip unparsable lines instead of failing
    #[arg(short = 'S', long, global = true)]
    lenient: bool,

    /// Export generated names of anonymous sections
    #[arg(short = 'X', long, global = true)]
    names: bool,

    /// Log engine activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available config packages
    List,

    /// Show packages, sections or options as address=value lines
    Show { address: Option<String> },

    /// Print the value at an address
    Get { address: String },

    /// Set a section type or option value (pkg.section[.option]=value)
    Set { assignment: String },

    /// Add an anonymous section and print its name
    Add {
        package: String,
        section_type: String,
    },

    /// Append an item to a list option (pkg.section.option=item)
    AddList { assignment: String },

    /// Delete a section or option
    Delete { address: String },

    /// Rename a section or option (pkg.section[.option]=newname)
    Rename { assignment: String },

    /// Show staged changes
    Changes {
        package: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a unified diff between a package's file and its staged state
    Diff { package: String },

    /// Write staged changes to the config files
    Commit { package: Option<String> },

    /// Discard staged changes for a package, section or option
    Revert { address: String },

    /// Print packages in config file syntax
    Export { package: Option<String> },

    /// Read config file syntax from stdin or a file
    Import {
        package: Option<String>,

        /// Apply as edits to an existing package instead of replacing it
        #[arg(short, long)]
        merge: bool,

        /// Read from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = match err.downcast_ref::<UciError>() {
                Some(err) => err.render(Some("ucikit")),
                None => format!("ucikit: {err:#}"),
            };
            eprintln!("{}", message.red());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn build_context(cli: &Cli) -> Result<Context> {
    let settings = match &cli.settings {
        Some(path) => load_from_path(path)?,
        None => Settings::default(),
    };
    let mut context = Context::with_settings(settings.with_env_overrides());
    if let Some(dir) = &cli.confdir {
        context.set_confdir(dir);
    }
    if let Some(dir) = &cli.savedir {
        context.set_savedir(dir);
    }
    for dir in &cli.history_paths {
        context.add_history_path(dir);
    }
    if cli.lenient {
        context.set_strict(false);
    }
    if cli.names {
        context.set_export_names(true);
    }
    Ok(context)
}

fn run(cli: Cli) -> Result<()> {
    let mut ctx = build_context(&cli)?;

    match cli.command {
        Commands::List => cmd_list(&ctx),
        Commands::Show { address } => cmd_show(&mut ctx, address.as_deref()),
        Commands::Get { address } => cmd_get(&mut ctx, &address),
        Commands::Set { assignment } => {
            ctx.set_path(&assignment)?;
            save_addressed(&mut ctx, &assignment)
        }
        Commands::Add {
            package,
            section_type,
        } => {
            let name = ctx.add_section(&package, &section_type)?;
            ctx.save(&package)?;
            println!("{name}");
            Ok(())
        }
        Commands::AddList { assignment } => {
            ctx.add_list_path(&assignment)?;
            save_addressed(&mut ctx, &assignment)
        }
        Commands::Delete { address } => {
            ctx.delete_path(&address)?;
            save_addressed(&mut ctx, &address)
        }
        Commands::Rename { assignment } => {
            ctx.rename_path(&assignment)?;
            save_addressed(&mut ctx, &assignment)
        }
        Commands::Changes { package, json } => cmd_changes(&mut ctx, package, json),
        Commands::Diff { package } => cmd_diff(&mut ctx, &package),
        Commands::Commit { package } => {
            for name in selected_packages(&ctx, package)? {
                if !ctx.changes(&name)?.is_empty() {
                    ctx.commit(&name, false)?;
                }
            }
            Ok(())
        }
        Commands::Revert { address } => {
            let path = UciPath::parse(&address)?;
            ctx.revert(path.package(), path.section(), path.option())?;
            Ok(())
        }
        Commands::Export { package } => {
            for name in selected_packages(&ctx, package)? {
                ctx.autoload(&name)?;
                ctx.export(&mut io::stdout().lock(), Some(&name), true)?;
            }
            Ok(())
        }
        Commands::Import {
            package,
            merge,
            file,
        } => cmd_import(&mut ctx, package, merge, file),
    }
}

fn save_addressed(ctx: &mut Context, address: &str) -> Result<()> {
    let path = UciPath::parse(address)?;
    ctx.save(path.package())?;
    Ok(())
}

/// One named package, or every package in the config directory.
fn selected_packages(ctx: &Context, package: Option<String>) -> Result<Vec<String>> {
    match package {
        Some(name) => Ok(vec![name]),
        None => Ok(ctx.list_configs()?),
    }
}

fn cmd_list(ctx: &Context) -> Result<()> {
    for name in ctx.list_configs()? {
        println!("{name}");
    }
    Ok(())
}

fn format_value(value: &Value) -> String {
    value
        .items()
        .into_iter()
        .map(quote)
        .collect::<Vec<_>>()
        .join(" ")
}

fn show_package(package: &Package, only: Option<&str>) {
    for section in package.sections() {
        if only.is_some_and(|name| name != section.name()) {
            continue;
        }
        let prefix = format!("{}.{}", package.name(), section.name());
        println!("{}={}", prefix.bold(), section.section_type());
        for option in section.options() {
            println!(
                "{}.{}={}",
                prefix,
                option.name(),
                format_value(option.value())
            );
        }
    }
}

fn cmd_show(ctx: &mut Context, address: Option<&str>) -> Result<()> {
    let Some(address) = address else {
        for name in ctx.list_configs()? {
            show_package(ctx.autoload(&name)?, None);
        }
        return Ok(());
    };

    let path = UciPath::parse(address)?;
    match (path.section(), path.option()) {
        (None, _) => {
            show_package(ctx.autoload(path.package())?, None);
        }
        (Some(_), None) => {
            let section = ctx.section_at(address)?.name().to_string();
            if let Some(package) = ctx.package(path.package()) {
                show_package(package, Some(&section));
            }
        }
        (Some(_), Some(option)) => {
            let value = ctx.get(address)?;
            let section = ctx.section_at(&format!(
                "{}.{}",
                path.package(),
                path.section().unwrap_or_default()
            ))?;
            println!(
                "{}.{}.{}={}",
                path.package(),
                section.name(),
                option,
                format_value(&value)
            );
        }
    }
    Ok(())
}

fn cmd_get(ctx: &mut Context, address: &str) -> Result<()> {
    match ctx.get(address)? {
        Value::Scalar(value) => println!("{value}"),
        Value::List(items) => println!("{}", items.join(" ")),
    }
    Ok(())
}

#[derive(Serialize)]
struct PackageChanges {
    package: String,
    changes: Vec<Change>,
}

fn cmd_changes(ctx: &mut Context, package: Option<String>, json: bool) -> Result<()> {
    let mut report = Vec::new();
    for name in selected_packages(ctx, package)? {
        let changes = ctx.changes(&name)?;
        if !changes.is_empty() {
            report.push(PackageChanges {
                package: name,
                changes,
            });
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for entry in &report {
        for change in &entry.changes {
            println!("{}", history::encode(&entry.package, change).yellow());
        }
    }
    Ok(())
}

fn cmd_diff(ctx: &mut Context, name: &str) -> Result<()> {
    ctx.autoload(name)?;
    let package = ctx
        .package(name)
        .with_context(|| format!("package {name} is not loaded"))?;
    let path = package
        .path()
        .with_context(|| format!("package {name} has no backing file"))?;
    let original = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let options = ExportOptions {
        header: false,
        names: ctx.settings().export_names,
    };
    let committed = parse_package(original.as_bytes(), name, ctx.settings().strict)?;
    let before = to_string(&committed, options);
    let after = to_string(package, options);

    println!("{}", format!("--- {} (committed)", path.display()).dimmed());
    println!("{}", format!("+++ {} (staged)", path.display()).dimmed());
    let diff = TextDiff::from_lines(&before, &after);
    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", line);
    }
    Ok(())
}

fn cmd_import(
    ctx: &mut Context,
    package: Option<String>,
    merge: bool,
    file: Option<PathBuf>,
) -> Result<()> {
    let mut input = String::new();
    match &file {
        Some(path) => {
            input = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
        }
        None => {
            io::stdin().read_to_string(&mut input)?;
        }
    }
    let reader = BufReader::new(input.as_bytes());

    if merge {
        let name = package.context("--merge needs a package name")?;
        ctx.import_merge(reader, &name)?;
        ctx.save(&name)?;
        return Ok(());
    }

    for name in ctx.import(reader, package.as_deref(), DuplicatePolicy::Reject)? {
        ctx.commit(&name, true)?;
    }
    Ok(())
}
