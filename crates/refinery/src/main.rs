use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use refinery_core::types::{Field, Type, TypeKind, TypeRepository, UserDefinedType};
use refinery_core::{crawl_file, RefineryError, RefineryResult};
use refinery_utils::{debug, info, init_logging_with_overrides, LogFormat, LogLevel};

/// Crawl the debug information of a compiled binary into a de-duplicated type graph.
#[derive(Parser, Debug)]
#[command(name = "refinery")]
#[command(version)]
#[command(about = "Crawl the debug information of a compiled binary into a de-duplicated type graph", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format (pretty or json). Overrides REFINERY_LOG_FORMAT.
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List every type recovered from a binary
    Types
    {
        /// Path to the binary (or separate debug file) to crawl
        binary: PathBuf,
        /// Only list types of this kind
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,
        /// Only list types whose name contains this text
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Show the layout of one type
    Show
    {
        /// Path to the binary (or separate debug file) to crawl
        binary: PathBuf,
        /// Exact name of the type, e.g. `geo::Point` or `Node*`
        name: String,
    },
    /// Count the recovered types by kind
    Summary
    {
        /// Path to the binary (or separate debug file) to crawl
        binary: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum KindArg
{
    Basic,
    Udt,
    Pointer,
    Wildcard,
}

impl From<KindArg> for TypeKind
{
    fn from(kind: KindArg) -> Self
    {
        match kind {
            KindArg::Basic => TypeKind::Basic,
            KindArg::Udt => TypeKind::UserDefined,
            KindArg::Pointer => TypeKind::Pointer,
            KindArg::Wildcard => TypeKind::Wildcard,
        }
    }
}

const ALL_KINDS: [TypeKind; 4] = [TypeKind::Basic, TypeKind::UserDefined, TypeKind::Pointer, TypeKind::Wildcard];

fn main()
{
    let cli = Cli::parse();

    // Held until exit so file logs are flushed
    let _guard = match init_logging_with_overrides(cli.log_level, cli.log_format) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_command(command: Commands) -> RefineryResult<()>
{
    match command {
        Commands::Types { binary, kind, name } => {
            let repository = load(&binary)?;
            let kind = kind.map(TypeKind::from);
            for ty in &repository {
                if kind.is_some_and(|kind| ty.kind() != kind) {
                    continue;
                }
                if name.as_deref().is_some_and(|needle| !ty.name().contains(needle)) {
                    continue;
                }
                print_type_line(ty);
            }
            Ok(())
        }
        Commands::Show { binary, name } => {
            let repository = load(&binary)?;
            let ty = repository.find_by_name(&name).ok_or(RefineryError::TypeNotFound(name))?;
            print_type_details(&repository, ty);
            Ok(())
        }
        Commands::Summary { binary } => {
            let repository = load(&binary)?;
            println!("{}: {} types", binary.display(), repository.len());
            for kind in ALL_KINDS {
                println!("  {:<14} {}", kind.to_string(), repository.types_of_kind(kind).count());
            }
            Ok(())
        }
    }
}

fn load(binary: &Path) -> RefineryResult<TypeRepository>
{
    info!("Crawling types from {}", binary.display());
    let repository = crawl_file(binary)?;
    debug!("Recovered {} types", repository.len());
    Ok(repository)
}

fn type_id_label(ty: &Type) -> String
{
    ty.type_id().map_or_else(|| "-".to_string(), |id| id.to_string())
}

fn print_type_line(ty: &Type)
{
    println!("{:>6}  {:<12} {:>8}  {}", type_id_label(ty), ty.kind().to_string(), ty.size(), ty.name());
}

fn print_type_details(repository: &TypeRepository, ty: &Type)
{
    println!("{} ({}, {} bytes, id {})", ty.name(), ty.kind(), ty.size(), type_id_label(ty));

    if let Some(udt) = ty.as_user_defined() {
        print_fields(repository, udt);
    } else if let Some(ptr) = ty.as_pointer() {
        let content = repository
            .content_type(ptr)
            .map_or_else(|| "<unknown>".to_string(), |content| content.name().to_string());
        println!("  points to {}{}", content, cv_suffix(ptr.is_const(), ptr.is_volatile()));
    }
}

fn print_fields(repository: &TypeRepository, udt: &UserDefinedType)
{
    if udt.fields().is_empty() {
        println!("  (no fields)");
        return;
    }
    for (index, field) in udt.fields().iter().enumerate() {
        let type_name = repository.field_type(udt, index).map_or("<unknown>", Type::name);
        println!(
            "  +{:<6} {:<24} {}{}{}",
            field.offset(),
            field.name(),
            type_name,
            cv_suffix(field.is_const(), field.is_volatile()),
            bit_range(field)
        );
    }
}

fn cv_suffix(is_const: bool, is_volatile: bool) -> &'static str
{
    match (is_const, is_volatile) {
        (true, true) => " const volatile",
        (true, false) => " const",
        (false, true) => " volatile",
        (false, false) => "",
    }
}

fn bit_range(field: &Field) -> String
{
    if field.is_bitfield() {
        format!(" : {} (bit {})", field.bit_len(), field.bit_pos())
    } else {
        String::new()
    }
}
