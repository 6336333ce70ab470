use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use symvar_core::prelude::*;
use symvar_utils::{info, init_logging, init_logging_to_dir, init_logging_with_level, LogFormat, LogLevel, LoggingGuard};

mod path;

use path::{Selector, VariablePath};

/// Default RAM image size: the 8 KiB SRAM of an ATmega2560 plus the I/O space below it
const DEFAULT_RAM_SIZE: usize = 8704;

/// Inspect and patch program globals in a RAM image by symbolic name.
#[derive(Parser, Debug)]
#[command(name = "symvar")]
#[command(version)]
#[command(about = "Inspect and patch program globals in a RAM image by symbolic name", long_about = None)]
struct Cli
{
    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    /// Write logs to a dated file in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List the compile units in an ELF file
    Units
    {
        /// ELF file with DWARF debug info
        elf: PathBuf,
    },
    /// List the globals of a compile unit with their types and locations
    List
    {
        #[command(flatten)]
        target: Target,
        /// Also list struct members and array elements
        #[arg(long, default_value_t = false)]
        members: bool,
    },
    /// Read a global, struct member or array element from a RAM image
    Read
    {
        #[command(flatten)]
        target: Target,
        /// Variable path: name, name.member or name[index]
        path: VariablePath,
        /// Raw RAM dump to read from
        #[arg(long)]
        ram: PathBuf,
    },
    /// Write a value into a RAM image
    Write
    {
        #[command(flatten)]
        target: Target,
        /// Variable path: name, name.member or name[index]
        path: VariablePath,
        /// Value to store: true/false, an integer (decimal or 0x hex) or a float
        #[arg(allow_hyphen_values = true)]
        value: Value,
        /// Raw RAM dump to patch; created zeroed if it does not exist
        #[arg(long)]
        ram: PathBuf,
        /// Size of a newly created RAM dump in bytes
        #[arg(long, default_value_t = DEFAULT_RAM_SIZE)]
        ram_size: usize,
    },
}

/// Options shared by every command that binds globals
#[derive(Args, Debug)]
struct Target
{
    /// ELF file with DWARF debug info
    elf: PathBuf,
    /// Compile unit name (DW_AT_name); optional when the ELF has exactly one
    #[arg(long)]
    unit: Option<String>,
    /// Override the data-space base address (decimal or 0x hex)
    #[arg(long, value_parser = parse_number)]
    data_base: Option<u64>,
}

fn main()
{
    let cli = Cli::parse();

    let _guard = match init_cli_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_cli_logging(cli: &Cli) -> Result<LoggingGuard, Box<dyn Error>>
{
    if let Some(dir) = &cli.log_dir {
        let (file, guard) = init_logging_to_dir(dir, cli.log_level.unwrap_or(LogLevel::Debug))?;
        info!("Logging to {}", file.display());
        return Ok(guard);
    }
    let guard = match cli.log_level {
        Some(level) => init_logging_with_level(level, LogFormat::Pretty)?,
        None => init_logging()?,
    };
    Ok(guard)
}

fn run_command(command: Commands) -> Result<(), Box<dyn Error>>
{
    match command {
        Commands::Units { elf } => {
            let debug = DebugInfo::open(&elf)?;
            println!("{} ({})", debug.origin(), debug.architecture());
            for name in debug.compile_unit_names()? {
                println!("  {name}");
            }
        }
        Commands::List { target, members } => {
            let debug = DebugInfo::open(&target.elf)?;
            // Listing only resolves locations, nothing is read
            let memory = SparseMemory::new();
            let globals = bind_globals(&debug, &memory, &target)?;
            list_globals(&globals, members)?;
        }
        Commands::Read { target, path, ram } => {
            let debug = DebugInfo::open(&target.elf)?;
            let memory = RamImage::load(&ram)?;
            let globals = bind_globals(&debug, &memory, &target)?;
            read_path(&globals, &path)?;
        }
        Commands::Write {
            target,
            path,
            value,
            ram,
            ram_size,
        } => {
            let debug = DebugInfo::open(&target.elf)?;
            let memory = open_or_create(&ram, ram_size)?;
            let globals = bind_globals(&debug, &memory, &target)?;
            let primitive = select(&globals, &path)?.into_primitive()?;
            primitive.write(value)?;
            memory.save(&ram)?;
            info!("Wrote {} to {} in {}", value, path, ram.display());
            println!("{} = {}", primitive.name(), primitive.read()?);
        }
    }
    Ok(())
}

fn bind_globals<'a>(debug: &'a DebugInfo, memory: &'a dyn Memory, target: &Target) -> Result<Globals<'a>, Box<dyn Error>>
{
    let unit = match &target.unit {
        Some(unit) => unit.clone(),
        None => {
            let mut names = debug.compile_unit_names()?;
            if names.len() != 1 {
                return Err(format!(
                    "{} has {} compile units, pick one with --unit: {}",
                    debug.origin(),
                    names.len(),
                    names.join(", ")
                )
                .into());
            }
            names.remove(0)
        }
    };

    let globals = Globals::new(debug, memory, &unit)?;
    Ok(match target.data_base {
        Some(base) => globals.with_memory_map(MemoryMap::new(base)),
        None => globals,
    })
}

fn open_or_create(ram: &Path, size: usize) -> Result<RamImage, Box<dyn Error>>
{
    if ram.exists() {
        Ok(RamImage::load(ram)?)
    } else {
        info!("Creating zeroed RAM image {} ({size} bytes)", ram.display());
        Ok(RamImage::zeroed(size))
    }
}

/// Bind the global a path names and apply its selector
fn select<'a>(globals: &Globals<'a>, path: &VariablePath) -> SymvarResult<Variable<'a>>
{
    let variable = globals.variable(&path.global)?;
    Ok(match &path.selector {
        None => variable,
        Some(Selector::Member(member)) => Variable::Primitive(variable.into_struct()?.member(member)?),
        Some(Selector::Index(index)) => Variable::Primitive(variable.into_array()?.get(*index)?),
    })
}

fn read_path(globals: &Globals<'_>, path: &VariablePath) -> SymvarResult<()>
{
    match select(globals, path)? {
        Variable::Primitive(primitive) => println!("{} = {}", primitive.name(), primitive.read()?),
        Variable::Struct(structure) => {
            for member in structure.member_names()? {
                match structure.member(&member) {
                    Ok(primitive) => println!("{} = {}", primitive.name(), primitive.read()?),
                    Err(SymvarError::UnsupportedType(reason)) => println!("{}.{member} = <{reason}>", structure.name()),
                    Err(e) => return Err(e),
                }
            }
        }
        Variable::Array(array) => {
            for index in 0..array.size() {
                let element = array.get(index)?;
                println!("{} = {}", element.name(), element.read()?);
            }
        }
    }
    Ok(())
}

fn list_globals(globals: &Globals<'_>, members: bool) -> SymvarResult<()>
{
    println!("{} (data base {:#x})", globals.compile_unit().name().unwrap_or("<unnamed>"), globals.memory_map().data_base());
    for name in globals.variable_names()? {
        let variable = match globals.variable(&name) {
            Ok(variable) => variable,
            Err(e) => {
                println!("  {name:<24} <{e}>");
                continue;
            }
        };

        match &variable {
            Variable::Primitive(primitive) => println!("  {}", describe(primitive)),
            Variable::Struct(structure) => {
                println!("  {name:<24} struct      {}", location_text(variable.location()));
                if members {
                    for member in structure.member_names()? {
                        match structure.member(&member) {
                            Ok(primitive) => println!("    {}", describe(&primitive)),
                            Err(e) => println!("    {name}.{member:<20} <{e}>"),
                        }
                    }
                }
            }
            Variable::Array(array) => {
                println!(
                    "  {name:<24} {}[{}]  {}",
                    array.element_kind(),
                    array.size(),
                    location_text(variable.location())
                );
                if members {
                    for index in 0..array.size() {
                        println!("    {}", describe(&array.get(index)?));
                    }
                }
            }
        }
    }
    Ok(())
}

fn describe(primitive: &Primitive<'_>) -> String
{
    let ty = match primitive.bit_field() {
        Some(field) => format!("{} ({field})", primitive.type_name()),
        None => primitive.type_name().to_string(),
    };
    format!("{:<24} {ty:<11} {}", primitive.name(), location_text(primitive.location()))
}

fn location_text(location: SymvarResult<Address>) -> String
{
    match location {
        Ok(address) => address.to_string(),
        Err(SymvarError::ConstHasNoLocation(_)) => "const".to_string(),
        Err(e) => format!("<{e}>"),
    }
}

fn parse_number(s: &str) -> Result<u64, String>
{
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse::<u64>(),
    };
    parsed.map_err(|e| format!("Invalid number {s}: {e}"))
}
