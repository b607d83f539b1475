//! vn32 - CLI Entry Point
//!
//! Commands:
//! - `vn32 run <program>` - Run an ASM source or IMG image
//! - `vn32 debug <program>` - Interactive debugger
//! - `vn32 asm <source>` - Assemble to an image
//! - `vn32 disasm <image>` - Disassemble an image
//! - `vn32 snapshot <program>` - Run and print the machine state as JSON

use clap::{Args, Parser, Subcommand};
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use vn32::{Cpu, CpuState, MachineConfig, ProgramImage, Word};

#[derive(Parser)]
#[command(name = "vn32")]
#[command(version = "0.1.0")]
#[command(about = "A minimal 32-bit von Neumann machine with a Load/Store/Add instruction set")]
struct Cli {
    /// Log every fetched and executed instruction
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options that shape the machine.
#[derive(Args)]
struct MachineArgs {
    /// JSON config file (memory_bytes, data, max_cycles)
    #[arg(short, long)]
    config: Option<String>,
    /// Memory size in bytes
    #[arg(short, long)]
    memory: Option<usize>,
    /// Initial data words, comma separated (e.g. 10,15)
    #[arg(short, long, value_delimiter = ',')]
    data: Option<Vec<u32>>,
    /// Maximum number of instructions to execute
    #[arg(long)]
    max_cycles: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the ASM or IMG file to execute
        program: String,
        #[command(flatten)]
        machine: MachineArgs,
        /// Print the data region after the run
        #[arg(long)]
        dump: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the ASM or IMG file to debug
        program: String,
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Assemble source to an image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble an image to readable text
    Disasm {
        /// Path to the image file
        image: String,
    },
    /// Run a program and print the final machine state as JSON
    Snapshot {
        /// Path to the ASM or IMG file to execute
        program: String,
        #[command(flatten)]
        machine: MachineArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.trace);

    let result = match cli.command {
        Commands::Run { program, machine, dump } => run_program(&program, &machine, dump),
        Commands::Debug { program, machine } => debug_program(&program, &machine),
        Commands::Asm { source, output } => assemble_file(&source, output),
        Commands::Disasm { image } => disassemble_file(&image),
        Commands::Snapshot { program, machine } => snapshot_program(&program, &machine),
    };

    if let Err(message) = result {
        eprintln!("error: {}", message);
        std::process::exit(1);
    }
}

/// Install the log subscriber. `RUST_LOG` is honoured unless `--trace` is set.
fn init_logging(trace: bool) {
    let filter = if trace {
        EnvFilter::new("vn32=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the machine config: file first, then flag overrides.
fn machine_config(args: &MachineArgs) -> Result<MachineConfig, String> {
    let mut config = match &args.config {
        Some(path) => MachineConfig::from_json_file(path).map_err(|e| format!("{}: {}", path, e))?,
        None => MachineConfig::default(),
    };

    if let Some(memory) = args.memory {
        config.memory_bytes = memory;
    }
    if let Some(data) = &args.data {
        config.data = data.clone();
    }
    if let Some(max_cycles) = args.max_cycles {
        config.max_cycles = max_cycles;
    }

    config.validate().map_err(|e| e.to_string())?;
    debug!(?config, "machine config");
    Ok(config)
}

fn is_source(path: &str) -> bool {
    Path::new(path).extension().is_some_and(|ext| ext == "asm")
}

fn read_source(path: &str) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path, e))
}

/// Initialize a CPU from either a source file or an image.
fn load_cpu(path: &str, config: MachineConfig) -> Result<Cpu, String> {
    let mut cpu = Cpu::new(config);

    if is_source(path) {
        let source = read_source(path)?;
        let program = cpu.initialize(&source).map_err(|e| e.to_string())?;
        info!(words = program.words.len(), start = program.start, "assembled");
    } else {
        let image = vn32::load_image(path).map_err(|e| e.to_string())?;
        let start = cpu.initialize_image(&image.words).map_err(|e| e.to_string())?;
        info!(words = image.len(), start, "image loaded");
    }

    Ok(cpu)
}

/// Machine words for a program file, assembling in a scratch memory if needed.
fn load_words(path: &str, config: &MachineConfig) -> Result<Vec<Word>, String> {
    if is_source(path) {
        let source = read_source(path)?;
        let mut scratch = vn32::Memory::new(config.memory_bytes);
        let program = vn32::compile(&source, &mut scratch).map_err(|e| e.to_string())?;
        Ok(program.words)
    } else {
        let image = vn32::load_image(path).map_err(|e| e.to_string())?;
        Ok(image.words)
    }
}

fn run_program(path: &str, args: &MachineArgs, dump: bool) -> Result<(), String> {
    let config = machine_config(args)?;
    let max_cycles = config.max_cycles;
    let mut cpu = load_cpu(path, config)?;
    let start = cpu.mem.program_start();
    println!("Program: {} words at word {}", cpu.mem.word_count() - start, start);

    let outcome = cpu.run_limited(max_cycles);

    println!();
    println!("Cycles: {}", cpu.cycles);
    println!("State:  {:?}", cpu.state);
    for index in 0..vn32::cpu::registers::GPR_COUNT {
        let value = cpu.regs.gpr(index).map(|w| w.to_u32()).unwrap_or_default();
        if value != 0 {
            println!("r{:<2} = {}", index, value);
        }
    }

    if dump {
        println!();
        println!("Data region:");
        for (addr, word) in cpu.mem.dump(0, cpu.mem.program_start()) {
            println!("{:03}: {} = {}", addr, word, word.to_u32());
        }
    }

    outcome.map_err(|e| e.to_string())?;

    if cpu.state == CpuState::Ready {
        println!();
        println!("Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
    }
    Ok(())
}

fn snapshot_program(path: &str, args: &MachineArgs) -> Result<(), String> {
    let config = machine_config(args)?;
    let max_cycles = config.max_cycles;
    let mut cpu = load_cpu(path, config)?;

    let outcome = cpu.run_limited(max_cycles);
    let json = serde_json::to_string_pretty(&cpu.snapshot()).map_err(|e| e.to_string())?;
    println!("{}", json);

    outcome.map(|_| ()).map_err(|e| e.to_string())
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, args: &MachineArgs) -> Result<(), String> {
    let config = machine_config(args)?;
    let words = load_words(path, &config)?;
    if words.is_empty() {
        return Err("no instructions to execute".into());
    }

    vn32::run_debugger(config, words).map_err(|e| format!("debugger error: {}", e))
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str, _args: &MachineArgs) -> Result<(), String> {
    Err("the debugger requires the `tui` feature".into())
}

fn assemble_file(source_path: &str, output: Option<String>) -> Result<(), String> {
    let out_path = output.unwrap_or_else(|| {
        Path::new(source_path).with_extension("img").to_string_lossy().into_owned()
    });

    println!("Assembling: {} -> {}", source_path, out_path);

    let words = load_words(source_path, &MachineConfig::default())?;
    println!("Assembled {} instructions", words.len());

    vn32::save_image(&out_path, &ProgramImage::new(words)).map_err(|e| e.to_string())?;
    println!("Saved to {}", out_path);
    Ok(())
}

fn disassemble_file(image_path: &str) -> Result<(), String> {
    let image = vn32::load_image(image_path).map_err(|e| e.to_string())?;
    let start = vn32::Memory::new(MachineConfig::default().memory_bytes)
        .word_count()
        .saturating_sub(image.len());

    println!("{}", vn32::disassemble(&image.words, start));
    Ok(())
}
