use std::path::PathBuf;

use clap::Parser;

#[derive(Clone, clap::ValueEnum, Debug, PartialEq, Eq, Hash)]
pub enum Optimization {
    #[clap(name = "unused-store")]
    UnusedStoreElimination,
    #[clap(name = "unused-assign")]
    UnusedAssignElimination,
    #[clap(name = "all")]
    All,
}

#[derive(Clone, Copy, clap::ValueEnum, Debug, PartialEq, Eq)]
pub enum Action {
    /// Print the token stream.
    Scan,
    /// Print the parsed program.
    Parse,
    /// Run the requested optimizations and print the result.
    Optimize,
}

#[derive(Parser, Debug)]
#[command(
    name = "evmil",
    about = "Optimizer for a low-level, EVM-oriented intermediate language"
)]
pub struct Args {
    /// Input file.
    pub input: PathBuf,
    /// What to do with the input.
    #[arg(long, value_enum, default_value = "optimize")]
    pub action: Action,
    /// Optimizations to run, in their fixed pipeline order.
    #[arg(short = 'O', long = "opt", value_enum)]
    pub opt: Vec<Optimization>,
    /// Output file; stdout if absent.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Treat the program as part of a larger object whose subroutines pass
    /// data through memory.
    #[arg(long)]
    pub object_access: bool,
}

pub fn parse() -> Args {
    Args::parse()
}
