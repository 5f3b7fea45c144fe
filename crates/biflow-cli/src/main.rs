use anyhow::Result;
use biflow_cli::config::{load_settings, read_source};
use biflow_cli::logger;
use biflow_cli::report::{self, Format, Selection};
use biflow_parse::parse_str;
use biflow_types::TypeChecker;
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "biflow")]
#[command(about = "biflow: structural type inference for a Python subset")]
struct Cli {
    /// Log solver activity to stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Infer and print the type of every binding
    Check {
        /// Path to the source file
        file: PathBuf,

        /// Report every binding in order, shadowed ones included
        #[arg(long)]
        all: bool,

        /// Also report the builtin environment
        #[arg(long)]
        builtins: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Pretty)]
        format: Format,

        /// Type print(..) as none and input(..) as str
        #[arg(long)]
        skip_print_input: bool,

        /// JSON settings file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Parse a source file and dump the AST
    Parse {
        /// Path to the source file
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let outcome = match cli.command {
        Commands::Check {
            file,
            all,
            builtins,
            format,
            skip_print_input,
            config,
        } => cmd_check(
            &file,
            Selection { all, builtins },
            format,
            skip_print_input,
            config.as_deref(),
        ),
        Commands::Parse { file, format } => cmd_parse(&file, format).map(|()| ExitCode::SUCCESS),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_check(
    file: &Path,
    selection: Selection,
    format: Format,
    skip_print_input: bool,
    config: Option<&Path>,
) -> Result<ExitCode> {
    let mut settings = load_settings(config)?;
    if skip_print_input {
        settings.skip_print_and_input = true;
    }

    let src = read_source(file)?;
    let module = parse_str(&file.display().to_string(), &src)?;
    let inference = TypeChecker::with_settings(settings).check_module(&module);

    // best-effort report first, then the error
    let text = report::render(&report::select(&inference, selection), format)?;
    print!("{}", text);

    match inference.error() {
        Some(e) => {
            eprintln!("Type error: {}", e);
            Ok(ExitCode::FAILURE)
        }
        None => Ok(ExitCode::SUCCESS),
    }
}

fn cmd_parse(file: &Path, format: Format) -> Result<()> {
    let src = read_source(file)?;
    let module = parse_str(&file.display().to_string(), &src)?;

    match format {
        Format::Pretty => println!("{:#?}", module),
        Format::Json => println!("{}", serde_json::to_string_pretty(&module)?),
    }
    Ok(())
}
