use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox::ast_printer::AstPrinter;
use rox::error::{decode_source, Diagnostics};
use rox::lox::{with_stack, Lox};
use rox::parser::Parser;
use rox::scanner::Scanner;
use rox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints each statement's AST
    Parse {
        filename: PathBuf,

        /// Parse the input as a single expression instead of a program
        #[arg(long)]
        expression: bool,
    },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive prompt (the default)
    Repl,
}

/// Reads a source file through a memory map.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let mut file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Mapping a zero-length file fails on some platforms.
    if len == 0 {
        let mut source = String::new();
        file.read_to_string(&mut source)
            .with_context(|| format!("Failed to read file {:?}", filename))?;
        return Ok(source);
    }

    // SAFETY: the map is read once and copied out before anything else can
    // observe it; concurrent truncation by another process is not guarded.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {:?}", filename))?;

    let source = decode_source(&mmap)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Print every diagnostic to stderr and exit with the matching code.
fn fail(diagnostics: &Diagnostics) -> ! {
    for error in diagnostics {
        eprintln!("{}", error);
    }

    let code = diagnostics.exit_code();
    debug!("Exiting with code {}", code);
    std::process::exit(code);
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut diagnostics = Diagnostics::new();

    for token in Scanner::new(source) {
        match token {
            Ok(token) => {
                if !json {
                    println!("{}", token);
                }
                tokens.push(token);
            }

            Err(e) => {
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
                diagnostics.report(e);
            }
        }
    }

    if json {
        let rendered =
            serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", rendered);
    }

    if diagnostics.has_errors() {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(65);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(source: &str, expression: bool) -> Result<()> {
    let tokens = Scanner::new(source)
        .scan_tokens()
        .unwrap_or_else(|d| fail(&d));

    let parser = Parser::new(&tokens);

    if expression {
        let expr = parser.parse_expression().unwrap_or_else(|d| fail(&d));
        println!("{}", AstPrinter::print(&expr));
    } else {
        let statements = parser.parse().unwrap_or_else(|d| fail(&d));
        for stmt in &statements {
            println!("{}", AstPrinter::print_stmt(stmt));
        }
    }

    info!("Parse subcommand completed");
    Ok(())
}

fn repl() -> Result<()> {
    let mut lox = Lox::new();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let Some(line) = lox.read_line().context("Failed to read from stdin")? else {
            break;
        };

        // Errors are reported but never end the session.
        if let Err(diagnostics) = lox.run_line(&line) {
            for error in &diagnostics {
                eprintln!("{}", error);
            }
        }
    }

    info!("REPL session ended");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let command = args.commands.unwrap_or(Commands::Repl);
    with_stack(move || dispatch(command)).context("Failed to spawn interpreter thread")?
}

/// Runs one subcommand.  Called on the session thread, never on `main`.
fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");
            let source = read_source(&filename)?;
            tokenize(&source, json)?;
        }

        Commands::Parse {
            filename,
            expression,
        } => {
            info!("Running Parse subcommand");
            let source = read_source(&filename)?;
            parse(&source, expression)?;
        }

        Commands::Run { filename } => {
            info!("Running Run subcommand");
            let source = read_source(&filename)?;

            let mut lox = Lox::new();
            if let Err(diagnostics) = lox.run(&source) {
                fail(&diagnostics);
            }

            info!("Program executed successfully");
        }

        Commands::Repl => {
            info!("Running Repl subcommand");
            repl()?;
        }
    }

    Ok(())
}
