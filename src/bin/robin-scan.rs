//! robin-scan: lexical scanner driver.
//!
//! `scan` tokenizes a source file and writes the program internal form and
//! the symbol table; `fa` loads a finite automaton, describes it and checks
//! sequences against it.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use robin_table::{FiniteAutomaton, ScanConfig, ScanError, Scanner, TokenSpec};
use tracing::{debug, info};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "robin-scan")]
#[command(about = "Lexical scanner backed by a Robin Hood hash table")]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a source file and write the PIF and symbol table
    Scan {
        /// Token file: operators, separators and reserved words
        #[arg(long, value_name = "PATH", default_value = "token.in")]
        tokens: PathBuf,

        /// Program to scan
        #[arg(long, value_name = "PATH", default_value = "p1.txt")]
        source: PathBuf,

        /// Output path of the program internal form
        #[arg(long, value_name = "PATH", default_value = "PIF.out")]
        pif: PathBuf,

        /// Output path of the symbol table
        #[arg(long, value_name = "PATH", default_value = "ST.out")]
        st: PathBuf,

        /// Automaton deciding which tokens are identifiers
        #[arg(long, value_name = "PATH")]
        identifier_fa: Option<PathBuf>,

        /// Automaton deciding which tokens are integer constants
        #[arg(long, value_name = "PATH")]
        integer_fa: Option<PathBuf>,
    },
    /// Load a finite automaton and check sequences against it
    Fa {
        /// Automaton definition file
        file: PathBuf,

        /// Sequence to check (repeatable)
        #[arg(long, value_name = "SEQ")]
        verify: Vec<String>,

        /// Print states, alphabet and transitions
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Command::Scan {
            tokens,
            source,
            pif,
            st,
            identifier_fa,
            integer_fa,
        } => {
            let spec = TokenSpec::from_path(&tokens)
                .with_context(|| format!("loading token file {}", tokens.display()))?;
            let mut config = ScanConfig::new(spec);
            if let Some(path) = identifier_fa {
                let fa = FiniteAutomaton::from_path(&path)
                    .with_context(|| format!("loading identifier automaton {}", path.display()))?;
                config = config.with_identifier_automaton(fa);
            }
            if let Some(path) = integer_fa {
                let fa = FiniteAutomaton::from_path(&path)
                    .with_context(|| format!("loading integer automaton {}", path.display()))?;
                config = config.with_integer_automaton(fa);
            }

            let mut scanner = Scanner::new(config);
            info!(source = %source.display(), "scanning");
            match scanner.scan_path(&source) {
                Ok(form) => {
                    println!("Lexically correct");
                    form.write_to_path(&pif, &scanner.config().tokens)
                        .with_context(|| format!("writing {}", pif.display()))?;
                    scanner
                        .symbols()
                        .write_to_path(&st)
                        .with_context(|| format!("writing {}", st.display()))?;
                    debug!(tokens = form.len(), symbols = scanner.symbols().len(), "reports written");
                    Ok(ExitCode::SUCCESS)
                }
                Err(err @ ScanError::Lexical { .. }) => {
                    println!("Lexical error: {err}");
                    Ok(ExitCode::FAILURE)
                }
                Err(err) => Err(err).with_context(|| format!("scanning {}", source.display())),
            }
        }
        Command::Fa { file, verify, show } => {
            let fa = FiniteAutomaton::from_path(&file)
                .with_context(|| format!("loading automaton {}", file.display()))?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            if show || verify.is_empty() {
                fa.describe(&mut out)?;
            }
            for sequence in &verify {
                let verdict = if fa.accepts(sequence) { "accepted" } else { "not accepted" };
                writeln!(out, "The sequence {sequence} is {verdict} by the FA")?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("robin_table=debug,robin_scan=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
