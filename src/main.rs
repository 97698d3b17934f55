use clap::Parser;
use serde::Serialize;
use std::io::Read;

use scrolls::logging::init_tracing;
use scrolls::{Environment, EnvironmentOptions, ExecutionLimits, ScrollError};

#[derive(Parser)]
#[command(name = "scrolls")]
#[command(about = "Run Scrolls scripts")]
#[command(version)]
struct Cli {
    /// Execute the script from command line argument
    #[arg(short = 'c')]
    script: Option<String>,

    /// Read statements from stdin interactively
    #[arg(long = "repl")]
    repl: bool,

    /// Print the parsed tree as JSON instead of running the script
    #[arg(long = "parse")]
    parse: bool,

    /// Stop after this many statements (0 = unlimited)
    #[arg(long = "statement-limit")]
    statement_limit: Option<u64>,

    /// Maximum call stack depth (0 = unlimited)
    #[arg(long = "call-depth-limit")]
    call_depth_limit: Option<usize>,

    /// Disable file-open, file-read and file-close
    #[arg(long = "no-files")]
    no_files: bool,

    /// Disable select, shuffle and uniform
    #[arg(long = "no-random")]
    no_random: bool,

    /// Enable the backtrace command
    #[arg(long = "debug")]
    debug: bool,

    /// Print the outcome as JSON (ok, error)
    #[arg(long = "json")]
    json: bool,

    /// Script file to execute
    #[arg()]
    script_file: Option<String>,
}

#[derive(Serialize)]
struct RunReport {
    ok: bool,
    error: Option<String>,
}

fn finish(json: bool, result: Result<(), ScrollError>) -> ! {
    let code = if result.is_ok() { 0 } else { 1 };
    if json {
        let report = RunReport {
            ok: result.is_ok(),
            error: result.as_ref().err().map(ScrollError::message),
        };
        match serde_json::to_string(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error: cannot serialize report: {}", e),
        }
    } else if let Err(e) = &result {
        eprintln!("{}", e);
    }
    std::process::exit(code);
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let defaults = ExecutionLimits::default();
    let options = EnvironmentOptions {
        limits: ExecutionLimits {
            max_statements: cli.statement_limit.unwrap_or(defaults.max_statements),
            max_call_depth: cli.call_depth_limit.unwrap_or(defaults.max_call_depth),
        },
        files: !cli.no_files,
        random: !cli.no_random,
        debug: cli.debug,
        ..EnvironmentOptions::default()
    };

    if cli.repl {
        let mut env = Environment::new(options);
        let stdin = std::io::stdin();
        let result = env.repl(stdin.lock(), |e| eprintln!("{}", e));
        finish(cli.json, result);
    }

    // Determine script source: -c, file, or stdin
    let script = if let Some(s) = cli.script {
        s
    } else if let Some(ref file) = cli.script_file {
        match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error: Cannot read script file: {}: {}", file, e);
                std::process::exit(1);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("Error: No script provided. Use -c 'script', provide a script file, pipe via stdin, or use --repl.");
            std::process::exit(1);
        }
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            eprintln!("Error: Cannot read stdin: {}", e);
            std::process::exit(1);
        }
        buf
    };

    let mut env = Environment::new(options);
    if cli.parse {
        match env.interpreter().test_parse(&script) {
            Ok(dump) => {
                println!("{}", dump);
                std::process::exit(0);
            }
            Err(e) => finish(cli.json, Err(e.into())),
        }
    }

    let result = env.exec(&script);
    finish(cli.json, result);
}
