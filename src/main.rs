use clap::{App, Arg, ArgMatches, ErrorKind};
use rlox::Lox;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process;
use std::thread;
use tracing::info;

const EX_USAGE: i32 = 64;
const EX_SOFTWARE: i32 = 70;
const EX_OSERR: i32 = 71;
const EX_IOERR: i32 = 74;

// Room for the interpreter's maximum call depth.
const STACK_SIZE: usize = 256 * 1024 * 1024;

fn main() {
    let matches = parse_args();
    init_tracing(matches.occurrences_of("verbose"));
    let script = matches.value_of("script").map(str::to_string);
    let session = thread::Builder::new()
        .name("lox".to_string())
        .stack_size(STACK_SIZE)
        .spawn(move || match script {
            Some(path) => run_file(&path),
            None => run_prompt(),
        });
    match session {
        Ok(handle) => {
            if handle.join().is_err() {
                process::exit(EX_SOFTWARE);
            }
        }
        Err(err) => {
            eprintln!("Could not start the interpreter: {}", err);
            process::exit(EX_OSERR);
        }
    }
}

fn parse_args() -> ArgMatches<'static> {
    let app = App::new("rlox")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tree-walking interpreter for the Lox language")
        .arg(
            Arg::with_name("script")
                .help("Script to run; starts an interactive prompt when omitted")
                .index(1),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Logs more detail to stderr; repeat for more"),
        );
    match app.get_matches_safe() {
        Ok(matches) => matches,
        Err(err) => match err.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => err.exit(),
            _ => {
                eprintln!("{}", err.message);
                process::exit(EX_USAGE);
            }
        },
    }
}

/// `RUST_LOG` wins when set; otherwise each `-v` lowers the threshold by
/// one level, starting from warnings.
fn init_tracing(verbosity: u64) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn run_file(path: &str) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read '{}': {}", path, err);
            process::exit(EX_IOERR);
        }
    };
    info!(path, bytes = source.len(), "running script");
    let mut lox = Lox::new();
    if let Err(err) = lox.run(&source) {
        eprintln!("{}", err);
        process::exit(err.exit_code());
    }
}

fn run_prompt() {
    let mut lox = Lox::new();
    let stdin = io::stdin();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                eprintln!("Could not read input: {}", err);
                break;
            }
        }
        // Errors end the line, not the session.
        if let Err(err) = lox.run(&line) {
            eprintln!("{}", err);
        }
    }
}
