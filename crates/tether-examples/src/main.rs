use std::env;

use tracing_subscriber::EnvFilter;

mod scenarios;

type AnyResult<T> = Result<T, String>;

const SCENARIOS: &[&str] = &["nested-handoff", "abort", "segv", "panic"];

struct Args {
    list: bool,
    requested: Option<String>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> AnyResult<()> {
    let args = parse_args()?;

    if args.list {
        for scenario in SCENARIOS {
            println!("{scenario}");
        }
        return Ok(());
    }

    let Some(requested) = args.requested else {
        print_help();
        return Err("No scenario given".to_owned());
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tether::init().map_err(|e| format!("failed to install fault reporting: {e}"))?;
    if !tether::config().fault_report {
        eprintln!(
            "note: {}={} is not set; crashes will not print a chain",
            tether::ENV_VAR,
            tether::FAULT_REPORT_MARKER
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("tether-worker")
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    match requested.as_str() {
        "nested-handoff" => scenarios::nested_handoff::run(runtime.handle()),
        "abort" => scenarios::fatal_signal::run(runtime.handle(), libc::SIGABRT),
        "segv" => scenarios::fatal_signal::run(runtime.handle(), libc::SIGSEGV),
        "panic" => scenarios::job_panic::run(runtime.handle()),
        other => Err(format!(
            "Unknown scenario '{other}'. Available: {}",
            SCENARIOS.join(", ")
        )),
    }
}

fn parse_args() -> AnyResult<Args> {
    let mut args = env::args().skip(1);
    let mut list = false;
    let mut requested: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--list" => {
                list = true;
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            _ if arg.starts_with('-') => {
                return Err(format!("Unknown option '{arg}'"));
            }
            _ => {
                if requested.is_some() {
                    return Err("Too many arguments".to_owned());
                }
                requested = Some(arg);
            }
        }
    }

    Ok(Args { list, requested })
}

fn print_help() {
    eprintln!("Usage: tether-examples [--list] <scenario>");
    eprintln!("Run with TETHER=fault-report to print chains on crashes.");
}
