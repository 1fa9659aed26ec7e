//! The `vibe` command: run a `.vibe` script under the sandboxed engine.

use clap::Parser;
use colored::Colorize;
use std::{path::PathBuf, process::ExitCode, time::Duration};
use vibe_engine::{CallOptions, CancelToken, Engine, Value};

#[derive(Debug, Parser)]
#[command(name = "vibe", about = "Run VibeScript files", version)]
struct Opt {
    /// The script to run.
    file: PathBuf,

    /// Interpreter step quota.
    #[arg(long)]
    step_quota: Option<u64>,

    /// Memory quota in bytes.
    #[arg(long)]
    memory_quota: Option<usize>,

    /// Maximum interpreter call depth.
    #[arg(long)]
    recursion_limit: Option<usize>,

    /// Wall-clock timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Module search root (repeatable, searched in order).
    #[arg(long = "module-path")]
    module_paths: Vec<PathBuf>,

    /// Deny-list glob for module names (repeatable, checked first).
    #[arg(long = "deny")]
    deny: Vec<String>,

    /// Allow-list glob for module names (repeatable).
    #[arg(long = "allow")]
    allow: Vec<String>,

    /// Enable strict effects (implies --allow-require is needed).
    #[arg(long)]
    strict_effects: bool,

    /// Permit `require` under strict effects.
    #[arg(long)]
    allow_require: bool,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let opt = Opt::parse();

    let level = match opt.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let _ = simple_logger::SimpleLogger::new().with_level(level).init();

    let source = match std::fs::read_to_string(&opt.file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{} {}: {err}", "error:".red().bold(), opt.file.display());
            return ExitCode::FAILURE;
        }
    };

    let mut builder = Engine::builder().strict_effects(opt.strict_effects);
    if let Some(quota) = opt.step_quota {
        builder = builder.step_quota(quota);
    }
    if let Some(bytes) = opt.memory_quota {
        builder = builder.memory_quota_bytes(bytes);
    }
    if let Some(limit) = opt.recursion_limit {
        builder = builder.recursion_limit(limit);
    }
    for path in &opt.module_paths {
        builder = builder.module_path(path);
    }
    if opt.module_paths.is_empty() {
        if let Some(parent) = opt.file.parent() {
            builder = builder.module_path(parent);
        }
    }
    for pattern in &opt.deny {
        builder = builder.module_deny(pattern);
    }
    for pattern in &opt.allow {
        builder = builder.module_allow(pattern);
    }

    let engine = match builder.build() {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    engine.register_builtin("puts", |_, inv| {
        let line = inv
            .args
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        println!("{line}");
        Ok(Value::Nil)
    });

    let script = match engine.compile(&source) {
        Ok(script) => script,
        Err(err) => {
            eprintln!("{} {err}", "compile error:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let cancel = match opt.timeout_ms {
        Some(ms) => CancelToken::with_timeout(Duration::from_millis(ms)),
        None => CancelToken::new(),
    };
    let options = CallOptions {
        allow_require: opt.allow_require || !opt.strict_effects,
        ..CallOptions::default()
    };

    // Scripts with a `main` function are called through it; anything else
    // is evaluated top to bottom.
    let result = if script.has_function("main") {
        script.call(&cancel, "main", &[], options)
    } else {
        script.eval(&cancel, options)
    };

    match result {
        Ok(Value::Nil) => ExitCode::SUCCESS,
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err.render(Some(script.source())).red());
            ExitCode::FAILURE
        }
    }
}
