mod diagnostics;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use owo_colors::OwoColorize;
use volt_compiler::{Compiler, CompilerOptions, FileSystemLoader};
use volt_parser::Parser as VoltParser;
use volt_syntax::Error;

use diagnostics::render_error;

#[derive(Parser, Debug)]
#[command(name = "voltc", version, about = "Compile Volt templates to PHP")]
struct Cli {
    /// Template to compile
    file: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Directory that extends/include paths are relative to
    #[arg(long = "root")]
    root: Option<PathBuf>,

    /// Escape every print by default (also VOLT_AUTOESCAPE=1)
    #[arg(long = "autoescape", default_value_t = false)]
    autoescape: bool,

    /// JSON file with compiler options
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// What to print
    #[arg(long = "emit", value_enum, default_value_t = Emit::Php)]
    emit: Emit,

    /// Print phase timings and inheritance details to stderr
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    Php,
    Tokens,
    Ir,
}

fn fail(msg: String) -> ! {
    eprintln!("{}: {}", "error".red().bold(), msg.red());
    process::exit(1);
}

fn env_autoescape() -> Option<bool> {
    let value = std::env::var("VOLT_AUTOESCAPE").ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

fn load_options(cli: &Cli) -> CompilerOptions {
    let mut options: CompilerOptions = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .unwrap_or_else(|e| fail(format!("Failed to read {}: {}", path.display(), e)));
            serde_json::from_str(&text)
                .unwrap_or_else(|e| fail(format!("Invalid options in {}: {}", path.display(), e)))
        }
        None => CompilerOptions::default(),
    };
    if let Some(enabled) = env_autoescape() {
        options.autoescape = enabled;
    }
    if cli.autoescape {
        options.autoescape = true;
    }
    options
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn write_output(path: &Path, text: &str) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            fail(format!("Failed to create {}: {}", parent.display(), e));
        }
    }
    if let Err(e) = fs::write(path, text) {
        fail(format!("Failed to write {}: {}", path.display(), e));
    }
}

fn run(cli: &Cli, compiler: &Compiler, name: &str, src: &str) -> Result<String, Error> {
    let start = Instant::now();
    let tokens = compiler.tokenize(src).map_err(|e| e.in_source(name))?;
    let lex_time = start.elapsed();

    if cli.emit == Emit::Tokens {
        let lines: Vec<String> = tokens
            .iter()
            .map(|t| format!("{:>4}:{:<4} {}", t.line, t.col, t.kind.describe()))
            .collect();
        return Ok(lines.join("\n") + "\n");
    }

    let start = Instant::now();
    let template = VoltParser::new(tokens).parse_template().map_err(|e| e.in_source(name))?;
    let parse_time = start.elapsed();

    if cli.emit == Emit::Ir {
        return serde_json::to_string_pretty(&template)
            .map(|json| json + "\n")
            .or_else(|e| fail(format!("Failed to serialize IR: {}", e)));
    }

    let start = Instant::now();
    let compilation = compiler.generate(template, name)?;
    let gen_time = start.elapsed();

    if cli.verbose {
        eprintln!("{} {:.3} ms", "lex:     ".bright_black(), ms(lex_time));
        eprintln!("{} {:.3} ms", "parse:   ".bright_black(), ms(parse_time));
        eprintln!("{} {:.3} ms", "generate:".bright_black(), ms(gen_time));
        if compilation.chain.len() > 1 {
            eprintln!("{} {}", "chain:   ".bright_black(), compilation.chain.join(" -> "));
        }
        for block in &compilation.dead_blocks {
            eprintln!("{} block '{}' is never rendered", "warning:".yellow().bold(), block);
        }
    }
    Ok(compilation.code)
}

fn main() {
    let cli = Cli::parse();

    let name = cli.file.to_string_lossy().into_owned();
    if !cli.file.exists() {
        fail(format!("File not found: {}", name));
    }
    let src = fs::read_to_string(&cli.file).unwrap_or_else(|e| fail(format!("Failed to read {}: {}", name, e)));

    let options = load_options(&cli);
    let loader = FileSystemLoader::from_options(cli.root.clone(), &options);
    let compiler = Compiler::with_options(options).with_loader(loader);

    match run(&cli, &compiler, &name, &src) {
        Ok(out) => match &cli.output {
            Some(path) => write_output(path, &out),
            None => print!("{}", out),
        },
        Err(e) => {
            render_error(&e, &name, &src);
            process::exit(1);
        }
    }
}
