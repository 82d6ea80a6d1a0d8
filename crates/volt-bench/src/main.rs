use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{ArgAction, Parser};
use serde::Serialize;

use volt_compiler::{Compiler, CompilerOptions, FileSystemLoader};
use volt_lexer::Lexer;
use volt_parser::Parser as VoltParser;
use volt_syntax::Error;

#[derive(Parser, Debug)]
#[command(name = "volt-bench", about = "Run Volt compiler benchmarks")]
struct Cli {
    /// Specific template(s) to run (by name, e.g. catalog). If omitted, runs all discovered templates.
    #[arg(short = 't', long = "test", action = ArgAction::Append)]
    tests: Vec<String>,

    /// Iterations per template (measured)
    #[arg(short = 'n', long = "iterations", default_value_t = 10)]
    iterations: u32,

    /// Warmup iterations (not measured)
    #[arg(short = 'w', long = "warmup", default_value_t = 2)]
    warmup: u32,

    /// Output JSON file path; default: benchmark/results/<timestamp>.json
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Compile with autoescape enabled
    #[arg(long = "autoescape", default_value_t = false)]
    autoescape: bool,

    /// List discovered templates and exit
    #[arg(long = "list", default_value_t = false)]
    list: bool,
}

#[derive(Debug, Serialize)]
struct BenchResult {
    name: String,
    iterations: u32,
    avg_total_ms: f64,
    min_total_ms: f64,
    max_total_ms: f64,
    avg_lex_ms: f64,
    avg_parse_ms: f64,
    avg_generate_ms: f64,
    output_bytes: usize,
}

#[derive(Debug, Serialize)]
struct OutputDoc {
    timestamp: String,
    volt_version: String,
    autoescape: bool,
    benchmarks: Vec<BenchResult>,
}

#[derive(Debug, Clone)]
struct TemplateCase {
    name: String,
    path: PathBuf,
}

#[derive(Debug, Default)]
struct Samples {
    totals: Vec<f64>,
    lexes: Vec<f64>,
    parses: Vec<f64>,
    generates: Vec<f64>,
    output_bytes: usize,
}

fn workspace_root() -> PathBuf {
    // crates/volt-bench -> crates -> root
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.ancestors().nth(2).unwrap_or(manifest).to_path_buf()
}

fn templates_dir() -> PathBuf {
    workspace_root().join("benchmark/templates")
}

/// Top-level `.volt` files only; subdirectories hold partials.
fn discover_templates(dir: &Path) -> Vec<TemplateCase> {
    let mut out = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for e in entries.flatten() {
            let p = e.path();
            if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("volt") {
                let name = p.file_stem().and_then(|s| s.to_str()).unwrap_or("").to_string();
                out.push(TemplateCase { name, path: p });
            }
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

fn fail(msg: String) -> ! {
    eprintln!("error: {}", msg);
    std::process::exit(1);
}

fn compile_once(compiler: &Compiler, src: &str, name: &str) -> Result<(Duration, Duration, Duration, usize), Error> {
    let mut t = Instant::now();
    let tokens = Lexer::with_delimiters(src, &compiler.options().delimiters).tokenize()?;
    let t_lex = t.elapsed();

    t = Instant::now();
    let template = VoltParser::new(tokens).parse_template()?;
    let t_parse = t.elapsed();

    t = Instant::now();
    let compilation = compiler.generate(template, name)?;
    let t_gen = t.elapsed();

    Ok((t_lex, t_parse, t_gen, compilation.code.len()))
}

fn measure_template(compiler: &Compiler, src: &str, name: &str, iterations: u32, warmup: u32) -> Result<Samples, Error> {
    for _ in 0..warmup {
        compile_once(compiler, src, name)?;
    }

    let mut samples = Samples::default();
    for _ in 0..iterations {
        let t0 = Instant::now();
        let (lex, parse, gen, bytes) = compile_once(compiler, src, name)?;
        let total = t0.elapsed();

        samples.lexes.push(dur_ms(lex));
        samples.parses.push(dur_ms(parse));
        samples.generates.push(dur_ms(gen));
        samples.totals.push(dur_ms(total));
        samples.output_bytes = bytes;
    }
    Ok(samples)
}

fn dur_ms(d: Duration) -> f64 { d.as_secs_f64() * 1000.0 }

fn stats(vals: &[f64]) -> (f64, f64, f64) {
    if vals.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let min = vals.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = vals.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let avg = vals.iter().sum::<f64>() / (vals.len() as f64);
    (avg, min, max)
}

fn ensure_dir(p: &Path) {
    if let Err(e) = fs::create_dir_all(p) {
        fail(format!("Failed to create {}: {}", p.display(), e));
    }
}

fn main() {
    let cli = Cli::parse();

    let dir = templates_dir();
    let mut cases = discover_templates(&dir);

    if cli.list {
        println!("Discovered templates:");
        for c in &cases { println!("- {} ({})", c.name, c.path.display()); }
        return;
    }

    if !cli.tests.is_empty() {
        let wanted: std::collections::HashSet<_> = cli.tests.iter().map(|s| s.to_lowercase()).collect();
        cases.retain(|c| wanted.contains(&c.name.to_lowercase()));
        if cases.is_empty() {
            eprintln!("No matching templates. Use --list to see available.");
            std::process::exit(2);
        }
    }

    if cases.is_empty() {
        eprintln!("No .volt templates found in {}.", dir.display());
        std::process::exit(2);
    }

    let options = CompilerOptions { autoescape: cli.autoescape, ..CompilerOptions::default() };
    let loader = FileSystemLoader::from_options(Some(dir.clone()), &options);
    let compiler = Compiler::with_options(options).with_loader(loader);

    let mut results = Vec::new();

    for case in &cases {
        let src = fs::read_to_string(&case.path)
            .unwrap_or_else(|e| fail(format!("Failed to read {}: {}", case.path.display(), e)));
        let name = case.path.to_string_lossy().into_owned();
        let samples = measure_template(&compiler, &src, &name, cli.iterations, cli.warmup)
            .unwrap_or_else(|e| fail(format!("{}: {}", case.name, e.in_source(&name))));

        let (avg_t, min_t, max_t) = stats(&samples.totals);
        let (avg_l, _, _) = stats(&samples.lexes);
        let (avg_p, _, _) = stats(&samples.parses);
        let (avg_g, _, _) = stats(&samples.generates);

        println!(
            "{:>12}: total avg={:.3}ms min={:.3}ms max={:.3}ms | lex={:.3}ms parse={:.3}ms generate={:.3}ms | out={}B",
            case.name, avg_t, min_t, max_t, avg_l, avg_p, avg_g, samples.output_bytes
        );

        results.push(BenchResult {
            name: case.name.clone(),
            iterations: cli.iterations,
            avg_total_ms: avg_t,
            min_total_ms: min_t,
            max_total_ms: max_t,
            avg_lex_ms: avg_l,
            avg_parse_ms: avg_p,
            avg_generate_ms: avg_g,
            output_bytes: samples.output_bytes,
        });
    }

    let out_path = match cli.output.clone() {
        Some(p) => p,
        None => {
            let results_dir = workspace_root().join("benchmark/results");
            ensure_dir(&results_dir);
            // Windows-safe filename timestamp
            let ts_file = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%SZ").to_string();
            results_dir.join(format!("{}.json", ts_file))
        }
    };

    let doc = OutputDoc {
        timestamp: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        volt_version: env!("CARGO_PKG_VERSION").to_string(),
        autoescape: cli.autoescape,
        benchmarks: results,
    };

    let json = serde_json::to_string_pretty(&doc).unwrap_or_else(|e| fail(format!("Failed to serialize results: {}", e)));
    if let Some(parent) = out_path.parent() { ensure_dir(parent); }
    if let Err(e) = fs::write(&out_path, json) {
        fail(format!("Failed to write {}: {}", out_path.display(), e));
    }

    println!("\nSaved results to {}", out_path.display());
}
