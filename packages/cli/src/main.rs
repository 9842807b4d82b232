use anyhow::{anyhow, Context, Result};
use astro_compiler_js::{compile, parse_to_json, CompileError, TransformOptions};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Compiler for .astro component files
#[derive(Parser, Debug)]
#[command(name = "astro-compile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile .astro files to JavaScript modules
    Build(BuildArgs),

    /// Parse a .astro file and print its tree as JSON
    Parse(ParseArgs),
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Input .astro file or directory
    input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "dist")]
    out_dir: PathBuf,

    /// Print output to stdout instead of writing files
    #[arg(long)]
    stdout: bool,

    /// Site URL passed to the runtime
    #[arg(long, default_value = "")]
    site: String,

    /// Base URL the emitted module imports the runtime from
    #[arg(long, default_value = "astro/internal")]
    internal_url: String,

    /// Project root passed to the runtime
    #[arg(long, default_value = ".")]
    project_root: String,

    /// Leave hoisted scripts to the bundler instead of inlining them
    #[arg(long)]
    static_extraction: bool,

    /// Skip the sidecar .js.map file
    #[arg(long)]
    no_sourcemap: bool,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Input .astro file
    input: PathBuf,

    /// Pretty-print the JSON
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Build(args) => build(args),
        Command::Parse(args) => parse_command(args),
    }
}

fn build(args: BuildArgs) -> Result<()> {
    let options = TransformOptions {
        scope: None,
        site: args.site.clone(),
        internal_url: args.internal_url.clone(),
        project_root: args.project_root.clone(),
        static_extraction: args.static_extraction,
    };

    let files = find_astro_files(&args.input)?;
    if files.is_empty() {
        println!("{}", "No .astro files found".yellow());
        return Ok(());
    }

    let mut errors = 0usize;
    for file in &files {
        match build_file(file, &args, &options) {
            Ok(output) => {
                println!("  {} {} → {}", "✓".green(), file.display(), output);
            }
            Err(e) => {
                errors += 1;
                eprintln!("  {} {} - {}", "✗".red(), file.display(), e.to_string().red());
            }
        }
    }

    if errors > 0 {
        return Err(anyhow!("{} of {} files failed", errors, files.len()));
    }
    println!("{} Compiled {} files", "✅".green(), files.len());
    Ok(())
}

fn build_file(file: &Path, args: &BuildArgs, options: &TransformOptions) -> Result<String> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let result = compile(&source, options).map_err(|e| match e {
        CompileError::Parse(parse_err) => {
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown");
            anyhow!(
                "\n{}",
                astro_parser::error::pretty::format_error(&parse_err, name, &source)
            )
        }
        other => anyhow!(other),
    })?;

    for warning in &result.warnings {
        eprintln!("  {} {}", "warning:".yellow(), warning);
    }

    if args.stdout {
        println!("{}", result.output);
        return Ok("stdout".to_string());
    }

    let file_name = file
        .file_stem()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("invalid file name: {}", file.display()))?;
    fs::create_dir_all(&args.out_dir)?;
    let out_file = args.out_dir.join(format!("{}.js", file_name));

    if args.no_sourcemap {
        fs::write(&out_file, &result.output)?;
    } else {
        let map_file = args.out_dir.join(format!("{}.js.map", file_name));
        let sourcemap = serde_json::json!({
            "version": 3,
            "sources": [file.display().to_string()],
            "names": [],
            "mappings": result.source_map_chunk,
            "sourcesContent": [source],
        });
        fs::write(&map_file, serde_json::to_string(&sourcemap)?)?;
        let output = format!(
            "{}\n//# sourceMappingURL={}.js.map\n",
            result.output, file_name
        );
        fs::write(&out_file, output)?;
    }

    Ok(out_file.display().to_string())
}

fn parse_command(args: ParseArgs) -> Result<()> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let json = parse_to_json(&source, args.pretty).map_err(|e| anyhow!(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn find_astro_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(input)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("astro") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}
