use canopy::{config, generate, output, render, scan};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Hierarchical static site generator")]
#[command(long_about = "\
Hierarchical static site generator

Your filesystem is the site map. Every content file renders to HTML at the
same relative location; directories aggregate their descendants' metadata
so an ancestor page can list everything beneath it.

Content structure:

  content/
  ├── _canopy.toml                 # Site config (optional)
  ├── _template.tera               # Template for this directory's files
  ├── index.tera                   # → dist/index.html
  ├── _draft.md                    # Leading underscore = ignored
  ├── assets/                      # Copied verbatim to dist/assets/
  │   └── style.css
  └── posts/
      ├── _template.tera           # posts' own template (never inherited)
      ├── first.md                 # → dist/posts/first.html
      └── second.md                # → dist/posts/second.html

Formats: Markdown (.md), YAML data pages (.yml/.yaml), Tera content
(.tera), and raw HTML (.html). Markdown and YAML pages require a directory
template; Tera and HTML render on their own.

Metadata: YAML frontmatter plus builtins (fileName, filePath, now). A
directory's files inherit a map of every subdirectory's aggregated
metadata, keyed by name ({{ posts.first.title }}).

Run 'canopy gen-config' for a documented _canopy.toml.")]
#[command(version)]
struct Cli {
    /// Source content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    out: PathBuf,

    /// Config file (default: <source>/_canopy.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the per-directory template filename
    #[arg(long, global = true)]
    template: Option<String>,

    /// Override the asset directory name
    #[arg(long, global = true)]
    assets: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the source directory and print the classified tree
    Scan,
    /// Generate the site into the output directory
    Build {
        /// Erase the output directory before generating
        #[arg(short, long)]
        erase: bool,

        /// Print the aggregated metadata of the whole site after building
        #[arg(long)]
        verbose_metadata: bool,
    },
    /// Print a stock _canopy.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Scan => {
            let config = resolve_generator_config(&cli)?;
            let registry = render::RendererRegistry::with_defaults();
            let tree = scan::scan(&cli.source, &registry, &config)?;
            output::print_scan_tree(&tree);
        }
        Command::Build {
            erase,
            verbose_metadata,
        } => {
            let config = resolve_generator_config(&cli)?;
            let registry = render::RendererRegistry::with_defaults();
            let generator = generate::Generator::new(config, registry);
            let stat = generator.generate(&cli.source, &cli.out, erase)?;
            output::print_stats_tree(&stat);
            if verbose_metadata {
                println!("{}", output::format_metadata(&stat.metadata));
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Resolve the effective engine config: `_canopy.toml` (or `--config`),
/// CLI overrides on top, bound to the build clock.
fn resolve_generator_config(cli: &Cli) -> Result<config::GeneratorConfig, config::ConfigError> {
    let mut site = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(&cli.source)?,
    };

    if let Some(template) = &cli.template {
        site.template = template.clone();
    }
    if let Some(assets) = &cli.assets {
        site.assets = assets.clone();
    }
    // Overrides bypass the file loader, so validate again
    site.validate()?;

    Ok(site.into_generator_config(Utc::now()))
}

/// Warnings by default, `-v` for info, `-vv` for debug. `RUST_LOG` wins
/// when set.
fn init_tracing(verbosity: u8) {
    let default_directives = match verbosity {
        0 => "warn",
        1 => "warn,canopy=info",
        _ => "warn,canopy=debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
