use clap::{Parser, Subcommand};
use simple_blog::admin::{AdminError, Site};
use simple_blog::reconcile::Reconciler;
use simple_blog::registry::{Registry, RegistryError};
use simple_blog::render::MarkdownRenderer;
use simple_blog::{config, output, scan};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("BLOG_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("BLOG_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "simple-blog")]
#[command(about = "Post registry and atomic publisher for a directory-per-post blog")]
#[command(long_about = "\
Post registry and atomic publisher for a directory-per-post blog

Each subdirectory of the content directory is a post. A post is either a
static HTML page (index.html, copied verbatim) or a markdown document
(index.md, rendered to index.html). Every post gets a post-uuid.txt marker
the first time it is seen, so renaming the directory keeps its title, date
and position in the list.

Site structure:

  site/
  ├── config.toml                  # Optional, see 'simple-blog gen-config'
  ├── post-list.json               # Ordered post list (the registry)
  ├── posts/
  │   ├── hello-world/
  │   │   ├── index.md             # Markdown post
  │   │   ├── post-thumbnail.jpg   # Optional thumbnail
  │   │   └── post-uuid.txt        # Identity marker (written automatically)
  │   └── demo-page/
  │       └── index.html           # HTML post
  └── public/                      # Published site, replaced atomically

Typical workflow:

  simple-blog preview              # What would change?
  simple-blog publish              # Reconcile, publish, save post-list.json
  $EDITOR post-list.json           # Rename posts, fix dates, reorder
  simple-blog apply post-list.json # Publish the edited list

Logging goes to stderr and is controlled with RUST_LOG (default: info).")]
#[command(version = version_string())]
struct Cli {
    /// Site root (holds config.toml; relative paths resolve against it)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Content directory, relative to --root (overrides content_dir)
    #[arg(long, global = true)]
    content: Option<PathBuf>,

    /// Output directory, relative to --root (overrides output_dir)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Registry file, relative to --root (overrides registry_file)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List post directories and assign identities to new ones
    Scan,
    /// Show what a publish would change, without publishing
    Preview {
        /// Print the reconciled registry as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Reconcile with disk, publish, and save the registry
    Publish,
    /// Publish an edited registry file and save it as the registry
    Apply {
        /// Registry JSON to publish
        file: PathBuf,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Prefix admin failures with their class so scripts can tell a bad
/// registry from a disk that changed under it.
fn classified(e: AdminError) -> Box<dyn std::error::Error> {
    format!("{}: {e}", e.kind()).into()
}

/// Load config from the site root and apply path overrides from the flags.
fn open_site(cli: &Cli) -> Result<Site, Box<dyn std::error::Error>> {
    let site_config = config::load_config(&cli.root)?;
    let paths = site_config.paths(&cli.root).with_overrides(
        &cli.root,
        cli.content.as_deref(),
        cli.output.as_deref(),
        cli.registry.as_deref(),
    );
    paths.validate()?;

    Ok(Site::new(
        paths,
        Reconciler::new(site_config.ordering),
        MarkdownRenderer::new(site_config.render),
    ))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match &cli.command {
        Command::Scan => {
            let site = open_site(&cli)?;
            let scanned = scan::scan(&site.paths().content_dir)?;
            output::print_scan_output(&scanned);
        }
        Command::Preview { json } => {
            let preview = open_site(&cli)?.preview().map_err(classified)?;
            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&preview.reconciled.registry)?
                );
            } else {
                output::print_preview(&preview);
            }
        }
        Command::Publish => {
            let site = open_site(&cli)?;
            let published = site.refresh().map_err(classified)?;
            output::print_publish_output(&published, &site.paths().output_dir);
        }
        Command::Apply { file } => {
            let site = open_site(&cli)?;
            let content = std::fs::read_to_string(file)?;
            let registry = Registry::from_json(&content).map_err(|reason| {
                classified(AdminError::Registry(RegistryError::Malformed {
                    path: file.clone(),
                    reason,
                }))
            })?;
            let published = site.apply(&registry).map_err(classified)?;
            output::print_publish_output(&published, &site.paths().output_dir);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
