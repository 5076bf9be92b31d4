use clap::{Parser, Subcommand};
use lazysite::worker::{self, JobSlot, LIVENESS_TIMEOUT};
use lazysite::{config, output, site};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "LAZYSITE_LOG";

#[derive(Parser)]
#[command(name = "lazysite")]
#[command(about = "Static site generator with parallel page builds and lazy-loaded media")]
#[command(long_about = "\
Static site generator with parallel page builds and lazy-loaded media

Every content file is built in its own worker, at most pool.size at a time.
Built pages have their images, iframes, and videos rewritten to load lazily
inside aspect-ratio boxes, and only carry the styles and scripts for the
elements they actually use.

Site structure:

  my-site/
  ├── site.toml                    # Site config (optional)
  ├── content/
  │   ├── navigation.toml          # Navigation tree (optional)
  │   ├── index.md                 # → build/index.html
  │   └── guides/setup.md          # → build/guides/setup.html
  ├── static/                      # Copied verbatim into build/
  └── theme/
      ├── theme.toml               # Default template, per-element assets
      ├── templates/default.html   # Wrapper template
      └── layouts/                 # Optional layouts

Run 'lazysite gen-config' to generate a documented site.toml.")]
#[command(version)]
struct Cli {
    /// Config file, or a directory containing site.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Build every page, the sitemap, and static files (default)
    Build,
    /// Validate config, theme, and navigation, and list the pages to build
    Check,
    /// Print a stock site.toml with all options documented
    GenConfig,
    /// Build a single page for the pool (reads one run message from stdin)
    #[command(hide = true)]
    Worker {
        /// Content file to build
        input: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "unable to start the async runtime");
            return ExitCode::FAILURE;
        }
    };
    let code = runtime.block_on(run(cli));
    // A worker that timed out still has a blocking stdin read in flight;
    // it cannot be cancelled, so don't wait for it.
    runtime.shutdown_background();
    code
}

async fn run(cli: Cli) -> ExitCode {
    match cli.command.unwrap_or(Command::Build) {
        Command::Build => {
            let context = match site::prepare(&cli.config) {
                Ok(context) => context,
                Err(err) => return fail(&err),
            };
            let content_root = context.config.site.content_path.clone();
            let output_root = context.config.site.output_path.clone();
            println!("==> Building {}", content_root.display());

            match site::build(context).await {
                Ok(report) => {
                    output::print_build_output(&report, &content_root, &output_root);
                    println!("==> Build complete: {}", output_root.display());
                    ExitCode::SUCCESS
                }
                Err(site::SiteError::PartialBuild(report)) => {
                    output::print_build_output(&report, &content_root, &output_root);
                    tracing::error!(
                        failed = report.failures().len(),
                        total = report.results.len(),
                        "build finished with errors"
                    );
                    ExitCode::FAILURE
                }
                Err(err) => fail(&err),
            }
        }
        Command::Check => match site::check(&cli.config) {
            Ok(report) => {
                let (config_file, _) = config::locate(&cli.config);
                output::print_check_output(&report, config_file.as_deref());
                println!("==> Site is valid");
                ExitCode::SUCCESS
            }
            Err(err) => fail(&err),
        },
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            ExitCode::SUCCESS
        }
        Command::Worker { input } => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let reply = worker::serve(&input, JobSlot::new(stdin), LIVENESS_TIMEOUT).await;
            let mut stdout = std::io::stdout().lock();
            if let Err(err) = writeln!(stdout, "{}", reply.to_line()).and_then(|_| stdout.flush()) {
                tracing::error!(error = %err, "unable to write reply");
            }
            ExitCode::SUCCESS
        }
    }
}

fn fail(err: &site::SiteError) -> ExitCode {
    tracing::error!("{err}");
    ExitCode::FAILURE
}
