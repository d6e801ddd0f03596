//! panelkit - Drive a model-authoring panel from the command line
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use panelkit_app::BUILTIN_VIEWS;
use panelkit_core::prelude::*;

/// panelkit - Drive a model-authoring panel from the command line
#[derive(Parser, Debug)]
#[command(name = "panelkit")]
#[command(about = "Run a panel against the reference host, NDJSON on stdout", long_about = None)]
struct Args {
    /// Project directory holding `.panelkit/`
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// View to open
    #[arg(long, default_value = "DataObjects")]
    view: String,

    /// Print the built-in view names and exit
    #[arg(long)]
    list_views: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_views {
        for view in BUILTIN_VIEWS {
            println!("{}", view);
        }
        return Ok(());
    }

    color_eyre::install().map_err(|e| Error::config(e.to_string()))?;
    panelkit_core::logging::init()?;

    let project_path = args
        .path
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if !project_path.is_dir() {
        eprintln!("❌ Not a directory: {}", project_path.display());
        std::process::exit(1);
    }

    if !BUILTIN_VIEWS.contains(&args.view.as_str()) {
        eprintln!("❌ Unknown view: {}", args.view);
        eprintln!("   Available views: {}", BUILTIN_VIEWS.join(", "));
        std::process::exit(1);
    }

    panelkit::run_headless(&project_path, &args.view).await
}
