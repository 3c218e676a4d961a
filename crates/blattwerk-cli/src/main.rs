// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk - image-to-PDF assembly and PDF merging from the command line.
//
// Entry point. Initialises logging and backend services, then dispatches the
// subcommand. Results go to stdout as JSON; logs go to stderr.

mod commands;
mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::human_errors::humanize_error;
use clap::{Parser, Subcommand};
use serde::Serialize;

use commands::BuildRequest;
use services::app_services::AppServices;

#[derive(Parser)]
#[command(name = "blattwerk", about = "Assemble images into PDFs and merge PDFs", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a PDF with one page per image
    Build {
        /// Image paths or http(s) URLs, in page order
        #[arg(required = true, num_args = 1..)]
        images: Vec<String>,

        /// Output PDF; a bare file name goes to the configured output directory
        #[arg(short, long)]
        output: PathBuf,

        /// a4, letter or a3 (unknown names fall back to a4)
        #[arg(long)]
        page_size: Option<String>,

        /// portrait or landscape
        #[arg(long)]
        orientation: Option<String>,

        /// Image quality, 1-100
        #[arg(long)]
        quality: Option<u8>,

        /// Leave streams uncompressed
        #[arg(long)]
        no_compression: bool,

        /// Text stamped diagonally across every page
        #[arg(long)]
        watermark: Option<String>,

        /// Remember this build in the project history under NAME
        #[arg(long, value_name = "NAME")]
        project: Option<String>,

        /// Copy the result to the configured export directory
        #[arg(long)]
        share: bool,
    },

    /// Concatenate PDFs
    Merge {
        /// Source PDFs, in order
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,

        /// Zero-based source order, e.g. 2,0,1
        #[arg(long, value_delimiter = ',')]
        order: Option<Vec<usize>>,

        #[arg(long)]
        share: bool,
    },

    /// Copy selected pages into a new PDF
    Extract {
        input: PathBuf,

        /// One-based page numbers, in output order, e.g. 3,1
        #[arg(long, required = true, value_delimiter = ',')]
        pages: Vec<u32>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print page count and page sizes of a PDF
    Info { input: PathBuf },

    /// Manage the project history
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Show or create the configuration file
    Config {
        /// Write the default configuration
        #[arg(long, conflicts_with = "show")]
        init: bool,

        /// Overwrite an existing configuration with --init
        #[arg(long, requires = "init")]
        force: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// List projects, oldest first
    List {
        /// Most recently updated first
        #[arg(long)]
        recent: bool,
    },
    /// Find projects by name or notes
    Search { query: String },
    /// Delete one project
    Delete { id: String },
    /// Delete every project
    Clear,
    /// Count projects and images
    Stats,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let svc = match AppServices::init() {
        Ok(svc) => svc,
        Err(e @ BlattwerkError::InvalidInput(_)) => return report(&e),
        Err(e) => {
            tracing::error!(error = %e, "persistent storage failed, using in-memory fallback");
            match AppServices::fallback() {
                Ok(svc) => svc,
                Err(e) => return report(&e),
            }
        }
    };

    match run(&svc, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

async fn run(svc: &AppServices, command: Commands) -> Result<()> {
    match command {
        Commands::Build {
            images,
            output,
            page_size,
            orientation,
            quality,
            no_compression,
            watermark,
            project,
            share,
        } => {
            let request = BuildRequest {
                images,
                output,
                page_size,
                orientation,
                quality,
                no_compression,
                watermark,
                project,
                share,
            };
            print_json(&commands::build(svc, request).await?)
        }
        Commands::Merge {
            inputs,
            output,
            order,
            share,
        } => print_json(&commands::merge(svc, &inputs, &output, order.as_deref(), share).await?),
        Commands::Extract { input, pages, output } => {
            print_json(&commands::extract(svc, &input, &pages, &output).await?)
        }
        Commands::Info { input } => print_json(&commands::info(&input).await?),
        Commands::Projects { action } => match action {
            ProjectAction::List { recent } => print_json(&commands::list_projects(svc, recent)?),
            ProjectAction::Search { query } => print_json(&commands::search_projects(svc, &query)?),
            ProjectAction::Delete { id } => {
                let id = commands::delete_project(svc, &id)?;
                println!("deleted {id}");
                Ok(())
            }
            ProjectAction::Clear => {
                let removed = commands::clear_projects(svc)?;
                println!("deleted {removed} projects");
                Ok(())
            }
            ProjectAction::Stats => print_json(&commands::project_stats(svc)?),
        },
        Commands::Config { init, force, show } => {
            if init {
                let path = commands::init_config(svc, force)?;
                println!("wrote {}", path.display());
            }
            if show || !init {
                print_json(svc.config())?;
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(err: &BlattwerkError) -> ExitCode {
    let human = humanize_error(err);
    tracing::debug!(error = %err, "command failed");
    eprintln!("error: {}", human.message);
    eprintln!("  {}", human.suggestion);
    ExitCode::FAILURE
}
