mod auth;
mod cli;
mod commands;
mod config;
mod observability;
mod output;

use std::io::Cursor;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use qrshare_core::{Camera, CommandCamera, LineCamera, QrSessionClient, QrShareApp, TwoTierTokenProvider};

use cli::{Cli, Commands, OutputFormat, ScanArgs};
use commands::{Reported, TerminalApp};
use config::ProfileConfig;
use output::{TerminalView, print_error};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        if e.downcast_ref::<Reported>().is_none() {
            print_error(&format!("{e:#}"));
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing_with_level(&cli.log_level);

    let profile = &cli.profile;
    let cfg = config::load_profile(profile)?;
    let format = cli
        .format
        .or_else(|| cfg.format.as_deref().and_then(OutputFormat::parse_config))
        .unwrap_or_default();

    match &cli.command {
        Commands::Login(args) => {
            let server = config::resolve_server(&cli.server, profile)?;
            commands::auth::login(&server, args, profile)?;
        }
        Commands::Logout => {
            commands::auth::logout(profile)?;
        }
        Commands::Whoami => {
            commands::auth::whoami(profile)?;
        }
        Commands::Config(args) => match &args.command {
            cli::ConfigCommands::Show => {
                println!("{}: {}", "Profile".cyan(), profile);
                println!(
                    "{}: {}",
                    "Server".cyan(),
                    cfg.server.as_deref().unwrap_or("(not set)")
                );
                println!(
                    "{}: {}",
                    "Format".cyan(),
                    cfg.format.as_deref().unwrap_or("table")
                );
                println!(
                    "{}: {}",
                    "Auth on generate".cyan(),
                    cfg.client_options().attach_auth_on_generate
                );
                println!("{}: {}", "Scanner".cyan(), cfg.scanner_command());
            }
            cli::ConfigCommands::Set(set_args) => {
                let mut cfg = cfg.clone();
                cfg.set(&set_args.key, &set_args.value)?;
                config::save_profile(profile, &cfg)?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
            }
        },
        Commands::Render(args) => {
            commands::scan::render(&args.file, format)?;
        }
        Commands::Share(args) => {
            let mut app = make_app(&cli, &cfg, format, idle_camera())?;
            commands::share::share(&mut app, args).await?;
        }
        Commands::Cancel(args) => {
            let mut app = make_app(&cli, &cfg, format, idle_camera())?;
            commands::share::cancel(&mut app, &args.session_id).await?;
        }
        Commands::Status(args) => {
            let app = make_app(&cli, &cfg, format, idle_camera())?;
            commands::share::status(&app, &args.session_id, format).await?;
        }
        Commands::Scan(args) => {
            let mut app = make_app(&cli, &cfg, format, scan_camera(args, &cfg)?)?;
            commands::scan::scan(&mut app).await?;
        }
    }

    Ok(())
}

fn make_app(
    cli: &Cli,
    cfg: &ProfileConfig,
    format: OutputFormat,
    camera: Box<dyn Camera>,
) -> Result<TerminalApp> {
    let server = config::resolve_server(&cli.server, &cli.profile)?;
    let tokens = TwoTierTokenProvider::for_profile(&cli.profile)?;
    let client = QrSessionClient::new(&server, tokens, cfg.client_options())?;
    tracing::debug!(%server, profile = %cli.profile, "client ready");
    Ok(QrShareApp::new(client, camera, TerminalView::new(format)))
}

/// Camera for commands that never scan. Building it cannot fail, so a
/// broken `scanner_command` only affects `scan`.
fn idle_camera() -> Box<dyn Camera> {
    Box::new(LineCamera::new(tokio::io::empty()))
}

fn scan_camera(args: &ScanArgs, cfg: &ProfileConfig) -> Result<Box<dyn Camera>> {
    if let Some(payload) = &args.payload {
        let source = Cursor::new(format!("{payload}\n").into_bytes());
        return Ok(Box::new(LineCamera::new(source)));
    }
    if args.stdin {
        return Ok(Box::new(LineCamera::stdin()));
    }
    let command = args.command.as_deref().unwrap_or(cfg.scanner_command());
    Ok(Box::new(CommandCamera::from_command_line(command)?))
}
