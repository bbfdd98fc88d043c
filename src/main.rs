// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Trailmap CLI entrypoint.
//!
//! By default this runs the interactive TUI viewer and serves MCP over
//! streamable HTTP at `http://127.0.0.1:<port>/mcp`.
//!
//! Use `--mcp` to run the MCP server over stdio instead (intended for tool
//! integrations). `init`/`uninstall` manage the per-project scaffold.

use std::error::Error;
use std::sync::Arc;

use axum::Router;
use rmcp::transport::{
    streamable_http_server::session::local::LocalSessionManager, StreamableHttpServerConfig,
    StreamableHttpService,
};

const DEFAULT_MCP_HTTP_PORT: u16 = 27457;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--dir <path>] [--durable-writes] [--mcp-http-port <port>]\n  {program} [--dir <path>] [--durable-writes] --mcp\n  {program} init [--dir <path>]\n  {program} uninstall [--dir <path>]\n  {program} help\n\nTUI mode (default) serves MCP over streamable HTTP at `http://127.0.0.1:<port>/mcp`.\n--mcp-http-port selects the port (0 = ephemeral; default {DEFAULT_MCP_HTTP_PORT}).\n\nIf --dir is omitted, the current working directory is used.\n\n`init` scaffolds trajectory.mmd and trailmap.hooks.json; `uninstall` removes the\nhook config and preserves the trajectory.\n\n--durable-writes opts into slower, best-effort durable persistence (fsync/sync where supported)."
    );
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Command {
    #[default]
    Run,
    Init,
    Uninstall,
    Help,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    command: Command,
    mcp: bool,
    dir: Option<String>,
    mcp_http_port: Option<u16>,
    durable_writes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliError {
    UnknownCommand(String),
    BadUsage,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, CliError> {
    let mut options = CliOptions::default();
    let mut first = true;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "init" if first => options.command = Command::Init,
            "uninstall" if first => options.command = Command::Uninstall,
            "help" if first => options.command = Command::Help,
            "--mcp" => {
                if options.mcp {
                    return Err(CliError::BadUsage);
                }
                options.mcp = true;
            }
            "--dir" => {
                if options.dir.is_some() {
                    return Err(CliError::BadUsage);
                }
                let dir = args.next().ok_or(CliError::BadUsage)?;
                options.dir = Some(dir);
            }
            "--mcp-http-port" => {
                if options.mcp_http_port.is_some() {
                    return Err(CliError::BadUsage);
                }
                let raw = args.next().ok_or(CliError::BadUsage)?;
                let port: u16 = raw.parse().map_err(|_| CliError::BadUsage)?;
                options.mcp_http_port = Some(port);
            }
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(CliError::BadUsage);
                }
                options.durable_writes = true;
            }
            _ if arg.starts_with('-') => return Err(CliError::BadUsage),
            _ => return Err(CliError::UnknownCommand(arg)),
        }
        first = false;
    }

    if options.command != Command::Run && (options.mcp || options.mcp_http_port.is_some()) {
        return Err(CliError::BadUsage);
    }
    if options.mcp && options.mcp_http_port.is_some() {
        return Err(CliError::BadUsage);
    }

    Ok(options)
}

fn trajectory_file(options: &CliOptions) -> trailmap::store::TrajectoryFile {
    let dir = options.dir.clone().unwrap_or_else(|| ".".to_owned());
    let file = trailmap::store::TrajectoryFile::new(dir);
    if options.durable_writes {
        file.with_durability(trailmap::store::WriteDurability::Durable)
    } else {
        file
    }
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "trailmap".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(CliError::UnknownCommand(command)) => {
                eprintln!("{program}: unknown command: {command}");
                print_usage(&program);
                std::process::exit(1);
            }
            Err(CliError::BadUsage) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        match options.command {
            Command::Help => {
                print_usage(&program);
                return Ok(());
            }
            Command::Init => {
                let file = trajectory_file(&options);
                let report = file.init()?;
                if report.created_document {
                    println!("created {}", file.document_path().display());
                }
                if report.created_hooks {
                    println!("created {}", file.hooks_path().display());
                }
                if !report.created_document && !report.created_hooks {
                    println!("already initialized: {}", file.dir().display());
                }
                return Ok(());
            }
            Command::Uninstall => {
                let file = trajectory_file(&options);
                if file.uninstall()? {
                    println!("removed {}", file.hooks_path().display());
                } else {
                    println!("no hook config at {}", file.hooks_path().display());
                }
                return Ok(());
            }
            Command::Run => {}
        }

        if options.mcp {
            let mcp = trailmap::mcp::TrailmapMcp::new(trajectory_file(&options));
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            runtime.block_on(mcp.serve_stdio())?;
            return Ok(());
        }

        let file = trajectory_file(&options);
        let mcp = trailmap::mcp::TrailmapMcp::new(file.clone());
        let mcp_http_port = options.mcp_http_port.unwrap_or(DEFAULT_MCP_HTTP_PORT);

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind(("127.0.0.1", mcp_http_port)).await?;

            let config = StreamableHttpServerConfig {
                stateful_mode: true,
                ..StreamableHttpServerConfig::default()
            };
            let shutdown_token = config.cancellation_token.clone();
            let server_shutdown = shutdown_token.clone();

            let session_manager = Arc::new(LocalSessionManager::default());
            let mcp_service = {
                let mcp = mcp.clone();
                StreamableHttpService::new(move || Ok(mcp.clone()), session_manager, config)
            };

            let router = Router::new().nest_service("/mcp", mcp_service);
            let server_handle = tokio::spawn(async move {
                let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                    server_shutdown.cancelled().await;
                });
                if let Err(err) = serve.await {
                    eprintln!("trailmap: MCP HTTP server error: {err}");
                }
            });

            let tui_join = tokio::task::spawn_blocking(move || {
                trailmap::tui::run(file).map_err(|err| err.to_string())
            })
            .await;

            shutdown_token.cancel();
            let _ = server_handle.await;

            let tui_result = tui_join.map_err(|err| -> Box<dyn Error> { Box::new(err) })?;
            tui_result.map_err(|err| {
                Box::new(std::io::Error::new(std::io::ErrorKind::Other, err)) as Box<dyn Error>
            })?;
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("trailmap: {err}");
        std::process::exit(1);
    }
}
