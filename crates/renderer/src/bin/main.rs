// sdbg - Simple Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! sdbg renderer - draws the variables published to one debug window.
//!
//! Normally started by the producer inside a terminal emulator as
//! `sdbg-renderer <WINDOW_ID>`.

use std::{path::PathBuf, process};

use clap::Parser;
use eyre::Result;
use sdbg_common::{env::SDBG_CHANNEL_DIR, logging, WindowId, DIAG_PREFIX};
use sdbg_renderer::RendererConfig;

/// sdbg debug window renderer
#[derive(Debug, Parser)]
#[command(name = "sdbg-renderer")]
#[command(about = "Renderer for sdbg debug windows", version)]
struct Args {
    /// Window number to attach to
    #[arg(value_name = "WINDOW_ID", allow_hyphen_values = true)]
    ids: Vec<String>,

    /// Directory holding the window channels (system temp dir if not specified)
    #[arg(long, env = SDBG_CHANNEL_DIR)]
    channel_dir: Option<PathBuf>,

    /// Config file path (uses ~/.sdbg.toml if not specified)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Print an `sD>` error on stdout and exit with status 1.
fn fail(message: std::fmt::Arguments<'_>) -> ! {
    println!("{DIAG_PREFIX} Error: {message}");
    process::exit(1)
}

fn window_id(ids: &[String]) -> WindowId {
    let [id] = ids else {
        fail(format_args!("Argument count to subprocess is wrong, is {} should be 1!", ids.len()))
    };
    id.parse()
        .unwrap_or_else(|_| fail(format_args!("None-integer {id} was passed to subprocess!")))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let id = window_id(&args.ids);

    // Logs go to a file so they never mix with the rendered frames
    let log_file_path = logging::init_file_only_logging("sdbg-renderer")?;
    tracing::info!("Renderer logs: {}", log_file_path.display());

    let config = match args.config {
        Some(path) => RendererConfig::load_from_path(path)?,
        None => RendererConfig::load().unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable config, using defaults: {:?}", e);
            RendererConfig::default()
        }),
    };
    let channel_dir = args.channel_dir.unwrap_or_else(sdbg_common::env::channel_dir);

    match sdbg_renderer::run(id, &channel_dir, config).await {
        Ok(()) => {
            tracing::info!("Renderer exited normally");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Renderer error: {:?}", e);
            process::exit(1)
        }
    }
}
