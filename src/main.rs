// vidmeta (video metadata inspector)
// Copyright (C) 2025 Andrew Nissen

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::config::{VidmetaConfig, set_config_field, unset_config_field};
use crate::flow::{Effect, FlowEvent, SelectionFlow};
use crate::permission::PermissionStatus;
use crate::picker::FileFilter;
use crate::report::{RecordedProbe, RenderOptions};
use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod capability;
mod config;
mod error;
mod flow;
mod format;
mod metadata;
mod permission;
mod picker;
mod report;
mod tui;

const VALID_CONFIG_FIELDS: &str = "ffprobe_path, start_directory, file_filter, max_depth, capability_tier, date_fallback, pad_seconds, allow_storage_read";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Show duration, rotation, resolution, bit rate, date and size of a video")]
    Inspect {
        #[arg(help = "Path to the video file (opens the file chooser when omitted)")]
        path: Option<String>,
        #[arg(
            long,
            help = "Show JSON output instead of formatted",
            default_value = "false"
        )]
        json: bool,
        #[arg(
            short = 'y',
            long,
            help = "Allow reading media files for this run without asking",
            default_value = "false"
        )]
        yes: bool,
    },
    #[command(about = "Render a report from recorded metadata instead of probing a file")]
    #[command(arg_required_else_help = true)]
    Render {
        #[arg(long, help = "JSON file with file_path, size_bytes and metadata")]
        from_json: String,
        #[arg(
            long,
            help = "Show JSON output instead of formatted",
            default_value = "false"
        )]
        json: bool,
    },
    #[command(about = "Launch the single-screen TUI")]
    Tui,
    #[command(about = "Display current configuration settings")]
    Config {
        #[command(subcommand)]
        config_command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    #[command(about = "Display current configuration settings")]
    Show,
    #[command(about = "Display path to configuration file")]
    Path,
    #[command(about = "Set a configuration field")]
    Set {
        #[arg(help = "Field name to set")]
        field: String,
        #[arg(help = "Value to set")]
        value: String,
    },
    #[command(about = "Unset/clear a configuration field")]
    Unset {
        #[arg(help = "Field name to unset")]
        field: String,
    },
}

fn is_valid_config_field(field: &str) -> bool {
    matches!(
        field,
        "ffprobe_path"
            | "start_directory"
            | "file_filter"
            | "max_depth"
            | "capability_tier"
            | "date_fallback"
            | "pad_seconds"
            | "allow_storage_read"
    )
}

/// Logs go to stderr so stdout only carries the report. The TUI owns the
/// terminal, so it gets no log output at all.
fn init_logging(tui: bool) {
    let filter = EnvFilter::try_from_env("VIDMETA_LOG")
        .unwrap_or_else(|_| EnvFilter::new("vidmeta=warn"));
    if tui {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}

/// Drives the selection flow from the command line. Returns the process
/// exit code.
fn run_inspect(path: Option<String>, json: bool, yes: bool) -> Result<i32, Box<dyn std::error::Error>> {
    let mut cfg = config::load_config()?;
    let status = if yes {
        PermissionStatus::Granted
    } else {
        permission::check(&cfg)
    };

    let mut flow = SelectionFlow::new(status);
    let mut effect = flow.handle(FlowEvent::Click);
    loop {
        effect = match effect {
            Effect::Nothing => return Ok(0),
            Effect::RequestPermission => {
                let answer = permission::prompt_for_consent();
                if let Some(granted) = answer {
                    permission::record_decision(&mut cfg, granted);
                }
                flow.handle(FlowEvent::PermissionResult(answer.unwrap_or(false)))
            }
            Effect::OpenPicker => {
                let picked = match &path {
                    Some(p) => Some(PathBuf::from(p)),
                    None => {
                        let filter = FileFilter::new(&cfg.file_filter)?;
                        picker::pick_from_list(&cfg.start_directory(), &filter, cfg.max_depth)?
                    }
                };
                flow.handle(FlowEvent::PickerResult(picked))
            }
            Effect::Extract(video_path) => {
                let result = report::inspect_and_render(&video_path, &cfg, json)
                    .map_err(|e| format!("Error: {}", e));
                flow.handle(FlowEvent::Extracted(result))
            }
            Effect::Render(text) => {
                print!("{}", text);
                return Ok(0);
            }
            Effect::Notify(message) => {
                eprintln!("{}", message);
                return Ok(1);
            }
        };
    }
}

fn run_render(from_json: &str, json: bool) -> Result<i32, Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    let content = fs::read_to_string(from_json)?;
    let recorded: RecordedProbe = serde_json::from_str(&content)?;
    match recorded
        .into_report(&cfg)
        .and_then(|report| report.output(&RenderOptions::from(&cfg), json))
    {
        Ok(text) => {
            print!("{}", text);
            Ok(0)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(1)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(matches!(args.command, Some(Commands::Tui)));

    match args.command {
        Some(Commands::Inspect { path, json, yes }) => {
            let code = run_inspect(path, json, yes)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Some(Commands::Render { from_json, json }) => {
            let code = run_render(&from_json, json)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Some(Commands::Tui) => {
            tui::run()?;
        }
        Some(Commands::Config { config_command }) => match config_command {
            Some(ConfigCommands::Show) | None => {
                let cfg: VidmetaConfig = config::load_config()?;
                let json_output = serde_json::to_string_pretty(&cfg)?;
                println!("{}", json_output);
            }
            Some(ConfigCommands::Path) => {
                let config_path = config::get_config_path()?;
                println!("{}", config_path.display());
            }
            Some(ConfigCommands::Set { field, value }) => {
                if !is_valid_config_field(&field) {
                    eprintln!(
                        "Error: Unknown field '{}'. Valid fields are: {}",
                        field, VALID_CONFIG_FIELDS
                    );
                    std::process::exit(1);
                }

                let mut cfg: VidmetaConfig = config::load_config()?;

                if let Err(e) = set_config_field(&mut cfg, &field, &value) {
                    eprintln!("Error setting field: {}", e);
                    std::process::exit(1);
                }

                config::store_config(&cfg)?;
                println!("Set {} = {}", field, value);
            }
            Some(ConfigCommands::Unset { field }) => {
                if !is_valid_config_field(&field) {
                    eprintln!(
                        "Error: Unknown field '{}'. Valid fields are: {}",
                        field, VALID_CONFIG_FIELDS
                    );
                    std::process::exit(1);
                }

                let mut cfg: VidmetaConfig = config::load_config()?;

                if let Err(e) = unset_config_field(&mut cfg, &field) {
                    eprintln!("Error unsetting field: {}", e);
                    std::process::exit(1);
                }

                config::store_config(&cfg)?;
                println!("Unset {}", field);
            }
        },
        None => {}
    }

    Ok(())
}
