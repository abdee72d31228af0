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

//! Starting the renderer for a new window.
//!
//! Window creation only needs "make a renderer for window N visible". The
//! [`RendererLauncher`] trait is that seam; [`TerminalLauncher`] implements it
//! by opening a terminal emulator running `sdbg-renderer N`.

use std::{
    env,
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
    process::Command,
    thread,
};

use sdbg_common::{
    env::{SDBG_CHANNEL_DIR, SDBG_RENDERER},
    Channel, WindowId,
};
use thiserror::Error;
use tracing::{debug, info};

/// Name of the renderer executable.
const RENDERER_BIN: &str = "sdbg-renderer";

/// Known terminal emulators in order of preference.
const KNOWN_TERMINALS: &[TerminalKind] = &[
    TerminalKind::Xterm,
    TerminalKind::Kitty,
    TerminalKind::Alacritty,
    TerminalKind::WezTerm,
    TerminalKind::Foot,
    TerminalKind::GnomeTerminal,
    TerminalKind::Konsole,
];

/// Errors raised while starting a renderer.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No terminal emulator could be found
    #[error("no terminal emulator found, set $TERMINAL or install xterm")]
    NoTerminal,
    /// The renderer executable could not be located
    #[error("renderer executable `{0}` not found, set $SDBG_RENDERER")]
    RendererNotFound(String),
    /// The terminal process could not be spawned
    #[error("failed to spawn renderer terminal: {0}")]
    Spawn(#[from] io::Error),
}

/// Makes a renderer for a window visible to the user.
pub trait RendererLauncher: Send + Sync {
    /// Start a renderer bound to window `id`, reading from `channel`
    fn launch(&self, id: WindowId, channel: &Channel) -> Result<(), LaunchError>;
}

impl<F> RendererLauncher for F
where
    F: Fn(WindowId, &Channel) -> Result<(), LaunchError> + Send + Sync,
{
    fn launch(&self, id: WindowId, channel: &Channel) -> Result<(), LaunchError> {
        self(id, channel)
    }
}

/// Supported terminal emulators with their spawn conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    /// xterm, started with the classic green-on-black debug window look
    Xterm,
    /// kitty
    Kitty,
    /// Alacritty
    Alacritty,
    /// WezTerm
    WezTerm,
    /// foot
    Foot,
    /// GNOME Terminal
    GnomeTerminal,
    /// Konsole
    Konsole,
    /// Generic terminal using the -e flag convention
    Generic,
}

impl TerminalKind {
    /// Returns the executable name for this terminal.
    pub fn executable(&self) -> &'static str {
        match self {
            Self::Xterm => "xterm",
            Self::Kitty => "kitty",
            Self::Alacritty => "alacritty",
            Self::WezTerm => "wezterm",
            Self::Foot => "foot",
            Self::GnomeTerminal => "gnome-terminal",
            Self::Konsole => "konsole",
            Self::Generic => "x-terminal-emulator",
        }
    }

    /// Guess the kind of terminal from an executable name.
    pub fn from_name(name: &str) -> Self {
        let base = Path::new(name).file_name().and_then(OsStr::to_str).unwrap_or(name);
        KNOWN_TERMINALS
            .iter()
            .copied()
            .find(|kind| base.contains(kind.executable()))
            .unwrap_or(Self::Generic)
    }

    /// Builds a command running `program args...` in a new window titled `title`.
    pub fn build_command(&self, program: &OsStr, args: &[&OsStr], title: &str) -> Command {
        let mut cmd = Command::new(self.executable());
        match self {
            Self::Xterm => {
                cmd.args(["+sb", "+hold", "+aw", "-geometry", "118x62"])
                    .args(["-bg", "black", "-fg", "green", "-T", title])
                    .args(["+ah", "+bc", "-cr", "black", "-uc", "-e"])
                    .arg(program)
                    .args(args);
            }
            Self::Kitty => {
                cmd.arg("--title").arg(title).arg(program).args(args);
            }
            Self::Alacritty | Self::Konsole | Self::Generic => {
                cmd.arg("-e").arg(program).args(args);
            }
            Self::WezTerm => {
                cmd.arg("start").arg("--").arg(program).args(args);
            }
            Self::Foot => {
                cmd.arg("--title").arg(title).arg(program).args(args);
            }
            Self::GnomeTerminal => {
                cmd.arg("--title").arg(title).arg("--").arg(program).args(args);
            }
        }
        cmd
    }
}

/// Launches `sdbg-renderer` inside a terminal emulator.
#[derive(Debug, Clone, Default)]
pub struct TerminalLauncher {
    terminal: Option<TerminalKind>,
    renderer: Option<PathBuf>,
}

impl TerminalLauncher {
    /// Launcher that detects the terminal and renderer at launch time
    pub fn new() -> Self {
        Self::default()
    }

    /// Always use the given terminal
    pub fn with_terminal(mut self, kind: TerminalKind) -> Self {
        self.terminal = Some(kind);
        self
    }

    /// Always use the given renderer executable
    pub fn with_renderer(mut self, path: impl Into<PathBuf>) -> Self {
        self.renderer = Some(path.into());
        self
    }

    fn terminal(&self) -> Result<TerminalKind, LaunchError> {
        self.terminal.or_else(detect_terminal).ok_or(LaunchError::NoTerminal)
    }

    fn renderer(&self) -> Result<PathBuf, LaunchError> {
        if let Some(path) = &self.renderer {
            return Ok(path.clone());
        }
        find_renderer()
    }

    /// Build the command that would be spawned for window `id`.
    pub fn command(&self, id: WindowId, channel: &Channel) -> Result<Command, LaunchError> {
        let terminal = self.terminal()?;
        let renderer = self.renderer()?;
        let id_arg = id.to_string();
        let title = channel.path().display().to_string();

        let mut cmd =
            terminal.build_command(renderer.as_os_str(), &[OsStr::new(&id_arg)], &title);
        if let Some(dir) = channel.path().parent() {
            cmd.env(SDBG_CHANNEL_DIR, dir);
        }
        Ok(cmd)
    }
}

impl RendererLauncher for TerminalLauncher {
    fn launch(&self, id: WindowId, channel: &Channel) -> Result<(), LaunchError> {
        let mut cmd = self.command(id, channel)?;
        debug!("Spawning renderer for window {}: {:?}", id, cmd);

        let mut child = cmd.spawn()?;
        info!(window = %id, pid = child.id(), "Renderer terminal started");

        // Reap the terminal once the user closes it
        thread::Builder::new()
            .name(format!("sdbg-reaper-{id}"))
            .spawn(move || {
                let _ = child.wait();
            })?;

        Ok(())
    }
}

/// Detects the best available terminal emulator.
///
/// Checks `$TERMINAL` first, then known terminals on `PATH` (xterm first).
pub fn detect_terminal() -> Option<TerminalKind> {
    if let Ok(terminal) = env::var("TERMINAL") {
        if which::which(&terminal).is_ok() {
            return Some(TerminalKind::from_name(&terminal));
        }
    }

    KNOWN_TERMINALS.iter().copied().find(|kind| which::which(kind.executable()).is_ok())
}

/// Locate the renderer: `$SDBG_RENDERER`, then next to the current executable,
/// then on `PATH`.
fn find_renderer() -> Result<PathBuf, LaunchError> {
    if let Some(path) = env::var_os(SDBG_RENDERER).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    if let Some(sibling) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(RENDERER_BIN)))
        .filter(|path| path.is_file())
    {
        return Ok(sibling);
    }

    which::which(RENDERER_BIN).map_err(|_| LaunchError::RendererNotFound(RENDERER_BIN.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_xterm_command_carries_window_styling() {
        let cmd = TerminalKind::Xterm.build_command(
            OsStr::new("sdbg-renderer"),
            &[OsStr::new("2")],
            "/tmp/simpleDebugger2.pipe",
        );
        assert_eq!(cmd.get_program(), "xterm");

        let args = args_of(&cmd);
        assert!(args.windows(2).any(|w| w == ["-geometry", "118x62"]));
        assert!(args.windows(2).any(|w| w == ["-T", "/tmp/simpleDebugger2.pipe"]));
        assert_eq!(&args[args.len() - 3..], ["-e", "sdbg-renderer", "2"]);
    }

    #[test]
    fn test_terminal_command_building() {
        let args: &[&OsStr] = &[OsStr::new("0")];

        let cmd = TerminalKind::WezTerm.build_command(OsStr::new("r"), args, "t");
        assert_eq!(cmd.get_program(), "wezterm");
        assert_eq!(args_of(&cmd), ["start", "--", "r", "0"]);

        let cmd = TerminalKind::Alacritty.build_command(OsStr::new("r"), args, "t");
        assert_eq!(args_of(&cmd), ["-e", "r", "0"]);

        let cmd = TerminalKind::GnomeTerminal.build_command(OsStr::new("r"), args, "t");
        assert_eq!(args_of(&cmd), ["--title", "t", "--", "r", "0"]);
    }

    #[test]
    fn test_terminal_kind_from_name() {
        assert_eq!(TerminalKind::from_name("/usr/bin/xterm"), TerminalKind::Xterm);
        assert_eq!(TerminalKind::from_name("kitty"), TerminalKind::Kitty);
        assert_eq!(TerminalKind::from_name("urxvt"), TerminalKind::Generic);
    }

    #[test]
    fn test_launcher_command_forwards_channel_dir() {
        let launcher = TerminalLauncher::new()
            .with_terminal(TerminalKind::Xterm)
            .with_renderer("/opt/sdbg/sdbg-renderer");
        let channel = Channel::for_window(Path::new("/var/tmp/sdbg"), WindowId::new(4));

        let cmd = launcher.command(WindowId::new(4), &channel).unwrap();
        let envs: Vec<_> = cmd.get_envs().collect();
        assert!(envs.contains(&(OsStr::new(SDBG_CHANNEL_DIR), Some(OsStr::new("/var/tmp/sdbg")))));

        let args = args_of(&cmd);
        assert_eq!(&args[args.len() - 2..], ["/opt/sdbg/sdbg-renderer", "4"]);
    }

    #[test]
    fn test_closure_launcher() {
        let launcher = |id: WindowId, _: &Channel| -> Result<(), LaunchError> {
            if id.get() == 0 {
                Ok(())
            } else {
                Err(LaunchError::NoTerminal)
            }
        };
        let channel = Channel::new("/tmp/unused.pipe");
        assert!(launcher.launch(WindowId::new(0), &channel).is_ok());
        assert!(launcher.launch(WindowId::new(1), &channel).is_err());
    }
}
