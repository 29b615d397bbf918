//! Shell kind labels derived from prompt shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shell family inferred from the shape of a prompt tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellKind {
    /// REPL continuation marker (`>>>` / `...`).
    ReplContinuation,
    /// PowerShell (`PS C:\...>`).
    PowerShell,
    /// zsh (`%`).
    Zsh,
    /// Root shell (`#`).
    RootShell,
    /// Modern prompt glyphs (`❯`, `➜`).
    ModernShell,
    /// POSIX shells (`$`).
    PosixShell,
    /// No recognized prompt shape.
    Unknown,
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            ShellKind::ReplContinuation => "repl",
            ShellKind::PowerShell => "powershell",
            ShellKind::Zsh => "zsh",
            ShellKind::RootShell => "root",
            ShellKind::ModernShell => "modern",
            ShellKind::PosixShell => "posix",
            ShellKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}
