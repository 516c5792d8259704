//! # Platform-specific utilities
//!
//! Punto unico per sapere se un tool esterno è installato e dove si trova.
//!
//! La pipeline chiede la disponibilità dei tool per ogni file: il risultato viene verificato
//! una sola volta per tool (resolver, poi `which`/`where`) e poi memorizzato.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing::debug;

use crate::tool_resolver::ToolPathResolver;

/// Tool lookup with a per-process availability cache
pub struct PlatformCommands {
    which_command: &'static str,
    tool_resolver: ToolPathResolver,
    availability: Mutex<HashMap<String, bool>>,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(|| Self::with_resolver(ToolPathResolver::new()))
    }

    pub fn with_resolver(tool_resolver: ToolPathResolver) -> Self {
        Self {
            which_command: if cfg!(windows) { "where" } else { "which" },
            tool_resolver,
            availability: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `tool` can be run; checked once, then answered from the cache
    pub async fn is_command_available(&self, tool: &str) -> bool {
        if let Some(known) = self.cached(tool) {
            return known;
        }

        let available = self.tool_resolver.is_tool_available(tool)
            || (self.tool_resolver.searches_path() && self.which_finds(tool).await);
        if !available {
            debug!("{} is not installed", tool);
        }
        if let Ok(mut cache) = self.availability.lock() {
            cache.insert(tool.to_string(), available);
        }
        available
    }

    fn cached(&self, tool: &str) -> Option<bool> {
        self.availability.lock().ok()?.get(tool).copied()
    }

    /// Shims the resolver cannot see (e.g. `.cmd` wrappers on Windows)
    async fn which_finds(&self, tool: &str) -> bool {
        tokio::process::Command::new(self.which_command)
            .arg(tool)
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Resolved path to a tool, or the bare name to let the OS search for it
    pub fn get_tool_path(&self, tool: &str) -> PathBuf {
        self.tool_resolver
            .resolve_tool(tool)
            .unwrap_or_else(|| PathBuf::from(tool))
    }

    pub fn get_tools_report(&self) -> String {
        self.tool_resolver.get_tools_report()
    }

    /// Host and tool source, logged at debug level on start-up
    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            tools_dir: self.tool_resolver.tools_dir().map(|dir| dir.to_path_buf()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub tools_dir: Option<PathBuf>,
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.tools_dir {
            Some(dir) => write!(f, "{} {} (tools from {})", self.os, self.arch, dir.display()),
            None => write!(f, "{} {} (tools from PATH)", self.os, self.arch),
        }
    }
}
