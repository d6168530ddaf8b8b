//! Platform-specific service lifecycle management
//!
//! Install, uninstall, and query the PEBO daemon as a user service

use std::path::PathBuf;

use crate::config::DEFAULT_PORT;
use crate::eyes::Mood;
use crate::{Error, Result};

/// Service status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Service is running
    Running,
    /// Service is installed but not running
    Stopped,
    /// Service is not installed
    NotInstalled,
    /// Status could not be determined
    Unknown(String),
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::NotInstalled => write!(f, "not installed"),
            Self::Unknown(msg) => write!(f, "unknown ({msg})"),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Path to the pebo binary
    pub binary_path: PathBuf,
    /// Port for the control API
    pub port: u16,
    /// Mood to start in
    pub mood: Option<Mood>,
    /// Extra arguments
    pub extra_args: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("pebo"),
            port: DEFAULT_PORT,
            mood: None,
            extra_args: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Daemon command line, binary first
    #[must_use]
    pub fn command_line(&self) -> Vec<String> {
        let mut args = vec![
            self.binary_path.display().to_string(),
            "--port".to_string(),
            self.port.to_string(),
        ];
        if let Some(mood) = self.mood {
            args.push("--mood".to_string());
            args.push(mood.to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Install pebo as a user service
///
/// # Errors
///
/// Returns error if service installation fails
pub fn install_service(config: &ServiceConfig) -> Result<()> {
    #[cfg(target_os = "macos")]
    return install_launchd(config);

    #[cfg(target_os = "linux")]
    return install_systemd(config);

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = config;
        Err(Error::Config(
            "service installation not supported on this platform".to_string(),
        ))
    }
}

/// Uninstall the pebo user service
///
/// # Errors
///
/// Returns error if service removal fails
pub fn uninstall_service() -> Result<()> {
    #[cfg(target_os = "macos")]
    return uninstall_launchd();

    #[cfg(target_os = "linux")]
    return uninstall_systemd();

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    Err(Error::Config(
        "service management not supported on this platform".to_string(),
    ))
}

/// Query pebo service status
///
/// # Errors
///
/// Returns error if status cannot be determined
pub fn service_status() -> Result<ServiceStatus> {
    #[cfg(target_os = "macos")]
    return launchd_status();

    #[cfg(target_os = "linux")]
    return systemd_status();

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    Ok(ServiceStatus::Unknown(
        "platform not supported".to_string(),
    ))
}

/// Get the service log file path
#[must_use]
pub fn log_path() -> Option<PathBuf> {
    log_dir().map(|dir| dir.join("pebo.log"))
}

fn log_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".pebo").join("logs"))
}

/// systemd user unit for the daemon
#[must_use]
pub fn systemd_unit(config: &ServiceConfig) -> String {
    let exec = config
        .command_line()
        .iter()
        .map(String::as_str)
        .map(systemd_quote)
        .collect::<Vec<_>>()
        .join(" ");
    let log = log_path().map_or_else(|| "/tmp/pebo.log".to_string(), |p| p.display().to_string());

    format!(
        r"[Unit]
Description=PEBO desk robot
After=network.target

[Service]
Type=simple
ExecStart={exec}
Restart=on-failure
RestartSec=5
Environment=RUST_LOG=info
StandardOutput=append:{log}
StandardError=append:{log}

[Install]
WantedBy=default.target
"
    )
}

/// Quote one `ExecStart=` word; `%` and `$` are escaped even when bare
fn systemd_quote(arg: &str) -> String {
    let escaped = arg.replace('%', "%%").replace('$', "$$");
    let needs_quotes = escaped.is_empty()
        || escaped
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | ';'));
    if !needs_quotes {
        return escaped;
    }
    let inner = escaped.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{inner}\"")
}

/// launchd agent plist for the daemon
#[must_use]
pub fn launchd_plist(config: &ServiceConfig) -> String {
    let dir = log_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
    let stdout_log = dir.join("pebo.log").display().to_string();
    let stderr_log = dir.join("pebo.err.log").display().to_string();
    let args: String = config
        .command_line()
        .iter()
        .map(|a| format!("        <string>{a}</string>\n"))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{LAUNCHD_LABEL}</string>
    <key>ProgramArguments</key>
    <array>
{args}    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <true/>
    <key>StandardOutPath</key>
    <string>{stdout_log}</string>
    <key>StandardErrorPath</key>
    <string>{stderr_log}</string>
</dict>
</plist>"#
    )
}

const LAUNCHD_LABEL: &str = "dev.pebo.daemon";

// --- macOS (launchd) ---

#[cfg(target_os = "macos")]
fn plist_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home)
        .join("Library/LaunchAgents")
        .join(format!("{LAUNCHD_LABEL}.plist"))
}

#[cfg(target_os = "macos")]
fn install_launchd(config: &ServiceConfig) -> Result<()> {
    if let Some(dir) = log_dir() {
        std::fs::create_dir_all(dir)?;
    }

    let path = plist_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, launchd_plist(config))?;

    let output = std::process::Command::new("launchctl")
        .args(["load", "-w"])
        .arg(&path)
        .output()
        .map_err(|e| Error::Config(format!("failed to run launchctl: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Config(format!("launchctl load failed: {stderr}")));
    }

    tracing::info!(path = %path.display(), "installed LaunchAgent");
    Ok(())
}

#[cfg(target_os = "macos")]
fn uninstall_launchd() -> Result<()> {
    let path = plist_path();

    if path.exists() {
        let _ = std::process::Command::new("launchctl")
            .args(["unload"])
            .arg(&path)
            .output();

        std::fs::remove_file(&path)?;
        tracing::info!("uninstalled LaunchAgent");
    }

    Ok(())
}

#[cfg(target_os = "macos")]
fn launchd_status() -> Result<ServiceStatus> {
    if !plist_path().exists() {
        return Ok(ServiceStatus::NotInstalled);
    }

    let output = std::process::Command::new("launchctl")
        .args(["list", LAUNCHD_LABEL])
        .output()
        .map_err(|e| Error::Config(format!("failed to run launchctl: {e}")))?;

    if output.status.success() {
        Ok(ServiceStatus::Running)
    } else {
        Ok(ServiceStatus::Stopped)
    }
}

// --- Linux (systemd) ---

#[cfg(target_os = "linux")]
const SYSTEMD_SERVICE: &str = "pebo";

#[cfg(target_os = "linux")]
fn service_file_path() -> PathBuf {
    let config_dir = directories::BaseDirs::new()
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });

    config_dir
        .join("systemd/user")
        .join(format!("{SYSTEMD_SERVICE}.service"))
}

#[cfg(target_os = "linux")]
fn install_systemd(config: &ServiceConfig) -> Result<()> {
    if let Some(dir) = log_dir() {
        std::fs::create_dir_all(dir)?;
    }

    let path = service_file_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, systemd_unit(config))?;

    run_systemctl(&["--user", "daemon-reload"])?;
    run_systemctl(&["--user", "enable", "--now", SYSTEMD_SERVICE])?;

    tracing::info!(path = %path.display(), "installed systemd user service");
    Ok(())
}

#[cfg(target_os = "linux")]
fn uninstall_systemd() -> Result<()> {
    let _ = run_systemctl(&["--user", "disable", "--now", SYSTEMD_SERVICE]);

    let path = service_file_path();
    if path.exists() {
        std::fs::remove_file(&path)?;
        let _ = run_systemctl(&["--user", "daemon-reload"]);
        tracing::info!("uninstalled systemd user service");
    }

    Ok(())
}

#[cfg(target_os = "linux")]
fn systemd_status() -> Result<ServiceStatus> {
    if !service_file_path().exists() {
        return Ok(ServiceStatus::NotInstalled);
    }

    let output = std::process::Command::new("systemctl")
        .args(["--user", "is-active", SYSTEMD_SERVICE])
        .output()
        .map_err(|e| Error::Config(format!("failed to run systemctl: {e}")))?;

    let status = String::from_utf8_lossy(&output.stdout).trim().to_string();
    match status.as_str() {
        "active" => Ok(ServiceStatus::Running),
        "inactive" | "failed" => Ok(ServiceStatus::Stopped),
        other => Ok(ServiceStatus::Unknown(other.to_string())),
    }
}

#[cfg(target_os = "linux")]
fn run_systemctl(args: &[&str]) -> Result<()> {
    let output = std::process::Command::new("systemctl")
        .args(args)
        .output()
        .map_err(|e| Error::Config(format!("failed to run systemctl: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Config(format!(
            "systemctl {} failed: {stderr}",
            args.join(" ")
        )));
    }

    Ok(())
}
