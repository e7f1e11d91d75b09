//! Probe command definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Extra seconds the executor waits beyond a probe's own timeout before
/// killing it, so tools with a native timeout get to report it themselves.
pub const PROCESS_GRACE_SECS: u64 = 2;

/// How an HTTP probe should treat proxy settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "mode", content = "url")]
pub enum ProxyOverride {
    /// Use whatever the environment configures.
    #[default]
    Ambient,

    /// Explicitly bypass every proxy.
    Bypass,

    /// Route through the given proxy.
    Explicit(String),
}

impl ProxyOverride {
    /// curl arguments implementing this override.
    pub fn curl_args(&self) -> Vec<String> {
        match self {
            ProxyOverride::Ambient => Vec::new(),
            ProxyOverride::Bypass => vec!["--noproxy".to_string(), "*".to_string()],
            ProxyOverride::Explicit(url) => vec!["--proxy".to_string(), url.clone()],
        }
    }

    pub fn is_bypass(&self) -> bool {
        matches!(self, ProxyOverride::Bypass)
    }
}

impl fmt::Display for ProxyOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyOverride::Ambient => write!(f, "ambient proxy settings"),
            ProxyOverride::Bypass => write!(f, "no proxy"),
            ProxyOverride::Explicit(url) => write!(f, "proxy {}", url),
        }
    }
}

/// A single external command issued by a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeCommand {
    /// Short probe name used in logs.
    pub name: String,

    /// Executable.
    pub program: String,

    /// Arguments passed verbatim (no shell).
    pub args: Vec<String>,

    /// Timeout in seconds.
    pub timeout_secs: u64,
}

impl ProbeCommand {
    /// Create a custom probe command.
    pub fn custom(name: &str, program: &str, args: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args,
            timeout_secs,
        }
    }

    /// `curl --include` fetch of `url`, status line and headers included in output.
    pub fn http_fetch(url: &str, proxy: &ProxyOverride, timeout_secs: u64) -> Self {
        let mut args = vec![
            "--silent".to_string(),
            "--show-error".to_string(),
            "--include".to_string(),
            "--max-time".to_string(),
            timeout_secs.to_string(),
        ];
        args.extend(proxy.curl_args());
        args.push(url.to_string());
        Self::custom("http_fetch", "curl", args, timeout_secs)
    }

    /// Single ICMP echo to `host`, waiting at most `wait_secs` for the reply.
    pub fn ping(host: &str, wait_secs: u64) -> Self {
        Self::custom(
            "ping",
            "ping",
            vec![
                "-c".to_string(),
                "1".to_string(),
                "-W".to_string(),
                wait_secs.to_string(),
                host.to_string(),
            ],
            wait_secs,
        )
    }

    /// One-shot DNS query for `host`.
    pub fn dns_query(host: &str, timeout_secs: u64) -> Self {
        Self::custom(
            "dns_query",
            "dig",
            vec![
                format!("+time={}", timeout_secs),
                "+tries=1".to_string(),
                host.to_string(),
            ],
            timeout_secs,
        )
    }

    /// `systemctl is-active <unit>`; exit 0 means active.
    pub fn service_active(unit: &str, timeout_secs: u64) -> Self {
        Self::custom(
            "service_active",
            "systemctl",
            vec!["is-active".to_string(), unit.to_string()],
            timeout_secs,
        )
    }

    /// `systemctl is-enabled <unit>`; prints `masked` for masked units.
    pub fn service_enabled(unit: &str, timeout_secs: u64) -> Self {
        Self::custom(
            "service_enabled",
            "systemctl",
            vec!["is-enabled".to_string(), unit.to_string()],
            timeout_secs,
        )
    }

    /// Full command line for transcripts.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg == "*" {
                line.push_str(&format!("'{}'", arg));
            } else {
                line.push_str(arg);
            }
        }
        line
    }

    /// Whether any argument equals or contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a.contains(needle))
    }
}

impl fmt::Display for ProbeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetch_ambient_has_no_proxy_args() {
        let cmd = ProbeCommand::http_fetch("https://example.org/latest", &ProxyOverride::Ambient, 10);
        assert_eq!(cmd.program, "curl");
        assert!(cmd.args.contains(&"--include".to_string()));
        assert!(!cmd.mentions("--noproxy"));
        assert!(!cmd.mentions("--proxy"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("https://example.org/latest"));
    }

    #[test]
    fn test_http_fetch_bypass() {
        let cmd = ProbeCommand::http_fetch("http://wpad/wpad.dat", &ProxyOverride::Bypass, 10);
        let pos = cmd.args.iter().position(|a| a == "--noproxy").expect("noproxy flag");
        assert_eq!(cmd.args[pos + 1], "*");
        assert!(cmd.command_line().contains("--noproxy '*'"));
    }

    #[test]
    fn test_http_fetch_explicit_proxy() {
        let proxy = ProxyOverride::Explicit("http://proxy.corp:3128".to_string());
        let cmd = ProbeCommand::http_fetch("https://example.org/", &proxy, 15);
        assert!(cmd.command_line().contains("--proxy http://proxy.corp:3128"));
        assert!(cmd.command_line().contains("--max-time 15"));
    }

    #[test]
    fn test_ping_and_dns_commands() {
        let ping = ProbeCommand::ping("_gateway", 5);
        assert_eq!(ping.command_line(), "ping -c 1 -W 5 _gateway");

        let dig = ProbeCommand::dns_query("cdn.example.org", 5);
        assert_eq!(dig.command_line(), "dig +time=5 +tries=1 cdn.example.org");
    }

    #[test]
    fn test_service_commands() {
        assert_eq!(
            ProbeCommand::service_active("pacrunner", 5).command_line(),
            "systemctl is-active pacrunner"
        );
        assert_eq!(
            ProbeCommand::service_enabled("pacrunner", 5).command_line(),
            "systemctl is-enabled pacrunner"
        );
    }

    #[test]
    fn test_proxy_override_display() {
        assert_eq!(ProxyOverride::Bypass.to_string(), "no proxy");
        assert_eq!(
            ProxyOverride::Explicit("http://p:8080".to_string()).to_string(),
            "proxy http://p:8080"
        );
        assert!(ProxyOverride::Bypass.is_bypass());
        assert!(!ProxyOverride::Ambient.is_bypass());
    }
}
