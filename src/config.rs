use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Args as ClapArgs, Parser};

use crate::live::ReconnectPolicy;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Base URL of the dashboard backend.
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    pub server: String,

    /// Seconds between log refreshes while the selected job is running.
    #[arg(long, default_value_t = 4)]
    pub log_poll_secs: u64,

    /// Tracing filter, e.g. `relion_dash=debug`. Falls back to `RUST_LOG`.
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(flatten)]
    pub layout: LayoutConfig,

    #[command(flatten)]
    pub reconnect: ReconnectArgs,
}

/// Fixed geometry of the DAG layout. Positions are the top-left corner of a
/// `node_width` x `node_height` box.
#[derive(Clone, Copy, Debug, PartialEq, ClapArgs)]
pub struct LayoutConfig {
    #[arg(long, default_value_t = 164.0)]
    pub node_width: f32,
    #[arg(long, default_value_t = 50.0)]
    pub node_height: f32,
    /// Horizontal distance between column origins.
    #[arg(long, default_value_t = 220.0)]
    pub column_spacing: f32,
    /// Vertical distance between row origins.
    #[arg(long, default_value_t = 74.0)]
    pub row_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 164.0,
            node_height: 50.0,
            column_spacing: 220.0,
            row_spacing: 74.0,
        }
    }
}

#[derive(Clone, Copy, Debug, ClapArgs)]
pub struct ReconnectArgs {
    #[arg(long, default_value_t = 1000)]
    pub reconnect_initial_ms: u64,
    #[arg(long, default_value_t = 30_000)]
    pub reconnect_max_ms: u64,
}

impl ReconnectArgs {
    pub fn policy(self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(self.reconnect_initial_ms.max(1)),
            max_delay: Duration::from_millis(self.reconnect_max_ms.max(self.reconnect_initial_ms)),
            ..ReconnectPolicy::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub wheel_step: f32,
    pub button_zoom_in: f32,
    pub button_zoom_out: f32,
    pub frame_left_margin: f32,
    pub initial_pan: (f32, f32),
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.15,
            max_zoom: 3.0,
            wheel_step: 1.1,
            button_zoom_in: 1.25,
            button_zoom_out: 0.8,
            frame_left_margin: 48.0,
            initial_pan: (60.0, 0.0),
        }
    }
}

/// Request/response base and push-channel URL for one backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub api_base: String,
    pub live_url: String,
}

impl Endpoints {
    /// The push channel lives at `/ws` with a scheme mirroring the HTTP one.
    pub fn from_server(server: &str) -> Result<Self> {
        let trimmed = server.trim().trim_end_matches('/');
        let (live_scheme, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
            ("wss", rest)
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            ("ws", rest)
        } else {
            bail!("server URL must start with http:// or https://, got {server:?}");
        };

        if rest.is_empty() {
            bail!("server URL {server:?} has no host");
        }

        Ok(Self {
            api_base: trimmed.to_owned(),
            live_url: format!("{live_scheme}://{rest}/ws"),
        })
    }
}

/// Everything the dashboard needs at startup, resolved from [`Args`].
#[derive(Clone, Debug)]
pub struct Settings {
    pub endpoints: Endpoints,
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub reconnect: ReconnectPolicy,
    pub log_poll: Duration,
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self> {
        Ok(Self {
            endpoints: Endpoints::from_server(&args.server)?,
            layout: args.layout,
            viewport: ViewportConfig::default(),
            reconnect: args.reconnect.policy(),
            log_poll: Duration::from_secs(args.log_poll_secs.max(1)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_http_maps_to_ws() {
        let endpoints = Endpoints::from_server("http://localhost:3000/").unwrap();
        assert_eq!(endpoints.api_base, "http://localhost:3000");
        assert_eq!(endpoints.live_url, "ws://localhost:3000/ws");
    }

    #[test]
    fn tls_maps_to_wss() {
        let endpoints = Endpoints::from_server("https://hpc.example.org").unwrap();
        assert_eq!(endpoints.live_url, "wss://hpc.example.org/ws");
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(Endpoints::from_server("ftp://host").is_err());
        assert!(Endpoints::from_server("http://").is_err());
    }

    #[test]
    fn cli_defaults_match_layout_defaults() {
        let args = Args::parse_from(["relion-dash"]);
        assert_eq!(args.layout, LayoutConfig::default());
        assert_eq!(args.log_poll_secs, 4);

        let policy = args.reconnect.policy();
        assert_eq!(policy.initial_delay, Duration::from_millis(1000));
        assert_eq!(policy.max_delay, Duration::from_millis(30_000));
    }

    #[test]
    fn layout_flags_override_geometry() {
        let args = Args::parse_from(["relion-dash", "--column-spacing", "300", "--row-spacing", "90"]);
        assert_eq!(args.layout.column_spacing, 300.0);
        assert_eq!(args.layout.row_spacing, 90.0);
        assert_eq!(args.layout.node_width, 164.0);
    }

    #[test]
    fn settings_resolve_endpoints_and_intervals() {
        let args = Args::parse_from([
            "relion-dash",
            "--server",
            "https://cryo.lab:8443",
            "--log-poll-secs",
            "0",
        ]);
        let settings = Settings::from_args(&args).unwrap();
        assert_eq!(settings.endpoints.live_url, "wss://cryo.lab:8443/ws");
        assert_eq!(settings.log_poll, Duration::from_secs(1));
        assert_eq!(settings.viewport, ViewportConfig::default());
    }
}
