//! Command-line interface

use clap::builder::BoolishValueParser;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "weather-gateway")]
#[command(about = "Weather MCP server over HTTP+SSE with a REST facade", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// PEM private key; enables HTTPS together with --ssl-certfile
    #[arg(long, env = "SSL_KEYFILE", value_name = "PATH")]
    pub ssl_keyfile: Option<PathBuf>,

    /// PEM certificate chain; enables HTTPS together with --ssl-keyfile
    #[arg(long, env = "SSL_CERTFILE", value_name = "PATH")]
    pub ssl_certfile: Option<PathBuf>,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Require a bearer token on the SSE endpoint
    #[arg(long, env = "AUTH_ENABLED", value_parser = BoolishValueParser::new())]
    pub auth: bool,
}
