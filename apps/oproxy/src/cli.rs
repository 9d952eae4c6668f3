use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "oproxy", version, about = "OpenAI chat-completions front end for Ollama")]
pub struct Cli {
    /// Address to bind.
    #[arg(long, env = "OPROXY_HOST")]
    pub host: Option<String>,
    #[arg(long, env = "OPROXY_PORT")]
    pub port: Option<u16>,
    /// Ollama base URL, e.g. http://127.0.0.1:11434
    #[arg(long, env = "OPROXY_UPSTREAM")]
    pub upstream: Option<String>,
    /// TOML file layered between the defaults and the environment.
    #[arg(long, env = "OPROXY_CONFIG")]
    pub config: Option<PathBuf>,
    /// Emit logs as JSON lines.
    #[arg(long, env = "OPROXY_LOG_JSON")]
    pub log_json: bool,
}
