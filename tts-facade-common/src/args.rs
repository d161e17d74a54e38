//! Command-line listen arguments shared by the server binaries.
//!
//! Flags take precedence over the environment-derived [`Config`]:
//!
//! ```ignore
//! use tts_facade_common::args::ListenArgs;
//! use clap::Parser;
//!
//! #[derive(Parser)]
//! struct Args {
//!     #[command(flatten)]
//!     listen: ListenArgs,
//! }
//!
//! let args = Args::parse();
//! let config = args.listen.apply(Config::from_env()?);
//! ```

use std::path::PathBuf;

use clap::Args;

use crate::config::Config;

/// Command-line arguments for the HTTP listener.
#[derive(Args, Debug, Clone, Default)]
pub struct ListenArgs {
    /// Address to bind (default: 0.0.0.0, or from HOST env var)
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on (default: 8080, or from PORT env var)
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// JSON voice catalog (default: built-in catalog, or from VOICES_FILE env var)
    #[arg(long, env = "VOICES_FILE")]
    pub voices_file: Option<PathBuf>,
}

impl ListenArgs {
    /// Overlay the arguments that were given onto `config`.
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(voices_file) = self.voices_file {
            config.voices_file = Some(voices_file);
        }
        config
    }
}
