use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "remotephoto")]
#[command(
    author,
    version,
    about = "Remote photo show: one master controls, every viewer follows"
)]
pub struct Cli {
    /// Configuration file path (YAML); defaults apply when it is missing
    #[arg(short, long, default_value = "remotephoto.yaml")]
    pub config: String,

    /// Listen address
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Directory holding the photos
    #[arg(short = 'd', long)]
    pub photo_dir: Option<PathBuf>,

    /// Master username
    #[arg(short, long)]
    pub username: Option<String>,

    /// Master password
    #[arg(long, env = "REMOTEPHOTO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
