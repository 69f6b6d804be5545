use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ga4-insights-rs",
    version,
    about = "GA4 Data API server with best-time-to-post helpers"
)]
pub struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 8094)]
    pub port: u16,
    #[arg(long)]
    pub setup_config: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub print_openapi: bool,
}
