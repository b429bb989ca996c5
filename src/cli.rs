// cli.rs - Command-line interface configuration
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "shadow-viewer")]
#[command(about = "Four-viewport shadow mapping viewer", long_about = None)]
pub struct Cli {
    /// Disable the control panel overlay
    #[arg(long = "no-ui", default_value = "false")]
    pub no_ui: bool,
}
