//! Writes the JavaScript API client used by the browser extension
//!
//! ```bash
//! credicheck-gen-client --base-url https://ratings.example.org --output extension/api.js
//! ```

use anyhow::Context;
use clap::Parser;
use credicheck::client_gen::render_js_client;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "credicheck-gen-client")]
#[command(about = "Generate the JavaScript API client")]
struct Args {
    /// Base URL of the credicheck server
    #[arg(long, env = "CREDICHECK_BASE_URL", default_value = "http://localhost:4269")]
    base_url: String,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let js = render_js_client(&args.base_url);

    match args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(&path, js).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Generated API client at {}", path.display());
        }
        None => print!("{}", js),
    }

    Ok(())
}
