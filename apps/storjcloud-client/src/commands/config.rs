use anyhow::{Context, Result};
use clap::Args;

use crate::config::AppConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Print JSON instead of YAML
    #[arg(long)]
    json: bool,
}

impl ConfigArgs {
    pub fn run(&self, config: &AppConfig) -> Result<()> {
        let view = config.redacted().context("failed to serialize configuration")?;
        let rendered = if self.json {
            serde_json::to_string_pretty(&view)?
        } else {
            serde_saphyr::to_string(&view).context("failed to render configuration as YAML")?
        };
        println!("{}", rendered.trim_end());
        Ok(())
    }
}
