use std::path::Path;

use crate::config::ResolvedConfig;

pub fn config_output(config_path: &Path, config: &ResolvedConfig) -> serde_json::Value {
    serde_json::json!({
        "config_file": config_path.display().to_string(),
        "ledger_path": config.ledger_path.display().to_string(),
        "tickers_path": config.tickers_path.display().to_string(),
        "output_dir": config.output_dir.display().to_string(),
        "home_currency": config.home_currency,
        "foreign_currency": config.foreign_currency,
        "default_fx_rate": config.default_fx_rate.to_string(),
        "timeline": {
            "hours": config.timeline.hours,
            "start": config.timeline.start.map(|d| d.to_string()),
            "end": config.timeline.end.map(|d| d.to_string()),
        },
        "market_data": {
            "base_url": config.market_data.base_url,
            "concurrency": config.market_data.concurrency,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    #[test]
    fn reports_resolved_paths_and_currencies() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("replaybook.toml");
        let config = ResolvedConfig::load_or_default(&config_path)?;

        let output = config_output(&config_path, &config);

        assert_eq!(output["home_currency"], "EUR");
        assert_eq!(output["default_fx_rate"], "0.97");
        assert_eq!(output["timeline"]["hours"][0], 9);
        assert!(output["ledger_path"]
            .as_str()
            .is_some_and(|p| p.ends_with("Account.csv")));
        Ok(())
    }
}
