//! Handler for the `registry` command.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::adapter::polymarket::GammaClient;
use crate::cli::{output, RegistryArgs};
use crate::domain::{AssetRole, MarketSpec, RegistryFile};
use crate::error::{ConfigError, Result};

/// Fetch an event from Gamma and emit it as a `[[markets]]` table.
pub async fn execute(args: &RegistryArgs) -> Result<()> {
    let party = args
        .party
        .as_deref()
        .map(str::trim)
        .filter(|party| !party.is_empty())
        .map(str::to_string);
    if args.role == AssetRole::Nomination && party.is_none() {
        return Err(ConfigError::MissingField { field: "party" }.into());
    }

    let client = GammaClient::new(args.gamma_url.clone());
    let event = client.event(&args.slug).await?;
    let (market, skipped) = event.to_market_spec(args.role, party);
    let table = render(market.clone())?;

    match &args.append {
        Some(path) => {
            append(path, &table)?;
            output::success(&format!(
                "Appended {} ({} assets) to {}",
                market.id,
                market.assets.len(),
                output::highlight(path.display())
            ));
        }
        None => print!("{table}"),
    }
    if skipped > 0 {
        output::warning(&format!("{skipped} markets had no name or Yes token and were skipped"));
    }
    Ok(())
}

/// TOML text for a single market.
pub fn render(market: MarketSpec) -> Result<String> {
    let file = RegistryFile {
        markets: vec![market],
        ..RegistryFile::default()
    };
    let text = toml::to_string(&file).map_err(|e| ConfigError::InvalidValue {
        field: "markets",
        reason: e.to_string(),
    })?;
    Ok(text)
}

fn append(path: &Path, table: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(format!("\n{table}").as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetRegistry, AssetSpec};

    fn market() -> MarketSpec {
        MarketSpec {
            id: "democratic-presidential-nominee-2028".into(),
            role: AssetRole::Nomination,
            party: Some("Democratic".into()),
            assets: vec![
                AssetSpec {
                    name: "Gavin Newsom".into(),
                    asset_id: "101".into(),
                },
                AssetSpec {
                    name: "Josh Shapiro".into(),
                    asset_id: "201".into(),
                },
            ],
        }
    }

    #[test]
    fn rendered_table_loads_back_as_a_registry() {
        let text = render(market()).unwrap();
        assert!(text.contains("[[markets]]"));
        assert!(text.contains("[[markets.assets]]"));

        let registry = AssetRegistry::from_toml_str(&text, "generated").unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.parties(), vec!["Democratic".to_string()]);
    }

    #[test]
    fn appended_tables_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markets.toml");

        append(&path, &render(market()).unwrap()).unwrap();
        let mut winner = market();
        winner.id = "presidential-election-winner-2028".into();
        winner.role = AssetRole::Winner;
        winner.party = None;
        winner.assets.iter_mut().for_each(|a| a.asset_id.push('9'));
        append(&path, &render(winner).unwrap()).unwrap();

        let registry = AssetRegistry::load(&path).unwrap();
        assert_eq!(registry.markets().len(), 2);
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.skipped(), 0);
    }
}
