use std::collections::{BTreeSet, HashMap};
use std::io::Read;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Where to find market data for one ledger product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerMapping {
    pub symbol: String,
    /// True when the symbol is quoted in the foreign currency rather than the
    /// home currency.
    pub foreign_quoted: bool,
}

/// Mapping from ledger product name to market-data symbol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickerMap {
    entries: HashMap<String, TickerMapping>,
}

#[derive(Debug, Deserialize)]
struct TickerRow {
    #[serde(rename = "Product")]
    product: String,
    #[serde(rename = "Ticker", default)]
    ticker: Option<String>,
    #[serde(rename = "USD", default)]
    foreign: Option<String>,
}

impl TickerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `Product,Ticker,USD` CSV. Rows with an empty ticker are skipped.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut map = Self::new();
        for (idx, row) in csv.deserialize::<TickerRow>().enumerate() {
            let row = row.with_context(|| format!("Invalid ticker mapping row {}", idx + 1))?;
            let Some(symbol) = row.ticker.filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            let foreign_quoted = row.foreign.as_deref().is_some_and(parse_flag);
            map.insert(row.product, symbol, foreign_quoted);
        }
        Ok(map)
    }

    pub fn insert(
        &mut self,
        product: impl Into<String>,
        symbol: impl Into<String>,
        foreign_quoted: bool,
    ) {
        self.entries.insert(
            product.into(),
            TickerMapping {
                symbol: symbol.into(),
                foreign_quoted,
            },
        );
    }

    pub fn with(mut self, product: &str, symbol: &str, foreign_quoted: bool) -> Self {
        self.insert(product, symbol, foreign_quoted);
        self
    }

    pub fn get(&self, product: &str) -> Option<&TickerMapping> {
        self.entries.get(product)
    }

    pub fn symbol(&self, product: &str) -> Option<&str> {
        self.get(product).map(|m| m.symbol.as_str())
    }

    pub fn is_foreign_quoted(&self, product: &str) -> bool {
        self.get(product).is_some_and(|m| m.foreign_quoted)
    }

    /// Products from `products` that have no mapping, sorted.
    pub fn unmapped_products<'a, I>(&self, products: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        products
            .into_iter()
            .filter(|p| !self.entries.contains_key(*p))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_mappings_and_flags() -> Result<()> {
        let csv = "Product,Ticker,USD\n\
                   APPLE INC,AAPL,True\n\
                   ASML HOLDING,ASML.AS,False\n\
                   VANGUARD FTSE,VWRL.AS,\n\
                   UNKNOWN CO,,yes\n";
        let map = TickerMap::from_csv_reader(csv.as_bytes())?;

        assert_eq!(map.len(), 3);
        assert_eq!(map.symbol("APPLE INC"), Some("AAPL"));
        assert!(map.is_foreign_quoted("APPLE INC"));
        assert!(!map.is_foreign_quoted("ASML HOLDING"));
        assert!(!map.is_foreign_quoted("VANGUARD FTSE"));
        assert!(map.get("UNKNOWN CO").is_none());
        Ok(())
    }

    #[test]
    fn unmapped_products_are_sorted_and_unique() {
        let map = TickerMap::new().with("B", "B.AS", false);
        let unmapped = map.unmapped_products(["C", "B", "A", "C"]);
        assert_eq!(unmapped, vec!["A".to_string(), "C".to_string()]);
    }

    #[test]
    fn flag_accepts_common_truthy_spellings() {
        for value in ["true", "T", "Yes", "y", "1"] {
            assert!(parse_flag(value), "{value} should be truthy");
        }
        for value in ["false", "0", "no", ""] {
            assert!(!parse_flag(value), "{value} should be falsy");
        }
    }
}
