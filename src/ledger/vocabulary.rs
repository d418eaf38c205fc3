use serde::{Deserialize, Serialize};

/// Description keywords used to normalise and classify ledger lines.
///
/// Defaults match the Dutch-language DEGIRO account export. Verb tokens are
/// matched case-sensitively on word boundaries; every other keyword is a
/// case-insensitive substring match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub buy_verbs: Vec<String>,
    pub sell_verbs: Vec<String>,
    pub deposit_keywords: Vec<String>,
    pub withdrawal_keywords: Vec<String>,
    /// Internal transfers and money-market sweeps. Excluded from the cash lookup.
    pub transfer_keywords: Vec<String>,
    pub fee_keywords: Vec<String>,
    pub tax_keywords: Vec<String>,
    /// Currency-conversion legs.
    pub conversion_keywords: Vec<String>,
    /// Exact descriptions whose zero-amount postings are dropped while loading.
    pub noise_descriptions: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            buy_verbs: strings(&["Koop"]),
            sell_verbs: strings(&["Verkoop"]),
            deposit_keywords: strings(&["deposit"]),
            withdrawal_keywords: strings(&["withdraw", "terugstorting"]),
            transfer_keywords: strings(&["Overboeking", "Degiro Cash Sweep Transfer"]),
            fee_keywords: strings(&["DEGIRO Transactiekosten", "Transactiekosten"]),
            tax_keywords: strings(&["Transactiebelasting"]),
            conversion_keywords: strings(&["Valuta Creditering", "Valuta Debitering"]),
            noise_descriptions: strings(&["Flatex Interest Income"]),
        }
    }
}

impl Vocabulary {
    pub fn is_transfer(&self, description: &str) -> bool {
        contains_any(description, &self.transfer_keywords)
    }

    pub fn is_deposit(&self, description: &str) -> bool {
        contains_any(description, &self.deposit_keywords)
    }

    pub fn is_withdrawal(&self, description: &str) -> bool {
        contains_any(description, &self.withdrawal_keywords)
    }

    pub fn is_fee(&self, description: &str) -> bool {
        contains_any(description, &self.fee_keywords)
    }

    pub fn is_tax(&self, description: &str) -> bool {
        contains_any(description, &self.tax_keywords)
    }

    pub fn is_conversion(&self, description: &str) -> bool {
        contains_any(description, &self.conversion_keywords)
    }

    pub fn is_noise_description(&self, description: &str) -> bool {
        self.noise_descriptions
            .iter()
            .any(|d| d.trim() == description.trim())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    needles
        .iter()
        .filter(|n| !n.is_empty())
        .any(|n| haystack.contains(&n.to_lowercase()))
}
