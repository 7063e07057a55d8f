use serde::{Deserialize, Serialize};

/// One price update published by a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub sequence: u64,
    pub price: f64,
}

impl Quote {
    /// Deterministic quote for the simulated feed: the price walks through ten ticks
    /// of 0.25 above 100.
    pub fn simulated(symbol: &str, sequence: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            sequence,
            price: 100.0 + (sequence % 10) as f64 * 0.25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_price_wraps_every_ten_ticks() {
        assert_eq!(Quote::simulated("ACME", 3).price, 100.75);
        assert_eq!(Quote::simulated("ACME", 13).price, 100.75);
        assert_eq!(Quote::simulated("ACME", 10).price, 100.0);
    }
}
