use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 15;

/// Listing venue inferred from the ticker's suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    /// `.KS` listings and the `^KS11` composite.
    Kospi,
    /// `.KQ` listings.
    Kosdaq,
    /// Index tickers other than the KOSPI composite.
    Index,
    /// `KRW=X` style currency quotes.
    Currency,
    /// Anything without a recognised suffix; treated as a US listing.
    Us,
}

impl Market {
    pub const fn is_korean(self) -> bool {
        matches!(self, Self::Kospi | Self::Kosdaq)
    }

    /// Quote currency for prices on this venue.
    pub const fn currency(self) -> &'static str {
        if self.is_korean() {
            "KRW"
        } else {
            "USD"
        }
    }
}

/// Normalized, upper-case ticker.
///
/// Accepts exchange-suffixed listings (`005930.KS`), index tickers (`^KS11`),
/// currency pairs (`KRW=X`) and share classes (`BRK-B`). Company names such as
/// `삼성전자` are not tickers; the resolver maps those first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        let mut chars = normalized.chars();

        match chars.next() {
            None => return Err(ValidationError::EmptySymbol),
            Some(first) if !(first.is_ascii_alphanumeric() || first == '^') => {
                return Err(ValidationError::SymbolInvalidStart { ch: first });
            }
            Some(_) => {}
        }

        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        if let Some((index, ch)) = chars
            .enumerate()
            .find(|(_, ch)| !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '=')))
        {
            return Err(ValidationError::SymbolInvalidChar {
                ch,
                index: index + 1,
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn market(&self) -> Market {
        let s = self.as_str();
        if s.ends_with(".KS") || s == "^KS11" {
            Market::Kospi
        } else if s.ends_with(".KQ") {
            Market::Kosdaq
        } else if s.starts_with('^') {
            Market::Index
        } else if s.ends_with("=X") {
            Market::Currency
        } else {
            Market::Us
        }
    }

    /// Ticker without its exchange suffix (`005930` for `005930.KS`).
    pub fn base(&self) -> &str {
        match self.market() {
            Market::Kospi | Market::Kosdaq => self
                .as_str()
                .rsplit_once('.')
                .map_or(self.as_str(), |(base, _)| base),
            _ => self.as_str(),
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("valid symbol")
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(sym(" aapl ").as_str(), "AAPL");
        assert_eq!(sym("005930.ks").as_str(), "005930.KS");
        assert_eq!(sym("krw=x").as_str(), "KRW=X");
    }

    #[test]
    fn infers_market_from_suffix() {
        assert_eq!(sym("005930.KS").market(), Market::Kospi);
        assert_eq!(sym("^KS11").market(), Market::Kospi);
        assert_eq!(sym("247540.KQ").market(), Market::Kosdaq);
        assert_eq!(sym("^GSPC").market(), Market::Index);
        assert_eq!(sym("KRW=X").market(), Market::Currency);
        assert_eq!(sym("BRK-B").market(), Market::Us);
        assert_eq!(sym("247540.KQ").market().currency(), "KRW");
        assert_eq!(sym("NVDA").market().currency(), "USD");
    }

    #[test]
    fn base_strips_korean_suffix_only() {
        assert_eq!(sym("000660.KS").base(), "000660");
        assert_eq!(sym("BRK.B").base(), "BRK.B");
    }

    #[test]
    fn rejects_company_names_and_stray_characters() {
        assert!(matches!(
            Symbol::parse("삼성전자"),
            Err(ValidationError::SymbolInvalidStart { .. })
        ));
        assert!(matches!(
            Symbol::parse(".AAPL"),
            Err(ValidationError::SymbolInvalidStart { .. })
        ));
        assert_eq!(
            Symbol::parse("AAPL$"),
            Err(ValidationError::SymbolInvalidChar { ch: '$', index: 4 })
        );
        assert_eq!(Symbol::parse("   "), Err(ValidationError::EmptySymbol));
    }
}
