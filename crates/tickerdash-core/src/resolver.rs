//! Free-text query to ticker resolution.
//!
//! Order: built-in name table, then remote symbol search (an exact symbol hit
//! wins, otherwise the first hit), then the query itself as a literal ticker.

use std::collections::BTreeMap;
use std::future::Future;

use serde::Serialize;

use crate::data_source::{SearchBatch, SearchRequest, SourceError};
use crate::{Symbol, ValidationError};

/// Common company names, Korean and English, mapped to listings.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("삼성전자", "005930.KS"),
    ("삼성", "005930.KS"),
    ("samsung electronics", "005930.KS"),
    ("sk하이닉스", "000660.KS"),
    ("하이닉스", "000660.KS"),
    ("sk hynix", "000660.KS"),
    ("네이버", "035420.KS"),
    ("naver", "035420.KS"),
    ("카카오", "035720.KS"),
    ("kakao", "035720.KS"),
    ("현대차", "005380.KS"),
    ("현대자동차", "005380.KS"),
    ("hyundai motor", "005380.KS"),
    ("기아", "000270.KS"),
    ("셀트리온", "068270.KS"),
    ("posco홀딩스", "005490.KS"),
    ("포스코홀딩스", "005490.KS"),
    ("삼성바이오로직스", "207940.KS"),
    ("lg에너지솔루션", "373220.KS"),
    ("삼성sdi", "006400.KS"),
    ("lg화학", "051910.KS"),
    ("에코프로", "086520.KQ"),
    ("에코프로비엠", "247540.KQ"),
    ("한미반도체", "042700.KS"),
    ("엔비디아", "NVDA"),
    ("nvidia", "NVDA"),
    ("테슬라", "TSLA"),
    ("tesla", "TSLA"),
    ("애플", "AAPL"),
    ("apple", "AAPL"),
    ("마이크로소프트", "MSFT"),
    ("microsoft", "MSFT"),
    ("구글", "GOOGL"),
    ("알파벳", "GOOGL"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("아마존", "AMZN"),
    ("amazon", "AMZN"),
    ("메타", "META"),
    ("브로드컴", "AVGO"),
    ("broadcom", "AVGO"),
    ("tsmc", "TSM"),
    ("팔란티어", "PLTR"),
    ("palantir", "PLTR"),
    ("코스피", "^KS11"),
    ("kospi", "^KS11"),
    ("나스닥", "^IXIC"),
    ("nasdaq", "^IXIC"),
    ("원달러", "KRW=X"),
    ("환율", "KRW=X"),
];

/// Where a resolved symbol came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Alias,
    Search,
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub query: String,
    pub symbol: Symbol,
    pub source: ResolutionSource,
    /// Instrument name when the search endpoint supplied one.
    pub name: Option<String>,
}

/// Lowercase with all whitespace removed, so "SK 하이닉스" hits "sk하이닉스".
fn alias_key(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone)]
pub struct TickerResolver {
    aliases: BTreeMap<String, Symbol>,
    search_limit: usize,
}

impl Default for TickerResolver {
    fn default() -> Self {
        Self::new(5)
    }
}

impl TickerResolver {
    pub fn new(search_limit: usize) -> Self {
        let aliases = BUILTIN_ALIASES
            .iter()
            .filter_map(|(name, ticker)| Some((alias_key(name), Symbol::parse(ticker).ok()?)))
            .collect();
        Self {
            aliases,
            search_limit: search_limit.max(1),
        }
    }

    /// Adds or overrides name aliases.
    pub fn with_aliases<'a>(
        mut self,
        extra: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ValidationError> {
        for (name, ticker) in extra {
            self.aliases.insert(alias_key(name), Symbol::parse(ticker)?);
        }
        Ok(self)
    }

    pub fn lookup_alias(&self, query: &str) -> Option<&Symbol> {
        self.aliases.get(&alias_key(query))
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Resolves `query`, calling `search` only when the alias table misses.
    ///
    /// A failed search is logged and falls through to the literal symbol.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when nothing matched and the query is not a
    /// valid ticker on its own.
    pub async fn resolve<F, Fut>(&self, query: &str, search: F) -> Result<Resolution, ValidationError>
    where
        F: FnOnce(SearchRequest) -> Fut,
        Fut: Future<Output = Result<SearchBatch, SourceError>>,
    {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        if let Some(symbol) = self.lookup_alias(query) {
            return Ok(Resolution {
                query: query.to_owned(),
                symbol: symbol.clone(),
                source: ResolutionSource::Alias,
                name: None,
            });
        }

        let request = SearchRequest::new(query, self.search_limit)
            .map_err(|_| ValidationError::EmptySymbol)?;
        match search(request).await {
            Ok(batch) => {
                let exact = batch
                    .results
                    .iter()
                    .find(|hit| hit.symbol.as_str().eq_ignore_ascii_case(query));
                if let Some(hit) = exact.or_else(|| batch.results.first()) {
                    return Ok(Resolution {
                        query: query.to_owned(),
                        symbol: hit.symbol.clone(),
                        source: ResolutionSource::Search,
                        name: Some(hit.name.clone()),
                    });
                }
            }
            Err(error) => {
                tracing::warn!(query, %error, "symbol search failed; using query as ticker");
            }
        }

        Ok(Resolution {
            query: query.to_owned(),
            symbol: Symbol::parse(query)?,
            source: ResolutionSource::Literal,
            name: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetClass, Instrument};
    use std::cell::Cell;

    fn instrument(symbol: &str, name: &str) -> Instrument {
        Instrument::new(
            Symbol::parse(symbol).expect("symbol"),
            name,
            None,
            None,
            AssetClass::Equity,
        )
    }

    fn batch(query: &str, hits: Vec<Instrument>) -> Result<SearchBatch, SourceError> {
        Ok(SearchBatch {
            query: query.to_owned(),
            results: hits,
        })
    }

    #[tokio::test]
    async fn alias_table_wins_without_searching() {
        let resolver = TickerResolver::default();
        let searched = Cell::new(false);

        let resolution = resolver
            .resolve(" SK 하이닉스 ", |_| {
                searched.set(true);
                async { batch("", Vec::new()) }
            })
            .await
            .expect("alias resolves");

        assert_eq!(resolution.symbol.as_str(), "000660.KS");
        assert_eq!(resolution.source, ResolutionSource::Alias);
        assert!(!searched.get());
    }

    #[tokio::test]
    async fn exact_symbol_hit_is_preferred_over_first_hit() {
        let resolver = TickerResolver::default();
        let resolution = resolver
            .resolve("amd", |req| async move {
                batch(
                    &req.query,
                    vec![instrument("AMD.MX", "AMD Mexico"), instrument("AMD", "Advanced Micro Devices")],
                )
            })
            .await
            .expect("search resolves");

        assert_eq!(resolution.symbol.as_str(), "AMD");
        assert_eq!(resolution.source, ResolutionSource::Search);
        assert_eq!(resolution.name.as_deref(), Some("Advanced Micro Devices"));
    }

    #[tokio::test]
    async fn first_hit_when_no_exact_match() {
        let resolver = TickerResolver::default();
        let resolution = resolver
            .resolve("coupang", |req| async move {
                batch(&req.query, vec![instrument("CPNG", "Coupang, Inc.")])
            })
            .await
            .expect("search resolves");
        assert_eq!(resolution.symbol.as_str(), "CPNG");
    }

    #[tokio::test]
    async fn search_failure_falls_back_to_literal() {
        let resolver = TickerResolver::default();
        let resolution = resolver
            .resolve("brk-b", |_| async { Err(SourceError::rate_limited("slow down")) })
            .await
            .expect("literal resolves");
        assert_eq!(resolution.symbol.as_str(), "BRK-B");
        assert_eq!(resolution.source, ResolutionSource::Literal);
    }

    #[tokio::test]
    async fn unresolvable_name_is_a_validation_error() {
        let resolver = TickerResolver::default();
        let error = resolver
            .resolve("없는회사", |req| async move { batch(&req.query, Vec::new()) })
            .await
            .expect_err("not a ticker");
        assert!(matches!(error, ValidationError::SymbolInvalidStart { .. }));
    }

    #[test]
    fn configured_aliases_override_builtins() {
        let resolver = TickerResolver::default()
            .with_aliases([("삼성", "005935.KS")])
            .expect("valid alias");
        assert_eq!(
            resolver.lookup_alias("삼성").map(Symbol::as_str),
            Some("005935.KS")
        );
        assert!(TickerResolver::default().with_aliases([("bad", "$$")]).is_err());
    }

    #[test]
    fn new_aliases_grow_the_table_and_overrides_do_not() {
        let builtin = TickerResolver::default().alias_count();
        assert!(builtin > 0);

        let resolver = TickerResolver::default()
            .with_aliases([("코인베이스", "COIN"), ("삼성", "005935.KS")])
            .expect("valid aliases");
        assert_eq!(resolver.alias_count(), builtin + 1);
        assert_eq!(resolver.lookup_alias("코인 베이스").map(Symbol::as_str), Some("COIN"));
    }
}
