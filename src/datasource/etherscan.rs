//! Etherscan-compatible account API client.

use super::{http, DataSourceError, LedgerDataSource};
use crate::domain::{Address, BlockNumber, RawTransferEvent, SortOrder, UnixTime};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Ledger data source backed by the Etherscan account/block API.
#[derive(Debug, Clone)]
pub struct EtherscanDataSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EtherscanDataSource {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    /// Create with the mainnet Etherscan API URL.
    pub fn mainnet(api_key: String) -> Self {
        Self::new("https://api.etherscan.io/api".to_string(), api_key)
    }

    async fn get_api(
        &self,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, DataSourceError> {
        let mut query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        query.push(("apikey", self.api_key.as_str()));
        http::get_json(&self.client, &self.base_url, &query, unwrap_envelope).await
    }
}

#[async_trait]
impl LedgerDataSource for EtherscanDataSource {
    async fn block_number_at_or_before(
        &self,
        timestamp: UnixTime,
    ) -> Result<BlockNumber, DataSourceError> {
        debug!("Resolving block at or before timestamp={}", timestamp);

        let result = self
            .get_api(&[
                ("module", "block".to_string()),
                ("action", "getblocknobytime".to_string()),
                ("timestamp", timestamp.to_string()),
                ("closest", "before".to_string()),
            ])
            .await?;

        parse_block_number(&result)
    }

    async fn transfer_events(
        &self,
        address: &Address,
        start_block: BlockNumber,
        end_block: BlockNumber,
        order: SortOrder,
    ) -> Result<Vec<RawTransferEvent>, DataSourceError> {
        debug!(
            "Fetching token transfers for address={}, start_block={}, end_block={}",
            address, start_block, end_block
        );

        let result = self
            .get_api(&[
                ("module", "account".to_string()),
                ("action", "tokentx".to_string()),
                ("address", address.to_string()),
                ("startblock", start_block.to_string()),
                ("endblock", end_block.to_string()),
                ("sort", order.as_str().to_string()),
            ])
            .await?;

        serde_json::from_value(result).map_err(|e| DataSourceError::ParseError(e.to_string()))
    }

    async fn token_balance(
        &self,
        address: &Address,
        contract: &Address,
    ) -> Result<u128, DataSourceError> {
        debug!("Fetching balance for address={}, contract={}", address, contract);

        let result = self
            .get_api(&[
                ("module", "account".to_string()),
                ("action", "tokenbalance".to_string()),
                ("contractaddress", contract.to_string()),
                ("address", address.to_string()),
                ("tag", "latest".to_string()),
            ])
            .await?;

        parse_u128_result(&result)
    }
}

/// Extract `result` from an `{status, message, result}` envelope.
///
/// A "No transactions found" answer is an empty page, not an error.
fn unwrap_envelope(body: serde_json::Value) -> Result<serde_json::Value, DataSourceError> {
    let status = body.get("status").and_then(|v| v.as_str()).unwrap_or("1");
    let message = body
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let result = body
        .get("result")
        .cloned()
        .ok_or_else(|| DataSourceError::ParseError("Missing result field".to_string()))?;

    if status == "1" {
        return Ok(result);
    }
    if message.starts_with("No transactions found") {
        return Ok(serde_json::Value::Array(Vec::new()));
    }
    let detail = result.as_str().unwrap_or(&message).to_string();
    if detail.contains("rate limit") {
        return Err(DataSourceError::RateLimited);
    }
    Err(DataSourceError::ApiError(detail))
}

fn parse_block_number(result: &serde_json::Value) -> Result<BlockNumber, DataSourceError> {
    let s = result
        .as_str()
        .ok_or_else(|| DataSourceError::ParseError("Expected block number string".to_string()))?;
    s.trim()
        .parse::<u64>()
        .map(BlockNumber::new)
        .map_err(|e| DataSourceError::ParseError(format!("Invalid block number {}: {}", s, e)))
}

fn parse_u128_result(result: &serde_json::Value) -> Result<u128, DataSourceError> {
    let s = result
        .as_str()
        .ok_or_else(|| DataSourceError::ParseError("Expected integer string".to_string()))?;
    s.trim()
        .parse::<u128>()
        .map_err(|e| DataSourceError::ParseError(format!("Invalid balance {}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_ok_returns_result() {
        let body = json!({"status": "1", "message": "OK", "result": "12712551"});
        let result = unwrap_envelope(body).unwrap();
        assert_eq!(parse_block_number(&result).unwrap(), BlockNumber::new(12_712_551));
    }

    #[test]
    fn test_envelope_no_transactions_is_empty_page() {
        let body = json!({"status": "0", "message": "No transactions found", "result": []});
        let result = unwrap_envelope(body).unwrap();
        let page: Vec<RawTransferEvent> = serde_json::from_value(result).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_envelope_rate_limit() {
        let body = json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Max rate limit reached, please use API Key for higher rate limit"
        });
        assert!(matches!(unwrap_envelope(body), Err(DataSourceError::RateLimited)));
    }

    #[test]
    fn test_envelope_api_error() {
        let body = json!({"status": "0", "message": "NOTOK", "result": "Invalid API Key"});
        match unwrap_envelope(body) {
            Err(DataSourceError::ApiError(msg)) => assert_eq!(msg, "Invalid API Key"),
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[test]
    fn test_transfer_page_parses() {
        let body = json!({"status": "1", "message": "OK", "result": [{
            "blockNumber": "15000000",
            "timeStamp": "1656000000",
            "hash": "0xabc",
            "from": "0x1",
            "to": "0x2",
            "value": "1000",
            "contractAddress": "0xc",
            "tokenName": "Uniswap",
            "tokenSymbol": "UNI",
            "tokenDecimal": "18",
            "confirmations": "10"
        }]});
        let page: Vec<RawTransferEvent> = serde_json::from_value(unwrap_envelope(body).unwrap()).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].block(), Some(BlockNumber::new(15_000_000)));
        assert_eq!(page[0].token_symbol.as_deref(), Some("UNI"));
    }

    #[test]
    fn test_balance_parses_large_integers() {
        let result = json!("1000000000000000000000000000000");
        assert_eq!(parse_u128_result(&result).unwrap(), 10u128.pow(30));
        assert!(parse_u128_result(&json!(5)).is_err());
    }
}
