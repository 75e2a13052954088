//! JSON-RPC Ledger Adapter
//!
//! Implements the `LedgerClient` port against an EVM JSON-RPC endpoint
//! (`eth_blockNumber`, `eth_getBlockByNumber`, `eth_getLogs`, `eth_call`).

use crate::domain::{keccak256, Address, EntityCounters, EventKind, RawLog, RetrievalError};
use crate::ports::outbound::LedgerClient;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use primitive_types::{H256, U256};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// JSON-RPC request envelope.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Log filter for `eth_getLogs`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogFilter {
    from_block: String,
    to_block: String,
    address: String,
    topics: Vec<String>,
}

/// Log entry as returned by `eth_getLogs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    topics: Vec<String>,
    data: String,
    block_number: String,
    transaction_hash: String,
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct CallRequest {
    to: String,
    data: String,
}

/// HTTP JSON-RPC connection to the ledger, scoped to one contract.
pub struct JsonRpcLedgerClient {
    client: Client,
    url: String,
    contract: Address,
    request_id: AtomicU64,
}

impl JsonRpcLedgerClient {
    /// Create a client for `contract` at `url`.
    pub fn new(
        url: impl Into<String>,
        contract: Address,
        timeout: Duration,
    ) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RetrievalError::Network(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            contract,
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn call<P: Serialize + Send, R: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RetrievalError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RetrievalError::Network(format!("{} {}: {}", method, self.url, e)))?
            .error_for_status()
            .map_err(|e| RetrievalError::Network(format!("{}: {}", method, e)))?;

        let body: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RetrievalError::Decode(format!("{} response: {}", method, e)))?;

        if let Some(error) = body.error {
            return Err(RetrievalError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        body.result
            .ok_or_else(|| RetrievalError::Decode(format!("{}: missing result", method)))
    }

    async fn read_counter(&self, signature: &str) -> Result<u64, RetrievalError> {
        let hash = keccak256(signature.as_bytes());
        let request = CallRequest {
            to: self.contract.to_lower_hex(),
            data: format!("0x{}", hex::encode(&hash[..4])),
        };
        let result: String = self.call("eth_call", (request, "latest")).await?;
        let bytes = decode_hex(&result)?;
        if bytes.len() < 32 {
            return Err(RetrievalError::Decode(format!(
                "{} returned {} bytes",
                signature,
                bytes.len()
            )));
        }
        let value = U256::from_big_endian(&bytes[..32]);
        if value > U256::from(u64::MAX) {
            return Err(RetrievalError::Decode(format!("{} overflows u64", signature)));
        }
        Ok(value.as_u64())
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedgerClient {
    async fn current_height(&self) -> Result<u64, RetrievalError> {
        let height: String = self.call("eth_blockNumber", [(); 0]).await?;
        parse_quantity(&height)
    }

    async fn block_timestamp(&self, height: u64) -> Result<DateTime<Utc>, RetrievalError> {
        let block: RpcBlock = self
            .call("eth_getBlockByNumber", (format!("{:#x}", height), false))
            .await?;
        let secs = parse_quantity(&block.timestamp)?;
        i64::try_from(secs)
            .ok()
            .and_then(|s| Utc.timestamp_opt(s, 0).single())
            .ok_or_else(|| RetrievalError::Decode(format!("block {} timestamp {}", height, secs)))
    }

    async fn query_logs(
        &self,
        kind: EventKind,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, RetrievalError> {
        debug!("[sync] eth_getLogs {} [{}, {}] via {}", kind, from, to, self.url);

        let filter = LogFilter {
            from_block: format!("{:#x}", from),
            to_block: format!("{:#x}", to),
            address: self.contract.to_lower_hex(),
            topics: vec![format!("0x{}", hex::encode(kind.topic0().as_bytes()))],
        };
        let logs: Vec<RpcLog> = self.call("eth_getLogs", [filter]).await?;

        logs.into_iter().map(convert_log).collect()
    }

    async fn entity_counters(&self) -> Result<Option<EntityCounters>, RetrievalError> {
        let topics = self.read_counter("getTopicIdCounter()").await?;
        let replies = self.read_counter("getReplyIdCounter()").await?;
        Ok(Some(EntityCounters { topics, replies }))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

fn convert_log(log: RpcLog) -> Result<RawLog, RetrievalError> {
    let topics = log
        .topics
        .iter()
        .map(|t| parse_h256(t))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawLog {
        topics,
        data: decode_hex(&log.data)?,
        block_number: parse_quantity(&log.block_number)?,
        transaction_hash: parse_h256(&log.transaction_hash)?,
    })
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(value: &str) -> Result<u64, RetrievalError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| RetrievalError::Decode(format!("quantity without 0x prefix: {}", value)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| RetrievalError::Decode(format!("bad quantity {}: {}", value, e)))
}

fn decode_hex(value: &str) -> Result<Vec<u8>, RetrievalError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| RetrievalError::Decode(format!("bad hex data: {}", e)))
}

fn parse_h256(value: &str) -> Result<H256, RetrievalError> {
    let bytes = decode_hex(value)?;
    if bytes.len() != 32 {
        return Err(RetrievalError::Decode(format!(
            "expected 32-byte hash, got {} bytes",
            bytes.len()
        )));
    }
    Ok(H256::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x1907c6e4").unwrap(), 419_940_068);
        assert!(parse_quantity("1234").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_convert_log() {
        let topic0 = format!("0x{}", hex::encode(EventKind::TopicCreated.topic0().as_bytes()));
        let log = RpcLog {
            topics: vec![topic0, format!("0x{:064x}", 1), format!("0x{:064x}", 2)],
            data: "0x".to_string(),
            block_number: "0x10".to_string(),
            transaction_hash: format!("0x{}", "cd".repeat(32)),
        };
        let raw = convert_log(log).unwrap();
        assert_eq!(raw.topics.len(), 3);
        assert_eq!(raw.topics[0], EventKind::TopicCreated.topic0());
        assert_eq!(raw.block_number, 16);
        assert!(raw.data.is_empty());
    }

    #[test]
    fn test_convert_log_bad_hash() {
        let log = RpcLog {
            topics: vec!["0x01".to_string()],
            data: "0x".to_string(),
            block_number: "0x1".to_string(),
            transaction_hash: "0x00".to_string(),
        };
        assert!(matches!(convert_log(log), Err(RetrievalError::Decode(_))));
    }

    #[test]
    fn test_filter_serialization() {
        let filter = LogFilter {
            from_block: format!("{:#x}", 100u64),
            to_block: format!("{:#x}", 3699u64),
            address: "0xb9a8a83c8e599e19ad2e3e1c66721a63d2076380".to_string(),
            topics: vec!["0xabc".to_string()],
        };
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["fromBlock"], "0x64");
        assert_eq!(json["toBlock"], "0xe73");
        assert_eq!(json["topics"][0], "0xabc");
    }

    #[test]
    fn test_rpc_error_response_parses() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32005,"message":"limit exceeded"}}"#;
        let parsed: JsonRpcResponse<String> = serde_json::from_str(body).unwrap();
        assert!(parsed.result.is_none());
        assert_eq!(parsed.error.unwrap().code, -32005);
    }

    use crate::algorithms::{decode_topic, encode_body, u64_word};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Serve canned JSON-RPC results keyed by method; unknown methods get an
    /// error object. Returns the endpoint URL.
    async fn serve_canned(results: HashMap<&'static str, Value>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let results = results.clone();
                tokio::spawn(answer(stream, results));
            }
        });
        url
    }

    async fn answer(mut stream: TcpStream, results: HashMap<&'static str, Value>) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let length: usize = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse().unwrap())
            .unwrap_or(0);
        while buf.len() < header_end + length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let request: Value = serde_json::from_slice(&buf[header_end..header_end + length]).unwrap();
        let method = request["method"].as_str().unwrap();
        let body = match results.get(method) {
            Some(result) => json!({"jsonrpc": "2.0", "id": request["id"], "result": result}),
            None => json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": {"code": -32601, "message": "method not found"}
            }),
        }
        .to_string();

        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
    }

    fn hex_word(value: u64) -> String {
        format!("0x{}", hex::encode(u64_word(value)))
    }

    #[tokio::test]
    async fn test_client_against_canned_responses() {
        let log = json!({
            "address": "0xb9a8a83c8e599e19ad2e3e1c66721a63d2076380",
            "topics": [
                format!("0x{}", hex::encode(EventKind::TopicCreated.topic0().as_bytes())),
                hex_word(7),
                hex_word(0xa1),
            ],
            "data": format!("0x{}", hex::encode(encode_body(1_700_000_123, "hello"))),
            "blockNumber": "0x96",
            "transactionHash": hex_word(0xbeef),
            "logIndex": "0x0",
            "removed": false
        });
        let results = HashMap::from([
            ("eth_blockNumber", json!("0x1bee")),
            ("eth_getBlockByNumber", json!({"number": "0x96", "timestamp": "0x6553f100"})),
            ("eth_getLogs", json!([log])),
            ("eth_call", json!(hex_word(5))),
        ]);
        let url = serve_canned(results).await;
        let client =
            JsonRpcLedgerClient::new(url, Address::default(), Duration::from_secs(5)).unwrap();

        assert_eq!(client.current_height().await.unwrap(), 7150);

        let ts = client.block_timestamp(150).await.unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);

        let logs = client
            .query_logs(EventKind::TopicCreated, 100, 3699)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].block_number, 150);
        let topic = decode_topic(&logs[0]).unwrap();
        assert_eq!(topic.topic_id, 7);
        assert_eq!(topic.timestamp, 1_700_000_123);
        assert_eq!(topic.content, "hello");

        let counters = client.entity_counters().await.unwrap().unwrap();
        assert_eq!(counters, EntityCounters { topics: 5, replies: 5 });
    }

    #[tokio::test]
    async fn test_rpc_error_object_surfaces() {
        let url = serve_canned(HashMap::new()).await;
        let client =
            JsonRpcLedgerClient::new(url, Address::default(), Duration::from_secs(5)).unwrap();
        let result = client.query_logs(EventKind::ReplyCreated, 1, 2).await;
        assert!(matches!(result, Err(RetrievalError::Rpc { code: -32601, .. })));
    }

    #[tokio::test]
    async fn test_null_block_is_decode_error() {
        let url = serve_canned(HashMap::from([("eth_getBlockByNumber", Value::Null)])).await;
        let client =
            JsonRpcLedgerClient::new(url, Address::default(), Duration::from_secs(5)).unwrap();
        let result = client.block_timestamp(1).await;
        assert!(matches!(result, Err(RetrievalError::Decode(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let client = JsonRpcLedgerClient::new(
            "http://127.0.0.1:9",
            Address::default(),
            Duration::from_millis(500),
        )
        .unwrap();
        let result = client.current_height().await;
        assert!(matches!(result, Err(RetrievalError::Network(_))));
    }
}
