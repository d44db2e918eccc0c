// src/connectors/okx.rs
use crate::connectors::traits::ExchangeGateway;
use crate::types::{Balances, OrderResponse, Side, TradingPair};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// OKX accepts at most this many decimals for a quote-sized market order.
const NOTIONAL_DP: u32 = 8;

/// Authenticated-session secrets. Constructed once at startup and moved into the client.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    secret_key: String,
    passphrase: String,
}

impl Credentials {
    pub fn new(api_key: String, secret_key: String, passphrase: String) -> Self {
        Self {
            api_key,
            secret_key,
            passphrase,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

pub struct OkxClient {
    credentials: Credentials,
    http_client: Client,
    base_rest_url: String,
    simulated: bool,
}

// --- Wire types (REST v5) ---

#[derive(Debug, Deserialize)]
struct Envelope {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkPrice {
    mark_px: String,
}

#[derive(Debug, Deserialize)]
struct MarketTicker {
    last: String,
}

#[derive(Debug, Deserialize)]
struct AccountBalance {
    #[serde(default)]
    details: Vec<BalanceDetail>,
}

#[derive(Debug, Deserialize)]
struct BalanceDetail {
    ccy: String,
    eq: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingOrder {
    ord_id: String,
    inst_id: String,
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderAck {
    #[serde(default)]
    ord_id: String,
    #[serde(default)]
    s_code: String,
    #[serde(default)]
    s_msg: String,
}

impl OkxClient {
    pub fn new(credentials: Credentials, base_rest_url: impl Into<String>, simulated: bool) -> Self {
        Self {
            credentials,
            http_client: Client::new(),
            base_rest_url: base_rest_url.into().trim_end_matches('/').to_string(),
            simulated,
        }
    }

    /// `BTC/USDT` -> `BTC-USDT`
    fn inst_id(pair: &TradingPair) -> String {
        format!("{}-{}", pair.base, pair.quote)
    }

    fn request_path(endpoint: &str, params: &[(&str, String)]) -> Result<String> {
        if params.is_empty() {
            return Ok(endpoint.to_string());
        }
        let query = serde_urlencoded::to_string(params)?;
        Ok(format!("{}?{}", endpoint, query))
    }

    fn sign(&self, timestamp: &str, method: &Method, request_path: &str, body: &str) -> Result<String> {
        let prehash = format!("{}{}{}{}", timestamp, method.as_str(), request_path, body);

        let mut mac = HmacSha256::new_from_slice(self.credentials.secret_key.as_bytes())
            .context("Invalid secret key length")?;
        mac.update(prehash.as_bytes());
        let result = mac.finalize();

        Ok(base64::engine::general_purpose::STANDARD.encode(result.into_bytes()))
    }

    async fn send_public_request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<Vec<T>> {
        let path = Self::request_path(endpoint, &params)?;
        let url = format!("{}{}", self.base_rest_url, path);

        let mut request = self.http_client.get(&url);
        if self.simulated {
            request = request.header("x-simulated-trading", "1");
        }

        let response = request.send().await.with_context(|| format!("GET {}", path))?;
        let text = response.text().await?;
        decode_envelope(&text, &path)
    }

    async fn send_signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(&str, String)>,
        body: Option<serde_json::Value>,
    ) -> Result<Vec<T>> {
        let path = Self::request_path(endpoint, &params)?;
        let body = match body {
            Some(value) => serde_json::to_string(&value)?,
            None => String::new(),
        };
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let signature = self.sign(&timestamp, &method, &path, &body)?;
        let url = format!("{}{}", self.base_rest_url, path);

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .header("OK-ACCESS-KEY", &self.credentials.api_key)
            .header("OK-ACCESS-SIGN", signature)
            .header("OK-ACCESS-TIMESTAMP", timestamp)
            .header("OK-ACCESS-PASSPHRASE", &self.credentials.passphrase)
            .header("Content-Type", "application/json");
        if self.simulated {
            request = request.header("x-simulated-trading", "1");
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{} {}", method, path))?;
        let text = response.text().await?;
        decode_envelope(&text, &path)
    }

    /// Spot market order sized in quote currency (`tgtCcy=quote_ccy`), for both sides.
    fn market_order_body(
        pair: &TradingPair,
        side: Side,
        quote_notional: Decimal,
        client_order_id: &str,
    ) -> Result<serde_json::Value> {
        Ok(json!({
            "instId": Self::inst_id(pair),
            "tdMode": "cash",
            "side": side.to_string(),
            "ordType": "market",
            "sz": format_notional(quote_notional)?,
            "tgtCcy": "quote_ccy",
            "clOrdId": client_order_id,
        }))
    }

    async fn submit_market_order(
        &self,
        pair: &TradingPair,
        side: Side,
        quote_notional: Decimal,
    ) -> Result<OrderResponse> {
        let client_order_id = Uuid::new_v4().simple().to_string();
        let body = Self::market_order_body(pair, side, quote_notional, &client_order_id)?;

        info!(%side, pair = %pair, notional = %quote_notional, "Sending market order");

        let acks: Vec<OrderAck> = self
            .send_signed_request(Method::POST, "/api/v5/trade/order", vec![], Some(body))
            .await?;
        let ack = first(acks, "/api/v5/trade/order")?;
        if ack.s_code != "0" {
            bail!("order rejected: sCode {}: {}", ack.s_code, ack.s_msg);
        }

        Ok(OrderResponse {
            id: ack.ord_id,
            symbol: pair.symbol(),
            status: "submitted".to_string(),
        })
    }
}

/// Unwraps the `{code, msg, data}` envelope every v5 endpoint returns.
fn decode_envelope<T: DeserializeOwned>(text: &str, path: &str) -> Result<Vec<T>> {
    let envelope: Envelope = serde_json::from_str(text)
        .with_context(|| format!("{}: unexpected response body: {}", path, text))?;

    if envelope.code != "0" {
        // Batch-style endpoints carry the real reason per item.
        let detail = envelope
            .data
            .first()
            .and_then(|d| d.get("sMsg"))
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(|m| format!(" ({})", m))
            .unwrap_or_default();
        bail!(
            "{}: OKX error code {}: {}{}",
            path,
            envelope.code,
            envelope.msg,
            detail
        );
    }

    envelope
        .data
        .into_iter()
        .map(|item| serde_json::from_value(item).with_context(|| format!("{}: bad data item", path)))
        .collect()
}

fn first<T>(items: Vec<T>, path: &str) -> Result<T> {
    items
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("{}: empty data", path))
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value).with_context(|| format!("invalid {} '{}'", field, value))
}

fn format_notional(quote_notional: Decimal) -> Result<String> {
    let sz = quote_notional
        .round_dp_with_strategy(NOTIONAL_DP, RoundingStrategy::ToZero)
        .normalize();
    if sz <= Decimal::ZERO {
        bail!("order notional {} rounds to zero", quote_notional);
    }
    Ok(sz.to_string())
}

fn balances_from(accounts: Vec<AccountBalance>) -> Result<Balances> {
    let mut balances = Balances::new();
    for detail in accounts.into_iter().flat_map(|a| a.details) {
        let total = parse_decimal("eq", &detail.eq)?;
        balances.insert(detail.ccy, total);
    }
    Ok(balances)
}

#[async_trait]
impl ExchangeGateway for OkxClient {
    async fn fetch_mark_price(&self, pair: &TradingPair) -> Result<Decimal> {
        let path = "/api/v5/public/mark-price";
        let prices: Vec<MarkPrice> = self
            .send_public_request(
                path,
                vec![
                    ("instType", "MARGIN".to_string()),
                    ("instId", Self::inst_id(pair)),
                ],
            )
            .await?;
        parse_decimal("markPx", &first(prices, path)?.mark_px)
    }

    async fn fetch_last_price(&self, pair: &TradingPair) -> Result<Decimal> {
        let path = "/api/v5/market/ticker";
        let tickers: Vec<MarketTicker> = self
            .send_public_request(path, vec![("instId", Self::inst_id(pair))])
            .await?;
        parse_decimal("last", &first(tickers, path)?.last)
    }

    async fn fetch_balances(&self) -> Result<Balances> {
        let accounts: Vec<AccountBalance> = self
            .send_signed_request(Method::GET, "/api/v5/account/balance", vec![], None)
            .await?;
        balances_from(accounts)
    }

    async fn fetch_open_orders(&self, pair: &TradingPair) -> Result<Vec<OrderResponse>> {
        let pending: Vec<PendingOrder> = self
            .send_signed_request(
                Method::GET,
                "/api/v5/trade/orders-pending",
                vec![
                    ("instType", "SPOT".to_string()),
                    ("instId", Self::inst_id(pair)),
                ],
                None,
            )
            .await?;

        debug!(count = pending.len(), pair = %pair, "Fetched open orders");

        Ok(pending
            .into_iter()
            .map(|o| OrderResponse {
                id: o.ord_id,
                symbol: o.inst_id,
                status: o.state,
            })
            .collect())
    }

    async fn submit_market_sell_by_notional(
        &self,
        pair: &TradingPair,
        quote_notional: Decimal,
    ) -> Result<OrderResponse> {
        self.submit_market_order(pair, Side::Sell, quote_notional)
            .await
    }

    async fn submit_market_buy_by_notional(
        &self,
        pair: &TradingPair,
        quote_notional: Decimal,
    ) -> Result<OrderResponse> {
        self.submit_market_order(pair, Side::Buy, quote_notional)
            .await
    }

    async fn cancel_order(&self, order_id: &str, pair: &TradingPair) -> Result<()> {
        let path = "/api/v5/trade/cancel-order";
        let body = json!({
            "instId": Self::inst_id(pair),
            "ordId": order_id,
        });
        let acks: Vec<OrderAck> = self
            .send_signed_request(Method::POST, path, vec![], Some(body))
            .await?;
        let ack = first(acks, path)?;
        if ack.s_code != "0" {
            bail!("cancel {} rejected: sCode {}: {}", order_id, ack.s_code, ack.s_msg);
        }
        Ok(())
    }
}
