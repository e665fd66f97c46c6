//! Contract view client
//!
//! Read-only queries against the node's `/view` endpoint. One round issues
//! the price and supply queries concurrently and combines them into an
//! [`Observation`]. No retries happen here; the caller decides what a failed
//! round means.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{Config, ContractConfig};
use crate::errors::ViewError;
use crate::metrics::Timer;
use crate::quote::Observation;

/// Body posted to `<node>/view`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ViewRequest {
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
}

impl ViewRequest {
    pub fn new(function: &str, args: Vec<Value>) -> Self {
        Self {
            function: function.to_string(),
            type_arguments: Vec::new(),
            arguments: args,
        }
    }
}

/// Read-only contract query capability
#[async_trait]
pub trait ViewClient: Send + Sync {
    /// Run a view function and return the node's raw value list
    async fn query_view(&self, function: &str, args: Vec<Value>) -> Result<Vec<Value>, ViewError>;
}

/// [`ViewClient`] over the node's REST API
#[derive(Debug, Clone)]
pub struct HttpViewClient {
    http: reqwest::Client,
    view_url: String,
}

impl HttpViewClient {
    pub fn new(node_url: &str, timeout: Duration) -> Result<Self, ViewError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ViewError::Transport {
                function: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            view_url: format!("{}/view", node_url.trim_end_matches('/')),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ViewError> {
        Self::new(&config.node.url, Duration::from_secs(config.node.timeout_secs))
    }

    pub fn view_url(&self) -> &str {
        &self.view_url
    }
}

#[async_trait]
impl ViewClient for HttpViewClient {
    async fn query_view(&self, function: &str, args: Vec<Value>) -> Result<Vec<Value>, ViewError> {
        let body = ViewRequest::new(function, args);
        debug!(function = %function, url = %self.view_url, "Issuing view query");

        let response = self
            .http
            .post(&self.view_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ViewError::Transport {
                function: function.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ViewError::Network {
                status: status.as_u16(),
                function: function.to_string(),
            });
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| ViewError::Decode {
                function: function.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Read the first returned value as a finite, non-negative number.
///
/// Nodes serialize `u64`/`u128` results as JSON strings, so both strings and
/// numbers are accepted.
pub fn first_number(function: &str, values: &[Value]) -> Result<f64, ViewError> {
    let decode_err = |reason: String| ViewError::Decode {
        function: function.to_string(),
        reason,
    };

    let first = values
        .first()
        .ok_or_else(|| decode_err("empty result list".to_string()))?;

    let number = match first {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| decode_err(format!("not a number: {}", first)))?;

    if !number.is_finite() || number < 0.0 {
        return Err(decode_err(format!("out of range: {}", number)));
    }
    Ok(number)
}

/// One view round: price and supply for the configured token, fetched
/// concurrently. Either query failing fails the round.
pub async fn fetch_round<V>(client: &V, contract: &ContractConfig) -> Result<Observation, ViewError>
where
    V: ViewClient + ?Sized,
{
    let timer = Timer::new();
    let price_fn = contract.price_function();
    let supply_fn = contract.supply_function();
    let args = || {
        vec![
            Value::String(contract.address.clone()),
            Value::String(contract.token_symbol.clone()),
        ]
    };

    let (price_values, supply_values) = futures::try_join!(
        client.query_view(&price_fn, args()),
        client.query_view(&supply_fn, args()),
    )?;

    let base_price = first_number(&price_fn, &price_values)?;
    let supply = first_number(&supply_fn, &supply_values)?;
    if supply.fract() != 0.0 || supply > u64::MAX as f64 {
        return Err(ViewError::Decode {
            function: supply_fn,
            reason: format!("supply is not an integer: {}", supply),
        });
    }

    timer.observe_duration(&crate::metrics::metrics().view_round_latency);
    Ok(Observation::new(base_price, supply as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_request_wire_format() {
        let req = ViewRequest::new(
            "0x1::BondingCurve::get_token_price",
            vec![json!("0x1"), json!("PROMPT")],
        );
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body,
            json!({
                "function": "0x1::BondingCurve::get_token_price",
                "type_arguments": [],
                "arguments": ["0x1", "PROMPT"],
            })
        );
    }

    #[test]
    fn test_first_number_accepts_string_and_number() {
        assert_eq!(first_number("f", &[json!("42")]).unwrap(), 42.0);
        assert_eq!(first_number("f", &[json!(7)]).unwrap(), 7.0);
        assert_eq!(first_number("f", &[json!("1.5"), json!("ignored")]).unwrap(), 1.5);
    }

    #[test]
    fn test_first_number_rejects_garbage() {
        assert!(matches!(first_number("f", &[]), Err(ViewError::Decode { .. })));
        assert!(matches!(first_number("f", &[json!("abc")]), Err(ViewError::Decode { .. })));
        assert!(matches!(first_number("f", &[json!(null)]), Err(ViewError::Decode { .. })));
        assert!(matches!(first_number("f", &[json!(-1)]), Err(ViewError::Decode { .. })));
    }

    /// Answers from a fixed table keyed by function name
    struct TableViewClient {
        price: Result<Vec<Value>, ViewError>,
        supply: Result<Vec<Value>, ViewError>,
        seen: Mutex<Vec<ViewRequest>>,
    }

    #[async_trait]
    impl ViewClient for TableViewClient {
        async fn query_view(&self, function: &str, args: Vec<Value>) -> Result<Vec<Value>, ViewError> {
            self.seen.lock().unwrap().push(ViewRequest::new(function, args));
            if function.ends_with("get_token_price") {
                self.price.clone()
            } else {
                self.supply.clone()
            }
        }
    }

    fn contract() -> ContractConfig {
        ContractConfig {
            address: "0xfeed".to_string(),
            ..ContractConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_round_combines_both_queries() {
        let client = TableViewClient {
            price: Ok(vec![json!("10")]),
            supply: Ok(vec![json!("100")]),
            seen: Mutex::new(Vec::new()),
        };

        let obs = fetch_round(&client, &contract()).await.unwrap();
        assert_eq!(obs.base_price, 10.0);
        assert_eq!(obs.supply, 100);

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|r| r.arguments == vec![json!("0xfeed"), json!("PROMPT")]));
    }

    #[tokio::test]
    async fn test_fetch_round_fails_if_either_query_fails() {
        let client = TableViewClient {
            price: Ok(vec![json!("10")]),
            supply: Err(ViewError::Network {
                status: 500,
                function: "0xfeed::BondingCurve::get_token_supply".to_string(),
            }),
            seen: Mutex::new(Vec::new()),
        };

        let err = fetch_round(&client, &contract()).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_fetch_round_rejects_fractional_supply() {
        let client = TableViewClient {
            price: Ok(vec![json!("10")]),
            supply: Ok(vec![json!("2.5")]),
            seen: Mutex::new(Vec::new()),
        };

        assert!(matches!(
            fetch_round(&client, &contract()).await,
            Err(ViewError::Decode { .. })
        ));
    }

    #[test]
    fn test_view_url_trailing_slash() {
        let client = HttpViewClient::new("http://node/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.view_url(), "http://node/v1/view");
    }
}
