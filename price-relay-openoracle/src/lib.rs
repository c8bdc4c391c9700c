use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ethers::{
    abi::{encode, Token},
    signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer},
    types::{Signature, U256},
    utils::keccak256,
};
use price_relay_core::{
    submitter::Submitter,
    types::{OraclePriceUpdate, UnixTimestamp},
};
use reqwest::Url;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt::{Debug, Formatter},
    str::FromStr,
    time::Duration,
};
use tracing::{debug, error, info, instrument};

// Constants
const SUBMIT_PATH: &str = "oracle/submit";
const OPEN_ORACLE_SOURCE: &str = "ORACLE_SOURCE_OPEN_ORACLE";
const PRICES_KIND: &str = "prices";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// --- Open Oracle Data Structures ---

/// Signed price report in the Open Oracle format.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OpenOracleResponse {
    pub timestamp: String,
    /// ABI-encoded `(string kind, uint64 timestamp, string key, uint256 value)`, hex.
    pub messages: Vec<String>,
    /// Ethereum personal-message signatures over `keccak256(message)`, hex.
    pub signatures: Vec<String>,
    pub prices: BTreeMap<String, String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SubmissionEnvelope {
    pub_key: String,
    oracle_data_submission: OracleDataSubmission,
    signature: String,
}

#[derive(Serialize, Debug)]
struct OracleDataSubmission {
    source: &'static str,
    /// Base64 of the JSON-serialized [`OpenOracleResponse`].
    payload: String,
}

// --- OpenOracleSubmitter Implementation ---

/// Submits prices to the oracle network node as signed Open Oracle data.
pub struct OpenOracleSubmitter {
    http: reqwest::Client,
    submit_url: Url,
    /// Signs the envelope; derived from the wallet mnemonic.
    wallet: LocalWallet,
    /// Signs the individual price messages.
    oracle_signer: LocalWallet,
}

impl Debug for OpenOracleSubmitter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenOracleSubmitter")
            .field("submit_url", &self.submit_url.as_str())
            .field("wallet", &self.wallet.address()) // Show only addresses
            .field("oracle_signer", &self.oracle_signer.address())
            .finish()
    }
}

impl OpenOracleSubmitter {
    /// Creates a new OpenOracleSubmitter.
    ///
    /// `node_addr` may omit the scheme, in which case plain HTTP is assumed.
    pub fn new(node_addr: &str, wallet_mnemonic: &str, ethereum_private_key: &str) -> Result<Self> {
        let submit_url = submit_url(node_addr)?;

        let wallet = MnemonicBuilder::<English>::default()
            .phrase(wallet_mnemonic.trim())
            .build()
            .map_err(|e| anyhow!("Failed to derive wallet from mnemonic: {}", e))?;

        let key = ethereum_private_key.trim();
        let key = key
            .strip_prefix("0x")
            .or_else(|| key.strip_prefix("0X"))
            .unwrap_or(key);
        let oracle_signer = LocalWallet::from_str(key)
            .map_err(|e| anyhow!("Invalid ethereum private key: {}", e))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        info!(
            wallet = ?wallet.address(),
            oracle_signer = ?oracle_signer.address(),
            url = %submit_url,
            "Initialized Open Oracle submitter"
        );

        Ok(Self {
            http,
            submit_url,
            wallet,
            oracle_signer,
        })
    }

    /// Builds and signs the Open Oracle report for `updates`.
    pub async fn build_response(
        &self,
        timestamp: UnixTimestamp,
        updates: &[OraclePriceUpdate],
    ) -> Result<OpenOracleResponse> {
        let mut messages = Vec::with_capacity(updates.len());
        let mut signatures = Vec::with_capacity(updates.len());
        let mut prices = BTreeMap::new();

        for update in updates {
            let message = encode_message(update)?;
            let signature = self
                .oracle_signer
                .sign_message(keccak256(&message))
                .await
                .with_context(|| format!("Failed to sign price message for {}", update.asset))?;

            messages.push(to_hex(&message));
            signatures.push(signature_hex(&signature));
            prices.insert(update.asset.clone(), update.price.clone());
        }

        Ok(OpenOracleResponse {
            timestamp: timestamp.to_string(),
            messages,
            signatures,
            prices,
        })
    }

    async fn build_envelope(&self, response: &OpenOracleResponse) -> Result<SubmissionEnvelope> {
        let payload = serde_json::to_vec(response).context("Failed to serialize oracle payload")?;
        let signature = self
            .wallet
            .sign_message(&payload)
            .await
            .context("Failed to sign oracle submission")?;

        Ok(SubmissionEnvelope {
            pub_key: to_hex(self.wallet.address().as_bytes()),
            oracle_data_submission: OracleDataSubmission {
                source: OPEN_ORACLE_SOURCE,
                payload: BASE64.encode(&payload),
            },
            signature: signature_hex(&signature),
        })
    }
}

// --- Submitter Trait Implementation ---

#[async_trait]
impl Submitter for OpenOracleSubmitter {
    #[instrument(skip(self, updates), level = "info", fields(count = updates.len()))]
    async fn send(&self, timestamp: UnixTimestamp, updates: &[OraclePriceUpdate]) -> Result<()> {
        if updates.is_empty() {
            info!("No price updates provided, skipping.");
            return Ok(());
        }

        let response = self.build_response(timestamp, updates).await?;
        let envelope = self.build_envelope(&response).await?;

        debug!(url = %self.submit_url, "Submitting signed oracle data to node");
        let reply = self
            .http
            .post(self.submit_url.clone())
            .json(&envelope)
            .send()
            .await
            .context("Failed to reach oracle node")?;

        let status = reply.status();
        if !status.is_success() {
            let body = reply.text().await.unwrap_or_default();
            error!(%status, %body, "Oracle node rejected submission.");
            bail!("Oracle node rejected submission (HTTP {}): {}", status, body);
        }

        info!(%status, "Oracle data submitted successfully.");
        Ok(())
    }
}

// --- Helpers ---

fn submit_url(node_addr: &str) -> Result<Url> {
    let node_addr = node_addr.trim();
    if node_addr.is_empty() {
        bail!("Missing node address");
    }
    let mut base = if node_addr.contains("://") {
        node_addr.to_string()
    } else {
        format!("http://{}", node_addr)
    };
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)
        .and_then(|url| url.join(SUBMIT_PATH))
        .with_context(|| format!("Invalid node address: {}", node_addr))
}

fn encode_message(update: &OraclePriceUpdate) -> Result<Vec<u8>> {
    let value = U256::from_dec_str(&update.price)
        .map_err(|e| anyhow!("Invalid fixed-point price {:?}: {:?}", update.price, e))?;

    Ok(encode(&[
        Token::String(PRICES_KIND.to_string()),
        Token::Uint(U256::from(update.timestamp)),
        Token::String(update.asset.clone()),
        Token::Uint(value),
    ]))
}

fn signature_hex(signature: &Signature) -> String {
    to_hex(&signature.to_vec())
}

fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::{decode, ParamType};
    use mockito::Matcher;
    use serde_json::json;

    // Well-known development mnemonic; its first account owns TEST_KEY.
    const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn create_update(asset: &str, price: &str) -> OraclePriceUpdate {
        OraclePriceUpdate {
            asset: asset.to_string(),
            price: price.to_string(),
            timestamp: 1_700_000_000,
        }
    }

    fn decode_hex(value: &str) -> Vec<u8> {
        hex::decode(value.trim_start_matches("0x")).unwrap()
    }

    #[test]
    fn test_submit_url() {
        assert_eq!(
            submit_url("localhost:3003").unwrap().as_str(),
            "http://localhost:3003/oracle/submit"
        );
        assert_eq!(
            submit_url("https://node.example.com/api").unwrap().as_str(),
            "https://node.example.com/api/oracle/submit"
        );
        assert!(submit_url("  ").is_err());
    }

    #[test]
    fn test_new_rejects_bad_keys() {
        assert!(OpenOracleSubmitter::new("localhost:3003", "not a mnemonic", TEST_KEY).is_err());
        assert!(OpenOracleSubmitter::new("localhost:3003", TEST_MNEMONIC, "0x1234").is_err());
    }

    #[tokio::test]
    async fn test_build_response_signs_each_message() {
        let submitter = OpenOracleSubmitter::new("localhost:3003", TEST_MNEMONIC, TEST_KEY).unwrap();
        let update = create_update("AAPL", "18252000000");

        let response = submitter
            .build_response(update.timestamp, &[update.clone()])
            .await
            .unwrap();

        assert_eq!(response.timestamp, "1700000000");
        assert_eq!(response.prices.get("AAPL").map(String::as_str), Some("18252000000"));
        assert_eq!(response.messages.len(), 1);

        let message = decode_hex(&response.messages[0]);
        let tokens = decode(
            &[
                ParamType::String,
                ParamType::Uint(64),
                ParamType::String,
                ParamType::Uint(256),
            ],
            &message,
        )
        .unwrap();
        assert_eq!(tokens[0], Token::String("prices".to_string()));
        assert_eq!(tokens[1], Token::Uint(U256::from(1_700_000_000u64)));
        assert_eq!(tokens[2], Token::String("AAPL".to_string()));
        assert_eq!(tokens[3], Token::Uint(U256::from(18_252_000_000u64)));

        let signature = Signature::try_from(decode_hex(&response.signatures[0]).as_slice()).unwrap();
        let signer = signature.recover(keccak256(&message).to_vec()).unwrap();
        assert_eq!(signer, submitter.oracle_signer.address());
        assert_eq!(to_hex(signer.as_bytes()), TEST_ADDRESS);
    }

    #[tokio::test]
    async fn test_build_response_rejects_non_integer_price() {
        let submitter = OpenOracleSubmitter::new("localhost:3003", TEST_MNEMONIC, TEST_KEY).unwrap();
        let result = submitter
            .build_response(1, &[create_update("AAPL", "1.5")])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_send_posts_signed_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oracle/submit")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "pubKey": TEST_ADDRESS,
                "oracleDataSubmission": { "source": "ORACLE_SOURCE_OPEN_ORACLE" }
            })))
            .with_status(200)
            .with_body(r#"{"success":true}"#)
            .expect(1)
            .create_async()
            .await;

        let submitter = OpenOracleSubmitter::new(&server.url(), TEST_MNEMONIC, TEST_KEY).unwrap();
        submitter
            .send(1_700_000_000, &[create_update("AAPL", "18252000000")])
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_surfaces_node_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oracle/submit")
            .with_status(503)
            .with_body("node is catching up")
            .create_async()
            .await;

        let submitter = OpenOracleSubmitter::new(&server.url(), TEST_MNEMONIC, TEST_KEY).unwrap();
        let err = submitter
            .send(1_700_000_000, &[create_update("AAPL", "1")])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("node is catching up"));
    }

    #[tokio::test]
    async fn test_send_without_updates_is_noop() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oracle/submit")
            .expect(0)
            .create_async()
            .await;

        let submitter = OpenOracleSubmitter::new(&server.url(), TEST_MNEMONIC, TEST_KEY).unwrap();
        submitter.send(1, &[]).await.unwrap();

        mock.assert_async().await;
    }
}
