//! `alloy` implementation of [`Ledger`] against the InsuranceHub contract.

use super::types::{FlightUpdate, LedgerEffect, PurchaseEntry, PurchasedPolicy, UpdateReceipt};
use super::{Ledger, LedgerError, with_deadline};
use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::Log;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use skyoracle_sdk::objects::{FlightId, FlightKey, FlightStatus};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

sol! {
    #[sol(rpc)]
    contract InsuranceHub {
        struct FlightData {
            bytes32 flightId;
            string flightNumber;
            uint64 arrivalTimestamp;
            uint32 delayInMinutes;
            uint16 reasonCode;
            uint8 status;
            uint64 updatedAt;
        }

        event PolicyPurchased(
            uint256 indexed policyId,
            address indexed holder,
            uint32 indexed productId,
            bytes32 flightId,
            string flightNumber,
            uint64 arrivalTimestamp,
            uint256 premiumWei,
            uint256 maxPayoutWei,
            uint64 coverageEnd
        );

        event PolicySettled(
            uint256 indexed policyId,
            address indexed holder,
            uint256 payoutWei,
            bytes32 flightId
        );

        event FlightStatusUpdated(
            bytes32 indexed flightId,
            uint8 status,
            uint32 delayInMinutes,
            uint16 reasonCode,
            uint64 updatedAt
        );

        function updateFlightStatus(FlightData calldata data) external;

        function lastUpdatedAtByFlightId(bytes32 flightId) external view returns (uint64);
    }
}

/// Gas limit used when none is configured, matching what the hub needs for
/// an update that settles a handful of policies.
pub const DEFAULT_GAS_LIMIT: u64 = 500_000;

/// Settings for [`HubClient::connect`].
#[derive(Clone)]
pub struct HubClientConfig {
    pub rpc_url: Url,
    pub hub_address: Address,
    /// Hex-encoded secp256k1 key of the oracle account.
    pub private_key: String,
    /// Deadline for every read call and for handing a transaction to the node.
    pub call_timeout: Duration,
    /// Deadline for a submitted transaction to be mined.
    pub receipt_timeout: Duration,
    pub gas_limit: u64,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl std::fmt::Debug for HubClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubClientConfig")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("hub_address", &self.hub_address)
            .field("private_key", &"<redacted>")
            .field("call_timeout", &self.call_timeout)
            .field("receipt_timeout", &self.receipt_timeout)
            .field("gas_limit", &self.gas_limit)
            .field("max_fee_per_gas", &self.max_fee_per_gas)
            .field("max_priority_fee_per_gas", &self.max_priority_fee_per_gas)
            .finish()
    }
}

/// Ledger client bound to one hub contract and one oracle signer.
pub struct HubClient {
    provider: DynProvider,
    hub: InsuranceHub::InsuranceHubInstance<DynProvider>,
    hub_address: Address,
    oracle: Address,
    call_timeout: Duration,
    receipt_timeout: Duration,
    gas_limit: u64,
    max_fee_per_gas: Option<u128>,
    max_priority_fee_per_gas: Option<u128>,
}

impl HubClient {
    /// Build the provider stack (signer, nonce/gas/chain-id fillers, HTTP
    /// transport). No network traffic happens here.
    pub fn connect(config: HubClientConfig) -> Result<Self, LedgerError> {
        let signer: PrivateKeySigner = config
            .private_key
            .trim()
            .parse()
            .map_err(|e| LedgerError::Config(format!("invalid oracle private key: {e}")))?;
        let oracle = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(config.rpc_url)
            .erased();
        let hub = InsuranceHub::new(config.hub_address, provider.clone());

        Ok(Self {
            provider,
            hub,
            hub_address: config.hub_address,
            oracle,
            call_timeout: config.call_timeout,
            receipt_timeout: config.receipt_timeout,
            gas_limit: config.gas_limit,
            max_fee_per_gas: config.max_fee_per_gas,
            max_priority_fee_per_gas: config.max_priority_fee_per_gas,
        })
    }

    /// Address of the oracle account that signs updates.
    pub fn oracle_address(&self) -> Address {
        self.oracle
    }

    pub fn hub_address(&self) -> Address {
        self.hub_address
    }

    /// Native balance of the oracle account, in wei.
    pub async fn oracle_balance(&self) -> Result<U256, LedgerError> {
        with_deadline("get_balance", self.call_timeout, async {
            self.provider
                .get_balance(self.oracle)
                .await
                .map_err(|e| LedgerError::Unavailable(e.to_string()))
        })
        .await
    }
}

#[async_trait]
impl Ledger for HubClient {
    async fn current_height(&self) -> Result<u64, LedgerError> {
        with_deadline("get_block_number", self.call_timeout, async {
            self.provider
                .get_block_number()
                .await
                .map_err(|e| LedgerError::Unavailable(e.to_string()))
        })
        .await
    }

    async fn query_purchases(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<PurchaseEntry>, LedgerError> {
        let filter = self
            .hub
            .PolicyPurchased_filter()
            .from_block(from_block)
            .to_block(to_block)
            .filter;
        let logs = with_deadline("get_logs", self.call_timeout, async {
            self.provider
                .get_logs(&filter)
                .await
                .map_err(|e| LedgerError::Unavailable(e.to_string()))
        })
        .await?;

        debug!(from_block, to_block, count = logs.len(), "Fetched PolicyPurchased logs");

        Ok(decode_purchases(&logs))
    }

    async fn read_revision(&self, flight_id: FlightId) -> Result<u64, LedgerError> {
        with_deadline("lastUpdatedAtByFlightId", self.call_timeout, async {
            self.hub
                .lastUpdatedAtByFlightId(flight_id)
                .call()
                .await
                .map_err(|e| LedgerError::Unavailable(e.to_string()))
        })
        .await
    }

    async fn submit_update(&self, update: &FlightUpdate) -> Result<UpdateReceipt, LedgerError> {
        let mut call = self
            .hub
            .updateFlightStatus(flight_data(update))
            .gas(self.gas_limit);
        if let Some(max_fee) = self.max_fee_per_gas {
            call = call.max_fee_per_gas(max_fee);
        }
        if let Some(tip) = self.max_priority_fee_per_gas {
            call = call.max_priority_fee_per_gas(tip);
        }

        let pending = with_deadline("send_transaction", self.call_timeout, async move {
            call.send()
                .await
                .map_err(|e| LedgerError::Submission(e.to_string()))
        })
        .await?;
        let tx_hash = *pending.tx_hash();

        info!(
            %tx_hash,
            flight_id = %update.flight_id,
            revision = update.revision(),
            "Status update sent, waiting for receipt"
        );

        let receipt = with_deadline("get_receipt", self.receipt_timeout, async move {
            pending
                .get_receipt()
                .await
                .map_err(|e| LedgerError::Submission(e.to_string()))
        })
        .await?;

        let success = receipt.status();
        let effects = if success {
            decode_effects(self.hub_address, receipt.inner.logs())
        } else {
            warn!(%tx_hash, "Status update reverted");
            Vec::new()
        };

        Ok(UpdateReceipt {
            success,
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            effects,
        })
    }
}

/// ABI payload of `updateFlightStatus` for `update`.
fn flight_data(update: &FlightUpdate) -> InsuranceHub::FlightData {
    let record = &update.record;
    InsuranceHub::FlightData {
        flightId: update.flight_id,
        flightNumber: record.flight_number.clone(),
        arrivalTimestamp: record.arrival_timestamp,
        delayInMinutes: record.delay_in_minutes,
        reasonCode: record.reason_code,
        status: record.status.into(),
        updatedAt: record.updated_at,
    }
}

/// Decode `PolicyPurchased` logs one by one, keeping undecodable logs as
/// [`LedgerError::Malformed`] entries.
fn decode_purchases(logs: &[Log]) -> Vec<PurchaseEntry> {
    logs.iter()
        .map(|log| -> PurchaseEntry {
            let event = log
                .log_decode::<InsuranceHub::PolicyPurchased>()
                .map_err(|e| {
                    LedgerError::Malformed(format!(
                        "PolicyPurchased log {:?}#{:?}: {e}",
                        log.transaction_hash, log.log_index
                    ))
                })?
                .inner
                .data;
            Ok(PurchasedPolicy {
                policy_id: event.policyId,
                holder: event.holder,
                product_id: event.productId,
                flight_id: event.flightId,
                key: FlightKey::new(event.flightNumber, event.arrivalTimestamp),
                premium_wei: event.premiumWei,
                max_payout_wei: event.maxPayoutWei,
                coverage_end: event.coverageEnd,
                block_number: log.block_number,
            })
        })
        .collect()
}

/// Pick the hub's own secondary events out of a receipt's logs.
///
/// Logs emitted by other contracts and logs that fail to decode are skipped.
fn decode_effects(hub: Address, logs: &[Log]) -> Vec<LedgerEffect> {
    logs.iter()
        .filter(|log| log.address() == hub)
        .filter_map(|log| {
            let topic = *log.topic0()?;
            if topic == InsuranceHub::PolicySettled::SIGNATURE_HASH {
                let event = log.log_decode::<InsuranceHub::PolicySettled>().ok()?.inner.data;
                Some(LedgerEffect::PolicySettled {
                    policy_id: event.policyId,
                    holder: event.holder,
                    payout_wei: event.payoutWei,
                    flight_id: event.flightId,
                })
            } else if topic == InsuranceHub::FlightStatusUpdated::SIGNATURE_HASH {
                let event = log
                    .log_decode::<InsuranceHub::FlightStatusUpdated>()
                    .ok()?
                    .inner
                    .data;
                Some(LedgerEffect::FlightStatusRecorded {
                    flight_id: event.flightId,
                    status: FlightStatus::try_from(event.status).ok()?,
                    delay_in_minutes: event.delayInMinutes,
                    reason_code: event.reasonCode,
                    updated_at: event.updatedAt,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, LogData, address};
    use skyoracle_sdk::objects::FlightRecord;

    const HUB: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
    const OTHER: Address = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");

    fn rpc_log<E: SolEvent>(emitter: Address, event: &E) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: emitter,
                data: event.encode_log_data(),
            },
            ..Default::default()
        }
    }

    fn settled(flight_id: FlightId) -> InsuranceHub::PolicySettled {
        InsuranceHub::PolicySettled {
            policyId: U256::from(1),
            holder: OTHER,
            payoutWei: U256::from(20_000_000_000_000_000u64),
            flightId: flight_id,
        }
    }

    #[test]
    fn test_flight_data_mapping() {
        let key = FlightKey::new("AA123", 1_700_086_400);
        let record = FlightRecord {
            flight_number: key.flight_number.clone(),
            arrival_timestamp: key.arrival_timestamp,
            status: FlightStatus::Delayed,
            delay_in_minutes: 180,
            reason_code: 50,
            updated_at: 1000,
        };
        let data = flight_data(&FlightUpdate::new(key.flight_id(), record));

        assert_eq!(data.flightId, key.flight_id());
        assert_eq!(data.flightNumber, "AA123");
        assert_eq!(data.arrivalTimestamp, 1_700_086_400);
        assert_eq!(data.delayInMinutes, 180);
        assert_eq!(data.reasonCode, 50);
        assert_eq!(data.status, 2);
        assert_eq!(data.updatedAt, 1000);
    }

    #[test]
    fn test_decode_effects_reads_settlement_and_status() {
        let flight_id = FlightKey::new("AA123", 1_700_086_400).flight_id();
        let status = InsuranceHub::FlightStatusUpdated {
            flightId: flight_id,
            status: 2,
            delayInMinutes: 180,
            reasonCode: 50,
            updatedAt: 1000,
        };
        let logs = vec![rpc_log(HUB, &status), rpc_log(HUB, &settled(flight_id))];

        let effects = decode_effects(HUB, &logs);

        assert_eq!(
            effects,
            vec![
                LedgerEffect::FlightStatusRecorded {
                    flight_id,
                    status: FlightStatus::Delayed,
                    delay_in_minutes: 180,
                    reason_code: 50,
                    updated_at: 1000,
                },
                LedgerEffect::PolicySettled {
                    policy_id: U256::from(1),
                    holder: OTHER,
                    payout_wei: U256::from(20_000_000_000_000_000u64),
                    flight_id,
                },
            ]
        );
    }

    #[test]
    fn test_decode_purchases_keeps_bad_logs_in_place() {
        let key = FlightKey::new("AA123", 1_700_086_400);
        let purchased = InsuranceHub::PolicyPurchased {
            policyId: U256::from(7),
            holder: OTHER,
            productId: 1,
            flightId: key.flight_id(),
            flightNumber: key.flight_number.clone(),
            arrivalTimestamp: key.arrival_timestamp,
            premiumWei: U256::from(3_000_000_000_000_000u64),
            maxPayoutWei: U256::from(20_000_000_000_000_000u64),
            coverageEnd: 1_700_100_000,
        };
        let mut good = rpc_log(HUB, &purchased);
        good.block_number = Some(42);
        let truncated = Log {
            inner: alloy::primitives::Log {
                address: HUB,
                data: LogData::new_unchecked(
                    vec![InsuranceHub::PolicyPurchased::SIGNATURE_HASH],
                    Bytes::from_static(&[1, 2, 3]),
                ),
            },
            ..Default::default()
        };

        let entries = decode_purchases(&[truncated, good]);

        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0], Err(LedgerError::Malformed(_))));
        let policy = entries[1].as_ref().unwrap();
        assert_eq!(policy.policy_id, U256::from(7));
        assert_eq!(policy.key, key);
        assert_eq!(policy.flight_id, key.flight_id());
        assert_eq!(policy.coverage_end, 1_700_100_000);
        assert_eq!(policy.block_number, Some(42));
    }

    #[test]
    fn test_decode_effects_ignores_foreign_logs() {
        let flight_id = FlightKey::new("AA123", 1_700_086_400).flight_id();
        let logs = vec![rpc_log(OTHER, &settled(flight_id))];

        assert!(decode_effects(HUB, &logs).is_empty());
    }

    #[test]
    fn test_connect_rejects_bad_key() {
        let config = HubClientConfig {
            rpc_url: Url::parse("http://127.0.0.1:8545").unwrap(),
            hub_address: HUB,
            private_key: "not-a-key".to_string(),
            call_timeout: Duration::from_secs(10),
            receipt_timeout: Duration::from_secs(60),
            gas_limit: DEFAULT_GAS_LIMIT,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        };

        assert!(matches!(HubClient::connect(config), Err(LedgerError::Config(_))));
        // Debug output must never leak the key.
        let config = HubClientConfig {
            private_key: "0xdeadbeef".to_string(),
            rpc_url: Url::parse("http://127.0.0.1:8545").unwrap(),
            hub_address: HUB,
            call_timeout: Duration::from_secs(10),
            receipt_timeout: Duration::from_secs(60),
            gas_limit: DEFAULT_GAS_LIMIT,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        };
        assert!(!format!("{config:?}").contains("deadbeef"));
    }
}
