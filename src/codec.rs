//! Event decoding and command encoding.
//!
//! Translates gateway logs discovered on a source chain into destination
//! commands. Both directions are pure: the same log always decodes to the
//! same [`RelayEvent`], and the same event always encodes to byte-identical
//! calldata.
//!
//! The gateway interface is fixed:
//! - `ContractCall(address indexed sender, string destinationChain,
//!   string destinationContractAddress, bytes32 indexed payloadHash, bytes payload)`
//! - `TokenSent(address indexed sender, string destinationChain,
//!   string destinationAddress, string symbol, uint256 amount)`
//!
//! relayed to the destination gateway entry points
//! `approveContractCall(bytes32,string,string,address,bytes32,bytes32,uint256)`
//! and `mintToken(bytes32,address,uint256,string)`.

use sha3::{Digest, Keccak256};
use std::fmt;

use crate::error::RelayError;
use crate::evm_client::EvmLog;

/// Event signature of the gateway `ContractCall` event.
pub const CONTRACT_CALL_SIGNATURE: &str = "ContractCall(address,string,string,bytes32,bytes)";
/// Event signature of the gateway `TokenSent` event.
pub const TOKEN_SENT_SIGNATURE: &str = "TokenSent(address,string,string,string,uint256)";

/// Keccak256 topic hash of an event signature, 0x-prefixed.
pub fn event_topic(signature: &str) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(signature.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

// ============================================================================
// EVENT STRUCTURES
// ============================================================================

/// Kind-specific payload of a relayed gateway event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Arbitrary cross-chain message delivery.
    ContractCall {
        /// Destination contract the payload is addressed to
        destination_contract: String,
        /// Keccak256 digest of the call payload
        payload_hash: [u8; 32],
    },
    /// Token value transfer to be minted on the destination chain.
    TokenSent {
        /// Receiving address on the destination chain
        destination_address: String,
        /// Token symbol
        symbol: String,
        /// Amount as a big-endian 256-bit integer
        amount: [u8; 32],
    },
}

/// One outbound-message event observed on a source-chain gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEvent {
    /// Name of the chain the event was observed on
    pub source_chain: String,
    /// Source transaction hash (32 bytes)
    pub tx_hash: [u8; 32],
    /// Position of the log within its block
    pub log_index: u64,
    /// Block number the event was observed at
    pub block_number: u64,
    /// Sender address on the source chain (0x-prefixed hex)
    pub sender: String,
    /// Name of the chain the command must be submitted to
    pub destination_chain: String,
    /// Kind-specific fields
    pub kind: EventKind,
}

impl RelayEvent {
    /// The deterministic command identifier for this event.
    pub fn command_id(&self) -> CommandId {
        CommandId::derive(&self.tx_hash, self.log_index)
    }
}

// ============================================================================
// COMMAND IDENTIFIER
// ============================================================================

/// Deterministic identifier for one source event:
/// keccak256(txHash || logIndex as big-endian u64).
///
/// Identical `(txHash, logIndex)` pairs always yield the identical id;
/// distinct pairs collide only with negligible probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub [u8; 32]);

impl CommandId {
    pub fn derive(tx_hash: &[u8; 32], log_index: u64) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(tx_hash);
        hasher.update(log_index.to_be_bytes());
        CommandId(hasher.finalize().into())
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

/// The destination-side entry point a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    ApproveContractCall,
    MintToken,
}

/// A fully encoded destination-chain command, ready for submission.
#[derive(Debug, Clone)]
pub struct Command {
    pub id: CommandId,
    pub destination_chain: String,
    pub kind: CommandKind,
    /// ABI calldata (selector + arguments) for the gateway entry point
    pub payload: Vec<u8>,
}

// ============================================================================
// LOG DECODING
// ============================================================================

/// Decodes one gateway log into a [`RelayEvent`].
///
/// Logs whose topic matches neither relayed event kind fail with
/// [`RelayError::UnsupportedEventKind`]; recognized events with undecodable
/// payloads fail with [`RelayError::MalformedEvent`].
pub fn parse_gateway_log(source_chain: &str, log: &EvmLog) -> Result<RelayEvent, RelayError> {
    let topic0 = log
        .topics
        .first()
        .ok_or_else(|| RelayError::MalformedEvent("log has no topics".to_string()))?;

    let tx_hash = parse_hash32(&log.transaction_hash)
        .map_err(|e| RelayError::MalformedEvent(format!("bad transaction hash: {}", e)))?;
    let log_index = parse_hex_u64(&log.log_index)
        .map_err(|e| RelayError::MalformedEvent(format!("bad log index: {}", e)))?;
    let block_number = parse_hex_u64(&log.block_number)
        .map_err(|e| RelayError::MalformedEvent(format!("bad block number: {}", e)))?;

    if topic0.eq_ignore_ascii_case(&event_topic(CONTRACT_CALL_SIGNATURE)) {
        // topics: [signature, sender, payloadHash]
        if log.topics.len() < 3 {
            return Err(RelayError::MalformedEvent(
                "ContractCall log needs 3 topics".to_string(),
            ));
        }
        let sender = topic_address(&log.topics[1])?;
        let payload_hash = parse_hash32(&log.topics[2])
            .map_err(|e| RelayError::MalformedEvent(format!("bad payload hash: {}", e)))?;

        // data: (string destinationChain, string destinationContractAddress, bytes payload)
        let data = AbiData::from_hex(&log.data)?;
        let destination_chain = data.string_at(0)?;
        let destination_contract = data.string_at(1)?;

        Ok(RelayEvent {
            source_chain: source_chain.to_string(),
            tx_hash,
            log_index,
            block_number,
            sender,
            destination_chain,
            kind: EventKind::ContractCall {
                destination_contract,
                payload_hash,
            },
        })
    } else if topic0.eq_ignore_ascii_case(&event_topic(TOKEN_SENT_SIGNATURE)) {
        // topics: [signature, sender]
        if log.topics.len() < 2 {
            return Err(RelayError::MalformedEvent(
                "TokenSent log needs 2 topics".to_string(),
            ));
        }
        let sender = topic_address(&log.topics[1])?;

        // data: (string destinationChain, string destinationAddress, string symbol, uint256 amount)
        let data = AbiData::from_hex(&log.data)?;
        let destination_chain = data.string_at(0)?;
        let destination_address = data.string_at(1)?;
        let symbol = data.string_at(2)?;
        let amount = data.bytes32_at(3)?;

        Ok(RelayEvent {
            source_chain: source_chain.to_string(),
            tx_hash,
            log_index,
            block_number,
            sender,
            destination_chain,
            kind: EventKind::TokenSent {
                destination_address,
                symbol,
                amount,
            },
        })
    } else {
        Err(RelayError::UnsupportedEventKind(topic0.clone()))
    }
}

// ============================================================================
// COMMAND ENCODING
// ============================================================================

/// Encodes a confirmed event into its destination command.
///
/// Field order matches the destination gateway entry points exactly:
/// - ContractCall -> `approveContractCall(commandId, sourceChain, sender,
///   destinationContract, payloadHash, sourceTxHash, logIndex)`
/// - TokenSent -> `mintToken(commandId, destinationAddress, amount, symbol)`
pub fn encode_command(event: &RelayEvent) -> Result<Command, RelayError> {
    let id = event.command_id();

    match &event.kind {
        EventKind::ContractCall {
            destination_contract,
            payload_hash,
        } => {
            let selector = function_selector(
                "approveContractCall(bytes32,string,string,address,bytes32,bytes32,uint256)",
            );

            // Head: 7 words. Dynamic tail holds the two strings.
            let head_size = 7 * 32;
            let source_chain_bytes = event.source_chain.as_bytes();
            let sender_bytes = event.sender.as_bytes();
            let source_chain_offset = head_size;
            let sender_offset = head_size + 32 + pad32_len(source_chain_bytes.len());

            let mut payload = Vec::with_capacity(4 + head_size + 128);
            payload.extend_from_slice(&selector);
            payload.extend_from_slice(&id.0);
            payload.extend_from_slice(&uint_word(source_chain_offset as u64));
            payload.extend_from_slice(&uint_word(sender_offset as u64));
            payload.extend_from_slice(&address_word(destination_contract)?);
            payload.extend_from_slice(payload_hash);
            payload.extend_from_slice(&event.tx_hash);
            payload.extend_from_slice(&uint_word(event.log_index));
            push_bytes_tail(&mut payload, source_chain_bytes);
            push_bytes_tail(&mut payload, sender_bytes);

            Ok(Command {
                id,
                destination_chain: event.destination_chain.clone(),
                kind: CommandKind::ApproveContractCall,
                payload,
            })
        }
        EventKind::TokenSent {
            destination_address,
            symbol,
            amount,
        } => {
            let selector = function_selector("mintToken(bytes32,address,uint256,string)");

            // Head: 4 words; symbol string in the tail at offset 128.
            let mut payload = Vec::with_capacity(4 + 4 * 32 + 64);
            payload.extend_from_slice(&selector);
            payload.extend_from_slice(&id.0);
            payload.extend_from_slice(&address_word(destination_address)?);
            payload.extend_from_slice(amount);
            payload.extend_from_slice(&uint_word(4 * 32));
            push_bytes_tail(&mut payload, symbol.as_bytes());

            Ok(Command {
                id,
                destination_chain: event.destination_chain.clone(),
                kind: CommandKind::MintToken,
                payload,
            })
        }
    }
}

/// First four bytes of keccak256 of the function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak256::new();
    hasher.update(signature.as_bytes());
    let hash = hasher.finalize();
    [hash[0], hash[1], hash[2], hash[3]]
}

// ============================================================================
// ABI HELPERS
// ============================================================================

/// Word-addressed view over a hex-encoded ABI data section.
pub struct AbiData {
    bytes: Vec<u8>,
}

impl AbiData {
    pub fn from_hex(data: &str) -> Result<Self, RelayError> {
        let clean = data.strip_prefix("0x").unwrap_or(data);
        let bytes = hex::decode(clean)
            .map_err(|e| RelayError::MalformedEvent(format!("bad data hex: {}", e)))?;
        Ok(Self { bytes })
    }

    /// The 32-byte word at head position `i`.
    pub fn word(&self, i: usize) -> Result<&[u8], RelayError> {
        let start = i * 32;
        self.bytes.get(start..start + 32).ok_or_else(|| {
            RelayError::MalformedEvent(format!("data too short for word {}", i))
        })
    }

    /// The word at head position `i` as a `[u8; 32]`.
    pub fn bytes32_at(&self, i: usize) -> Result<[u8; 32], RelayError> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.word(i)?);
        Ok(out)
    }

    /// The word at head position `i` as a u64, requiring the upper 24 bytes
    /// to be zero.
    pub fn uint_at(&self, i: usize) -> Result<u64, RelayError> {
        let word = self.word(i)?;
        if word[..24].iter().any(|&b| b != 0) {
            return Err(RelayError::MalformedEvent(format!(
                "uint at word {} exceeds u64",
                i
            )));
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&word[24..]);
        Ok(u64::from_be_bytes(buf))
    }

    /// Reads the dynamic string whose offset is stored in head word `i`.
    pub fn string_at(&self, i: usize) -> Result<String, RelayError> {
        let offset = self.uint_at(i)? as usize;
        let len_word = self.bytes.get(offset..offset + 32).ok_or_else(|| {
            RelayError::MalformedEvent(format!("string offset {} out of range", offset))
        })?;
        if len_word[..24].iter().any(|&b| b != 0) {
            return Err(RelayError::MalformedEvent(
                "string length exceeds u64".to_string(),
            ));
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&len_word[24..]);
        let len = u64::from_be_bytes(buf) as usize;

        let start = offset + 32;
        let data = self.bytes.get(start..start + len).ok_or_else(|| {
            RelayError::MalformedEvent(format!("string data at {} truncated", start))
        })?;
        String::from_utf8(data.to_vec())
            .map_err(|e| RelayError::MalformedEvent(format!("string not UTF-8: {}", e)))
    }
}

/// Extracts the 20-byte address padded into an indexed topic.
fn topic_address(topic: &str) -> Result<String, RelayError> {
    let clean = topic.strip_prefix("0x").unwrap_or(topic);
    if clean.len() != 64 {
        return Err(RelayError::MalformedEvent(format!(
            "topic is {} hex chars, expected 64",
            clean.len()
        )));
    }
    Ok(format!("0x{}", clean[24..].to_lowercase()))
}

/// Parses a 0x-prefixed 32-byte hash.
fn parse_hash32(hex_str: &str) -> Result<[u8; 32], String> {
    let clean = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(clean).map_err(|e| e.to_string())?;
    bytes
        .try_into()
        .map_err(|_| format!("expected 32 bytes, got {} hex chars", clean.len()))
}

/// Parses a 0x-prefixed hex quantity.
fn parse_hex_u64(hex_str: &str) -> Result<u64, String> {
    let clean = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    u64::from_str_radix(clean, 16).map_err(|e| e.to_string())
}

fn pad32_len(n: usize) -> usize {
    (n + 31) / 32 * 32
}

/// A u64 left-padded into a 32-byte ABI word.
fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// A 20-byte address left-padded into a 32-byte ABI word.
fn address_word(address: &str) -> Result<[u8; 32], RelayError> {
    let clean = address.strip_prefix("0x").unwrap_or(address);
    let bytes = hex::decode(clean)
        .map_err(|e| RelayError::MalformedEvent(format!("bad address hex: {}", e)))?;
    if bytes.len() != 20 {
        return Err(RelayError::MalformedEvent(format!(
            "address is {} bytes, expected 20",
            bytes.len()
        )));
    }
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&bytes);
    Ok(word)
}

/// Appends a dynamic item tail: length word followed by data right-padded to
/// a 32-byte boundary.
fn push_bytes_tail(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&uint_word(data.len() as u64));
    out.extend_from_slice(data);
    let padding = (32 - (data.len() % 32)) % 32;
    out.extend(std::iter::repeat(0u8).take(padding));
}

// ============================================================================
// TESTS
// ============================================================================
