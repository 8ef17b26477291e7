//! Wallet records and scan inputs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::blockchain::{KeyDerivation, ValidationError};

/// Terminal message for items that exhausted their retries.
pub const FETCH_FAILED: &str = "Failed to fetch balance";

/// Terminal message for items cut short by cancellation.
pub const CANCELLED: &str = "Scan cancelled";

/// What kind of material a submission carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    #[default]
    Address,
    Secret,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Address => "address",
            InputKind::Secret => "secret",
        }
    }
}

impl std::str::FromStr for InputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "address" | "addresses" => Ok(InputKind::Address),
            "secret" | "secrets" | "key" | "keys" => Ok(InputKind::Secret),
            other => Err(format!("unknown input kind '{}'", other)),
        }
    }
}

/// Resolution state of one wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Pending,
    Balance(String),
    Failed(String),
}

/// One wallet in a scan.
///
/// Serialized as `{address, balance?, error?, checked}`; a checked record
/// carries exactly one of `balance`/`error`, a pending one carries neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireRecord", try_from = "WireRecord")]
pub struct WalletRecord {
    pub address: String,
    pub status: RecordStatus,
}

impl WalletRecord {
    pub fn pending(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            status: RecordStatus::Pending,
        }
    }

    pub fn resolved(address: impl Into<String>, balance: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            status: RecordStatus::Balance(balance.into()),
        }
    }

    pub fn failed(address: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            status: RecordStatus::Failed(error.into()),
        }
    }

    pub fn checked(&self) -> bool {
        !matches!(self.status, RecordStatus::Pending)
    }

    pub fn balance(&self) -> Option<&str> {
        match &self.status {
            RecordStatus::Balance(b) => Some(b),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            RecordStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireRecord {
    address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default)]
    checked: bool,
}

impl From<WalletRecord> for WireRecord {
    fn from(record: WalletRecord) -> Self {
        let (balance, error, checked) = match record.status {
            RecordStatus::Pending => (None, None, false),
            RecordStatus::Balance(b) => (Some(b), None, true),
            RecordStatus::Failed(e) => (None, Some(e), true),
        };
        Self {
            address: record.address,
            balance,
            error,
            checked,
        }
    }
}

impl TryFrom<WireRecord> for WalletRecord {
    type Error = String;

    fn try_from(wire: WireRecord) -> Result<Self, Self::Error> {
        let status = match (wire.checked, wire.balance, wire.error) {
            (false, None, None) => RecordStatus::Pending,
            (true, Some(b), None) => RecordStatus::Balance(b),
            (true, None, Some(e)) => RecordStatus::Failed(e),
            _ => {
                return Err(format!(
                    "inconsistent wallet record for {}: checked records need exactly one of balance/error",
                    wire.address
                ))
            }
        };
        Ok(Self {
            address: wire.address,
            status,
        })
    }
}

/// Ordered records keyed by address; merging is last-write-wins and keeps
/// first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    records: Vec<WalletRecord>,
    index: HashMap<String, usize>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, record: WalletRecord) {
        match self.index.get(&record.address) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.address.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Insert a pending record unless the address is already known.
    pub fn insert_pending(&mut self, address: &str) {
        if !self.index.contains_key(address) {
            self.upsert(WalletRecord::pending(address));
        }
    }

    pub fn merge<I: IntoIterator<Item = WalletRecord>>(&mut self, records: I) {
        for record in records {
            self.upsert(record);
        }
    }

    pub fn get(&self, address: &str) -> Option<&WalletRecord> {
        self.index.get(address).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[WalletRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<WalletRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<WalletRecord> for RecordSet {
    fn from_iter<T: IntoIterator<Item = WalletRecord>>(iter: T) -> Self {
        let mut set = RecordSet::new();
        set.merge(iter);
        set
    }
}

/// One unit of work for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanItem {
    /// Address to validate and resolve.
    Address(String),
    /// Secret that failed derivation, known only by its 1-based input position.
    RejectedSecret { position: usize },
}

impl ScanItem {
    /// Derive the address for one secret entry. The secret is not retained.
    pub fn from_secret(deriver: &dyn KeyDerivation, secret: &str, position: usize) -> Self {
        match deriver.derive(secret) {
            Some(address) => ScanItem::Address(address.to_checksum(None)),
            None => ScanItem::RejectedSecret { position },
        }
    }

    pub fn from_entry(kind: InputKind, deriver: &dyn KeyDerivation, entry: &str, position: usize) -> Self {
        match kind {
            InputKind::Address => ScanItem::Address(entry.to_string()),
            InputKind::Secret => ScanItem::from_secret(deriver, entry, position),
        }
    }

    /// Record key: the address, or a positional label for rejected secrets.
    pub fn key(&self) -> String {
        match self {
            ScanItem::Address(address) => address.clone(),
            ScanItem::RejectedSecret { position } => format!("secret#{}", position),
        }
    }

    /// Whether the item can reach the resolver at all.
    pub fn is_well_formed(&self) -> bool {
        match self {
            ScanItem::Address(address) => crate::blockchain::parse_address(address).is_ok(),
            ScanItem::RejectedSecret { .. } => false,
        }
    }

    /// Address to show observers; rejected secrets have none.
    pub fn address(&self) -> Option<&str> {
        match self {
            ScanItem::Address(address) => Some(address),
            ScanItem::RejectedSecret { .. } => None,
        }
    }

    pub(crate) fn rejection(&self) -> Option<ValidationError> {
        match self {
            ScanItem::RejectedSecret { .. } => Some(ValidationError::InvalidSecret),
            ScanItem::Address(_) => None,
        }
    }
}

/// Submission summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

impl ScanStats {
    pub fn record(&mut self, item: &ScanItem) {
        self.total += 1;
        if item.is_well_formed() {
            self.valid += 1;
        } else {
            self.invalid += 1;
        }
    }

    pub fn of(items: &[ScanItem]) -> Self {
        let mut stats = Self::default();
        items.iter().for_each(|item| stats.record(item));
        stats
    }
}

/// Split free text the way the input box does: newlines and commas separate
/// entries, surrounding whitespace is dropped, empty pieces are skipped.
pub fn split_entries(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\n', ','])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
}
