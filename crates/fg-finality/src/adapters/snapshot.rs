//! Snapshot Collaborators Adapter
//!
//! Implements all three outbound ports from a JSON snapshot of Babylon chain,
//! contract and Bitcoin state. Used by the daemon and by integration tests in
//! place of live RPC clients.

use crate::domain::{normalize_block_hash, Delegation, FinalityProviderId, L2Block, StakingParams};
use crate::error::{CollaboratorError, CollaboratorResult};
use crate::ports::outbound::{
    BitcoinTimeOracle, ChainQuery, ContractState, DelegationPage, PageCursor,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_PAGE_SIZE: usize = 100;

fn default_enabled() -> bool {
    true
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Snapshot loading errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("page_size must be at least 1")]
    ZeroPageSize,
}

/// A finality provider and its BTC delegations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: FinalityProviderId,
    #[serde(default)]
    pub delegations: Vec<Delegation>,
}

/// Providers that signed one `(height, hash)`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteRecord {
    pub height: u64,
    pub hash: String,
    pub voters: Vec<FinalityProviderId>,
}

/// BTC height in effect from `timestamp` onwards
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TimeAnchor {
    pub timestamp: u64,
    pub btc_height: u64,
}

/// On-disk snapshot layout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub consumer_id: String,
    pub btc_tip_height: u64,
    pub params: StakingParams,
    #[serde(default)]
    pub providers: Vec<ProviderRecord>,
    #[serde(default)]
    pub votes: Vec<VoteRecord>,
    #[serde(default)]
    pub btc_anchors: Vec<TimeAnchor>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Snapshot {
    /// Empty, enabled snapshot for one consumer
    pub fn new(consumer_id: impl Into<String>, btc_tip_height: u64, params: StakingParams) -> Self {
        Self {
            enabled: true,
            consumer_id: consumer_id.into(),
            btc_tip_height,
            params,
            providers: Vec::new(),
            votes: Vec::new(),
            btc_anchors: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

struct SnapshotState {
    enabled: bool,
    consumer_id: String,
    btc_tip_height: u64,
    params: StakingParams,
    providers: BTreeMap<FinalityProviderId, Vec<Delegation>>,
    votes: HashMap<(u64, String), Vec<FinalityProviderId>>,
    anchors: BTreeMap<u64, u64>,
    page_size: usize,
}

/// In-memory collaborators backed by a [`Snapshot`]
pub struct SnapshotCollaborators {
    state: RwLock<SnapshotState>,
    /// Injected failures by call name
    failures: RwLock<HashMap<&'static str, CollaboratorError>>,
    /// Injected `list_delegations` failures by provider
    provider_failures: RwLock<HashMap<FinalityProviderId, CollaboratorError>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl SnapshotCollaborators {
    pub fn new(snapshot: Snapshot) -> Result<Self, SnapshotError> {
        if snapshot.page_size == 0 {
            return Err(SnapshotError::ZeroPageSize);
        }

        let mut votes: HashMap<(u64, String), Vec<FinalityProviderId>> = HashMap::new();
        for vote in snapshot.votes {
            votes
                .entry((vote.height, normalize_block_hash(&vote.hash)))
                .or_default()
                .extend(vote.voters);
        }

        let mut providers: BTreeMap<FinalityProviderId, Vec<Delegation>> = BTreeMap::new();
        for record in snapshot.providers {
            providers
                .entry(record.id)
                .or_default()
                .extend(record.delegations);
        }

        let state = SnapshotState {
            enabled: snapshot.enabled,
            consumer_id: snapshot.consumer_id,
            btc_tip_height: snapshot.btc_tip_height,
            params: snapshot.params,
            providers,
            votes,
            anchors: snapshot
                .btc_anchors
                .iter()
                .map(|a| (a.timestamp, a.btc_height))
                .collect(),
            page_size: snapshot.page_size,
        };

        Ok(Self {
            state: RwLock::new(state),
            failures: RwLock::new(HashMap::new()),
            provider_failures: RwLock::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Self::new(serde_json::from_str(json)?)
    }

    /// Load a snapshot file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let collaborators = Self::from_json(&json)?;
        {
            let state = collaborators.state.read();
            info!(
                path = %path.display(),
                consumer_id = %state.consumer_id,
                providers = state.providers.len(),
                votes = state.votes.len(),
                "loaded collaborator snapshot"
            );
        }
        Ok(collaborators)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.write().enabled = enabled;
    }

    pub fn set_btc_tip_height(&self, height: u64) {
        self.state.write().btc_tip_height = height;
    }

    pub fn add_delegation(&self, fp: FinalityProviderId, delegation: Delegation) {
        self.state
            .write()
            .providers
            .entry(fp)
            .or_default()
            .push(delegation);
    }

    /// Record a provider's signature over `(height, hash)`
    pub fn record_vote(&self, height: u64, hash: &str, fp: FinalityProviderId) {
        self.state
            .write()
            .votes
            .entry((height, normalize_block_hash(hash)))
            .or_default()
            .push(fp);
    }

    pub fn set_anchor(&self, timestamp: u64, btc_height: u64) {
        self.state.write().anchors.insert(timestamp, btc_height);
    }

    /// Make every future `call` fail with `error`
    pub fn fail_call(&self, call: &'static str, error: CollaboratorError) {
        self.failures.write().insert(call, error);
    }

    /// Make `list_delegations` fail for one provider
    pub fn fail_provider(&self, fp: FinalityProviderId, error: CollaboratorError) {
        self.provider_failures.write().insert(fp, error);
    }

    pub fn clear_failures(&self) {
        self.failures.write().clear();
        self.provider_failures.write().clear();
    }

    /// Number of times `call` has been served
    pub fn call_count(&self, call: &str) -> usize {
        self.calls.lock().get(call).copied().unwrap_or(0)
    }

    fn enter(&self, call: &'static str) -> CollaboratorResult<()> {
        *self.calls.lock().entry(call).or_insert(0) += 1;
        match self.failures.read().get(call) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn encode_cursor(offset: usize) -> PageCursor {
    PageCursor((offset as u64).to_be_bytes().to_vec())
}

fn decode_cursor(cursor: &PageCursor) -> CollaboratorResult<usize> {
    let bytes: [u8; 8] = cursor
        .0
        .as_slice()
        .try_into()
        .map_err(|_| CollaboratorError::InvalidResponse("malformed page cursor".into()))?;
    usize::try_from(u64::from_be_bytes(bytes))
        .map_err(|_| CollaboratorError::InvalidResponse("page cursor out of range".into()))
}

#[async_trait]
impl ChainQuery for SnapshotCollaborators {
    async fn list_finality_providers(
        &self,
        consumer_id: &str,
    ) -> CollaboratorResult<Vec<FinalityProviderId>> {
        self.enter("list_finality_providers")?;
        let state = self.state.read();
        if consumer_id != state.consumer_id {
            return Ok(Vec::new());
        }
        Ok(state.providers.keys().cloned().collect())
    }

    async fn list_delegations(
        &self,
        fp: &FinalityProviderId,
        cursor: Option<PageCursor>,
    ) -> CollaboratorResult<DelegationPage> {
        self.enter("list_delegations")?;
        if let Some(err) = self.provider_failures.read().get(fp) {
            return Err(err.clone());
        }

        let offset = match &cursor {
            Some(cursor) => decode_cursor(cursor)?,
            None => 0,
        };

        let state = self.state.read();
        let all = state.providers.get(fp).map(Vec::as_slice).unwrap_or(&[]);
        let end = offset.saturating_add(state.page_size).min(all.len());
        let delegations = all.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_cursor = (end < all.len()).then(|| encode_cursor(end));

        debug!(
            fp = %fp,
            offset,
            returned = delegations.len(),
            more = next_cursor.is_some(),
            "served delegation page"
        );
        Ok(DelegationPage {
            delegations,
            next_cursor,
        })
    }

    async fn staking_params(&self) -> CollaboratorResult<StakingParams> {
        self.enter("staking_params")?;
        Ok(self.state.read().params)
    }

    async fn btc_tip_height(&self) -> CollaboratorResult<u64> {
        self.enter("btc_tip_height")?;
        Ok(self.state.read().btc_tip_height)
    }
}

#[async_trait]
impl ContractState for SnapshotCollaborators {
    async fn is_enabled(&self) -> CollaboratorResult<bool> {
        self.enter("is_enabled")?;
        Ok(self.state.read().enabled)
    }

    async fn consumer_id(&self) -> CollaboratorResult<String> {
        self.enter("consumer_id")?;
        Ok(self.state.read().consumer_id.clone())
    }

    async fn voted_providers(
        &self,
        block: &L2Block,
    ) -> CollaboratorResult<Vec<FinalityProviderId>> {
        self.enter("voted_providers")?;
        let key = (block.block_height, normalize_block_hash(&block.block_hash));
        Ok(self
            .state
            .read()
            .votes
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl BitcoinTimeOracle for SnapshotCollaborators {
    async fn height_at_timestamp(&self, timestamp: u64) -> CollaboratorResult<u64> {
        self.enter("height_at_timestamp")?;
        self.state
            .read()
            .anchors
            .range(..=timestamp)
            .next_back()
            .map(|(_, height)| *height)
            .ok_or_else(|| {
                CollaboratorError::NotFound(format!("no BTC block at or before timestamp {timestamp}"))
            })
    }
}
