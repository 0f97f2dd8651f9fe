//! Genesis approval protocol.
//!
//! The bootstrap node broadcasts its candidate on every poll tick and
//! collects [`BlockApproval`]s from trusted validators. Once the ceremony
//! window has elapsed and the signature threshold is met (or the threshold
//! is zero), the candidate becomes the approved block: it is published to
//! the shared slot and broadcast to peers. There is no timeout past the
//! window; the ceremony waits for the final signature indefinitely.

use crate::env::CeremonyEnv;
use crate::error::ConsensusError;
use crate::last_approved::LastApprovedBlock;
use parking_lot::Mutex;
use prost::Message;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use vertex_crypto::{blake2b256, verify, Keypair, ALGORITHM_ED25519};
use vertex_types::wire::{ApprovedBlockMsg, UnapprovedBlockMsg};
use vertex_types::{
    ApprovedBlock, ApprovedBlockCandidate, BlockApproval, Signature, UnapprovedBlock, ValidatorId,
};

/// Broadcast tag for the periodic candidate announcement.
pub const TAG_UNAPPROVED_BLOCK: &str = "unapproved-block";
/// Broadcast tag for the ceremony result.
pub const TAG_APPROVED_BLOCK: &str = "approved-block";
/// Counter incremented once per admitted approval.
pub const COUNTER_GENESIS: &str = "genesis";

/// Ceremony parameters.
#[derive(Clone, Debug)]
pub struct ApprovalConfig {
    /// Signatures needed before the candidate can be approved
    pub required_sigs: u32,
    /// Minimum ceremony window; approval never happens earlier
    pub duration: Duration,
    /// Poll and broadcast interval
    pub interval: Duration,
    /// Validators whose approvals count
    pub trusted_validators: HashSet<ValidatorId>,
}

/// Collects approvals for one candidate block.
pub struct ApproveBlockProtocol {
    candidate: ApprovedBlockCandidate,
    digest: [u8; 32],
    config: ApprovalConfig,
    start_millis: i64,
    sigs: Mutex<Vec<Signature>>,
    env: CeremonyEnv,
    slot: Arc<LastApprovedBlock>,
}

impl ApproveBlockProtocol {
    /// Set up a ceremony starting now (per the injected clock).
    pub fn new(
        candidate: ApprovedBlockCandidate,
        config: ApprovalConfig,
        env: CeremonyEnv,
        slot: Arc<LastApprovedBlock>,
    ) -> Self {
        let digest = blake2b256(&candidate.to_wire_bytes());
        let start_millis = env.clock.now_millis();
        Self {
            candidate,
            digest,
            config,
            start_millis,
            sigs: Mutex::new(Vec::new()),
            env,
            slot,
        }
    }

    /// Validate one incoming approval and admit it if it is new.
    ///
    /// Returns `Ok(true)` on first admission, `Ok(false)` for a duplicate.
    /// Invalid approvals are logged, discarded, and never counted.
    pub fn add_approval(&self, approval: &BlockApproval) -> Result<bool, ConsensusError> {
        if approval.candidate != self.candidate {
            warn!("discarding approval for a different candidate");
            return Err(ConsensusError::WrongCandidate);
        }
        let signature = &approval.signature;
        if !self.config.trusted_validators.contains(&signature.public_key) {
            warn!(
                approver = %signature.public_key,
                "discarding approval from untrusted validator"
            );
            return Err(ConsensusError::UntrustedApprover);
        }
        if signature.algorithm != ALGORITHM_ED25519 {
            warn!(
                algorithm = %signature.algorithm,
                "discarding approval with unsupported algorithm"
            );
            return Err(ConsensusError::InvalidApprovalSignature(format!(
                "unsupported algorithm {:?}",
                signature.algorithm
            )));
        }
        if let Err(e) = verify(&signature.public_key, &self.digest, &signature.sig) {
            warn!(
                approver = %signature.public_key,
                error = %e,
                "discarding approval with invalid signature"
            );
            return Err(ConsensusError::InvalidApprovalSignature(e.to_string()));
        }

        let mut sigs = self.sigs.lock();
        if sigs.contains(signature) {
            debug!(approver = %signature.public_key, "duplicate approval ignored");
            return Ok(false);
        }
        sigs.push(signature.clone());
        let collected = sigs.len();
        drop(sigs);

        self.env.metrics.increment(COUNTER_GENESIS);
        info!(approver = %signature.public_key, collected, "approval admitted");
        Ok(true)
    }

    pub fn signature_count(&self) -> usize {
        self.sigs.lock().len()
    }

    /// Drive the ceremony to completion.
    ///
    /// Every interval: broadcast the candidate, then approve if the window
    /// has elapsed and enough signatures arrived (immediately when the
    /// threshold is zero). The sleep between ticks is the cancellation
    /// point; cancelling the future before approval leaves the slot unset.
    pub async fn run(&self) -> Result<ApprovedBlock, ConsensusError> {
        let unapproved = UnapprovedBlock {
            candidate: self.candidate.clone(),
            timestamp: self.start_millis,
            duration_millis: self.config.duration.as_millis() as i64,
        };
        let unapproved_bytes = UnapprovedBlockMsg::from(&unapproved).encode_to_vec();
        let deadline = self
            .start_millis
            .saturating_add(self.config.duration.as_millis() as i64);

        info!(
            required = self.config.required_sigs,
            duration_ms = self.config.duration.as_millis() as u64,
            "starting genesis approval ceremony"
        );
        loop {
            self.env
                .broadcast
                .send(TAG_UNAPPROVED_BLOCK, unapproved_bytes.clone());

            let now = self.env.clock.now_millis();
            let collected = self.signature_count() as u32;
            if self.config.required_sigs == 0
                || (now >= deadline && collected >= self.config.required_sigs)
            {
                let approved = ApprovedBlock {
                    candidate: self.candidate.clone(),
                    signatures: self.sigs.lock().clone(),
                };
                self.slot.set(approved.clone())?;
                self.env.broadcast.send(
                    TAG_APPROVED_BLOCK,
                    ApprovedBlockMsg::from(&approved).encode_to_vec(),
                );
                info!(
                    signatures = approved.signatures.len(),
                    "genesis candidate approved"
                );
                return Ok(approved);
            }

            sleep(self.config.interval).await;
        }
    }
}

/// Sign the candidate digest as a trusted validator, producing the
/// approval message to send back to the bootstrap node.
pub fn approve_candidate(candidate: &ApprovedBlockCandidate, keypair: &Keypair) -> BlockApproval {
    let digest = blake2b256(&candidate.to_wire_bytes());
    let sig = keypair.sign(&digest);
    BlockApproval {
        candidate: candidate.clone(),
        signature: Signature::new(keypair.public(), ALGORITHM_ED25519, sig),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Clock, ChannelBroadcast, CountingMetrics, ManualClock, NoopBroadcast, NoopMetrics};
    use vertex_types::{Block, BlockHash};

    fn candidate(required_sigs: u32) -> ApprovedBlockCandidate {
        let block = Block::new(BlockHash::from_bytes([1u8; 32]), vec![], Vec::new());
        ApprovedBlockCandidate::new(block, required_sigs)
    }

    struct Fixture {
        protocol: Arc<ApproveBlockProtocol>,
        clock: Arc<ManualClock>,
        metrics: Arc<CountingMetrics>,
        slot: Arc<LastApprovedBlock>,
        keypairs: Vec<Keypair>,
    }

    fn fixture(required_sigs: u32, trusted: usize) -> Fixture {
        let keypairs: Vec<Keypair> = (0..trusted).map(|_| Keypair::generate()).collect();
        let clock = Arc::new(ManualClock::new(0));
        let metrics = Arc::new(CountingMetrics::new());
        let slot = Arc::new(LastApprovedBlock::new());
        let config = ApprovalConfig {
            required_sigs,
            duration: Duration::from_millis(30),
            interval: Duration::from_millis(1),
            trusted_validators: keypairs.iter().map(|k| k.public()).collect(),
        };
        let env = CeremonyEnv::new(clock.clone(), Arc::new(NoopBroadcast), metrics.clone());
        let protocol = Arc::new(ApproveBlockProtocol::new(
            candidate(required_sigs),
            config,
            env,
            slot.clone(),
        ));
        Fixture {
            protocol,
            clock,
            metrics,
            slot,
            keypairs,
        }
    }

    #[test]
    fn test_valid_approval_admitted_once() {
        let f = fixture(2, 2);
        let approval = approve_candidate(&candidate(2), &f.keypairs[0]);

        assert_eq!(f.protocol.add_approval(&approval), Ok(true));
        assert_eq!(f.protocol.add_approval(&approval), Ok(false));
        assert_eq!(f.protocol.signature_count(), 1);
        assert_eq!(f.metrics.get(COUNTER_GENESIS), 1);
    }

    #[test]
    fn test_untrusted_approver_rejected() {
        let f = fixture(1, 1);
        let outsider = Keypair::generate();
        let approval = approve_candidate(&candidate(1), &outsider);

        assert_eq!(
            f.protocol.add_approval(&approval),
            Err(ConsensusError::UntrustedApprover)
        );
        assert_eq!(f.protocol.signature_count(), 0);
        assert_eq!(f.metrics.get(COUNTER_GENESIS), 0);
    }

    #[test]
    fn test_wrong_candidate_rejected() {
        let f = fixture(1, 1);
        let approval = approve_candidate(&candidate(99), &f.keypairs[0]);
        assert_eq!(
            f.protocol.add_approval(&approval),
            Err(ConsensusError::WrongCandidate)
        );
    }

    #[test]
    fn test_unsupported_algorithm_rejected() {
        let f = fixture(1, 1);
        let mut approval = approve_candidate(&candidate(1), &f.keypairs[0]);
        approval.signature.algorithm = "secp256k1".to_string();
        assert!(matches!(
            f.protocol.add_approval(&approval),
            Err(ConsensusError::InvalidApprovalSignature(_))
        ));
        assert_eq!(f.protocol.signature_count(), 0);
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let f = fixture(1, 1);
        let mut approval = approve_candidate(&candidate(1), &f.keypairs[0]);
        approval.signature.sig[0] ^= 0xFF;
        assert!(matches!(
            f.protocol.add_approval(&approval),
            Err(ConsensusError::InvalidApprovalSignature(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_threshold_approves_immediately() {
        let f = fixture(0, 0);
        let approved = f.protocol.run().await.unwrap();
        assert!(approved.signatures.is_empty());
        assert_eq!(f.slot.get().unwrap(), &approved);
        // Clock never advanced: the window did not matter.
        assert_eq!(f.clock.now_millis(), 0);
    }

    #[tokio::test]
    async fn test_waits_for_window_and_threshold() {
        let f = fixture(2, 2);
        let protocol = f.protocol.clone();
        let handle = tokio::spawn(async move { protocol.run().await });

        // Window not elapsed and no signatures: keeps polling.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(f.slot.try_get().is_none());

        for keypair in &f.keypairs {
            f.protocol
                .add_approval(&approve_candidate(&candidate(2), keypair))
                .unwrap();
        }
        // Threshold met but the clock stands still: still unapproved.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(f.slot.try_get().is_none());

        f.clock.set(31);
        let approved = handle.await.unwrap().unwrap();
        assert_eq!(approved.signatures.len(), 2);
        assert_eq!(f.slot.get().unwrap(), &approved);
    }

    #[tokio::test]
    async fn test_cancel_before_approval_leaves_slot_unset() {
        let f = fixture(1, 1);
        let protocol = f.protocol.clone();
        let handle = tokio::spawn(async move { protocol.run().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(f.slot.try_get().is_none());
    }

    #[tokio::test]
    async fn test_broadcasts_candidate_and_result() {
        let keypair = Keypair::generate();
        let clock = Arc::new(ManualClock::new(0));
        let (broadcast, mut rx) = ChannelBroadcast::new();
        let slot = Arc::new(LastApprovedBlock::new());
        let config = ApprovalConfig {
            required_sigs: 1,
            duration: Duration::from_millis(10),
            interval: Duration::from_millis(1),
            trusted_validators: [keypair.public()].into(),
        };
        let env = CeremonyEnv::new(clock.clone(), Arc::new(broadcast), Arc::new(NoopMetrics));
        let protocol = ApproveBlockProtocol::new(candidate(1), config, env, slot);

        protocol
            .add_approval(&approve_candidate(&candidate(1), &keypair))
            .unwrap();
        clock.set(11);
        protocol.run().await.unwrap();

        let mut tags = Vec::new();
        while let Ok((tag, _)) = rx.try_recv() {
            tags.push(tag);
        }
        assert!(tags.contains(&TAG_UNAPPROVED_BLOCK.to_string()));
        assert_eq!(tags.last().unwrap().as_str(), TAG_APPROVED_BLOCK);
    }
}
