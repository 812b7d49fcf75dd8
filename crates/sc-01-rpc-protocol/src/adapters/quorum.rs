//! Weighted quorum verification of multi-party signatures.
//!
//! Each signature is recovered to an address. Signers outside the policy or the
//! expected set count nothing, and a signer counts once however many times it
//! signed. The request is authorized when the summed weight reaches `quorum`.

use super::ecdsa::EcdsaVerifier;
use crate::ports::outbound::{MessageVerifier, VerifierError};
use serde_json::Value;
use shared_types::{Address, AppDefinition};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Participants, weights and threshold of a multi-party authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumPolicy {
    participants: Vec<Address>,
    weights: Vec<u64>,
    quorum: u64,
    /// Signatures must appear in the order of the expected signers.
    ordered: bool,
}

impl QuorumPolicy {
    pub fn new(
        participants: Vec<Address>,
        weights: Vec<u64>,
        quorum: u64,
        ordered: bool,
    ) -> Result<Self, VerifierError> {
        if participants.len() != weights.len() {
            return Err(VerifierError::Failed(format!(
                "{} participants but {} weights",
                participants.len(),
                weights.len()
            )));
        }
        if quorum == 0 {
            return Err(VerifierError::Failed("quorum must be positive".to_string()));
        }
        let total = weights
            .iter()
            .try_fold(0u64, |sum, w| sum.checked_add(*w))
            .ok_or_else(|| VerifierError::Failed("total weight overflows u64".to_string()))?;
        if quorum > total {
            return Err(VerifierError::Failed(format!(
                "quorum {quorum} exceeds total weight {total}"
            )));
        }
        Ok(Self {
            participants,
            weights,
            quorum,
            ordered,
        })
    }

    /// Policy of an application session definition.
    pub fn from_definition(
        definition: &AppDefinition,
        ordered: bool,
    ) -> Result<Self, VerifierError> {
        Self::new(
            definition.participants.clone(),
            definition.weights.clone(),
            definition.quorum,
            ordered,
        )
    }

    pub fn quorum(&self) -> u64 {
        self.quorum
    }

    pub fn participants(&self) -> &[Address] {
        &self.participants
    }

    pub fn weight_of(&self, signer: &Address) -> u64 {
        self.participants
            .iter()
            .position(|p| p == signer)
            .and_then(|idx| self.weights.get(idx).copied())
            .unwrap_or(0)
    }

    /// Whether the recovered signers satisfy the policy.
    ///
    /// `expected` narrows the eligible signers; when empty, every policy
    /// participant is eligible, in policy order.
    pub fn is_satisfied(&self, recovered: &[Address], expected: &[Address]) -> bool {
        let eligible = if expected.is_empty() {
            &self.participants[..]
        } else {
            expected
        };

        let mut seen = HashSet::new();
        let mut total = 0u64;
        let mut last_position = None;

        for signer in recovered {
            let Some(position) = eligible.iter().position(|e| e == signer) else {
                debug!(%signer, "ignoring signature from ineligible signer");
                continue;
            };
            if !seen.insert(*signer) {
                continue;
            }
            if self.ordered {
                if last_position.is_some_and(|last| position < last) {
                    debug!(%signer, "signature out of order");
                    return false;
                }
                last_position = Some(position);
            }
            total = total.saturating_add(self.weight_of(signer));
        }

        total >= self.quorum
    }
}

/// [`MessageVerifier`] enforcing a [`QuorumPolicy`] on signature sets.
#[derive(Debug, Clone)]
pub struct QuorumVerifier {
    policy: QuorumPolicy,
    inner: EcdsaVerifier,
}

impl QuorumVerifier {
    pub fn new(policy: QuorumPolicy) -> Self {
        Self {
            policy,
            inner: EcdsaVerifier::new(),
        }
    }

    pub fn policy(&self) -> &QuorumPolicy {
        &self.policy
    }
}

impl MessageVerifier for QuorumVerifier {
    fn verify(
        &self,
        payload: &Value,
        signature: &str,
        signer: &Address,
    ) -> Result<bool, VerifierError> {
        self.inner.verify(payload, signature, signer)
    }

    fn verify_multiple(
        &self,
        payload: &Value,
        signatures: &[String],
        signers: &[Address],
    ) -> Result<bool, VerifierError> {
        let mut recovered = Vec::with_capacity(signatures.len());
        for signature in signatures {
            match self.inner.recover_payload(payload, signature) {
                Ok(address) => recovered.push(address),
                Err(e) => warn!(error = %e, "skipping unrecoverable signature"),
            }
        }
        Ok(self.policy.is_satisfied(&recovered, signers))
    }
}
