//! Threshold store: accumulates signatures per message hash.
//!
//! Every replica independently signs each valid message it sees and merges
//! the signatures other replicas attached to their copies of the same
//! message. The store reports [`Outcome::Promoted`] exactly once per hash:
//! on the delivery that first brings the number of distinct signers to the
//! threshold. Signers are identified through [`Verifier::signer_of`], so a
//! second, differently-encoded signature from a validator already counted is
//! dropped. Redelivery of the same or overlapping signature sets never
//! promotes again.
//!
//! Entries are indexed by height so the store can be pruned as the replica's
//! height advances. Messages below the pruned floor are ignored, which keeps
//! the exactly-once guarantee after their entries are gone.

use hyperdrive_crypto::{Signer, Verifier};
use hyperdrive_messages::{Fault, Message};
use hyperdrive_types::{Digest, Height, Signature, Signatures};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::ConsensusError;

/// Result of accumulating one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The message just reached the threshold; carries the accumulated
    /// signature set.
    Promoted(Message),
    /// Below threshold, already promoted, or below the pruned floor.
    Pending,
    /// The message failed verification; carries a locally signed fault for
    /// its `(rank, height)`.
    Fault(Fault),
}

struct Entry {
    message: Message,
    signatures: Signatures,
    /// Validator indices behind `signatures`, one signature each.
    signers: BTreeSet<usize>,
}

impl Entry {
    fn new(message: Message) -> Self {
        Self {
            message,
            signatures: Signatures::new(),
            signers: BTreeSet::new(),
        }
    }

    /// Keep each signature whose signer is not yet represented.
    fn absorb<'a>(
        &mut self,
        hash: &Digest,
        incoming: impl IntoIterator<Item = &'a Signature>,
        verifier: &dyn Verifier,
    ) {
        for signature in incoming {
            if self.signatures.contains(signature) {
                continue;
            }
            match verifier.signer_of(hash, signature) {
                Some(index) if self.signers.insert(index) => {
                    self.signatures.insert(*signature);
                }
                Some(index) => {
                    tracing::debug!(index, %hash, "ignoring second signature from one validator");
                }
                None => tracing::trace!(%hash, "ignoring signature from unknown signer"),
            }
        }
    }

    fn count(&self) -> usize {
        self.signers.len()
    }

    fn promoted(&self) -> Message {
        self.message.clone().with_signatures(self.signatures.clone())
    }
}

/// Per-stage accumulation state.
#[derive(Default)]
pub struct ThresholdStore {
    entries: HashMap<Digest, Entry>,
    /// Height index: maps heights to the hashes stored at that height.
    by_height: BTreeMap<Height, Vec<Digest>>,
    /// Messages below this height are no longer admissible.
    floor: Height,
}

impl ThresholdStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify, sign and accumulate `message`.
    ///
    /// Fails only if `signer` fails; verification failures are returned as
    /// [`Outcome::Fault`].
    pub fn accumulate(
        &mut self,
        message: Message,
        signer: &dyn Signer,
        verifier: &dyn Verifier,
        threshold: usize,
    ) -> Result<Outcome, ConsensusError> {
        let height = message.height();
        if height < self.floor {
            tracing::trace!(height, floor = self.floor, "ignoring message below pruned height");
            return Ok(Outcome::Pending);
        }

        if let Err(e) = message.verify(verifier) {
            tracing::debug!(
                kind = %message.kind(),
                rank = message.rank(),
                height,
                error = %e,
                "message failed verification"
            );
            let fault = message.fault().signed(signer)?;
            return Ok(Outcome::Fault(fault));
        }

        let hash = message.hash();
        match self.entries.get_mut(&hash) {
            None => {
                let local = signer.sign(&hash)?;
                let incoming = message.signatures();
                let mut entry = Entry::new(message);
                entry.absorb(&hash, std::iter::once(&local).chain(incoming.iter()), verifier);
                let promoted = (entry.count() >= threshold).then(|| entry.promoted());
                self.entries.insert(hash, entry);
                self.by_height.entry(height).or_default().push(hash);
                Ok(promoted.map_or(Outcome::Pending, Outcome::Promoted))
            }
            Some(entry) if entry.count() >= threshold => Ok(Outcome::Pending),
            Some(entry) => {
                entry.absorb(&hash, message.signatures().iter(), verifier);
                if entry.count() >= threshold {
                    Ok(Outcome::Promoted(entry.promoted()))
                } else {
                    Ok(Outcome::Pending)
                }
            }
        }
    }

    /// Drop every entry below `height` and refuse messages below it from now
    /// on. Lowering the floor is a no-op.
    pub fn prune_below(&mut self, height: Height) {
        if height <= self.floor {
            return;
        }
        self.floor = height;
        let kept = self.by_height.split_off(&height);
        for hash in std::mem::replace(&mut self.by_height, kept)
            .into_values()
            .flatten()
        {
            self.entries.remove(&hash);
        }
    }

    /// Accumulated signatures for `hash`, if it is stored.
    pub fn signatures(&self, hash: &Digest) -> Option<&Signatures> {
        self.entries.get(hash).map(|e| &e.signatures)
    }

    /// Lowest admissible height.
    pub fn floor(&self) -> Height {
        self.floor
    }

    /// Number of distinct message hashes held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
