//! Turns the raw relay stream into the records one identity should see, once each.

use std::collections::HashSet;

use crate::common::{ChatRecord, RecordKey};
use crate::identity::{SignatureCheck, check_signature};

/// How strictly record signatures are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePolicy {
    /// Unsigned and badly signed records are dropped.
    Required,
    /// Unsigned records pass; badly signed ones are dropped.
    IfPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// Missing timestamp or sender.
    Malformed,
    /// Neither sent by nor addressed to this identity.
    Irrelevant,
    Unverified,
    Duplicate,
}

/// Seen-set plus identity filter. Lives as long as the subscription it guards.
#[derive(Debug)]
pub struct RecordFilter {
    identity: String,
    policy: SignaturePolicy,
    seen: HashSet<RecordKey>,
}

impl RecordFilter {
    /// Start a filter that already counts `history` as seen.
    pub fn seeded(identity: &str, policy: SignaturePolicy, history: &[ChatRecord]) -> Self {
        Self {
            identity: identity.to_string(),
            policy,
            seen: history.iter().map(ChatRecord::key).collect(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn has_seen(&self, key: &RecordKey) -> bool {
        self.seen.contains(key)
    }

    /// Decide on one incoming record. Only `Accepted` marks it as seen.
    pub fn offer(&mut self, record: &ChatRecord) -> Verdict {
        if !record.is_well_formed() {
            return Verdict::Malformed;
        }
        if !record.involves(&self.identity) {
            return Verdict::Irrelevant;
        }
        match (check_signature(record), self.policy) {
            (SignatureCheck::Valid, _) | (SignatureCheck::Missing, SignaturePolicy::IfPresent) => {}
            (check, _) => {
                log::debug!("Dropping record {} ({check:?} signature)", record.id);
                return Verdict::Unverified;
            }
        }
        if !self.seen.insert(record.key()) {
            return Verdict::Duplicate;
        }
        Verdict::Accepted
    }
}
