use std::collections::HashMap;

use crate::session::SessionId;

/// Routing keys are `/`-separated segments, e.g. `sensors/<channel>/readings`.
/// Subscription patterns may additionally use `+` for exactly one segment
/// and a trailing `#` for any remainder (including none).
pub fn matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_segments = pattern.split('/');
    let mut topic_segments = topic.split('/');
    loop {
        match (pattern_segments.next(), topic_segments.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(p), Some(t)) if p == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// A topic or pattern is authorized when its leading literal segments match
/// one of the allow-listed prefixes. A wildcard inside the prefix-covered
/// segments cannot prove confinement, so it fails the check.
pub fn allowed(allow_list: &[String], topic_or_pattern: &str) -> bool {
    allow_list.iter().any(|prefix| {
        let mut topic_segments = topic_or_pattern.split('/');
        prefix
            .split('/')
            .all(|p| topic_segments.next() == Some(p))
    })
}

/// One subscription pattern and the set of sessions subscribed to it.
///
/// Each subscriber carries its granted QoS: the ceiling applied to every
/// delivery made through this subscription.
#[derive(Debug, Default)]
pub struct Subscription {
    pub pattern: String,
    pub subscribers: HashMap<SessionId, u8>,
}

impl Subscription {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            subscribers: HashMap::new(),
        }
    }

    /// Add a subscriber with its granted QoS. Re-subscribing updates the
    /// granted QoS in place.
    pub fn subscribe(&mut self, id: SessionId, granted_qos: u8) {
        self.subscribers.insert(id, granted_qos);
    }

    /// Remove a subscriber. If it is not subscribed, it has no effect.
    pub fn unsubscribe(&mut self, id: &SessionId) {
        self.subscribers.remove(id);
    }
}
