#![forbid(unsafe_code)]

use std::time::Duration;

use quantboard_core::Listing;
use tracing::{debug, info};

use crate::{CollectionPath, FirestoreClient, FirestoreError};

/// Identity of a listing: ordered `(id, version)` pairs. The version is the
/// store's update time, or the serialized fields when the store sent none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fingerprint(Vec<(String, String)>);

impl Fingerprint {
    pub fn of(listing: &Listing) -> Self {
        let mut pairs: Vec<(String, String)> = listing
            .iter()
            .map(|d| {
                let version = match d.update_time.as_deref() {
                    Some(t) => t.to_string(),
                    None => serde_json::Value::Object(d.fields.clone()).to_string(),
                };
                (d.id.clone(), version)
            })
            .collect();
        pairs.sort();
        Self(pairs)
    }
}

/// Re-lists a collection on an interval and reports full listings only when
/// something changed.
pub struct Watcher {
    client: FirestoreClient,
    path: CollectionPath,
    interval: Duration,
    last: Option<Fingerprint>,
}

impl Watcher {
    pub fn new(client: FirestoreClient, path: CollectionPath, interval: Duration) -> Self {
        Self { client, path, interval, last: None }
    }

    pub fn path(&self) -> &CollectionPath { &self.path }

    /// Record `listing` as the last delivered state. Returns true when it
    /// differs from the previous one.
    pub fn observe(&mut self, listing: &Listing) -> bool {
        let fp = Fingerprint::of(listing);
        if self.last.as_ref() == Some(&fp) {
            return false;
        }
        self.last = Some(fp);
        true
    }

    /// One list round trip. `Some` when the collection changed since the
    /// last delivered listing (always on the first call).
    pub async fn poll(&mut self) -> Result<Option<Listing>, FirestoreError> {
        let listing = self.client.list_documents(&self.path).await?;
        if self.observe(&listing) {
            Ok(Some(listing))
        } else {
            Ok(None)
        }
    }

    /// Poll forever, handing every changed listing to `on_change`. Returns
    /// only on error; cancel by dropping the future.
    pub async fn run(&mut self, on_change: &mut (dyn FnMut(Listing) + Send)) -> Result<(), FirestoreError> {
        info!(path = %self.path, "watcher: started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match self.poll().await? {
                Some(listing) => {
                    info!(path = %self.path, docs = listing.len(), "watcher: collection changed");
                    on_change(listing);
                }
                None => debug!(path = %self.path, "watcher: no change"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantboard_core::Document;
    use serde_json::json;

    fn doc(id: &str, t: Option<&str>) -> Document {
        let mut d = Document::new(id, json!({ "Strategy_Name": id }).as_object().cloned().unwrap_or_default());
        d.update_time = t.map(String::from);
        d
    }

    #[test]
    fn fingerprint_ignores_order_and_tracks_versions() {
        let a = vec![doc("a", Some("1")), doc("b", Some("1"))];
        let b = vec![doc("b", Some("1")), doc("a", Some("1"))];
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
        let c = vec![doc("a", Some("2")), doc("b", Some("1"))];
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&c));
        let removed = vec![doc("a", Some("1"))];
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&removed));
    }

    #[test]
    fn observe_reports_only_changes() {
        let mut cfg = crate::ClientConfig::new("p");
        cfg.emulator_host = Some("localhost:1".into());
        let client = FirestoreClient::new(cfg).unwrap();
        let mut w = Watcher::new(client, "c".parse().unwrap(), Duration::from_secs(1));
        let l1 = vec![doc("a", Some("1"))];
        assert!(w.observe(&l1));
        assert!(!w.observe(&l1));
        assert!(w.observe(&Vec::new()));
        assert!(w.observe(&l1));
    }

    #[test]
    fn fingerprint_falls_back_to_fields() {
        let mut x = doc("a", None);
        let before = Fingerprint::of(&vec![x.clone()]);
        x.fields.insert("Risk_Level".into(), json!("High"));
        assert_ne!(before, Fingerprint::of(&vec![x]));
    }
}
