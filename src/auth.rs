//! Access gate: privileged identity, persisted allow-list, and the two
//! unlock paths (password match, completed payment).

use crate::storage::StorageManager;
use std::sync::{Arc, Mutex};

const ALLOWLIST_FILE: &str = "whitelist.json";

/// Invoice payload tag. A pre-checkout confirmation carrying anything else
/// is rejected before the charge is accepted.
pub const ACCESS_PAYLOAD_TAG: &str = "cinecast_access_v1";

pub struct AccessGate {
    admin_id: u64,
    store: Arc<dyn StorageManager>,
    // serializes read-modify-write of the allow-list across handler threads
    write_lock: Mutex<()>,
}

impl AccessGate {
    pub fn new(admin_id: u64, store: Arc<dyn StorageManager>) -> Self {
        Self {
            admin_id,
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn load_list(&self) -> Vec<u64> {
        if !self.store.exists(ALLOWLIST_FILE) {
            return Vec::new();
        }
        match self
            .store
            .read(ALLOWLIST_FILE)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| serde_json::from_slice(&bytes).map_err(anyhow::Error::from))
        {
            Ok(list) => list,
            Err(e) => {
                log::error!("error loading allow-list: {e}");
                Vec::new()
            }
        }
    }

    fn save_list(&self, list: &[u64]) {
        let data = match serde_json::to_vec(list) {
            Ok(d) => d,
            Err(e) => {
                log::error!("error serializing allow-list: {e}");
                return;
            }
        };
        if let Err(e) = self.store.write(ALLOWLIST_FILE, &data) {
            log::error!("error saving allow-list: {e}");
        }
    }

    pub fn is_authorized(&self, user_id: u64) -> bool {
        // admin is always authorized
        if user_id == self.admin_id {
            return true;
        }

        self.load_list().contains(&user_id)
    }

    /// Idempotent: adding an already-present identity is a no-op.
    pub fn authorize(&self, user_id: u64) {
        let _guard = self.write_lock.lock().expect("allow-list lock poisoned");

        let mut list = self.load_list();
        if !list.contains(&user_id) {
            list.push(user_id);
            self.save_list(&list);
            log::info!("user {user_id} authorized");
        }
    }
}

/// Validates a password attempt against the configured secret using
/// constant-time comparison, so the reply timing leaks nothing about
/// where the attempt diverged.
///
/// Returns `false` if either side is empty.
pub fn password_matches(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    if provided.is_empty() || expected.is_empty() {
        return false;
    }

    let len_match = provided.len() == expected.len();

    let mut diff: u8 = 0;
    for (a, b) in provided.iter().zip(expected.iter()) {
        diff |= a ^ b;
    }

    len_match && diff == 0
}

/// Payment confirmations must carry the exact expected payload tag.
pub fn payload_tag_valid(payload: &str) -> bool {
    payload == ACCESS_PAYLOAD_TAG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BackendLocal;

    fn create_gate(admin_id: u64) -> (AccessGate, tempfile::TempDir) {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let store =
            Arc::new(BackendLocal::new(tmp.path().to_str().unwrap()).expect("failed to create storage"));
        (AccessGate::new(admin_id, store), tmp)
    }

    #[test]
    fn test_unknown_user_denied() {
        let (gate, _tmp) = create_gate(1);
        assert!(!gate.is_authorized(42));
    }

    #[test]
    fn test_admin_always_authorized() {
        let (gate, _tmp) = create_gate(1);
        assert!(gate.is_authorized(1));
    }

    #[test]
    fn test_authorize_then_allowed() {
        let (gate, _tmp) = create_gate(1);
        assert!(!gate.is_authorized(42));
        gate.authorize(42);
        assert!(gate.is_authorized(42));
    }

    #[test]
    fn test_authorize_is_idempotent() {
        let (gate, _tmp) = create_gate(1);
        gate.authorize(42);
        gate.authorize(42);
        assert_eq!(gate.load_list(), vec![42]);
    }

    #[test]
    fn test_corrupt_list_treated_as_empty() {
        let (gate, tmp) = create_gate(1);
        std::fs::write(tmp.path().join(ALLOWLIST_FILE), b"not json").unwrap();
        assert!(!gate.is_authorized(42));
        gate.authorize(42);
        assert!(gate.is_authorized(42));
    }

    #[test]
    fn test_password_matching() {
        assert!(password_matches("secret123", "secret123"));
        assert!(!password_matches("secret123", "secret124"));
        assert!(!password_matches("secret123", "SECRET123"));
        assert!(!password_matches("short", "longer"));
    }

    #[test]
    fn test_password_empty_never_valid() {
        assert!(!password_matches("", ""));
        assert!(!password_matches("", "secret"));
        assert!(!password_matches("secret", ""));
    }

    #[test]
    fn test_payload_tag() {
        assert!(payload_tag_valid(ACCESS_PAYLOAD_TAG));
        assert!(!payload_tag_valid("cinecast_access_v2"));
        assert!(!payload_tag_valid(""));
    }
}
