//! # MLE Fan-out
//!
//! The two-phase handshake and encrypted notifications, driven through a
//! worker and read back with [`MleClient`](shared_crypto::MleClient).
//!
//! ```text
//! client                                worker
//!   │ start_session ───────────────────→ │ session row, cipher none
//!   │ dop_client_ready ────────────────→ │
//!   │ ←──────────── {phase 1, cipher_suites}  (mle 0)
//!   │ negotiate, fresh key               │
//!   │ dop_cipher_suite_selection ──────→ │ row rewritten: suite, key
//!   │ ←──────────── {err 0, phase 1}
//!   │ dop_client_ready ────────────────→ │
//!   │ ←──────────── sealed event          (mle 1)
//! ```

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use serde_json::{json, Value};
    use shared_crypto::{crc16, AesGcmCipher, MleClient, MleProviders, XChaChaCipher};
    use shared_types::Event;
    use std::sync::Arc;

    fn ready(worker: &mut TestWorker, session: &str) {
        worker.send(&message(session, "dop_client_ready", json!({"auth_token": TOKEN})));
    }

    fn last_raw(worker: &TestWorker, session: &str) -> String {
        worker
            .output
            .sent_to(session)
            .last()
            .map(|m| m.payload.clone())
            .expect("a message for the session")
    }

    /// Open a session and run the handshake with a client limited to `cipher`.
    fn negotiated(worker: &mut TestWorker, session: &str, client: &mut MleClient) {
        worker.open_session(session);
        ready(worker, session);
        let reply = client.open(&last_raw(worker, session)).unwrap();
        let suites = MleClient::suites_from_reply(&reply).unwrap();
        client.negotiate(&suites).unwrap();

        let mut params = client.selection_params();
        params["auth_token"] = json!(TOKEN);
        let report = worker.send(&message(session, "dop_cipher_suite_selection", params));
        assert!(report.is_success());
        let ack = client.open(&last_raw(worker, session)).unwrap();
        assert_eq!(ack.label(), "dop_cipher_suite_selection");
        assert_eq!(ack.payload["err"], 0);
    }

    #[test]
    fn test_crc16_reference() {
        assert_eq!(crc16(b"test"), "f82e");
    }

    #[test]
    fn test_cipher_none_is_plaintext() {
        let mut worker = TestWorker::standard();
        worker.open_session(SESSION_A);
        ready(&mut worker, SESSION_A);

        let body: Value = serde_json::from_str(&last_raw(&worker, SESSION_A)).unwrap();
        assert_eq!(body["mle"], 0);
        assert_eq!(body["event"], "dop_client_ready");
        assert_eq!(body["params"]["phase"], 1);
        assert!(body.get("session").is_none());
        let names: Vec<&str> = body["params"]["cipher_suites"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|s| s["name"].as_str())
            .collect();
        assert!(names.contains(&"aes"));
        assert!(names.contains(&"none"));
        assert!(names.contains(&"xchacha20"));
    }

    #[test]
    fn test_handshake_then_encrypted_notification() {
        let mut worker = TestWorker::standard();
        let mut client = MleClient::new(MleProviders::with_ciphers(vec![Arc::new(AesGcmCipher)]));
        negotiated(&mut worker, SESSION_A, &mut client);

        let row = worker.store.encrypted_session_for(SESSION_A).unwrap();
        assert_eq!(row.cipher_name, "aes");
        assert_eq!(row.integrity_fun, "crc16");

        ready(&mut worker, SESSION_A);
        let raw = last_raw(&worker, SESSION_A);
        let wire: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(wire["mle"], 1);
        assert_eq!(wire["cipher_suite_name"], "aes");
        assert_eq!(wire["integrity_fun"], "crc16");
        assert!(wire.get("event").is_none());

        let opened: Event = client.open(&raw).unwrap();
        assert_eq!(opened.label(), "dop_client_ready");
        assert_eq!(opened.payload["phase"], 1);
    }

    #[test]
    fn test_fan_out_uses_each_session_key() {
        let mut worker = TestWorker::standard();
        let mut client_a = MleClient::new(MleProviders::with_ciphers(vec![Arc::new(XChaChaCipher)]));
        negotiated(&mut worker, SESSION_A, &mut client_a);
        worker.open_session(SESSION_B);
        worker.output.take();

        // B has not negotiated: A gets a sealed copy, B a plaintext one.
        ready(&mut worker, SESSION_B);

        let to_a = last_raw(&worker, SESSION_A);
        let to_b: Value = serde_json::from_str(&last_raw(&worker, SESSION_B)).unwrap();
        assert_eq!(to_b["mle"], 0);
        assert_eq!(serde_json::from_str::<Value>(&to_a).unwrap()["mle"], 1);

        let opened = client_a.open(&to_a).unwrap();
        assert_eq!(opened.payload, to_b["params"].as_object().cloned().unwrap());
    }

    #[test]
    fn test_wrong_key_length_is_refused() {
        let mut worker = TestWorker::standard();
        worker.open_session(SESSION_A);
        let params = json!({
            "cipher_suite": {"name": "aes", "mode": "gcm", "keylength": 256},
            "cipher_key": shared_crypto::encode_base64(&[1u8; 16]),
            "auth_token": TOKEN,
        });
        worker.send(&message(SESSION_A, "dop_cipher_suite_selection", params));

        let body: Value = serde_json::from_str(&last_raw(&worker, SESSION_A)).unwrap();
        assert_eq!(body["params"]["err"], 803);
        assert_eq!(worker.store.encrypted_session_for(SESSION_A).unwrap().cipher_name, "none");
    }

    #[test]
    fn test_unserved_suite_is_refused() {
        let mut worker = TestWorker::standard();
        worker.open_session(SESSION_A);
        let params = json!({
            "cipher_suite": {"name": "des", "mode": "cbc", "keylength": 56},
            "cipher_key": "AAAA",
            "auth_token": TOKEN,
        });
        worker.send(&message(SESSION_A, "dop_cipher_suite_selection", params));
        let body: Value = serde_json::from_str(&last_raw(&worker, SESSION_A)).unwrap();
        assert_eq!(body["params"]["err"], 802);
    }
}
