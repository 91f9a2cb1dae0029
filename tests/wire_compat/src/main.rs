fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chunkup_protocol::{ChunkRecord, RemoteFile, Selector, SessionStatus, UploadSession};
    use chunkup_store::JsonStore;
    use chunkup_upload::{SessionStore, UploadEvent};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn read_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_str(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent comparison).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  Rust:    {reserialized}"
        );
        parsed
    }

    #[test]
    fn fixture_upload_session() {
        let session: UploadSession = roundtrip_test("upload_session.json");
        assert_eq!(session.selector, Selector::UploadFileNoDelete);
        assert_eq!(session.status, SessionStatus::UploadError);
        assert_eq!(session.ctime_header(), "1700000000");
        assert_eq!(session.mtime_header(), "1700000100");
    }

    #[test]
    fn fixture_chunk_record() {
        let chunk: ChunkRecord = roundtrip_test("chunk_record.json");
        assert_eq!(chunk.index, 2);
        assert_eq!(chunk.file_name, "00002");
        assert_eq!(chunk.checksum.len(), 64);
    }

    #[test]
    fn fixture_remote_file() {
        let file: RemoteFile = roundtrip_test("remote_file.json");
        assert!(file.delete_asset_local_identifier);
        assert!(file.asset_local_identifier.is_empty());
    }

    #[test]
    fn fixture_finished_event() {
        let event = UploadEvent::Finished {
            session_id: "9f0c4c0e8d7b4f7e9a51d2b0c3e4f5a6".into(),
            server_url: "https://cloud.example.com/remote.php/webdav/Photos".into(),
            account: "alice https://cloud.example.com".into(),
            file_name: "movie.mov".into(),
            temp_session_id: "9f0c4c0e8d7b4f7e9a51d2b0c3e4f5a6".into(),
            error_code: -1005,
            error_description: String::new(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            load_fixture("finished_event.json")
        );
    }

    #[test]
    fn fixture_session_store_resumes_in_plan_order() {
        // Loading never writes, so the fixture can be opened in place.
        let store = JsonStore::new(fixtures_dir().join("session_store.json")).unwrap();
        let session = store.session("s1").unwrap();
        assert_eq!(session.status, SessionStatus::UploadError);
        assert_eq!(session.selector, Selector::UploadFile);

        let pending = store.chunks(&session.account, &session.id);
        let names: Vec<_> = pending.iter().map(|c| c.file_name.as_str()).collect();
        assert_eq!(names, ["00002", "00003"]);
        assert!(pending.iter().all(|c| c.chunk_folder == "folder-s1"));
    }

    #[test]
    fn fixture_propfind_file() {
        let entries = chunkup_webdav::parse_multistatus(&read_fixture("propfind_file.xml")).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.oc_id, "00000042ocabc123");
        assert_eq!(entry.file_id, "42");
        assert_eq!(entry.etag, "5f3c1a");
        assert_eq!(entry.size, 26_214_400);
        assert_eq!(chunkup_webdav::last_segment(&entry.href), "movie.mov");
        assert!(!entry.is_collection);
    }
}
