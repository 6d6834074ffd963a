/// Capability that produces clearsigned text.
///
/// Payloads and results are raw bytes in the document's charset.
/// Implementations are sync; the underlying tool may block on key ring
/// I/O. For async callers, use `spawn_blocking`.
pub trait ClearsignBackend: Send + Sync {
    /// Clearsign with a single default key.
    fn clearsign_default_key(&self, payload: &[u8], key: &str) -> anyhow::Result<Vec<u8>>;

    /// Clearsign once per key, in order, within one armored block.
    fn clearsign_local_users(&self, payload: &[u8], keys: &[String]) -> anyhow::Result<Vec<u8>>;
}
