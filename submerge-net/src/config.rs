/// Tunables for the buffered connection. The original's buffer size was a
/// compile-time constant; here it is a runtime field so a driver can size
/// it for the transport it's actually running over.
#[derive(Clone, Copy, Debug)]
pub struct CodecConfig {
    /// Size, in bytes, of both the read-ahead and write-behind buffers.
    /// Strings and direct reads/writes longer than this bypass the buffer
    /// entirely rather than being chunked through it.
    pub buf_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig { buf_size: 4096 }
    }
}
