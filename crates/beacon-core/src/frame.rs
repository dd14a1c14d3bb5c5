//! Beacon wire format — every byte sequence peers exchange is built and
//! parsed here.
//!
//! The protocol is deliberately plain ASCII: a heartbeat line for
//! discovery, an unframed text payload for messages, a colon-delimited
//! one-shot header for stream file transfer, and a fixed-width padded
//! header for datagram file chunks. Changing any constant or delimiter
//! here is a breaking wire change.

// ── Constants ─────────────────────────────────────────────────────────────────

/// TCP port for stream messages and one-shot file transfers.
pub const DEFAULT_STREAM_PORT: u16 = 9000;

/// UDP port for datagram messages and file chunks.
pub const DEFAULT_DATAGRAM_PORT: u16 = 9001;

/// UDP port for discovery heartbeats.
pub const DEFAULT_DISCOVERY_PORT: u16 = 9002;

/// Limited-broadcast address heartbeats are sent to.
pub const BROADCAST_ADDR: &str = "255.255.255.255";

/// Seconds between heartbeat broadcasts.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 2;

/// Peers not heard from within this window are evicted from the registry.
pub const PEER_TIMEOUT_SECS: u64 = 10;

/// Maximum datagram size sent or expected on the datagram transport.
pub const UDP_PACKET_SIZE: usize = 1024;

/// Fixed width of the datagram chunk header, space-padded to length.
pub const CHUNK_HEADER_LEN: usize = 100;

/// Payload bytes available in one chunk datagram after the fixed header.
pub const CHUNK_PAYLOAD_MAX: usize = UDP_PACKET_SIZE - CHUNK_HEADER_LEN;

/// Marker prefix of a discovery heartbeat datagram.
pub const HEARTBEAT_MARKER: &[u8] = b"HEARTBEAT:";

/// Marker prefix of a file transfer payload on either transport.
pub const FILE_MARKER: &[u8] = b"FILE:";

/// Upper bound on a stream file header. A connection that sends this many
/// bytes without completing the header is treated as malformed.
pub const MAX_STREAM_HEADER: usize = 512;

/// Cap on one EOF-delimited stream text message.
pub const MAX_TEXT_BYTES: usize = 64 * 1024;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
///
/// All of these are per-item: the owning listener logs them and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("payload does not carry the {0} marker")]
    MissingMarker(&'static str),

    #[error("header has {got} fields, expected {want}")]
    FieldCount { want: usize, got: usize },

    #[error("header is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid decimal field {0:?}")]
    InvalidNumber(String),

    #[error("header exceeds {0} bytes without terminating")]
    HeaderTooLong(usize),

    #[error("chunk frame is {0} bytes, shorter than the fixed header")]
    ShortChunk(usize),

    #[error("filename {0:?} does not fit the fixed chunk header")]
    FilenameTooLong(String),
}

// ── Heartbeat ─────────────────────────────────────────────────────────────────

/// Build the `HEARTBEAT:<username>` discovery datagram.
pub fn encode_heartbeat(username: &str) -> Vec<u8> {
    let mut out = HEARTBEAT_MARKER.to_vec();
    out.extend_from_slice(username.as_bytes());
    out
}

/// Extract the username from a heartbeat datagram.
pub fn parse_heartbeat(payload: &[u8]) -> Result<&str, FrameError> {
    let rest = payload
        .strip_prefix(HEARTBEAT_MARKER)
        .ok_or(FrameError::MissingMarker("HEARTBEAT:"))?;
    std::str::from_utf8(rest).map_err(|_| FrameError::InvalidUtf8)
}

// ── Text ──────────────────────────────────────────────────────────────────────

/// Render a text message the way it travels on the wire.
pub fn render_text(username: &str, message: &str) -> String {
    format!("{username}: {message}")
}

// ── Classification ────────────────────────────────────────────────────────────

/// Does this payload carry the file transfer marker?
pub fn is_file_tagged(payload: &[u8]) -> bool {
    payload.starts_with(FILE_MARKER)
}

/// True while a partially-read payload could still grow into a file-tagged
/// one. Stream reads may return fewer bytes than the marker length.
pub fn may_become_file_tagged(buf: &[u8]) -> bool {
    buf.len() < FILE_MARKER.len() && FILE_MARKER.starts_with(buf)
}

// ── Stream file header ────────────────────────────────────────────────────────

/// Parsed `FILE:<username>:<filename>:<filesize>:` stream header.
///
/// `filesize` governs how many payload bytes follow on the same
/// connection. The receiver accepts fewer if the peer disconnects early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub username: String,
    pub filename: String,
    pub filesize: u64,
}

/// Build the one-shot stream file header.
pub fn encode_file_header(header: &FileHeader) -> Vec<u8> {
    format!(
        "FILE:{}:{}:{}:",
        header.username, header.filename, header.filesize
    )
    .into_bytes()
}

/// Incrementally parse a stream file header from the front of `buf`.
///
/// Returns `Ok(Some((header, consumed)))` once the full header is present;
/// bytes at `buf[consumed..]` are the start of the file payload.
/// Returns `Ok(None)` if more bytes are needed. `buf` must already start
/// with [`FILE_MARKER`].
pub fn parse_file_header(buf: &[u8]) -> Result<Option<(FileHeader, usize)>, FrameError> {
    if !is_file_tagged(buf) {
        return Err(FrameError::MissingMarker("FILE:"));
    }

    // Locate the three field-terminating colons after the marker.
    let mut colons = Vec::with_capacity(3);
    for (i, b) in buf.iter().enumerate().skip(FILE_MARKER.len()) {
        if *b == b':' {
            colons.push(i);
            if colons.len() == 3 {
                break;
            }
        }
    }

    if colons.len() < 3 {
        if buf.len() >= MAX_STREAM_HEADER {
            return Err(FrameError::HeaderTooLong(MAX_STREAM_HEADER));
        }
        return Ok(None);
    }

    let username = field(&buf[FILE_MARKER.len()..colons[0]])?;
    let filename = field(&buf[colons[0] + 1..colons[1]])?;
    let size_text = field(&buf[colons[1] + 1..colons[2]])?;
    let filesize: u64 = size_text
        .parse()
        .map_err(|_| FrameError::InvalidNumber(size_text.to_string()))?;

    Ok(Some((
        FileHeader {
            username: username.to_string(),
            filename: filename.to_string(),
            filesize,
        },
        colons[2] + 1,
    )))
}

fn field(bytes: &[u8]) -> Result<&str, FrameError> {
    std::str::from_utf8(bytes).map_err(|_| FrameError::InvalidUtf8)
}

// ── Datagram chunk header ─────────────────────────────────────────────────────

/// Parsed fixed-width chunk header:
/// `FILE:<username>:<filename>:<chunk_index>:<chunk_length>` space-padded
/// to [`CHUNK_HEADER_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    pub username: String,
    pub filename: String,
    pub index: u64,
    /// Payload length the sender declared. Datagram boundaries normally
    /// make this equal to the received payload length.
    pub length: usize,
}

/// Build one complete chunk datagram: padded header followed by payload.
pub fn encode_chunk_frame(
    username: &str,
    filename: &str,
    index: u64,
    payload: &[u8],
) -> Result<Vec<u8>, FrameError> {
    let info = format!("FILE:{username}:{filename}:{index}:{}", payload.len());
    if info.len() > CHUNK_HEADER_LEN {
        return Err(FrameError::FilenameTooLong(filename.to_string()));
    }

    let mut frame = format!("{info:<width$}", width = CHUNK_HEADER_LEN).into_bytes();
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Split a chunk datagram into its parsed header and payload bytes.
pub fn parse_chunk_frame(frame: &[u8]) -> Result<(ChunkHeader, &[u8]), FrameError> {
    if frame.len() < CHUNK_HEADER_LEN {
        return Err(FrameError::ShortChunk(frame.len()));
    }

    let header = std::str::from_utf8(&frame[..CHUNK_HEADER_LEN])
        .map_err(|_| FrameError::InvalidUtf8)?
        .trim_end();

    let parts: Vec<&str> = header.splitn(5, ':').collect();
    if parts.len() != 5 {
        return Err(FrameError::FieldCount {
            want: 5,
            got: parts.len(),
        });
    }
    if parts[0].as_bytes() != &FILE_MARKER[..FILE_MARKER.len() - 1] {
        return Err(FrameError::MissingMarker("FILE:"));
    }

    let index: u64 = parts[3]
        .parse()
        .map_err(|_| FrameError::InvalidNumber(parts[3].to_string()))?;
    let length: usize = parts[4]
        .parse()
        .map_err(|_| FrameError::InvalidNumber(parts[4].to_string()))?;

    Ok((
        ChunkHeader {
            username: parts[1].to_string(),
            filename: parts[2].to_string(),
            index,
            length,
        },
        &frame[CHUNK_HEADER_LEN..],
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
