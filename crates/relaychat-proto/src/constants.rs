/// Magic number at the beginning of every frame.
/// Used to quickly reject unrelated or corrupted data.
pub const MAGIC: u32 = 0x1234_5678;

/// Wire-format protocol version.
/// Bump this only for breaking changes to the header layout or message formats.
pub const VERSION: u16 = 0x0001;

/// Fixed header length in bytes (wire format).
pub const HEADER_LEN: usize = 16;

/// Maximum body size allowed for a single frame, in bytes.
/// Headers advertising more than this are treated as stream corruption.
pub const MAX_BODY_LEN: usize = 1024 * 1024;

/// Maximum size of one complete frame (header + body), in bytes.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_BODY_LEN;

/// Receive accumulator cap.
///
/// Set to accommodate one maximum-size frame plus some margin for partial
/// frames pipelined behind it. A peer whose accumulator grows past this is
/// not speaking the protocol and gets disconnected.
pub const RX_BUFFER_LIMIT: usize = MAX_FRAME_LEN + 64 * 1024;

/// Width of the `fileId` field (a 36-byte stringified UUID plus NUL).
pub const FILE_ID_LEN: usize = 37;
