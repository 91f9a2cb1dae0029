use std::time::Duration;

/// Header carrying the original creation time on the assembly MOVE.
pub const HEADER_CTIME: &str = "X-OC-CTime";

/// Header carrying the original modification time on the assembly MOVE.
pub const HEADER_MTIME: &str = "X-OC-MTime";

/// Header carrying a per-chunk payload checksum.
pub const HEADER_CHECKSUM: &str = "OC-Checksum";

/// Classic WebDAV root used by `serverUrl` values.
pub const WEBDAV_ROOT: &str = "/remote.php/webdav";

/// New-style DAV root used for chunk staging and assembly.
pub const DAV_ROOT: &str = "/remote.php/dav";

/// Marker object inside a staging folder; moving it triggers assembly.
pub const STAGING_MARKER: &str = ".file";

/// Default chunk size in megabytes.
pub const DEFAULT_CHUNK_SIZE_MB: u64 = 10;

/// Assembly time budget per gigabyte of payload.
pub const ASSEMBLE_TIME_PER_GB: Duration = Duration::from_secs(3 * 60);

/// Lower bound for the assembly timeout.
pub const ASSEMBLE_TIME_MIN: Duration = Duration::from_secs(60);

/// Upper bound for the assembly timeout.
pub const ASSEMBLE_TIME_MAX: Duration = Duration::from_secs(30 * 60);

/// Success.
pub const ERROR_NONE: i64 = 0;
/// The transport cancelled the request (URL-loading cancel code).
pub const ERROR_CANCELLED: i64 = -999;
/// The caller explicitly cancelled the upload.
pub const ERROR_EXPLICITLY_CANCELLED: i64 = -998;
/// The request timed out.
pub const ERROR_TIMED_OUT: i64 = -1001;
/// The network connection was lost mid-transfer.
pub const ERROR_CONNECTION_LOST: i64 = -1005;
/// The remote resource does not exist.
pub const ERROR_RESOURCE_NOT_FOUND: i64 = 404;
/// The local source file could not be read.
pub const ERROR_READ_FILE: i64 = -9993;
/// Catch-all code attached to user-facing error notices.
pub const ERROR_INTERNAL: i64 = -9999;
