//! Remote URL construction for staging folders, chunks and destinations.

use sha2::{Digest, Sha256};

use crate::constants::{DAV_ROOT, STAGING_MARKER, WEBDAV_ROOT};

/// Derives the staging folder name for a session.
///
/// The name depends only on `account` and `session_id`, so a resumed
/// session always lands in the same remote folder.
pub fn chunk_folder_name(account: &str, session_id: &str) -> String {
    let digest = Sha256::digest(format!("{account}/{session_id}").as_bytes());
    hex::encode(&digest[..16])
}

/// `<urlBase>/remote.php/dav/uploads/<userId>/<folder>`
pub fn chunk_folder_url(url_base: &str, user_id: &str, folder: &str) -> String {
    format!(
        "{}{DAV_ROOT}/uploads/{user_id}/{folder}",
        url_base.trim_end_matches('/')
    )
}

/// URL of one staged chunk inside a staging folder.
pub fn chunk_url(folder_url: &str, chunk_name: &str) -> String {
    format!("{folder_url}/{chunk_name}")
}

/// URL of the marker object that is moved to trigger assembly.
pub fn staging_marker_url(folder_url: &str) -> String {
    format!("{folder_url}/{STAGING_MARKER}")
}

/// `<urlBase>/remote.php/webdav`
pub fn home_url(url_base: &str) -> String {
    format!("{}{WEBDAV_ROOT}", url_base.trim_end_matches('/'))
}

/// Returns the directory path of `server_url` relative to the WebDAV root.
///
/// The home directory yields `""`; a sub-directory yields `"/a/b"`.
/// Returns `None` when `server_url` is not under `url_base`'s WebDAV root.
pub fn path_from_server_url<'a>(server_url: &'a str, url_base: &str) -> Option<&'a str> {
    let home = home_url(url_base);
    let rest = server_url.strip_prefix(home.as_str())?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest.trim_end_matches('/'))
    } else {
        None
    }
}

/// `<urlBase>/remote.php/dav/files/<userId><path>/<fileName>`
pub fn destination_url(
    url_base: &str,
    user_id: &str,
    server_url: &str,
    file_name: &str,
) -> Option<String> {
    let path = path_from_server_url(server_url, url_base)?;
    Some(format!(
        "{}{DAV_ROOT}/files/{user_id}{path}/{file_name}",
        url_base.trim_end_matches('/')
    ))
}
