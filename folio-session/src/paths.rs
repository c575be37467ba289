use std::path::{Path, PathBuf};

pub const SESSION_DIR: &str = ".folio";
pub const SESSION_SOCKET: &str = "session.sock";

pub fn folio_root(site: &Path) -> PathBuf {
    site.join(SESSION_DIR)
}

pub fn socket_path(site: &Path) -> PathBuf {
    folio_root(site).join(SESSION_SOCKET)
}
