//! The local socket channel to the dataplane
use std::{
    os::fd::{AsRawFd, OwnedFd},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use nix::sys::socket::{
    connect,
    recv,
    send,
    socket,
    AddressFamily,
    MsgFlags,
    SockFlag,
    SockType,
    UnixAddr,
};

use crate::msg::{DumpRequest, Response, MAX_BUFSZ};

/// Name of the dataplane's socket within the socket directory
pub const SOCK_NAME: &str = "dpdk_netlink";

/// Room for a MAX_BUFSZ payload after JSON encoding, plus the envelope.  One extra byte lets us
/// detect a truncated message.
const RECV_BUFSZ: usize = 6 * MAX_BUFSZ as usize + 4096 + 1;

/// A connection to the dataplane.  Each socket message carries exactly one protocol message.
#[derive(Debug)]
pub struct Connection {
    fd: OwnedFd,
    buf: Vec<u8>,
}

#[cfg_attr(test, mockall::automock)]
impl Connection {
    /// Connect to the dataplane socket in `sock_dir`
    pub fn connect(sock_dir: &Path) -> Result<Self> {
        let path: PathBuf = sock_dir.join(SOCK_NAME);
        let addr = UnixAddr::new(&path)
            .with_context(|| format!("invalid socket path {}", path.display()))?;
        let fd = socket(AddressFamily::Unix, SockType::SeqPacket, SockFlag::SOCK_CLOEXEC, None)
            .context("creating socket")?;
        connect(fd.as_raw_fd(), &addr)
            .with_context(|| format!("connecting to {}", path.display()))?;
        log::debug!("connected to {}", path.display());
        Ok(Self::from_fd(fd))
    }

    /// Wrap an already connected sequenced-packet socket
    pub fn from_fd(fd: OwnedFd) -> Self {
        Connection { fd, buf: vec![0; RECV_BUFSZ] }
    }

    pub fn send(&mut self, req: &DumpRequest) -> Result<()> {
        let data = serde_json::to_vec(req).context("encoding dump request")?;
        let n = send(self.fd.as_raw_fd(), &data, MsgFlags::MSG_NOSIGNAL)?;
        if n != data.len() {
            return Err(anyhow!("short send: {} of {} bytes", n, data.len()));
        }
        Ok(())
    }

    /// Receive the next message.  Returns `None` once the peer has closed the connection.
    pub fn recv(&mut self) -> Result<Option<Response>> {
        let n = recv(self.fd.as_raw_fd(), &mut self.buf, MsgFlags::empty())?;
        if n == 0 {
            return Ok(None);
        }
        if n == self.buf.len() {
            return Err(anyhow!("message truncated at {} bytes", n));
        }
        let resp = serde_json::from_slice(&self.buf[..n]).context("decoding dump response")?;
        Ok(Some(resp))
    }
}
