// Licensed under the Apache-2.0 license

//! IPv4 stream and datagram sockets.

use crate::error::{PalError, PalResult};
use nix::sys::socket::{
    self as nix_socket, sockopt, AddressFamily, MsgFlags, SockFlag, SockProtocol, SockType,
    SockaddrIn,
};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::unix::io::RawFd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    Stream,
    Datagram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

fn sockaddr(address: &str, port: u16) -> PalResult<SockaddrIn> {
    let ip: Ipv4Addr = address.parse().map_err(|_| PalError::InvalidParameter)?;
    Ok(SockaddrIn::from(SocketAddrV4::new(ip, port)))
}

/// Owned socket descriptor, closed on drop.
#[derive(Debug)]
pub struct Socket {
    fd: RawFd,
}

impl Socket {
    pub fn new(kind: SocketType, protocol: Protocol, reuse_addr: bool) -> PalResult<Self> {
        let (ty, proto) = match (kind, protocol) {
            (SocketType::Stream, Protocol::Tcp) => (SockType::Stream, SockProtocol::Tcp),
            (SocketType::Datagram, Protocol::Udp) => (SockType::Datagram, SockProtocol::Udp),
            _ => return Err(PalError::InvalidParameter),
        };
        let fd = nix_socket::socket(AddressFamily::Inet, ty, SockFlag::empty(), proto)?;
        let socket = Self { fd };
        if reuse_addr {
            nix_socket::setsockopt(socket.fd, sockopt::ReuseAddr, &true)?;
        }
        Ok(socket)
    }

    /// Binds to a dotted-quad `address` and `port`. Port 0 picks a free one.
    pub fn bind(&self, address: &str, port: u16) -> PalResult<()> {
        nix_socket::bind(self.fd, &sockaddr(address, port)?)?;
        Ok(())
    }

    pub fn listen(&self, max_connections: usize) -> PalResult<()> {
        if max_connections == 0 {
            return Err(PalError::InvalidParameter);
        }
        nix_socket::listen(self.fd, max_connections)?;
        Ok(())
    }

    /// Blocks until a peer connects and returns the connected socket.
    pub fn accept(&self) -> PalResult<Socket> {
        let fd = nix_socket::accept(self.fd)?;
        Ok(Socket { fd })
    }

    pub fn connect(&self, address: &str, port: u16) -> PalResult<()> {
        nix_socket::connect(self.fd, &sockaddr(address, port)?)?;
        Ok(())
    }

    pub fn send(&self, buf: &[u8]) -> PalResult<usize> {
        if buf.is_empty() {
            return Err(PalError::InvalidParameter);
        }
        Ok(nix_socket::send(self.fd, buf, MsgFlags::empty())?)
    }

    /// Receives into `buf`. Returns 0 once a stream peer has closed.
    pub fn receive(&self, buf: &mut [u8]) -> PalResult<usize> {
        if buf.is_empty() {
            return Err(PalError::InvalidParameter);
        }
        Ok(nix_socket::recv(self.fd, buf, MsgFlags::empty())?)
    }

    /// Port the socket is bound to.
    pub fn local_port(&self) -> PalResult<u16> {
        let addr: SockaddrIn = nix_socket::getsockname(self.fd)?;
        Ok(addr.port())
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.fd
    }

    /// Closes the descriptor, reporting any error the drop would swallow.
    pub fn close(self) -> PalResult<()> {
        let fd = self.fd;
        std::mem::forget(self);
        nix::unistd::close(fd)?;
        Ok(())
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if let Err(e) = nix::unistd::close(self.fd) {
            log::warn!("closing socket {} failed: {}", self.fd, e);
        }
    }
}
