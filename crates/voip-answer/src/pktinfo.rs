//! Recovers the kernel-selected local destination address for each inbound
//! SIP datagram via `IP_PKTINFO`/`IPV6_RECVPKTINFO`, so it can be embedded
//! as the SDP connection address in the reply — the same information the
//! original program reads back through `recvmsg`'s ancillary data.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};

use nix::sys::socket::sockopt::{Ipv4PacketInfo, Ipv6RecvPacketInfo};
use nix::sys::socket::{recvmsg, ControlMessageOwned, MsgFlags, SockaddrStorage};
use nix::sys::uio::IoSliceMut;
use tokio::net::UdpSocket;

/// Enables destination-address recovery on `socket`. Call once right after
/// binding; which sockopt applies depends on the bound address family.
pub fn enable(socket: &UdpSocket, is_ipv6: bool) -> io::Result<()> {
    let fd = socket.as_fd();
    let result = if is_ipv6 {
        nix::sys::socket::setsockopt(&fd, Ipv6RecvPacketInfo, &true)
    } else {
        nix::sys::socket::setsockopt(&fd, Ipv4PacketInfo, &true)
    };
    result.map_err(|errno| io::Error::from_raw_os_error(errno as i32))
}

/// One received datagram together with the local address the kernel
/// actually delivered it to (when PKTINFO ancillary data was present).
pub struct Received {
    pub len: usize,
    pub peer: SocketAddr,
    pub local_addr: Option<IpAddr>,
}

/// Awaits readability on `socket`, then performs one non-blocking `recvmsg`
/// pulling the PKTINFO control message out alongside the payload. Loops on
/// `EWOULDBLOCK` the way a tokio-native reader would.
pub async fn recv(socket: &UdpSocket, buf: &mut [u8]) -> io::Result<Received> {
    loop {
        socket.readable().await?;
        match try_recv(socket, buf) {
            Ok(received) => return Ok(received),
            Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => continue,
            Err(error) => return Err(error),
        }
    }
}

fn try_recv(socket: &UdpSocket, buf: &mut [u8]) -> io::Result<Received> {
    let fd: BorrowedFd<'_> = socket.as_fd();
    let mut iov = [IoSliceMut::new(buf)];
    let mut cmsg_space = nix::cmsg_space!(libc::in6_pktinfo);

    let msg = recvmsg::<SockaddrStorage>(fd.as_raw_fd(), &mut iov, Some(&mut cmsg_space), MsgFlags::empty())
        .map_err(|errno| io::Error::from_raw_os_error(errno as i32))?;

    let peer = msg
        .address
        .and_then(sockaddr_to_std)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "recvmsg returned no peer address"))?;

    let mut local_addr = None;
    for cmsg in msg.cmsgs() {
        match cmsg {
            ControlMessageOwned::Ipv4PacketInfo(info) => {
                local_addr = Some(IpAddr::V4(Ipv4Addr::from(u32::from_be(info.ipi_addr.s_addr))));
            }
            ControlMessageOwned::Ipv6PacketInfo(info) => {
                local_addr = Some(IpAddr::V6(Ipv6Addr::from(info.ipi6_addr.s6_addr)));
            }
            _ => {}
        }
    }

    Ok(Received { len: msg.bytes, peer, local_addr })
}

fn sockaddr_to_std(addr: SockaddrStorage) -> Option<SocketAddr> {
    if let Some(v4) = addr.as_sockaddr_in() {
        Some(SocketAddr::new(IpAddr::V4(v4.ip()), v4.port()))
    } else {
        addr.as_sockaddr_in6()
            .map(|v6| SocketAddr::new(IpAddr::V6(v6.ip()), v6.port()))
    }
}
