use crate::domain::ports::PortProbe;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(200);

/// Checks the local port table: a port counts as taken when something
/// accepts a connection on loopback, or when binding it on all interfaces
/// fails with `AddrInUse`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPortProbe;

impl PortProbe for LocalPortProbe {
    fn is_in_use(&self, port: u16) -> bool {
        let loopback = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        if TcpStream::connect_timeout(&loopback, CONNECT_TIMEOUT).is_ok() {
            return true;
        }

        bind_reports_busy(TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)))
    }
}

// 權限不足 (例如非 root 綁定 1024 以下) 不代表有人佔用，埠仍交給 runtime 發佈
fn bind_reports_busy(result: io::Result<TcpListener>) -> bool {
    match result {
        Ok(_) => false,
        Err(e) => e.kind() == io::ErrorKind::AddrInUse,
    }
}
