use super::Endpoint;
use crate::domain::error::{ShellError, ShellResult};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::{debug, info, warn};

const SERIAL_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// Raw byte transport underneath the telemetry link
pub enum LinkIo {
    Serial(Box<dyn SerialPort>),
    Tcp(TcpStream),
    Udp {
        socket: UdpSocket,
        peer: Option<SocketAddr>,
        /// Reply to whoever sent the last datagram
        follow_sender: bool,
    },
}

impl LinkIo {
    /// Open the transport behind `endpoint`
    pub async fn open(endpoint: &Endpoint, baud: u32, connect_timeout: Duration) -> ShellResult<Self> {
        match endpoint {
            Endpoint::Serial { path, .. } => {
                let baud = endpoint.effective_baud(baud);
                let port = serialport::new(path, baud)
                    .timeout(Duration::from_millis(10))
                    .open()?;
                info!("Serial port {} opened at {} baud", path, baud);
                Ok(LinkIo::Serial(port))
            }
            Endpoint::Tcp { host, port } => {
                let stream = tokio::time::timeout(
                    connect_timeout,
                    TcpStream::connect((host.as_str(), *port)),
                )
                .await
                .map_err(|_| {
                    ShellError::Io(std::io::Error::new(
                        ErrorKind::TimedOut,
                        format!("Connection timeout to {}:{}", host, port),
                    ))
                })??;

                if let Err(e) = stream.set_nodelay(true) {
                    warn!("Failed to set TCP_NODELAY: {}", e);
                }
                info!("TCP connection established to {}:{}", host, port);
                Ok(LinkIo::Tcp(stream))
            }
            Endpoint::UdpIn { host, port } => {
                let socket = UdpSocket::bind((host.as_str(), *port)).await?;
                info!("Listening for UDP on {}:{}", host, port);
                Ok(LinkIo::Udp {
                    socket,
                    peer: None,
                    follow_sender: true,
                })
            }
            Endpoint::UdpOut { host, port } => {
                let peer = tokio::net::lookup_host((host.as_str(), *port))
                    .await?
                    .next()
                    .ok_or_else(|| ShellError::Endpoint(format!("cannot resolve {}", host)))?;
                let local: SocketAddr = if peer.is_ipv4() {
                    ([0, 0, 0, 0], 0).into()
                } else {
                    ([0u16; 8], 0).into()
                };
                let socket = UdpSocket::bind(local).await?;
                info!("Sending UDP to {}", peer);
                Ok(LinkIo::Udp {
                    socket,
                    peer: Some(peer),
                    follow_sender: false,
                })
            }
        }
    }

    /// Read whatever arrives within `wait`, returning 0 when nothing did
    pub async fn read_some(&mut self, buf: &mut [u8], wait: Duration) -> ShellResult<usize> {
        match self {
            LinkIo::Serial(port) => {
                port.set_timeout(wait.max(Duration::from_millis(1)))?;
                match port.read(buf) {
                    Ok(n) => Ok(n),
                    Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(0),
                    Err(e) => Err(e.into()),
                }
            }
            LinkIo::Tcp(stream) => match tokio::time::timeout(wait, stream.read(buf)).await {
                Ok(Ok(0)) => {
                    info!("TCP connection closed by peer");
                    Err(ShellError::LinkClosed)
                }
                Ok(Ok(n)) => Ok(n),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Ok(0),
            },
            LinkIo::Udp {
                socket,
                peer,
                follow_sender,
            } => match tokio::time::timeout(wait, socket.recv_from(buf)).await {
                Ok(Ok((n, from))) => {
                    if *follow_sender && *peer != Some(from) {
                        debug!("UDP peer is now {}", from);
                        *peer = Some(from);
                    }
                    Ok(n)
                }
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Ok(0),
            },
        }
    }

    pub async fn write_all(&mut self, bytes: &[u8]) -> ShellResult<()> {
        match self {
            LinkIo::Serial(port) => {
                port.set_timeout(SERIAL_WRITE_TIMEOUT)?;
                port.write_all(bytes)?;
                port.flush()?;
            }
            LinkIo::Tcp(stream) => {
                stream.write_all(bytes).await?;
                stream.flush().await?;
            }
            LinkIo::Udp { socket, peer, .. } => match peer {
                Some(addr) => {
                    socket.send_to(bytes, *addr).await?;
                }
                None => warn!("Dropping {} bytes, no UDP peer seen yet", bytes.len()),
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_serial_open_fails_gracefully() {
        let endpoint = Endpoint::Serial {
            path: "/dev/mavshell-does-not-exist".to_string(),
            baud: None,
        };
        let result = LinkIo::open(&endpoint, 115200, Duration::from_millis(100)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tcp_roundtrip_and_peer_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let endpoint = Endpoint::Tcp {
            host: "127.0.0.1".to_string(),
            port,
        };

        let (io, accepted) = tokio::join!(
            LinkIo::open(&endpoint, 0, Duration::from_secs(1)),
            listener.accept()
        );
        let mut io = io.unwrap();
        let (mut peer, _) = accepted.unwrap();

        io.write_all(b"ping").await.unwrap();
        let mut got = [0u8; 4];
        peer.read_exact(&mut got).await.unwrap();
        assert_eq!(&got, b"ping");

        let mut buf = [0u8; 16];
        assert_eq!(io.read_some(&mut buf, Duration::from_millis(20)).await.unwrap(), 0);

        peer.write_all(b"pong").await.unwrap();
        let n = io.read_some(&mut buf, Duration::from_millis(500)).await.unwrap();
        assert_eq!(&buf[..n], b"pong");

        drop(peer);
        let err = io.read_some(&mut buf, Duration::from_millis(500)).await.unwrap_err();
        assert!(matches!(err, ShellError::LinkClosed));
    }

    #[tokio::test]
    async fn test_udp_listener_learns_peer() {
        let endpoint = Endpoint::UdpIn {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let mut io = LinkIo::open(&endpoint, 0, Duration::from_secs(1)).await.unwrap();
        let local = match &io {
            LinkIo::Udp { socket, .. } => socket.local_addr().unwrap(),
            _ => unreachable!(),
        };

        // Nothing to answer yet
        io.write_all(b"early").await.unwrap();

        let remote = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        remote.send_to(b"hello", local).await.unwrap();

        let mut buf = [0u8; 64];
        let n = io.read_some(&mut buf, Duration::from_millis(500)).await.unwrap();
        assert_eq!(&buf[..n], b"hello");

        io.write_all(b"reply").await.unwrap();
        let (n, _) = remote.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"reply");
    }
}
