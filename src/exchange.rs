use crate::registry::Registry;
use crate::transfer;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Serves registered files over one-shot TCP listeners.
///
/// The listener for a code binds the port equal to the code, accepts exactly
/// one connection and hands it to a sender task. The code is released as
/// soon as that connection arrives, so a code can be downloaded once.
#[derive(Debug, Clone)]
pub struct Exchange {
    registry: Arc<Registry>,
    host: IpAddr,
    listen_timeout: Option<Duration>,
}

impl Exchange {
    /// `listen_timeout` bounds how long a listener waits for its peer;
    /// `None` waits forever.
    pub fn new(registry: Arc<Registry>, host: IpAddr, listen_timeout: Option<Duration>) -> Exchange {
        Exchange {
            registry,
            host,
            listen_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    /// Binds the listener for `code` and waits for its single peer.
    ///
    /// Returns once the sender task has been dispatched, or once the listen
    /// timeout has released the code.
    pub async fn serve(&self, code: u16) -> crate::Result<()> {
        let (listener, path) = self.bind(code).await?;
        accept_one(Arc::clone(&self.registry), code, path, listener, self.listen_timeout).await
    }

    /// Binds the listener for `code` now and waits for the peer on a
    /// background task.
    ///
    /// Bind failures are returned to the caller; anything after that is only
    /// logged.
    pub async fn start(&self, code: u16) -> crate::Result<JoinHandle<()>> {
        let (listener, path) = self.bind(code).await?;
        let registry = Arc::clone(&self.registry);
        let listen_timeout = self.listen_timeout;

        Ok(tokio::spawn(async move {
            if let Err(err) = accept_one(registry, code, path, listener, listen_timeout).await {
                log::error!("exchange on port {} failed: {}", code, err);
            }
        }))
    }

    async fn bind(&self, code: u16) -> crate::Result<(TcpListener, PathBuf)> {
        let path = self.registry.lookup(code)?.ok_or(crate::Error::UnknownCode(code))?;

        let listener = TcpListener::bind(SocketAddr::new(self.host, code))
            .await
            .map_err(|cause| crate::Error::BindFailed { code, cause })?;

        log::info!("exchange listening on port {} for {}", code, path.display());
        Ok((listener, path))
    }
}

async fn accept_one(
    registry: Arc<Registry>,
    code: u16,
    path: PathBuf,
    listener: TcpListener,
    listen_timeout: Option<Duration>,
) -> crate::Result<()> {
    let accepted = match listen_timeout {
        Some(limit) => match tokio::time::timeout(limit, listener.accept()).await {
            Ok(accepted) => accepted,
            Err(_) => {
                log::warn!("no peer for port {} within {:?}, releasing it", code, limit);
                registry.release(code)?;
                remove_shared_file(&path).await;
                return Ok(());
            }
        },
        None => listener.accept().await,
    };
    drop(listener);

    let (peer, peer_addr) = match accepted {
        Ok(accepted) => accepted,
        Err(err) => {
            registry.release(code)?;
            remove_shared_file(&path).await;
            return Err(err.into());
        }
    };

    registry.release(code)?;
    log::info!("peer {} connected on port {}", peer_addr, code);

    tokio::spawn(async move {
        match send_file(peer, &path).await {
            Ok(sent) => log::info!("sent {} ({} bytes) to {}", path.display(), sent, peer_addr),
            Err(err) => log::error!("failed sending {} to {}: {}", path.display(), peer_addr, err),
        }
        remove_shared_file(&path).await;
    });

    Ok(())
}

/// Writes the transfer header and the content of `path` to `peer`, then shuts
/// the peer down.
///
/// Returns the number of content bytes sent, header excluded.
pub async fn send_file<W>(mut peer: W, path: &Path) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let result = write_file(&mut peer, path).await;
    let _ = peer.shutdown().await;
    result
}

async fn write_file<W>(peer: &mut W, path: &Path) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut file = File::open(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    transfer::write_header(peer, &file_name).await?;
    let sent = tokio::io::copy(&mut file, peer).await?;
    peer.flush().await?;

    Ok(sent)
}

/// Opens a client connection to the exchange listener for `code`.
pub(crate) async fn connect(host: IpAddr, code: u16) -> crate::Result<TcpStream> {
    TcpStream::connect(SocketAddr::new(host, code))
        .await
        .map_err(|cause| crate::Error::ConnectFailed { code, cause })
}

// Stored uploads live alone in their own directory.
pub(crate) async fn remove_shared_file(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        log::warn!("failed to remove {}: {}", path.display(), err);
        return;
    }

    if let Some(dir) = path.parent() {
        let _ = tokio::fs::remove_dir(dir).await;
    }
}
