use std::{io, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::service::Service;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use metrics::gauge;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{OwnedSemaphorePermit, Semaphore},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type Body = BoxBody<Bytes, hyper::Error>;

/// Serve HTTP on `addr` until `shutdown` is cancelled. Each connection gets a
/// fresh service from `make_service`.
///
/// No more than `max_connections` are served at once. A connection arriving
/// while all slots are taken is closed without being read.
pub(crate) async fn run_httpd<F, S>(
    addr: SocketAddr,
    max_connections: usize,
    shutdown: CancellationToken,
    make_service: F,
) -> io::Result<()>
where
    F: Fn() -> S,
    S: Service<
            hyper::Request<hyper::body::Incoming>,
            Response = hyper::Response<Body>,
            Error = hyper::Error,
        > + Send
        + 'static,
    S::Future: Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!("chart viewer listening on {addr}");

    let slots = Arc::new(Semaphore::new(max_connections));
    let mut connections = JoinSet::new();
    gauge!("connection.limit").set(max_connections as f64);

    loop {
        let in_use = max_connections - slots.available_permits();
        gauge!("connection.current").set(in_use as f64);

        tokio::select! {
            () = shutdown.cancelled() => {
                let open = connections.len();
                debug!("viewer shutting down with {open} connections open");
                break;
            }

            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("accept failed: {e}");
                        continue;
                    }
                };
                let Ok(slot) = Arc::clone(&slots).try_acquire_owned() else {
                    warn!("{peer} refused, all {max_connections} connection slots in use");
                    continue;
                };
                connections.spawn(serve_connection(stream, peer, make_service(), slot));
            }

            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    warn!("connection task ended abnormally: {e}");
                }
            }
        }
    }

    drop(listener);
    while connections.join_next().await.is_some() {}
    Ok(())
}

async fn serve_connection<S>(
    stream: TcpStream,
    peer: SocketAddr,
    service: S,
    _slot: OwnedSemaphorePermit,
)
where
    S: Service<
            hyper::Request<hyper::body::Incoming>,
            Response = hyper::Response<Body>,
            Error = hyper::Error,
        > + Send
        + 'static,
    S::Future: Send + 'static,
{
    debug!("serving {peer}");
    if let Err(e) = auto::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        debug!("connection with {peer} closed with error: {e}");
    }
}
