//! The HTTP surface: upload, download and CORS preflight.

use crate::config::Config;
use crate::decoder::MultipartDecoder;
use crate::exchange::{self, Exchange};
use crate::registry::Registry;
use crate::relay;
use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt};
use http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE,
};
use http::{Method, Request, Response, StatusCode};
use http_body::{Body, Frame};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, BodyStream, Empty, Full, StreamBody};
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type of every response produced by [`Service`].
pub type ResponseBody = BoxBody<Bytes, io::Error>;

#[derive(Serialize)]
struct UploadResponse {
    port: u16,
}

/// Request handler holding the shared registry and exchange.
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone)]
pub struct Service {
    config: Arc<Config>,
    registry: Arc<Registry>,
    exchange: Exchange,
}

impl Service {
    pub fn new(config: Config) -> Service {
        let registry = Arc::new(Registry::new(config.codes.clone()));
        let exchange = Exchange::new(Arc::clone(&registry), config.exchange_host, config.listen_timeout);

        Service {
            config: Arc::new(config),
            registry,
            exchange,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Routes `req` and always produces a response; failures become
    /// `text/plain` error responses.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<ResponseBody>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        log::debug!("{} {}", method, path);

        let result = if method == Method::OPTIONS {
            Ok(status(StatusCode::NO_CONTENT))
        } else if path == "/upload" {
            match method {
                Method::POST => self.upload(req).await,
                _ => Ok(status(StatusCode::METHOD_NOT_ALLOWED)),
            }
        } else if let Some(code) = path.strip_prefix("/download/") {
            match method {
                Method::GET => self.download(code).await,
                _ => Ok(status(StatusCode::METHOD_NOT_ALLOWED)),
            }
        } else {
            Ok(status(StatusCode::NOT_FOUND))
        };

        let response = result.unwrap_or_else(|err| {
            if err.status_code().is_server_error() {
                log::error!("{} {} failed: {}", method, path, err);
            } else {
                log::warn!("{} {} rejected: {}", method, path, err);
            }
            error_response(&err)
        });

        with_cors(response)
    }

    async fn upload<B>(&self, req: Request<B>) -> crate::Result<Response<ResponseBody>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let boundary = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .ok_or(crate::Error::NoMultipart)
            .and_then(crate::parse_boundary)?;

        let body_stream = BodyStream::new(req.into_body())
            .filter_map(|result| async move { result.map(|frame| frame.into_data().ok()).transpose() });

        tokio::fs::create_dir_all(&self.config.upload_dir).await?;
        let stored = MultipartDecoder::with_limits(boundary, self.config.limits)
            .decode(body_stream, &self.config.upload_dir)
            .await?;
        let path = stored.into_content_path();

        let code = match self.registry.register(path.clone()) {
            Ok(code) => code,
            Err(err) => {
                exchange::remove_shared_file(&path).await;
                return Err(err);
            }
        };

        if let Err(err) = self.exchange.start(code).await {
            let _ = self.registry.release(code);
            exchange::remove_shared_file(&path).await;
            return Err(err);
        }

        json(&UploadResponse { port: code })
    }

    async fn download(&self, code: &str) -> crate::Result<Response<ResponseBody>> {
        let code: u16 = code
            .parse()
            .map_err(|_| crate::Error::InvalidCode(code.to_owned()))?;

        if self.registry.lookup(code)?.is_none() {
            return Err(crate::Error::UnknownCode(code));
        }

        let download = relay::fetch(self.exchange.host(), code).await?;
        let disposition = HeaderValue::try_from(download.content_disposition())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        let len = download.len();

        let body = StreamBody::new(download.into_stream().map_ok(Frame::data));
        let mut response = Response::new(BodyExt::boxed(body));

        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        headers.insert(CONTENT_DISPOSITION, disposition);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));

        Ok(response)
    }
}

/// Serves HTTP/1 connections from `listener` until the process exits.
pub async fn run(listener: TcpListener, service: Service) -> crate::Result<()> {
    log::info!("portdrop listening on {}", listener.local_addr()?);

    loop {
        let (socket, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                log::error!("failed to accept connection: {}", err);
                continue;
            }
        };

        let socket = TokioIo::new(socket);
        let service = service.clone();

        tokio::spawn(async move {
            let handler = hyper::service::service_fn(move |req: Request<Incoming>| {
                let service = service.clone();
                async move { Ok::<_, Infallible>(service.handle(req).await) }
            });

            if let Err(err) = hyper::server::conn::http1::Builder::new()
                .serve_connection(socket, handler)
                .await
            {
                log::debug!("connection from {} ended with error: {}", remote_addr, err);
            }
        });
    }
}

fn full<T: Into<Bytes>>(chunk: T) -> ResponseBody {
    Full::new(chunk.into()).map_err(|never| match never {}).boxed()
}

fn status(code: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(Empty::<Bytes>::new().map_err(|never| match never {}).boxed());
    *response.status_mut() = code;
    response
}

fn json<T: Serialize>(value: &T) -> crate::Result<Response<ResponseBody>> {
    let body = serde_json::to_vec(value).map_err(io::Error::from)?;

    let mut response = Response::new(full(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

fn error_response(err: &crate::Error) -> Response<ResponseBody> {
    let mut response = Response::new(full(err.to_string()));
    *response.status_mut() = err.status_code();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

fn with_cors(mut response: Response<ResponseBody>) -> Response<ResponseBody> {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    response
}
