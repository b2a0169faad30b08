//!
//! IPP client
//!
use std::{collections::BTreeMap, marker::PhantomData, time::Duration};

use base64::Engine;
use http::Uri;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg(feature = "__tls")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TlsBackend {
    #[default]
    Rustls,
    Native,
}

/// Builder to create IPP client
pub struct IppClientBuilder<T> {
    uri: Uri,
    #[cfg(feature = "__tls")]
    ignore_tls_errors: bool,
    request_timeout: Option<Duration>,
    headers: BTreeMap<String, String>,
    #[cfg(feature = "__tls")]
    ca_certs: Vec<Vec<u8>>,
    #[cfg(feature = "__tls")]
    tls_backend: Option<TlsBackend>,
    _phantom_data: PhantomData<T>,
}

impl<T> IppClientBuilder<T> {
    fn new(uri: Uri) -> Self {
        IppClientBuilder {
            uri,
            #[cfg(feature = "__tls")]
            ignore_tls_errors: false,
            request_timeout: None,
            headers: BTreeMap::new(),
            #[cfg(feature = "__tls")]
            ca_certs: Vec::new(),
            #[cfg(feature = "__tls")]
            tls_backend: None,
            _phantom_data: PhantomData,
        }
    }

    #[cfg(feature = "__tls")]
    /// Enable or disable ignoring of TLS handshake errors. Default is false.
    pub fn ignore_tls_errors(mut self, flag: bool) -> Self {
        self.ignore_tls_errors = flag;
        self
    }

    #[cfg(feature = "__tls")]
    /// Add a custom root certificate in PEM or DER format.
    pub fn ca_cert<D: AsRef<[u8]>>(mut self, data: D) -> Self {
        self.ca_certs.push(data.as_ref().to_owned());
        self
    }

    /// Set the deadline of a whole request including the response body. Default is no timeout.
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Add a custom HTTP header
    pub fn http_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.headers.insert(key.as_ref().to_owned(), value.as_ref().to_owned());
        self
    }

    /// Add basic auth header (RFC 7617)
    pub fn basic_auth<U, P>(mut self, username: U, password: P) -> Self
    where
        U: AsRef<str>,
        P: AsRef<str>,
    {
        let authz =
            base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username.as_ref(), password.as_ref()));
        self.headers.insert("authorization".to_owned(), format!("Basic {authz}"));
        self
    }

    #[cfg(feature = "__tls")]
    /// Set TLS backend.
    pub fn tls_backend(mut self, backend: TlsBackend) -> Self {
        self.tls_backend = Some(backend);
        self
    }
}

impl IppClientBuilder<non_blocking::AsyncIppClient> {
    /// Build the async client
    pub fn build(self) -> non_blocking::AsyncIppClient {
        non_blocking::AsyncIppClient::from_config(self)
    }
}

pub mod non_blocking {
    use std::{
        io,
        sync::atomic::{AtomicU32, Ordering},
    };

    use futures_util::{
        future::{self, Either},
        io::BufReader,
        pin_mut,
        stream::TryStreamExt,
    };
    use http::Uri;
    use log::{debug, warn};
    use reqwest::{Body, ClientBuilder};
    use tokio_util::{compat::FuturesAsyncReadCompatExt, io::ReaderStream, sync::CancellationToken};

    use crate::{
        error::IppError,
        operation::IppOperation,
        parser::AsyncIppParser,
        request::IppRequestResponse,
        response::{check_status, FromIppResponse},
        util::ipp_uri_to_string,
    };

    #[cfg(feature = "__tls")]
    use super::TlsBackend;
    use super::{IppClientBuilder, CONNECT_TIMEOUT};

    const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"), ";reqwest");

    // request ids are positive 31-bit integers
    const MAX_REQUEST_ID: u32 = 0x7fff_ffff;

    /// Asynchronous IPP client.
    ///
    /// IPP client is responsible for sending requests to IPP server.
    /// Each request gets the next value of a per-client counter as its request id, starting at 1.
    pub struct AsyncIppClient {
        config: IppClientBuilder<Self>,
        request_id: AtomicU32,
    }

    impl AsyncIppClient {
        pub(super) fn from_config(config: IppClientBuilder<Self>) -> Self {
            AsyncIppClient {
                config,
                request_id: AtomicU32::new(0),
            }
        }

        /// Create IPP client with default options
        pub fn new(uri: Uri) -> Self {
            AsyncIppClient::builder(uri).build()
        }

        /// Create IPP client builder for setting extra options
        pub fn builder(uri: Uri) -> IppClientBuilder<Self> {
            IppClientBuilder::new(uri)
        }

        /// Return client URI
        pub fn uri(&self) -> &Uri {
            &self.config.uri
        }

        fn next_request_id(&self) -> u32 {
            self.request_id.fetch_add(1, Ordering::Relaxed) % MAX_REQUEST_ID + 1
        }

        fn http_client(&self) -> Result<reqwest::Client, IppError> {
            let mut builder = ClientBuilder::new().connect_timeout(CONNECT_TIMEOUT);

            if let Some(timeout) = self.config.request_timeout {
                builder = builder.timeout(timeout);
            }

            #[cfg(feature = "__tls")]
            {
                if self.config.ignore_tls_errors {
                    builder = builder.danger_accept_invalid_certs(true);
                }
                for data in &self.config.ca_certs {
                    let cert = reqwest::Certificate::from_pem(data)
                        .or_else(|_| reqwest::Certificate::from_der(data))
                        .map_err(|e| IppError::InvalidCertificate(e.to_string()))?;
                    builder = builder.add_root_certificate(cert);
                }
            }

            #[cfg(feature = "async-client-rustls")]
            if self.config.tls_backend != Some(TlsBackend::Native) {
                builder = builder.use_rustls_tls();
            }

            #[cfg(feature = "async-client-tls")]
            if self.config.tls_backend == Some(TlsBackend::Native) {
                builder = builder.use_native_tls();
            }

            #[cfg(feature = "async-client-tls")]
            if self.config.ignore_tls_errors {
                builder = builder.danger_accept_invalid_hostnames(true);
            }

            Ok(builder.user_agent(USER_AGENT).build()?)
        }

        /// Send IPP request to the server and return the raw response, whatever its IPP status is
        pub async fn send<R>(&self, request: R) -> Result<IppRequestResponse, IppError>
        where
            R: Into<IppRequestResponse>,
        {
            let request_id = self.next_request_id();
            let request = request.into().with_request_id(request_id);
            let client = self.http_client()?;

            debug!("Sending IPP request {} to {}", request_id, self.config.uri);

            let mut req_builder = client.post(ipp_uri_to_string(&self.config.uri));

            for (k, v) in &self.config.headers {
                req_builder = req_builder.header(k, v);
            }

            let response = req_builder
                .header("content-type", "application/ipp")
                .body(Body::wrap_stream(ReaderStream::new(request.into_async_read().compat())))
                .send()
                .await?;

            if response.status().is_success() {
                let parser = AsyncIppParser::new(BufReader::new(
                    response.bytes_stream().map_err(io::Error::other).into_async_read(),
                ));
                let response = parser.parse().await?;
                debug!(
                    "IPP response {} status {:#06x}",
                    response.header().request_id,
                    response.header().operation_or_status
                );
                if response.header().request_id != request_id {
                    warn!(
                        "IPP response id {} does not match request id {}",
                        response.header().request_id,
                        request_id
                    );
                }
                Ok(response)
            } else {
                debug!("HTTP error status: {}", response.status());
                Err(IppError::RequestError(response.status().as_u16()))
            }
        }

        /// Send IPP request, abandoning it as soon as the token is cancelled
        pub async fn send_cancellable<R>(
            &self,
            request: R,
            token: &CancellationToken,
        ) -> Result<IppRequestResponse, IppError>
        where
            R: Into<IppRequestResponse>,
        {
            if token.is_cancelled() {
                return Err(IppError::Cancelled);
            }

            let send = self.send(request);
            let cancelled = token.cancelled();
            pin_mut!(send, cancelled);

            match future::select(send, cancelled).await {
                Either::Left((result, _)) => result,
                Either::Right(_) => {
                    debug!("IPP request cancelled");
                    Err(IppError::Cancelled)
                }
            }
        }

        /// Send operation, check the response status and convert it into the typed result of the operation
        pub async fn execute<O>(&self, operation: O) -> Result<O::Response, IppError>
        where
            O: IppOperation,
        {
            let response = check_status(self.send(operation).await?)?;
            O::Response::from_response(response)
        }

        /// Same as [`AsyncIppClient::execute`] but abandoned when the token is cancelled
        pub async fn execute_cancellable<O>(&self, operation: O, token: &CancellationToken) -> Result<O::Response, IppError>
        where
            O: IppOperation,
        {
            let response = check_status(self.send_cancellable(operation, token).await?)?;
            O::Response::from_response(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{io, sync::Arc, time::Duration};

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        sync::mpsc,
    };
    use tokio_util::sync::CancellationToken;

    #[cfg(feature = "__tls")]
    use super::TlsBackend;
    use super::non_blocking::AsyncIppClient;
    use crate::{
        attribute::IppAttribute,
        error::{ErrorClass, IppError},
        model::{DelimiterTag, IppVersion, StatusCode},
        operation::{builder::IppOperationBuilder, IppOperation},
        payload::IppPayload,
        request::IppRequestResponse,
        response::StatusErrorKind,
        value::IppValue,
    };

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    // decoded body once the last chunk has arrived
    fn decode_chunked(mut data: &[u8]) -> Option<Vec<u8>> {
        let mut body = Vec::new();
        loop {
            let line_end = find(data, b"\r\n")?;
            let size_line = std::str::from_utf8(&data[..line_end]).ok()?;
            let size = usize::from_str_radix(size_line.split(';').next()?.trim(), 16).ok()?;
            data = &data[line_end + 2..];
            if size == 0 {
                return Some(body);
            }
            if data.len() < size + 2 {
                return None;
            }
            body.extend_from_slice(&data[..size]);
            data = &data[size + 2..];
        }
    }

    // request headers as sent and the decoded body
    async fn read_request(stream: &mut TcpStream) -> io::Result<(String, Vec<u8>)> {
        let mut data = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            data.extend_from_slice(&buf[..n]);

            if let Some(pos) = find(&data, b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&data[..pos]).into_owned();
                let body = &data[pos + 4..];
                let content_length = header_value(&headers, "content-length").and_then(|v| v.parse::<usize>().ok());
                match content_length {
                    Some(len) if body.len() >= len => return Ok((headers, body[..len].to_vec())),
                    Some(_) => {}
                    None => {
                        if let Some(decoded) = decode_chunked(body) {
                            return Ok((headers, decoded));
                        }
                    }
                }
            }
        }
    }

    fn header_value<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
        headers.lines().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }

    fn http_ok(response: IppRequestResponse) -> Vec<u8> {
        let body = response.to_bytes();
        let mut data = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/ipp\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        data.extend_from_slice(&body);
        data
    }

    // local printer answering each request with the bytes produced by `respond`
    async fn fake_printer<F>(respond: F) -> (http::Uri, mpsc::UnboundedReceiver<(String, Vec<u8>)>)
    where
        F: Fn(&IppRequestResponse) -> Vec<u8> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let respond = Arc::new(respond);

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let tx = tx.clone();
                let respond = respond.clone();
                tokio::spawn(async move {
                    let (headers, body) = read_request(&mut stream).await.unwrap();
                    let request = IppRequestResponse::from_bytes(body.clone()).unwrap();
                    let _ = tx.send((headers, body));
                    stream.write_all(&(*respond)(&request)).await.unwrap();
                    let _ = stream.shutdown().await;
                });
            }
        });

        (format!("ipp://{addr}/ipp/print").parse().unwrap(), rx)
    }

    // local printer which accepts connections and never answers
    async fn silent_printer() -> http::Uri {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut streams = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                streams.push(stream);
            }
        });
        format!("ipp://{addr}/ipp/print").parse().unwrap()
    }

    fn job_created(request: &IppRequestResponse) -> Vec<u8> {
        let mut response =
            IppRequestResponse::new_response(IppVersion::v1_1(), StatusCode::SuccessfulOk, request.header().request_id);
        response.attributes_mut().add(
            DelimiterTag::JobAttributes,
            IppAttribute::new(IppAttribute::JOB_ID, IppValue::Integer(request.header().request_id as i32)),
        );
        http_ok(response)
    }

    #[tokio::test]
    async fn test_print_job_body_and_request_ids() {
        let (uri, mut bodies) = fake_printer(job_created).await;
        let client = AsyncIppClient::new(uri.clone());
        let document = vec![0x5a; 10_000];

        let attributes_len = IppOperationBuilder::print_job(uri.clone(), IppPayload::empty())
            .job_title("doc")
            .build()
            .unwrap()
            .into_ipp_request()
            .to_bytes()
            .len();

        let op = IppOperationBuilder::print_job(uri.clone(), IppPayload::from_bytes(document.clone()))
            .job_title("doc")
            .build()
            .unwrap();
        let job = client.execute(op).await.unwrap();
        assert_eq!(job.id, 1);

        let (_, body) = bodies.recv().await.unwrap();
        assert_eq!(body.len(), attributes_len + document.len());
        assert_eq!(&body[body.len() - document.len()..], &document[..]);

        let op = IppOperationBuilder::get_jobs(uri).build().unwrap();
        let jobs = client.execute(op).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, 2);

        let (_, body) = bodies.recv().await.unwrap();
        assert_eq!(&body[4..8], &[0, 0, 0, 2]);
    }

    #[tokio::test]
    async fn test_not_found_status() {
        let (uri, _bodies) = fake_printer(|request| {
            let mut response = IppRequestResponse::new_response(
                IppVersion::v1_1(),
                StatusCode::ClientErrorNotFound,
                request.header().request_id,
            );
            response.attributes_mut().add(
                DelimiterTag::OperationAttributes,
                IppAttribute::new(
                    IppAttribute::STATUS_MESSAGE,
                    IppValue::TextWithoutLanguage("job not found".to_owned()),
                ),
            );
            http_ok(response)
        })
        .await;

        let client = AsyncIppClient::new(uri.clone());
        let err = client
            .execute(IppOperationBuilder::cancel_job(uri, 99).build().unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.class(), ErrorClass::Protocol);
        assert!(err.is_not_found());
        let status = err.as_status().unwrap();
        assert_eq!(status.kind(), StatusErrorKind::NotFound);
        assert_eq!(status.message(), Some("job not found"));
    }

    #[tokio::test]
    async fn test_http_error_is_network() {
        let (uri, _bodies) = fake_printer(|_| {
            b"HTTP/1.1 403 Forbidden\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_vec()
        })
        .await;

        let client = AsyncIppClient::new(uri.clone());
        let err = client
            .send(IppOperationBuilder::pause_printer(uri).build().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, IppError::RequestError(403)));
        assert_eq!(err.class(), ErrorClass::Network);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let uri: http::Uri = format!("ipp://{addr}/ipp/print").parse().unwrap();
        let client = AsyncIppClient::new(uri.clone());
        let err = client
            .send(IppOperationBuilder::get_printer_attributes(uri).build().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Network);
    }

    #[tokio::test]
    async fn test_timeout_is_network() {
        let uri = silent_printer().await;
        let client = AsyncIppClient::builder(uri.clone())
            .request_timeout(Duration::from_millis(200))
            .build();
        let err = client
            .send(IppOperationBuilder::resume_printer(uri).build().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Network);
    }

    #[tokio::test]
    async fn test_cancel_in_flight() {
        let uri = silent_printer().await;
        let client = AsyncIppClient::new(uri.clone());
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let op = IppOperationBuilder::purge_jobs(uri).build().unwrap();
        let err = tokio::time::timeout(Duration::from_secs(5), client.send_cancellable(op, &token))
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, IppError::Cancelled));
        assert_eq!(err.class(), ErrorClass::Network);
    }

    #[tokio::test]
    async fn test_auth_and_extra_headers() {
        let (uri, mut requests) = fake_printer(job_created).await;
        let builder = AsyncIppClient::builder(uri.clone())
            .basic_auth("alice", "secret")
            .http_header("x-print-site", "lab-2");
        #[cfg(feature = "__tls")]
        let builder = builder.tls_backend(TlsBackend::Native);
        let client = builder.build();

        let token = CancellationToken::new();
        let op = IppOperationBuilder::validate_job(uri).build().unwrap();
        let status = client.execute_cancellable(op, &token).await.unwrap();
        assert_eq!(status.status, StatusCode::SuccessfulOk);

        let (headers, _) = requests.recv().await.unwrap();
        assert_eq!(header_value(&headers, "authorization"), Some("Basic YWxpY2U6c2VjcmV0"));
        assert_eq!(header_value(&headers, "x-print-site"), Some("lab-2"));
        assert_eq!(header_value(&headers, "content-type"), Some("application/ipp"));
    }

    #[tokio::test]
    async fn test_mismatched_response_id_is_kept() {
        let (uri, _requests) = fake_printer(|request| {
            http_ok(IppRequestResponse::new_response(
                IppVersion::v1_1(),
                StatusCode::SuccessfulOk,
                request.header().request_id + 100,
            ))
        })
        .await;

        let client = AsyncIppClient::new(uri.clone());
        let response = client
            .send(IppOperationBuilder::resume_printer(uri).build().unwrap())
            .await
            .unwrap();
        assert_eq!(response.header().request_id, 101);
    }
}
