use crate::network::error::Error;
use crate::network::{Close, Connect, Connection, write_all};
use core::fmt::Write as _;
use heapless::{String, Vec};

const MAX_HEADERS: usize = 16;
const MAX_HEADER_NAME_LEN: usize = 64;
const MAX_HEADER_VALUE_LEN: usize = 256;
const MAX_REMOTE_LEN: usize = 128;

/// Size of the buffer holding a serialized request.
pub const REQUEST_BUF_LEN: usize = 1024;
/// Size of the buffer holding a raw response (status line, headers and body).
pub const RESPONSE_BUF_LEN: usize = 2048;
/// Maximum response body kept in a [`Response`].
pub const MAX_BODY_LEN: usize = 1024;

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A single header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name, compared case-insensitively.
    pub name: String<MAX_HEADER_NAME_LEN>,
    /// Header value.
    pub value: String<MAX_HEADER_VALUE_LEN>,
}

impl Header {
    /// Builds a header, failing if either part exceeds its buffer.
    pub fn new(name: &str, value: &str) -> Result<Self, Error> {
        Ok(Self {
            name: String::try_from(name).map_err(|_| Error::BufferOverflow)?,
            value: String::try_from(value).map_err(|_| Error::BufferOverflow)?,
        })
    }
}

/// An outgoing request.
#[derive(Debug)]
pub struct Request<'a> {
    /// Request method.
    pub method: Method,
    /// Origin-form request target, e.g. `/api/fleets/x/registerMote`.
    pub path: &'a str,
    /// Extra headers. `User-Agent` and `Content-Length` are added when absent.
    pub headers: Vec<Header, MAX_HEADERS>,
    /// Optional body.
    pub body: Option<&'a [u8]>,
}

/// A parsed response.
#[derive(Debug, Clone)]
pub struct Response {
    /// Numeric status code from the status line.
    pub status_code: u16,
    /// Response headers in the order received.
    pub headers: Vec<Header, MAX_HEADERS>,
    /// Body bytes, bounded by `Content-Length` when the server sent one.
    pub body: Vec<u8, MAX_BODY_LEN>,
}

impl Response {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// HTTP/1.1 client over a single connection.
#[derive(Debug)]
pub struct Client<C: Connection> {
    connection: C,
}

impl<C: Connection> Client<C> {
    /// Wraps an open connection.
    pub fn new(connection: C) -> Self {
        Self { connection }
    }

    /// Gives the connection back, e.g. to close it.
    pub fn into_inner(self) -> C {
        self.connection
    }

    /// Sends `request` and reads the response.
    pub fn request(&mut self, request: &Request) -> Result<Response, Error> {
        let request_buf = encode_request(request)?;
        write_all(&mut self.connection, &request_buf)?;
        self.connection.flush().map_err(|_| Error::WriteError)?;
        self.read_response()
    }

    fn read_response(&mut self) -> Result<Response, Error> {
        let mut raw: Vec<u8, RESPONSE_BUF_LEN> = Vec::new();

        // Headers first; the terminator may arrive split over several reads.
        let header_end = loop {
            if let Some(pos) = find_slice(&raw, b"\r\n\r\n") {
                break pos;
            }
            if self.fill(&mut raw)? == 0 {
                return Err(if raw.is_empty() {
                    Error::ConnectionClosed
                } else {
                    Error::ProtocolError
                });
            }
        };

        let header_str =
            core::str::from_utf8(&raw[..header_end]).map_err(|_| Error::ProtocolError)?;
        let mut lines = header_str.split("\r\n");

        let status_line = lines.next().ok_or(Error::ProtocolError)?;
        let mut status_parts = status_line.splitn(3, ' ');
        let version = status_parts.next().ok_or(Error::ProtocolError)?;
        if !version.starts_with("HTTP/") {
            return Err(Error::ProtocolError);
        }
        let status_code = status_parts
            .next()
            .ok_or(Error::ProtocolError)?
            .parse::<u16>()
            .map_err(|_| Error::ProtocolError)?;

        let mut headers: Vec<Header, MAX_HEADERS> = Vec::new();
        let mut content_length: Option<usize> = None;
        let mut chunked = false;
        for line in lines.filter(|l| !l.is_empty()) {
            let (name, value) = line.split_once(':').ok_or(Error::ProtocolError)?;
            let (name, value) = (name.trim(), value.trim());
            if name.eq_ignore_ascii_case("Content-Length") {
                content_length = Some(value.parse().map_err(|_| Error::ProtocolError)?);
            } else if name.eq_ignore_ascii_case("Transfer-Encoding") {
                chunked = value
                    .split(',')
                    .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
            }
            // Headers beyond our table are dropped rather than failing the response.
            if let Ok(header) = Header::new(name, value) {
                let _ = headers.push(header);
            }
        }

        let body_start = header_end + 4;
        // Chunked framing overrides any Content-Length.
        if chunked {
            let body = self.read_chunked(&mut raw, body_start)?;
            return Ok(Response {
                status_code,
                headers,
                body,
            });
        }
        match content_length {
            Some(len) => {
                if len > MAX_BODY_LEN {
                    return Err(Error::BufferOverflow);
                }
                while raw.len() < body_start + len {
                    if self.fill(&mut raw)? == 0 {
                        return Err(Error::ConnectionClosed);
                    }
                }
                raw.truncate(body_start + len);
            }
            // No length: the body runs until the server closes.
            None => while self.fill(&mut raw)? != 0 {},
        }

        let body = Vec::from_slice(&raw[body_start..]).map_err(|_| Error::BufferOverflow)?;
        Ok(Response {
            status_code,
            headers,
            body,
        })
    }

    /// Decodes a `Transfer-Encoding: chunked` body starting at `pos` in `raw`.
    ///
    /// Chunk extensions are ignored. Trailers after the last chunk are not
    /// read; the connection is closed after the response anyway.
    fn read_chunked(
        &mut self,
        raw: &mut Vec<u8, RESPONSE_BUF_LEN>,
        mut pos: usize,
    ) -> Result<Vec<u8, MAX_BODY_LEN>, Error> {
        let mut body: Vec<u8, MAX_BODY_LEN> = Vec::new();
        loop {
            let line_end = self.fill_until(raw, pos, b"\r\n")?;
            let line = core::str::from_utf8(&raw[pos..line_end]).map_err(|_| Error::ProtocolError)?;
            let size = line.split_once(';').map_or(line, |(size, _)| size).trim();
            let size = usize::from_str_radix(size, 16).map_err(|_| Error::ProtocolError)?;
            pos = line_end + 2;
            if size == 0 {
                return Ok(body);
            }

            if size > body.capacity() - body.len() {
                return Err(Error::BufferOverflow);
            }
            let data_end = pos + size;
            while raw.len() < data_end + 2 {
                if self.fill(raw)? == 0 {
                    return Err(Error::ConnectionClosed);
                }
            }
            if &raw[data_end..data_end + 2] != b"\r\n" {
                return Err(Error::ProtocolError);
            }
            body.extend_from_slice(&raw[pos..data_end])
                .map_err(|_| Error::BufferOverflow)?;
            pos = data_end + 2;
        }
    }

    /// Reads until `needle` shows up at or after `from`, returning its offset.
    fn fill_until(
        &mut self,
        raw: &mut Vec<u8, RESPONSE_BUF_LEN>,
        from: usize,
        needle: &[u8],
    ) -> Result<usize, Error> {
        loop {
            if let Some(at) = raw.get(from..).and_then(|tail| find_slice(tail, needle)) {
                return Ok(from + at);
            }
            if self.fill(raw)? == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }

    /// Reads one chunk into the tail of `raw`, returning how much arrived.
    fn fill(&mut self, raw: &mut Vec<u8, RESPONSE_BUF_LEN>) -> Result<usize, Error> {
        let mut chunk = [0u8; 256];
        let room = (raw.capacity() - raw.len()).min(chunk.len());
        if room == 0 {
            return Err(Error::BufferOverflow);
        }
        let n = self
            .connection
            .read(&mut chunk[..room])
            .map_err(|_| Error::ReadError)?;
        raw.extend_from_slice(&chunk[..n])
            .map_err(|_| Error::BufferOverflow)?;
        Ok(n)
    }
}

fn encode_request(request: &Request) -> Result<Vec<u8, REQUEST_BUF_LEN>, Error> {
    let mut buf: Vec<u8, REQUEST_BUF_LEN> = Vec::new();
    let mut put = |bytes: &[u8]| buf.extend_from_slice(bytes).map_err(|_| Error::BufferOverflow);

    put(request.method.as_str().as_bytes())?;
    put(b" ")?;
    put(request.path.as_bytes())?;
    put(b" HTTP/1.1\r\n")?;

    let mut has_user_agent = false;
    let mut has_length = false;
    for header in &request.headers {
        has_user_agent |= header.name.eq_ignore_ascii_case("User-Agent");
        has_length |= header.name.eq_ignore_ascii_case("Content-Length");
        put(header.name.as_bytes())?;
        put(b": ")?;
        put(header.value.as_bytes())?;
        put(b"\r\n")?;
    }
    if !has_user_agent {
        put(b"User-Agent: kinton\r\n")?;
    }

    let body = request.body.unwrap_or_default();
    // A POST always states its length, even when empty; some servers answer 411 otherwise.
    if !has_length && (request.body.is_some() || request.method == Method::Post) {
        let mut len_str: String<20> = String::new();
        write!(len_str, "{}", body.len()).map_err(|_| Error::BufferOverflow)?;
        put(b"Content-Length: ")?;
        put(len_str.as_bytes())?;
        put(b"\r\n")?;
    }
    put(b"\r\n")?;
    put(body)?;
    Ok(buf)
}

/// Finds the first occurrence of a slice in another slice and returns its starting position.
fn find_slice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// A parsed `http://` URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Url<'a> {
    /// Host name or address literal.
    pub host: &'a str,
    /// Port, 80 when absent.
    pub port: u16,
    /// Path including the leading `/` (and any query).
    pub path: &'a str,
}

impl<'a> Url<'a> {
    /// Parses a plain-HTTP URL. `https://` is rejected since TLS is not handled here.
    pub fn parse(url: &'a str) -> Result<Self, Error> {
        let rest = url.strip_prefix("http://").ok_or(Error::InvalidAddress)?;
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().map_err(|_| Error::InvalidAddress)?),
            None => (authority, 80),
        };
        if host.is_empty() {
            return Err(Error::InvalidAddress);
        }
        Ok(Self { host, port, path })
    }
}

/// Issues one-shot requests to absolute URLs, opening a fresh connection each time.
#[derive(Debug)]
pub struct Connector<N: Connect> {
    network: N,
}

impl<N: Connect> Connector<N> {
    /// Uses `network` to open connections.
    pub fn new(network: N) -> Self {
        Self { network }
    }

    /// Borrow the underlying network.
    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    /// `POST`s `body` to `url` and returns the response whatever its status.
    pub fn post(&mut self, url: &str, body: Option<&[u8]>) -> Result<Response, Error> {
        let url = Url::parse(url)?;

        let mut remote: String<MAX_REMOTE_LEN> = String::new();
        write!(remote, "{}:{}", url.host, url.port).map_err(|_| Error::InvalidAddress)?;

        let mut host: String<MAX_HEADER_VALUE_LEN> = String::new();
        let written = if url.port == 80 {
            host.push_str(url.host).map_err(|_| ())
        } else {
            write!(host, "{}:{}", url.host, url.port).map_err(|_| ())
        };
        written.map_err(|_| Error::BufferOverflow)?;

        let mut headers: Vec<Header, MAX_HEADERS> = Vec::new();
        headers
            .push(Header::new("Host", &host)?)
            .map_err(|_| Error::BufferOverflow)?;
        headers
            .push(Header::new("Connection", "close")?)
            .map_err(|_| Error::BufferOverflow)?;

        let request = Request {
            method: Method::Post,
            path: url.path,
            headers,
            body,
        };

        debug!("http: POST {} via {}", url.path, remote.as_str());
        let connection = self
            .network
            .connect(&remote)
            .map_err(|_| Error::ConnectionRefused)?;
        let mut client = Client::new(connection);
        let result = client.request(&request);
        if client.into_inner().close().is_err() {
            debug!("http: close after request failed");
        }
        result
    }
}
