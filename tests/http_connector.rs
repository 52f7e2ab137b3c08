mod common;

use common::MockNetwork;
use kinton::cloud::registration::register;
use kinton::cloud::{Config, Error as CloudError};
use kinton::network::application::http::Connector;
use kinton::network::error::Error;

const OK_ANSWER: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-Type: application/json\r\n\
Content-Length: 43\r\n\
\r\n\
{\"uuid\":\"6a1f0c2e\",\"secret\":\"0123456789ab\"}";

#[test]
fn test_registration_request_on_the_wire() {
    let network = MockNetwork::new();
    network.wire.borrow_mut().feed(OK_ANSWER);
    let mut connector = Connector::new(network.clone());

    let response = connector
        .post("http://api.testing.kinton.io/api/fleets/abc/registerMote", None)
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.header("content-type"), Some("application/json"));
    let wire = network.wire.borrow();
    assert_eq!(wire.dialled, ["api.testing.kinton.io:80"]);
    assert_eq!(wire.closes, 1);
    assert_eq!(
        std::str::from_utf8(&wire.outbound).unwrap(),
        "POST /api/fleets/abc/registerMote HTTP/1.1\r\n\
         Host: api.testing.kinton.io\r\n\
         Connection: close\r\n\
         User-Agent: kinton\r\n\
         Content-Length: 0\r\n\
         \r\n"
    );
}

#[test]
fn test_register_through_connector() {
    let network = MockNetwork::new();
    network.wire.borrow_mut().feed(OK_ANSWER);
    let mut connector = Connector::new(network.clone());
    let config = Config::default();

    let credentials = register(&mut connector, config.registration_base_url, "abc").unwrap();

    assert_eq!(credentials.identity(), Some("6a1f0c2e"));
    assert_eq!(credentials.secret(), Some("0123456789ab"));
}

#[test]
fn test_non_default_port_in_host_header() {
    let network = MockNetwork::new();
    network
        .wire
        .borrow_mut()
        .feed(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
    let mut connector = Connector::new(network.clone());

    let response = connector.post("http://localhost:8080/x", None).unwrap();

    assert_eq!(response.status_code, 404);
    assert!(!response.is_success());
    assert!(response.body.is_empty());
    let wire = network.wire.borrow();
    assert_eq!(wire.dialled, ["localhost:8080"]);
    assert!(
        std::str::from_utf8(&wire.outbound)
            .unwrap()
            .contains("Host: localhost:8080\r\n")
    );
}

#[test]
fn test_body_without_length_runs_to_close() {
    let network = MockNetwork::new();
    network
        .wire
        .borrow_mut()
        .feed(b"HTTP/1.0 500 Internal Server Error\r\n\r\nbroken");
    let mut connector = Connector::new(network.clone());

    let response = connector.post("http://h/", None).unwrap();

    assert_eq!(response.status_code, 500);
    assert_eq!(&response.body[..], b"broken");
}

#[test]
fn test_status_reaches_registration_as_http_error() {
    let network = MockNetwork::new();
    network
        .wire
        .borrow_mut()
        .feed(b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n");
    let mut connector = Connector::new(network);

    assert_eq!(
        register(&mut connector, "http://h/api/fleets/", "bad-key").unwrap_err(),
        CloudError::Http(403)
    );
}

#[test]
fn test_transport_errors() {
    let mut network = MockNetwork::new();
    network.refuse = true;
    let mut connector = Connector::new(network);
    assert_eq!(
        connector.post("http://h/", None).unwrap_err(),
        Error::ConnectionRefused
    );
    assert_eq!(
        register(&mut connector, "http://h/", "k").unwrap_err(),
        CloudError::Transport
    );

    // Peer hangs up before a full header block.
    let network = MockNetwork::new();
    network.wire.borrow_mut().feed(b"HTTP/1.1 200 OK\r\n");
    let mut connector = Connector::new(network);
    assert_eq!(
        connector.post("http://h/", None).unwrap_err(),
        Error::ProtocolError
    );
}

#[test]
fn test_https_is_rejected() {
    let mut connector = Connector::new(MockNetwork::new());
    assert_eq!(
        connector.post("https://h/", None).unwrap_err(),
        Error::InvalidAddress
    );
}

#[test]
fn test_response_arriving_after_the_request_is_read_whole() {
    let network = MockNetwork::new();
    {
        let mut wire = network.wire.borrow_mut();
        wire.feed_late(&OK_ANSWER[..20]);
        wire.feed_late(&OK_ANSWER[20..]);
    }
    let mut connector = Connector::new(network.clone());

    let credentials = register(&mut connector, "http://h/api/fleets/", "abc").unwrap();

    assert_eq!(credentials.identity(), Some("6a1f0c2e"));
    assert!(network.wire.borrow().late.is_empty());
}

#[test]
fn test_chunked_registration_answer() {
    let network = MockNetwork::new();
    {
        let mut wire = network.wire.borrow_mut();
        wire.feed(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n");
        wire.feed(b"c;name=value\r\n{\"uuid\":\"u1\"\r\n");
        wire.feed_late(b"f\r\n,\"secret\":\"s1\"}\r\n0\r\n\r\n");
    }
    let mut connector = Connector::new(network);

    let credentials = register(&mut connector, "http://h/api/fleets/", "abc").unwrap();

    assert_eq!(credentials.identity(), Some("u1"));
    assert_eq!(credentials.secret(), Some("s1"));
}

#[test]
fn test_chunked_framing_errors() {
    let post = |answer: &[u8]| {
        let network = MockNetwork::new();
        network.wire.borrow_mut().feed(answer);
        Connector::new(network).post("http://h/", None)
    };
    const HEAD: &str = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";

    assert_eq!(
        post(format!("{HEAD}zz\r\nab\r\n0\r\n\r\n").as_bytes()).unwrap_err(),
        Error::ProtocolError
    );
    assert_eq!(
        post(format!("{HEAD}2\r\nabc\r\n0\r\n\r\n").as_bytes()).unwrap_err(),
        Error::ProtocolError
    );
    assert_eq!(
        post(format!("{HEAD}4\r\nab").as_bytes()).unwrap_err(),
        Error::ConnectionClosed
    );
    assert_eq!(
        post(format!("{HEAD}ffff\r\n").as_bytes()).unwrap_err(),
        Error::BufferOverflow
    );
    let response = post(format!("{HEAD}2\r\nab\r\n0\r\n\r\n").as_bytes()).unwrap();
    assert_eq!(&response.body[..], b"ab");
}
