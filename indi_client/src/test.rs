use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use static_assertions::assert_impl_all;

use crate::sansio::protocol::get_properties;
use crate::*;

assert_impl_all!(Connection: Send);
assert_impl_all!(Error: Send, Sync, std::error::Error);

const WAIT: Duration = Duration::from_millis(150);

/// Read one outbound element. Every element the client writes ends with `>`.
fn read_message(stream: &mut TcpStream) -> Option<String> {
    let mut message = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        message.extend_from_slice(&buf[..n]);
        if message.trim_ascii_end().ends_with(b">") {
            return String::from_utf8(message).ok();
        }
    }
}

/// A fake indiserver answering each received element with the next reply.
///
/// The thread returns the received elements once the script is done or the
/// client went away. With `close` set, the peer hangs up after the last reply.
fn mock_peer(replies: Vec<String>, close: bool) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut received = Vec::new();
        for reply in replies {
            match read_message(&mut stream) {
                Some(message) => received.push(message),
                None => return received,
            }
            stream.write_all(reply.as_bytes()).unwrap();
        }
        if !close {
            while let Some(message) = read_message(&mut stream) {
                received.push(message);
            }
        }
        received
    });

    (port, handle)
}

fn coords(device: &str, state: &str, ra: f64, dec: f64) -> String {
    format!(
        r#"<setNumberVector device="{device}" name="EQUATORIAL_EOD_COORD" state="{state}" timeout="60">
  <oneNumber name="RA">{ra}</oneNumber>
  <oneNumber name="DEC">{dec}</oneNumber>
</setNumberVector>
"#
    )
}

fn config(port: u16) -> ClientConfig {
    ClientConfig {
        host: "127.0.0.1".into(),
        port,
        device: "Mock Mount".into(),
        connect_timeout: Duration::from_secs(2),
        drain_wait: WAIT,
        poll_interval: Duration::from_millis(50),
        slew_timeout: Duration::from_secs(5),
        ..ClientConfig::default()
    }
}

#[test]
fn test_send_and_drain() {
    let snapshot = r#"<defSwitchVector device="Mock Mount" name="CONNECTION" state="Ok">
  <defSwitch name="CONNECT">On</defSwitch>
  <defSwitch name="DISCONNECT">Off</defSwitch>
</defSwitchVector>
"#;
    let (port, peer) = mock_peer(vec![snapshot.into()], false);
    let config = config(port);

    let mut connection = Connection::with_config(&config).unwrap();
    assert!(connection.is_connected());
    assert_eq!(connection.address(), format!("127.0.0.1:{}", port));

    let response = connection
        .send_and_drain(&get_properties("1.7", None), WAIT)
        .unwrap();
    assert_eq!(response, snapshot);
    assert_eq!(switch_is_on(&response, "Mock Mount", "CONNECT"), Some(true));

    connection.disconnect();
    connection.disconnect();
    assert!(!connection.is_connected());
    assert!(matches!(
        connection.send("<getProperties/>"),
        Err(Error::ConnectionClosed)
    ));

    let received = peer.join().unwrap();
    assert_eq!(received, vec![r#"<getProperties version="1.7"/>"#.to_string()]);
}

#[test]
fn test_from_stream() {
    let reply = coords("Mock Mount", "Ok", 1.5, 2.5);
    let (port, peer) = mock_peer(vec![reply.clone()], false);

    let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let mut connection =
        Connection::from_stream(Box::new(stream), "mock", Duration::from_secs(2)).unwrap();
    assert_eq!(connection.address(), "mock");

    let response = connection
        .send_and_drain(&get_properties("1.7", None), WAIT)
        .unwrap();
    assert_eq!(response, reply);

    drop(connection);
    assert_eq!(peer.join().unwrap().len(), 1);
}

#[test]
fn test_drain_with_nothing_to_read() {
    let (port, peer) = mock_peer(vec![String::new()], false);
    let mut connection = Connection::connect("127.0.0.1", port, Duration::from_secs(2)).unwrap();

    let response = connection
        .send_and_drain(&get_properties("1.7", Some("Nobody")), WAIT)
        .unwrap();
    assert_eq!(response, "");
    assert!(connection.is_connected());

    drop(connection);
    peer.join().unwrap();
}

#[test]
fn test_peer_closes() {
    let reply = coords("Mock Mount", "Idle", 5.5, -3.25);
    let (port, peer) = mock_peer(vec![reply.clone()], true);
    let mut connection = Connection::connect("127.0.0.1", port, Duration::from_secs(2)).unwrap();

    // the data before the close is still delivered
    let response = connection.query(&get_properties("1.7", None), WAIT);
    assert_eq!(response, reply);
    assert!(!connection.is_connected());
    peer.join().unwrap();

    let response = connection.query(&get_properties("1.7", None), WAIT);
    assert!(is_error_reply(&response));
    assert_eq!(response, "ERROR: Connection Closed");
}

#[test]
fn test_connection_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    match Connection::connect("127.0.0.1", port, Duration::from_secs(2)) {
        Err(Error::Connection { address, .. }) => {
            assert_eq!(address, format!("127.0.0.1:{}", port))
        }
        other => panic!("Unexpected result {:?}", other),
    }
    assert!(!probe("127.0.0.1", port, Duration::from_secs(2)));

    let response = send_once(&config(port), &get_properties("1.7", None), WAIT);
    assert!(is_error_reply(&response));
}

#[test]
fn test_probe() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    assert!(probe("127.0.0.1", port, Duration::from_secs(2)));
}

#[test]
fn test_send_once() {
    let reply = coords("Mock Mount", "Ok", 12.0, 45.0);
    let (port, peer) = mock_peer(vec![reply.clone()], false);

    let response = send_once(&config(port), &get_properties("1.7", None), WAIT);
    assert_eq!(response, reply);
    assert_eq!(
        read_equatorial(&response, "Mock Mount"),
        Some(Coordinate::new(12.0, 45.0).unwrap())
    );

    assert_eq!(peer.join().unwrap().len(), 1);
}

#[test]
fn test_slew_against_mock() {
    let replies = vec![
        // position before the slew
        coords("Mock Mount", "Idle", 4.0, 10.0),
        // slew command
        coords("Mock Mount", "Busy", 4.0, 10.0),
        // polls
        coords("Mock Mount", "Busy", 4.6, 10.0),
        coords("Mock Mount", "Ok", 5.5, -5.4),
    ];
    let (port, peer) = mock_peer(replies, false);
    let config = ClientConfig {
        policy: CompletionPolicy::Strict,
        ..config(port)
    };

    let mut connection = Connection::with_config(&config).unwrap();
    {
        let mut slew = SlewController::new(&mut connection, &config);
        let target = Coordinate::new(5.5, -5.4).unwrap();

        assert_eq!(slew.request_slew(target).unwrap(), SlewState::Busy);
        assert_eq!(
            slew.request().unwrap().origin,
            Some(Coordinate::new(4.0, 10.0).unwrap())
        );

        let mut seen = Vec::new();
        let outcome = slew
            .poll_until_arrival_with(Duration::from_secs(5), config.poll_interval, |obs| {
                seen.push(obs.state)
            })
            .unwrap();
        assert_eq!(outcome, SlewOutcome::Arrived);
        assert_eq!(slew.state(), SlewState::Arrived);
        assert_eq!(
            seen,
            vec![Some(PropertyState::Busy), Some(PropertyState::Ok)]
        );
    }
    connection.disconnect();

    let received = peer.join().unwrap();
    assert_eq!(received.len(), 4);
    assert!(received[0].starts_with("<getProperties"));
    assert!(received[0].contains(r#"device="Mock Mount""#));
    assert!(received[1].contains(r#"<oneNumber name="RA">5.5</oneNumber>"#));
    assert!(received[1].contains(r#"<oneNumber name="DEC">-5.4</oneNumber>"#));
}

#[test]
fn test_abort_against_mock() {
    let reply = r#"<setSwitchVector device="Mock Mount" name="TELESCOPE_ABORT_MOTION" state="Ok">
  <oneSwitch name="ABORT">Off</oneSwitch>
</setSwitchVector>
"#;
    let (port, peer) = mock_peer(vec![reply.into()], false);
    let config = config(port);

    let mut connection = Connection::with_config(&config).unwrap();
    {
        let mut slew = SlewController::new(&mut connection, &config);
        slew.abort().unwrap();
        assert_eq!(slew.state(), SlewState::Aborted);
    }
    connection.disconnect();

    let received = peer.join().unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].contains("TELESCOPE_ABORT_MOTION"));
    assert!(received[0].contains(r#"<oneSwitch name="ABORT">On</oneSwitch>"#));
}
