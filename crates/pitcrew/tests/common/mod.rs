//! Minimal canned-response HTTP server for driving the CLI against a fake
//! REST API. One request per connection; responses always close the socket
//! so the client reconnects for the next call.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;

pub struct StubServer {
    pub base_url: String,
    addr: SocketAddr,
    handle: thread::JoinHandle<Vec<String>>,
}

/// Start a stub API serving `routes` of `(path, json_body)` pairs. A route
/// given as a full `path?query` target matches exactly; otherwise the query
/// string is ignored. Unknown paths get a 404.
pub fn spawn(routes: Vec<(String, String)>) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(s) => s,
                Err(_) => continue,
            };
            let Some((method, target)) = read_request(&mut stream) else {
                continue;
            };
            if target == "/__shutdown" {
                respond(&mut stream, 200, "{}");
                break;
            }
            seen.push(format!("{method} {target}"));
            let path = target.split('?').next().unwrap_or_default();
            let matched = routes
                .iter()
                .find(|(route, _)| *route == target)
                .or_else(|| routes.iter().find(|(route, _)| route.as_str() == path));
            match matched {
                Some((_, body)) => respond(&mut stream, 200, body),
                None => respond(&mut stream, 404, "{}"),
            }
        }
        seen
    });

    StubServer {
        base_url: format!("http://{addr}"),
        addr,
        handle,
    }
}

impl StubServer {
    /// Stop the server and return every `"METHOD /path?query"` it saw.
    pub fn shutdown(self) -> Vec<String> {
        if let Ok(mut stream) = TcpStream::connect(self.addr) {
            let _ = stream.write_all(b"GET /__shutdown HTTP/1.1\r\nHost: stub\r\n\r\n");
        }
        self.handle.join().unwrap()
    }
}

fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();
    // Drain headers; the CLI never sends a request body worth reading.
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 || line == "\r\n" {
            break;
        }
    }
    Some((method, target))
}

fn respond(stream: &mut TcpStream, status: u16, body: &str) {
    let reason = if status == 200 { "OK" } else { "Not Found" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
}
