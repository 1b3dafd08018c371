//! Shared HTTP client configuration and bounded response helpers.

use std::io::{self, Read, Write};
use std::sync::OnceLock;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(60);
const WRITE_TIMEOUT: Duration = Duration::from_secs(60);

/// Return a shared HTTP agent with consistent timeouts.
///
/// Photo uploads and spreadsheet downloads can be slow on classroom networks,
/// hence the generous read/write timeouts.
pub fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .timeout_write(WRITE_TIMEOUT)
            .build()
    })
}

/// Stream a response body to the writer, enforcing a maximum byte size.
///
/// Returns the number of bytes written. A declared `Content-Length` over the
/// cap fails before any byte is transferred.
pub fn stream_body_capped(
    response: ureq::Response,
    writer: &mut impl Write,
    max_bytes: usize,
) -> Result<u64, io::Error> {
    reject_oversized_declaration(&response, max_bytes)?;
    let mut limited = response.into_reader().take(max_bytes as u64 + 1);
    let mut total = 0u64;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = limited.read(&mut buf)?;
        if read == 0 {
            break;
        }
        total += read as u64;
        if total > max_bytes as u64 {
            return Err(oversized(max_bytes));
        }
        writer.write_all(&buf[..read])?;
    }
    Ok(total)
}

fn reject_oversized_declaration(
    response: &ureq::Response,
    max_bytes: usize,
) -> Result<(), io::Error> {
    let Some(declared) = response
        .header("Content-Length")
        .and_then(|value| value.parse::<u64>().ok())
    else {
        return Ok(());
    };
    if declared > max_bytes as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Response too large: {declared} bytes"),
        ));
    }
    Ok(())
}

fn oversized(max_bytes: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Response exceeded {max_bytes} bytes"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn declared_length_over_cap_is_rejected_up_front() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 4096\r\n\r\nok".to_string());
        let response = agent().get(&url).call().unwrap();
        let mut sink = Vec::new();
        let err = stream_body_capped(response, &mut sink, 64).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(sink.is_empty());
    }

    #[test]
    fn undeclared_body_over_cap_is_rejected_while_streaming() {
        let body = "x".repeat(200);
        let url = serve_once(format!("HTTP/1.0 200 OK\r\n\r\n{body}"));
        let response = agent().get(&url).call().unwrap();
        let mut sink = Vec::new();
        let err = stream_body_capped(response, &mut sink, 128).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn body_under_cap_streams_fully() {
        let body = "spreadsheet-bytes";
        let url = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ));
        let response = agent().get(&url).call().unwrap();
        let mut sink = Vec::new();
        let written = stream_body_capped(response, &mut sink, 1024).unwrap();
        assert_eq!(written, body.len() as u64);
        assert_eq!(sink, body.as_bytes());
    }
}
