// Response framing for the minimal text protocol

/// Sent once, before the first event frame.
pub const STREAM_HEADER: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\n\r\n";

/// Complete plaintext response; the connection is closed after it.
pub fn error_response(status: (u16, &str), body: &str) -> String {
    let (code, reason) = status;
    format!(
        "HTTP/1.1 {code} {reason}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// One server-sent event carrying `payload`.
pub fn event_frame(payload: &str) -> String {
    format!("data:{payload}\n\n")
}
