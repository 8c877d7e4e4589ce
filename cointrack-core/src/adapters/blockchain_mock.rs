//! Mock blockchain.info server for testing
//!
//! Serves `GET /rawaddr/{address}?limit=N&offset=M` with the same response
//! shape as the real API (`{ final_balance, txs: [...] }`) from an in-memory
//! history, and records the offsets each address was requested at.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use super::paging::{RawAddrPage, RawTx};
use crate::domain::Transaction;

/// Configuration for the mock server's behaviour
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Largest page the server will return regardless of `limit`
    pub max_limit: u64,
    /// Respond with this status to every request
    pub fail_status: Option<u16>,
    /// Respond 200 with a body that is not valid JSON
    pub malformed_body: bool,
    /// Respond 404 with an HTML page to every request, like a web server
    /// that is not the API
    pub html_not_found: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            max_limit: 1_000,
            fail_status: None,
            malformed_body: false,
            html_not_found: false,
        }
    }
}

#[derive(Default)]
struct MockState {
    histories: HashMap<String, (u64, Vec<RawTx>)>,
    requests: Vec<(String, u64)>,
}

/// Mock blockchain.info server bound to a random local port
pub struct MockBlockchainServer {
    port: u16,
    state: Arc<Mutex<MockState>>,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockBlockchainServer {
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let state = Arc::new(Mutex::new(MockState::default()));
        let running = Arc::new(AtomicBool::new(true));

        // Non-blocking accept so stop() can end the loop
        listener.set_nonblocking(true)?;

        let thread_state = Arc::clone(&state);
        let thread_running = Arc::clone(&running);
        let thread_handle = thread::spawn(move || {
            while thread_running.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let state = Arc::clone(&thread_state);
                        let cfg = config.clone();
                        thread::spawn(move || handle_connection(stream, &cfg, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            state,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Replace the full history served for an address
    pub fn set_history(&self, address: &str, balance: u64, txs: Vec<Transaction>) {
        let raw = txs.iter().map(RawTx::from).collect();
        self.state
            .lock()
            .unwrap()
            .histories
            .insert(address.to_string(), (balance, raw));
    }

    /// Offsets requested for an address, in request order
    pub fn requested_offsets(&self, address: &str) -> Vec<u64> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, offset)| *offset)
            .collect()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockBlockchainServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, state: &Mutex<MockState>) {
    let _ = stream.set_nonblocking(false);
    let mut buffer = [0; 4096];

    let Ok(n) = stream.read(&mut buffer) else {
        return;
    };
    let request = String::from_utf8_lossy(&buffer[..n]);

    let first_line = request.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 || parts[0] != "GET" {
        send_response(&mut stream, 405, "Method Not Allowed", r#"{"error": "Method not allowed"}"#);
        return;
    }

    if config.html_not_found {
        send_html(&mut stream, 404, "Not Found", "<html><body>404 page not found</body></html>");
        return;
    }

    let (path, query) = parts[1].split_once('?').unwrap_or((parts[1], ""));
    let Some(address) = path.strip_prefix("/rawaddr/") else {
        send_response(&mut stream, 404, "Not Found", r#"{"error": "Endpoint not found"}"#);
        return;
    };

    let limit = query_param(query, "limit").unwrap_or(50).min(config.max_limit);
    let offset = query_param(query, "offset").unwrap_or(0);

    let page = {
        let mut state = state.lock().unwrap();
        state.requests.push((address.to_string(), offset));
        state.histories.get(address).map(|(balance, txs)| {
            let start = (offset as usize).min(txs.len());
            let end = (start + limit as usize).min(txs.len());
            RawAddrPage {
                final_balance: *balance,
                txs: txs[start..end].to_vec(),
            }
        })
    };

    if let Some(status) = config.fail_status {
        send_response(&mut stream, status, "Error", r#"{"error": "Mock failure"}"#);
        return;
    }

    match page {
        Some(_) if config.malformed_body => {
            send_response(&mut stream, 200, "OK", "<html>maintenance</html>");
        }
        Some(page) => {
            let json = serde_json::to_string(&page).unwrap();
            send_response(&mut stream, 200, "OK", &json);
        }
        None => {
            send_response(&mut stream, 404, "Not Found", r#"{"error": "Address not found"}"#);
        }
    }
}

fn query_param(query: &str, name: &str) -> Option<u64> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| value.parse().ok())
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    write_response(stream, status, status_text, "application/json", body);
}

fn send_html(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    write_response(stream, status, status_text, "text/html", body);
}

fn write_response(stream: &mut TcpStream, status: u16, status_text: &str, content_type: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        content_type,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
