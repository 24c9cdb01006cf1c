// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::adb::AdbRunner,
    std::path::Path,
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        task::JoinHandle,
    },
};

/// Shell script standing in for adb: drops `-s <serial>` and runs the rest.
pub const FAKE_ADB: &str = "shift 2\nexec \"$@\"\n";

/// An [AdbRunner] executing [FAKE_ADB] from `dir` via `sh`.
pub fn fake_adb_runner(dir: &Path) -> std::io::Result<AdbRunner> {
    let script = dir.join("adb.sh");
    std::fs::write(&script, FAKE_ADB)?;

    Ok(AdbRunner::new("sh").with_global_args([script.into_os_string()]))
}

/// Read one HTTP/1.1 request, headers and body.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);

        if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&request[..end]).to_lowercase();
            let length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            if request.len() >= end + 4 + length {
                break;
            }
        }
    }

    Ok(String::from_utf8_lossy(&request).to_string())
}

async fn respond(stream: &mut TcpStream, status_line: &str, body: &str) -> std::io::Result<()> {
    let response = format!(
        "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Serve a single canned response on a loopback port.
///
/// Returns the base URL and a handle resolving to the raw request received.
pub async fn serve_once(
    status_line: &str,
    body: &str,
) -> std::io::Result<(String, JoinHandle<std::io::Result<String>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    let status_line = status_line.to_string();
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        let request = read_request(&mut stream).await?;
        respond(&mut stream, &status_line, &body).await?;

        Ok(request)
    });

    Ok((url, handle))
}

/// Answer every request with `200 OK` and `body` until the handle is aborted.
pub async fn serve_forever(body: &str) -> std::io::Result<(String, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                if read_request(&mut stream).await.is_ok() {
                    let _ = respond(&mut stream, "HTTP/1.1 200 OK", &body).await;
                }
            });
        }
    });

    Ok((url, handle))
}
