//! Exit status of the server binary after SIGTERM.
#![cfg(unix)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};

struct RunningBinary {
    child: Child,
    addr: SocketAddr,
    config_path: PathBuf,
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Start the binary with a config file holding `timeouts` and wait until it accepts.
async fn start_binary(name: &str, timeouts: &str) -> RunningBinary {
    let addr: SocketAddr = format!("127.0.0.1:{}", free_port()).parse().unwrap();
    let config_path =
        std::env::temp_dir().join(format!("movie-api-exit-{}-{}.toml", name, std::process::id()));
    std::fs::write(
        &config_path,
        format!(
            "[listener]\nbind_address = \"{}\"\n\n[rate_limit]\nenabled = false\n\n[timeouts]\n{}\n",
            addr, timeouts
        ),
    )
    .unwrap();

    let child = Command::new(env!("CARGO_BIN_EXE_movie-api"))
        .arg("--config")
        .arg(&config_path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if TcpStream::connect(addr).await.is_ok() {
            break;
        }
        assert!(Instant::now() < deadline, "binary never started listening");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    RunningBinary {
        child,
        addr,
        config_path,
    }
}

impl RunningBinary {
    fn sigterm(&self) {
        let pid = self.child.id().expect("binary already exited");
        let status = std::process::Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status()
            .unwrap();
        assert!(status.success());
    }

    async fn wait(mut self, limit: Duration) -> ExitStatus {
        let status = tokio::time::timeout(limit, self.child.wait())
            .await
            .expect("binary did not exit in time")
            .unwrap();
        let _ = std::fs::remove_file(&self.config_path);
        status
    }
}

#[tokio::test]
async fn test_idle_binary_exits_zero_on_sigterm() {
    let binary = start_binary("idle", "shutdown_secs = 5").await;

    binary.sigterm();
    let status = binary.wait(Duration::from_secs(10)).await;
    assert_eq!(status.code(), Some(0));
}

#[tokio::test]
async fn test_stalled_client_makes_binary_exit_nonzero() {
    let binary = start_binary("stalled", "shutdown_secs = 1\nread_header_secs = 30").await;

    // Request line only; the headers never finish.
    let mut stalled = TcpStream::connect(binary.addr).await.unwrap();
    stalled
        .write_all(b"GET /v1/healthcheck HTTP/1.1\r\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let shutdown_at = Instant::now();
    binary.sigterm();
    let status = binary.wait(Duration::from_secs(10)).await;

    assert_eq!(status.code(), Some(1));
    assert!(shutdown_at.elapsed() >= Duration::from_millis(900));
    drop(stalled);
}
