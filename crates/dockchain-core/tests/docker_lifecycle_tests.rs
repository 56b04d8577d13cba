//! End-to-end chains against a real Docker daemon.
//!
//! Run with:
//! ```bash
//! cargo test -p dockchain-core --test docker_lifecycle_tests -- --ignored --nocapture
//! ```

use std::sync::{Arc, Mutex};

use dockchain_core::options::{ContainerWaitOption, ContainerWaitParams};
use dockchain_core::{ContainerConfig, DockerChain};
use futures::StreamExt;

#[tokio::test]
#[ignore = "Requires Docker - run with --ignored"]
async fn test_create_start_wait_logs_remove() {
    let output = Arc::new(Mutex::new(String::new()));
    let sink = Arc::clone(&output);

    let mut chain = DockerChain::local();
    chain
        .image_pull("docker.io/library/alpine")
        .await
        .container_create_with_callback(
            "alpine",
            Some(ContainerConfig {
                cmd: Some(vec!["echo".to_string(), "hi".to_string()]),
                ..Default::default()
            }),
            None,
        )
        .await
        .container_start()
        .await
        .container_wait()
        .await
        .container_logs(move |logs| {
            sink.lock().unwrap().push_str(&logs?.stdout());
            Ok(())
        })
        .await
        .container_remove()
        .await;

    chain.error().expect("chain should succeed against a live daemon");
    assert_eq!(output.lock().unwrap().trim(), "hi");
}

#[tokio::test]
#[ignore = "Requires Docker - run with --ignored"]
async fn test_wait_stream_reports_exit_code() {
    let mut chain = DockerChain::local();
    chain
        .image_pull("alpine:latest")
        .await
        .container_create_with_callback(
            "alpine",
            Some(ContainerConfig {
                cmd: Some(vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()]),
                ..Default::default()
            }),
            None,
        )
        .await
        .container_start()
        .await;

    let (tx, rx) = tokio::sync::oneshot::channel();
    chain
        .container_wait_with_option(Some(
            ContainerWaitOption::new(ContainerWaitParams::new()).with_handler(move |stream| {
                let _ = tx.send(stream?);
                Ok(())
            }),
        ))
        .await;

    let mut stream = rx.await.unwrap();
    let status = stream.next().await.unwrap().unwrap();
    assert_eq!(status.status_code, 3);

    chain.container_remove().await;
    chain.error().unwrap();
}

#[tokio::test]
#[ignore = "Requires Docker - run with --ignored"]
async fn test_missing_image_fails_whole_chain() {
    let mut chain = DockerChain::local();
    chain
        .container_create_with_callback("dockchain-does-not-exist:never", None, None)
        .await
        .container_start()
        .await
        .container_remove()
        .await;

    let err = chain.error().unwrap_err();
    assert!(err.is_not_found());
    assert!(chain.error().is_ok());
}
