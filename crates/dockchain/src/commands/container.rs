//! Container commands
//!
//! `run` drives the whole lifecycle through one chain; the other commands are
//! single-operation chains against an existing container.

use crate::cli::OutputFormat;
use crate::connection::ConnectionManager;
use crate::error::{CliError, Result as CliResult};
use crate::output;
use dockchain_core::options::{
    ContainerCreateOption, ContainerCreateParams, ContainerLogsOption, ContainerLogsParams,
    ContainerRemoveOption, ContainerRemoveParams, ContainerWaitOption, ContainerWaitParams,
};
use dockchain_core::{ContainerLogs, ContainerWaitResponse, WaitCondition, WaitStream};
use futures::StreamExt;
use serde_json::json;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Arguments of `dockchain run`
#[derive(Debug)]
pub struct RunArgs<'a> {
    pub image: &'a str,
    pub name: Option<&'a str>,
    pub pull: bool,
    pub keep: bool,
    pub cmd: &'a [String],
}

/// Create, start, wait, print logs, and (unless kept) remove a container
pub async fn handle_run(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    args: RunArgs<'_>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let mut params = ContainerCreateParams::new(args.image);
    if !args.cmd.is_empty() {
        params = params.with_cmd(args.cmd.iter().cloned());
    }
    if let Some(name) = args.name {
        params = params.with_name(name);
    }

    let mut chain = conn_mgr.chain(profile)?;
    if args.pull {
        chain.image_pull(args.image).await;
    }

    let (wait_tx, wait_rx) = oneshot::channel();
    chain
        .container_create_with_option(Some(ContainerCreateOption::new(params)))
        .await
        .container_start()
        .await
        .container_wait_with_option(Some(wait_handler(ContainerWaitParams::new(), wait_tx)))
        .await;

    let id = chain.last_container_id().to_string();
    let status = match wait_rx.await {
        Ok(stream) => first_status(stream).await,
        Err(_) => Ok(None),
    };

    let (logs_tx, logs_rx) = oneshot::channel();
    chain
        .container_logs(move |logs| {
            let _ = logs_tx.send(logs?);
            Ok(())
        })
        .await;
    if !args.keep {
        chain
            .container_remove_with_option(Some(ContainerRemoveOption::new(
                ContainerRemoveParams::new().with_force(true),
            )))
            .await;
    }
    chain.error()?;

    let status = status?;
    let code = status.as_ref().map_or(0, |s| s.status_code);
    info!(container = %id, code, "Container finished");

    if let Ok(logs) = logs_rx.await {
        print_logs(&logs, output_format, Some(&id), Some(code))?;
    }
    if args.keep {
        debug!("Keeping container {}", id);
    }

    if code != 0 {
        return Err(CliError::ContainerExited { id, code });
    }
    Ok(())
}

/// Start a container by ID or name
pub async fn handle_start(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    id: &str,
) -> CliResult<()> {
    let mut chain = conn_mgr.chain(profile)?;
    chain.container_start_with_id(id).await;
    chain.error()?;
    println!("{}", id);
    Ok(())
}

/// Wait for a container and print its exit status
pub async fn handle_wait(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    id: &str,
    condition: WaitCondition,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (tx, rx) = oneshot::channel();
    let params = ContainerWaitParams::new()
        .with_id(id)
        .with_condition(condition);

    let mut chain = conn_mgr.chain(profile)?;
    chain
        .container_wait_with_option(Some(wait_handler(params, tx)))
        .await;
    chain.error()?;

    let stream = rx.await.map_err(|_| CliError::EngineError {
        message: "wait produced no response".to_string(),
    })?;
    let code = first_status(stream).await?.map_or(0, |s| s.status_code);

    match output_format {
        OutputFormat::Auto => println!("{}", code),
        format => output::print_output(
            json!({"id": id, "status_code": code}),
            output::OutputFormat::resolve(format, output::OutputFormat::Json),
        )?,
    }
    Ok(())
}

/// Print a container's logs
pub async fn handle_logs(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    id: &str,
    tail: &str,
    timestamps: bool,
    output_format: OutputFormat,
) -> CliResult<()> {
    let (tx, rx) = oneshot::channel();
    let params = ContainerLogsParams::new()
        .with_id(id)
        .with_tail(tail)
        .with_timestamps(timestamps);

    let mut chain = conn_mgr.chain(profile)?;
    chain
        .container_logs_with_option(Some(ContainerLogsOption::new(params).with_handler(
            move |logs| {
                let _ = tx.send(logs?);
                Ok(())
            },
        )))
        .await;
    chain.error()?;

    if let Ok(logs) = rx.await {
        print_logs(&logs, output_format, Some(id), None)?;
    }
    Ok(())
}

/// Remove a container
pub async fn handle_rm(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    id: &str,
    force: bool,
    volumes: bool,
) -> CliResult<()> {
    let params = ContainerRemoveParams::new()
        .with_id(id)
        .with_force(force)
        .with_volumes(volumes);

    let mut chain = conn_mgr.chain(profile)?;
    chain
        .container_remove_with_option(Some(ContainerRemoveOption::new(params)))
        .await;
    chain.error()?;
    println!("{}", id);
    Ok(())
}

fn wait_handler(
    params: ContainerWaitParams,
    tx: oneshot::Sender<WaitStream>,
) -> ContainerWaitOption {
    ContainerWaitOption::new(params).with_handler(move |stream| {
        let _ = tx.send(stream?);
        Ok(())
    })
}

async fn first_status(mut stream: WaitStream) -> CliResult<Option<ContainerWaitResponse>> {
    match stream.next().await {
        Some(Ok(status)) => Ok(Some(status)),
        Some(Err(err)) => Err(err.into()),
        None => Ok(None),
    }
}

fn print_logs(
    logs: &ContainerLogs,
    output_format: OutputFormat,
    id: Option<&str>,
    status_code: Option<i64>,
) -> CliResult<()> {
    match output_format {
        OutputFormat::Auto | OutputFormat::Table => {
            print!("{}", logs.stdout());
            eprint!("{}", logs.stderr());
        }
        format => output::print_output(
            json!({
                "id": id,
                "status_code": status_code,
                "stdout": logs.stdout(),
                "stderr": logs.stderr(),
            }),
            output::OutputFormat::resolve(format, output::OutputFormat::Json),
        )?,
    }
    Ok(())
}
