//! Image commands

use crate::cli::OutputFormat;
use crate::connection::ConnectionManager;
use crate::error::{CliError, Result as CliResult};
use crate::output::{self, format_size, short_id};
use dockchain_core::ImageSummary;
use dockchain_core::options::{ImageListOption, ImageListParams, ImagePullOption, ImagePullParams};
use serde_json::json;
use tokio::sync::oneshot;
use tracing::debug;

/// Pull an image and report how many progress messages the engine sent
pub async fn handle_pull(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    image: &str,
    tag: Option<&str>,
    platform: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let mut params = ImagePullParams::new();
    if let Some(tag) = tag {
        params = params.with_tag(tag);
    }
    if let Some(platform) = platform {
        params = params.with_platform(platform);
    }

    let (tx, rx) = oneshot::channel();
    let option = ImagePullOption::new(params).with_handler(move |progress| {
        let progress = progress?;
        let last = progress
            .iter()
            .rev()
            .find_map(|info| info.status.clone())
            .unwrap_or_default();
        let _ = tx.send((progress.len(), last));
        Ok(())
    });

    let mut chain = conn_mgr.chain(profile)?;
    chain.image_pull_with_option(image, Some(option)).await;
    chain.error()?;

    let (messages, status) = rx.await.unwrap_or_default();
    debug!("Pull finished after {} progress messages", messages);
    match output_format {
        OutputFormat::Auto => {
            if !status.is_empty() {
                println!("{}", status);
            }
            println!("Pulled {}", image);
        }
        format => output::print_output(
            json!({"image": image, "status": status, "progress_messages": messages}),
            output::OutputFormat::resolve(format, output::OutputFormat::Json),
        )?,
    }
    Ok(())
}

/// List images, optionally filtered by reference
pub async fn handle_images(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    reference: Option<&str>,
    all: bool,
    output_format: OutputFormat,
) -> CliResult<()> {
    let mut params = ImageListParams::new().with_all(all);
    if let Some(reference) = reference {
        params = params.with_reference(reference);
    }

    let (tx, rx) = oneshot::channel();
    let option = ImageListOption::new(params).with_handler(move |images| {
        let _ = tx.send(images?);
        Ok(())
    });

    let mut chain = conn_mgr.chain(profile)?;
    chain.image_list_with_option(Some(option)).await;
    chain.error()?;

    let images = rx.await.map_err(|_| CliError::EngineError {
        message: "image list produced no response".to_string(),
    })?;

    match output::OutputFormat::resolve(output_format, output::OutputFormat::Table) {
        output::OutputFormat::Table => {
            let rows: Vec<_> = images.iter().map(image_row).collect();
            if rows.is_empty() {
                println!("No images found");
                return Ok(());
            }
            output::print_output(rows, output::OutputFormat::Table)?;
        }
        format => output::print_output(&images, format)?,
    }
    Ok(())
}

fn image_row(image: &ImageSummary) -> serde_json::Value {
    json!({
        "ID": short_id(&image.id),
        "TAGS": image.repo_tags,
        "SIZE": format_size(image.size),
        "CREATED": image.created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_row() {
        let image = ImageSummary {
            id: "sha256:0123456789abcdef0123".to_string(),
            repo_tags: vec!["alpine:latest".to_string()],
            size: 7_400_000,
            created: 1_700_000_000,
            ..Default::default()
        };
        let row = image_row(&image);
        assert_eq!(row["ID"], "0123456789ab");
        assert_eq!(row["SIZE"], "7.4 MB");
        assert_eq!(row["TAGS"][0], "alpine:latest");
    }
}
