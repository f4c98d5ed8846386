use crate::api::{ApiClient, ApiConfig};
use crate::application::{DownloadCoordinator, DownloadEvent};
use crate::domain::{AppError, DownloadRequest, DownloadedFile};
use crate::ui::{DownloadMessage, DownloadView};
use crate::utils::{format_bytes, parse_media_url, sanitize_filename};
use futures::StreamExt;
use iced::{task, Task};
use std::path::PathBuf;
use tracing::{error, info};

pub struct DownloadApp {
    view: DownloadView,
    coordinator: Option<DownloadCoordinator>,
    // Why `coordinator` is missing, shown again on every Download press
    client_error: Option<String>,
    // Abort handle for the running download stream
    active_download: Option<task::Handle>,
}

impl DownloadApp {
    pub fn new(config: ApiConfig) -> Self {
        let mut view = DownloadView::default();
        let (coordinator, client_error) = match ApiClient::new(config) {
            Ok(client) => (Some(DownloadCoordinator::new(client)), None),
            Err(e) => {
                error!(error = %e, "failed to create HTTP client");
                (None, Some(e.to_string()))
            }
        };
        view.error_message = client_error.clone();

        Self {
            view,
            coordinator,
            client_error,
            active_download: None,
        }
    }

    /// Cancels the previous stream, if any, instead of leaving it running.
    fn release_active_download(&mut self) {
        if let Some(handle) = self.active_download.take() {
            handle.abort();
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    Download(DownloadEvent),
    /// (Selected Path, assembled file)
    FileSaveSelected(Option<PathBuf>, DownloadedFile),
    /// Final result after writing the file to disk
    FileSaved(Result<PathBuf, AppError>),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            if let DownloadMessage::DownloadPressed = ui_msg {
                return start_download(app);
            }
        }
        Message::Download(event) => return handle_download_event(app, event),
        Message::FileSaveSelected(path_opt, file) => match path_opt {
            Some(path) => {
                app.view.status_message = format!("Saving to: {}", path.display());
                return Task::perform(
                    async move {
                        tokio::fs::write(&path, &file.data)
                            .await
                            .map(|_| path)
                            .map_err(|e| AppError::Io(format!("Failed to write file: {}", e)))
                    },
                    Message::FileSaved,
                );
            }
            None => {
                // User cancelled dialog
                if save_result_applies(app) {
                    app.view.finish("Save cancelled".to_string());
                }
            }
        },
        Message::FileSaved(result) => match result {
            Ok(path) => {
                info!(path = %path.display(), "file saved");
                if save_result_applies(app) {
                    app.view.finish(format!("Saved: {}", path.display()));
                }
            }
            Err(e) => {
                error!(error = %e, "saving file failed");
                if save_result_applies(app) {
                    app.view.fail(e.to_string());
                }
            }
        },
    }
    Task::none()
}

/// A save dialog outlives its attempt; once a newer download is running its
/// outcome must not touch the view.
fn save_result_applies(app: &DownloadApp) -> bool {
    app.active_download.is_none() && !app.view.is_downloading()
}

fn start_download(app: &mut DownloadApp) -> Task<Message> {
    if app.view.is_downloading() {
        app.view.error_message = Some(AppError::Busy.to_string());
        return Task::none();
    }

    let url = match parse_media_url(&app.view.media_url) {
        Ok(url) => url,
        Err(e) => {
            app.view.error_message = Some(e.to_string());
            return Task::none();
        }
    };

    let Some(coordinator) = app.coordinator.clone() else {
        app.view.error_message = app.client_error.clone();
        return Task::none();
    };

    app.release_active_download();
    app.view.begin_download();

    let request = DownloadRequest {
        url,
        mode: app.view.mode,
    };
    let (task, handle) =
        Task::stream(coordinator.download_stream(request).map(Message::Download)).abortable();
    app.active_download = Some(handle);
    task
}

fn handle_download_event(app: &mut DownloadApp, event: DownloadEvent) -> Task<Message> {
    match event {
        DownloadEvent::Started => {
            app.view.status_message = "Waiting for data...".to_string();
        }
        DownloadEvent::Metadata(file_name) => {
            app.view.status_message = format!("Downloading {}", file_name);
            app.view.file_name = Some(file_name);
        }
        DownloadEvent::Progress {
            percent,
            received_bytes,
        } => {
            app.view.set_progress(percent, received_bytes);
        }
        DownloadEvent::Completed(file) => {
            app.active_download = None;
            app.view.finish(format!(
                "Downloaded {} ({}), choose where to save...",
                file.file_name,
                format_bytes(file.data.len() as u64)
            ));
            let suggested_filename = sanitize_filename(&file.file_name);

            return Task::perform(
                async move {
                    let path = rfd::AsyncFileDialog::new()
                        .set_file_name(&suggested_filename)
                        .save_file()
                        .await
                        .map(|handle| handle.path().to_path_buf());

                    (path, file)
                },
                |(path, file)| Message::FileSaveSelected(path, file),
            );
        }
        DownloadEvent::Failed(e) => {
            app.active_download = None;
            app.view.fail(e.to_string());
        }
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}
