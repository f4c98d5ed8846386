use iced::{
    widget::{button, column, progress_bar, radio, row, text, text_input, Space},
    Color, Element, Length,
};

use crate::{
    domain::{DownloadMode, DownloadPhase},
    utils::format_bytes,
};

const ERROR_COLOR: Color = Color::from_rgb(0.8, 0.15, 0.15);

/// Main view state
pub struct DownloadView {
    pub media_url: String,
    pub mode: DownloadMode,
    pub phase: DownloadPhase,
    pub status_message: String,
    pub error_message: Option<String>,
    pub file_name: Option<String>,
    /// Percent of the announced size, `None` while indeterminate.
    pub progress: Option<f32>,
    pub received_bytes: u64,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            media_url: String::new(),
            mode: DownloadMode::Video,
            phase: DownloadPhase::Idle,
            status_message: "Paste a media URL to download".to_string(),
            error_message: None,
            file_name: None,
            progress: None,
            received_bytes: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    ModeSelected(DownloadMode),
    DownloadPressed,
    ClearPressed,
}

impl DownloadView {
    pub fn is_downloading(&self) -> bool {
        self.phase == DownloadPhase::InProgress
    }

    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::UrlChanged(url) => {
                self.media_url = url;
            }
            DownloadMessage::ModeSelected(mode) => {
                if !self.is_downloading() {
                    self.mode = mode;
                }
            }
            DownloadMessage::ClearPressed => {
                self.media_url.clear();
                self.error_message = None;
            }
            DownloadMessage::DownloadPressed => {
                // Will be handled by the app
            }
        }
    }

    /// Clears everything left over from the previous attempt.
    pub fn begin_download(&mut self) {
        self.phase = DownloadPhase::InProgress;
        self.status_message = "Requesting download...".to_string();
        self.error_message = None;
        self.file_name = None;
        self.progress = None;
        self.received_bytes = 0;
    }

    pub fn set_progress(&mut self, percent: Option<f32>, received_bytes: u64) {
        self.progress = percent;
        self.received_bytes = received_bytes;
        let name = self.file_name.as_deref().unwrap_or("file");
        self.status_message = match percent {
            Some(p) => format!("Downloading {}: {:.1}%", name, p),
            None => format!(
                "Downloading {}: {} (size unknown)",
                name,
                format_bytes(received_bytes)
            ),
        };
    }

    pub fn finish(&mut self, status_message: String) {
        self.phase = DownloadPhase::Done;
        self.status_message = status_message;
    }

    pub fn fail(&mut self, error: String) {
        self.phase = DownloadPhase::Failed;
        self.status_message = "Download failed".to_string();
        self.error_message = Some(error);
        self.progress = None;
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let idle = !self.is_downloading();
        let can_download = idle && !self.media_url.trim().is_empty();

        let modes = row![
            radio(
                "Video (.mp4)",
                DownloadMode::Video,
                Some(self.mode),
                DownloadMessage::ModeSelected
            ),
            radio(
                "Audio (.mp3)",
                DownloadMode::Audio,
                Some(self.mode),
                DownloadMessage::ModeSelected
            ),
        ]
        .spacing(20);

        let actions = row![
            button("Download")
                .on_press_maybe(can_download.then_some(DownloadMessage::DownloadPressed))
                .padding([10, 20]),
            button("Clear")
                .on_press_maybe(idle.then_some(DownloadMessage::ClearPressed))
                .padding([10, 20]),
        ]
        .spacing(10);

        let mut content = column![
            text("Media Downloader").size(32),
            Space::new().height(Length::Fixed(20.0)),
            text("Media URL:").size(16),
            text_input("https://...", &self.media_url)
                .on_input(DownloadMessage::UrlChanged)
                .padding(10),
            modes,
            Space::new().height(Length::Fixed(10.0)),
            actions,
            Space::new().height(Length::Fixed(10.0)),
            text(&self.status_message).size(14),
        ]
        .padding(20)
        .spacing(10);

        if self.is_downloading() {
            // Unknown sizes still get a bar so the window shows activity.
            let value = self.progress.unwrap_or(0.0).clamp(0.0, 100.0);
            content = content.push(progress_bar(0.0..=100.0, value));
        }

        if let Some(error) = &self.error_message {
            content = content.push(text(error).size(14).color(ERROR_COLOR));
        }

        content.into()
    }
}
