use url::Url;

use crate::domain::AppError;

/// Parse user input as an absolute http(s) URL
pub fn parse_media_url(input: &str) -> Result<Url, AppError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::InvalidInput("URL is empty".to_string()));
    }

    let url = Url::parse(input).map_err(|e| AppError::InvalidInput(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::InvalidInput(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host().is_none() {
        return Err(AppError::InvalidInput("URL has no host".to_string()));
    }
    Ok(url)
}

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Human readable byte count, e.g. `1.5 MiB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
