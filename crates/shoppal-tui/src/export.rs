//! Saving the transcript as a standalone HTML page.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use shoppal_core::{render_transcript_html, Dispatcher, RenderOptions, Session};

/// `<data dir>/shoppal/transcripts/<session>.html`
pub fn default_transcript_path(session: &Session) -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;

    Ok(transcript_file(&data_dir.join("shoppal").join("transcripts"), session))
}

pub fn transcript_file(dir: &Path, session: &Session) -> PathBuf {
    dir.join(format!("{}.html", file_stem(session.token())))
}

/// Session tokens are opaque; keep only characters safe in a file name.
fn file_stem(token: &str) -> String {
    let stem: String = token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(64)
        .collect();

    if stem.is_empty() {
        "unsaved".to_string()
    } else {
        stem
    }
}

pub fn write_transcript(dispatcher: &Dispatcher, options: &RenderOptions, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let title = match dispatcher.session().token() {
        "" => "Shop Pal".to_string(),
        token => format!("Shop Pal - {token}"),
    };
    let html = render_transcript_html(dispatcher.transcript().visible(), &title, options);
    fs::write(path, html)?;

    tracing::info!(path = %path.display(), turns = dispatcher.transcript().len(), "transcript exported");
    Ok(())
}
