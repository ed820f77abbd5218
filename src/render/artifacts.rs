use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Per-sport debug dumps of the last rendered page:
/// `<root>/screenshots/screenshot-<sport>.png` and `<root>/html/page-<sport>.html`.
/// Each cycle overwrites the previous files. Failures are logged only.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    screenshots_dir: PathBuf,
    html_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(root: &Path) -> Self {
        Self {
            screenshots_dir: root.join("screenshots"),
            html_dir: root.join("html"),
        }
    }

    pub fn screenshot_path(&self, sport: &str) -> PathBuf {
        self.screenshots_dir.join(format!("screenshot-{sport}.png"))
    }

    pub fn html_path(&self, sport: &str) -> PathBuf {
        self.html_dir.join(format!("page-{sport}.html"))
    }

    pub fn save_screenshot(&self, sport: &str, png: &[u8]) {
        write_file(&self.screenshots_dir, &self.screenshot_path(sport), png);
    }

    pub fn save_html(&self, sport: &str, html: &str) {
        write_file(&self.html_dir, &self.html_path(sport), html.as_bytes());
    }
}

fn write_file(dir: &Path, path: &Path, bytes: &[u8]) {
    if let Err(e) = fs::create_dir_all(dir).and_then(|_| fs::write(path, bytes)) {
        warn!("Could not write debug artifact {}: {e}", path.display());
        return;
    }
    debug!("Saved {}", path.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("livescore-artifacts-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn writes_and_overwrites_per_sport_files() {
        let root = scratch_dir("overwrite");
        let writer = ArtifactWriter::new(&root);

        writer.save_html("soccer", "<p>first</p>");
        writer.save_html("soccer", "<p>second</p>");
        writer.save_screenshot("soccer", &[0x89, b'P', b'N', b'G']);

        assert_eq!(fs::read_to_string(root.join("html/page-soccer.html")).unwrap(), "<p>second</p>");
        assert_eq!(fs::read(root.join("screenshots/screenshot-soccer.png")).unwrap().len(), 4);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn unwritable_location_is_not_fatal() {
        let root = scratch_dir("blocked");
        fs::write(&root, b"a file, not a directory").unwrap();
        let writer = ArtifactWriter::new(&root);
        writer.save_html("tennis", "<p/>");
        assert!(!writer.html_path("tennis").exists());
        let _ = fs::remove_file(&root);
    }
}
