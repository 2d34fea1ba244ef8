//! Progress indicators for debrig.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use toolchain::{Transport, TransportError};

/// Create a spinner; hidden when `quiet` or when stderr is not a terminal
pub fn spinner(msg: &str, quiet: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if quiet {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]);
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Finish a spinner with a success mark
pub fn finish_success(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    if !pb.is_hidden() {
        eprintln!("{} {}", "✓".green(), msg);
    }
}

/// Finish a spinner with an error mark
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    if !pb.is_hidden() {
        eprintln!("{} {}", "✗".red(), msg);
    }
}

/// Transport that shows a spinner while each download runs
#[derive(Debug)]
pub struct SpinningTransport<T> {
    inner: T,
    quiet: bool,
}

impl<T: Transport> SpinningTransport<T> {
    pub fn new(inner: T, quiet: bool) -> Self {
        Self { inner, quiet }
    }
}

impl<T: Transport> Transport for SpinningTransport<T> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let pb = spinner(&format!("Downloading {url}"), self.quiet);

        match self.inner.fetch(url) {
            Ok(bytes) => {
                finish_success(&pb, &format!("Downloaded {url} ({} bytes)", bytes.len()));
                Ok(bytes)
            }
            Err(e) => {
                finish_error(&pb, &format!("Download failed: {url}"));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolchain::MockTransport;

    #[test]
    fn test_spinning_transport_passes_through() {
        let mock = MockTransport::new();
        mock.add_response("https://example.com/key.asc", b"key".to_vec());

        let transport = SpinningTransport::new(mock.clone(), true);
        assert_eq!(transport.fetch("https://example.com/key.asc").unwrap(), b"key");

        let err = transport.fetch("https://example.com/missing").unwrap_err();
        assert_eq!(err.exit_code, 22);
        assert_eq!(mock.requests().len(), 2);
    }
}
