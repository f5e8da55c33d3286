use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Detect if we're running in a CI environment
fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS", "JENKINS_URL"]
        .iter()
        .any(|name| std::env::var_os(name).is_some())
}

/// Create a spinner with a message
/// Returns a hidden spinner in CI environments
pub fn spinner(message: &str) -> ProgressBar {
    let pb = if is_ci() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };

    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Progress bar counting the chunks of a batch.
/// Hidden in CI environments or when `visible` is false.
pub fn chunk_bar(total: u64, visible: bool) -> ProgressBar {
    let pb = if is_ci() || !visible {
        ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::hidden())
    } else {
        ProgressBar::new(total)
    };

    if let Ok(style) =
        ProgressStyle::default_bar().template("{bar:30.cyan/blue} {pos}/{len} chunks {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}
