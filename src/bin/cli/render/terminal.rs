use studyquiz_lib::quiz::ScoreBand;
use studyquiz_lib::stats::{MasteryLevel, ProgressTrend};

/// ANSI color codes
pub struct Color;

impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Wrap text in a color when colors are enabled
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

pub fn bold(text: &str, use_color: bool) -> String {
    paint(text, Color::BOLD, use_color)
}

pub fn dim(text: &str, use_color: bool) -> String {
    paint(text, Color::DIM, use_color)
}

pub fn band_color(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::Good => Color::GREEN,
        ScoreBand::Fair => Color::YELLOW,
        ScoreBand::Poor => Color::RED,
    }
}

/// Percentage colored by the same bands as quiz results
pub fn percent(score: u32, use_color: bool) -> String {
    let band = match score {
        80.. => ScoreBand::Good,
        60..=79 => ScoreBand::Fair,
        _ => ScoreBand::Poor,
    };
    paint(&format!("{}%", score), band_color(band), use_color)
}

pub fn mastery(level: MasteryLevel, use_color: bool) -> String {
    let color = match level {
        MasteryLevel::Expert => Color::GREEN,
        MasteryLevel::Advanced => Color::BLUE,
        MasteryLevel::Intermediate => Color::YELLOW,
        MasteryLevel::Beginner => Color::GRAY,
    };
    paint(level.label(), color, use_color)
}

pub fn trend(trend: ProgressTrend, use_color: bool) -> String {
    match trend {
        ProgressTrend::Improving => paint("↑ improving", Color::GREEN, use_color),
        ProgressTrend::Declining => paint("↓ declining", Color::RED, use_color),
        ProgressTrend::Stable => paint("→ stable", Color::CYAN, use_color),
    }
}

/// Text progress bar, e.g. `[#####-----]`
pub fn progress_bar(done: usize, total: usize, width: usize) -> String {
    let filled = if total == 0 { 0 } else { (done * width) / total };
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled.min(width)))
}
