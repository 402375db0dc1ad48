use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;

use crate::testing::{CaseStatus, CaseVerdict, Histogram};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {{
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }}
}

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for CaseStatus {
    fn color(&self) -> Color {
        use CaseStatus::*;
        if !self::is_truecolor_supported() {
            return match self {
                OK => Color::Green,
                WA => Color::Yellow,
                TLE | MLE => Color::Red,
                RE => Color::Magenta,
                Error => Color::BrightBlack,
            };
        }

        let (r, g, b) = match self {
            OK => (30, 180, 40),
            WA => (210, 138, 4),
            TLE => (220, 42, 42),
            MLE => (200, 70, 110),
            RE => (171, 40, 200),
            Error => (110, 110, 110),
        };
        Color::TrueColor { r, g, b }
    }
}

/// Short label used in badges: `RUNTIME_ERROR` is too wide for a column.
fn short_label(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::OK => "OK",
        CaseStatus::WA => "WA",
        CaseStatus::TLE => "TLE",
        CaseStatus::MLE => "MLE",
        CaseStatus::RE => "RE",
        CaseStatus::Error => "ERR",
    }
}

pub fn status_badge(status: CaseStatus) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightWhite
    };
    format!(" {:<3} ", short_label(status))
        .on_color(status.color())
        .bold()
        .color(fg)
}

/// `Case 3 ...  WA   [12ms]`, prefixed with the run id when replaying.
pub fn case_line(verdict: &CaseVerdict, run_id: Option<&str>) -> String {
    let time = verdict
        .exec_time_ms
        .map(|ms| format!(" [{}ms]", ms))
        .unwrap_or_default();
    let prefix = run_id.map(|id| format!("{} ", id)).unwrap_or_default();
    format!(
        "{}Case {} ... {}{}",
        prefix,
        verdict.case_no,
        status_badge(verdict.status),
        time.dimmed()
    )
}

pub fn print_summary(hist: &Histogram) {
    let bar = "-".repeat(5);
    print!("{} ", bar);

    let total = hist.total();
    let passed = hist.get(CaseStatus::OK);

    if total == 0 {
        print!("{}", "No case was run".dimmed());
    } else if hist.is_all_ok() {
        print!("{}", format!("All {} cases passed ✨", total).green());
    } else {
        let summary_msg = if passed > 0 {
            format!("{}/{} cases failed 💣", total - passed, total)
        } else {
            format!("All {} cases failed 💀", total)
        };
        let detail_msg = hist
            .iter()
            .filter(|&(status, _)| status != CaseStatus::OK)
            .map(|(status, cnt)| {
                format!(
                    "{}{}{}",
                    self::status_badge(status),
                    "x".dimmed(),
                    cnt.to_string().bold().bright_white(),
                )
            })
            .collect::<Vec<String>>()
            .join(", ");
        print!("{} ({})", summary_msg.bright_red(), detail_msg);
    }

    println!(" {}", bar);
}

pub fn print_case_detail(verdict: &CaseVerdict) {
    let (cols, _) = terminal::size().unwrap_or((40, 40));
    let cols = cols as usize;

    const BOLD_LINE: &str = "━";
    const THIN_LINE: &str = "─";

    let bold_bar = BOLD_LINE.repeat(cols).blue().bold();
    let time = verdict
        .exec_time_ms
        .map(|ms| format!(" [{}ms]", ms))
        .unwrap_or_default();

    println!(
        "\n{}: {}{}\n{}",
        format!("Case {}", verdict.case_no).bright_yellow().bold(),
        status_badge(verdict.status),
        time,
        bold_bar,
    );

    let print_sub_title = |s: &str| {
        println!(
            "{}{}",
            s.cyan().bold(),
            THIN_LINE.repeat(cols.saturating_sub(s.len() + 1)).bright_black(),
        )
    };

    let sections = [
        ("[input]", &verdict.input),
        ("[output]", &verdict.output),
        ("[message]", &verdict.message),
        ("[reason]", &verdict.reason),
    ];
    for (title, body) in sections {
        let Some(body) = body else { continue };
        print_sub_title(title);
        print_lines(body);
    }

    println!("{}", bold_bar);
}

fn print_lines(s: &str) {
    let lines: Vec<_> = s.lines().collect();
    if lines.is_empty() {
        println!("{}", "<EMPTY>".magenta().dimmed());
        return;
    }
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_end();
        print!("{}", trimmed);

        let num_trailing_whitespace = line.len() - trimmed.len();
        if num_trailing_whitespace > 0 {
            print!("{}", " ".repeat(num_trailing_whitespace).on_red());
        }
        if i + 1 == lines.len() && !s.ends_with('\n') {
            print!("{}", " Missing new line ".on_yellow().black().bold());
        }
        println!();
    }
}
