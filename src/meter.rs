use {
    crossterm::style::{Color, StyledContent, Stylize},
    std::iter::{once, repeat_n},
};

/// a labelled utilization bar.
///
/// ```text
/// cpu0  [████████              ]  36.4%
/// ```
pub struct Meter<'a> {
    pub label: &'a str,
    /// the utilization to show, or `None` if it could not be read.
    pub percent: Option<f64>,
    /// the number of cells between the brackets.
    pub width: usize,
}

// === impl Meter ===

impl Meter<'_> {
    const ACTIVE: char = '█';
    const IDLE: char = ' ';
    const BORDER_L: char = '[';
    const BORDER_R: char = ']';
    const LABEL: usize = 6;

    /// the meter, as styled spans ready to print.
    pub fn spans(&self) -> Vec<StyledContent<String>> {
        let Self {
            label,
            percent,
            width,
        } = self;

        let label = format!("{label:<width$}", width = Self::LABEL).stylize();
        let Some(percent) = percent else {
            let bar = format!(
                "{}{:^width$}{}",
                Self::BORDER_L,
                "N/A",
                Self::BORDER_R,
                width = *width
            );
            return vec![label, bar.dark_grey()];
        };

        let percent = percent.clamp(0.0, 100.0);
        let filled = Self::cells(percent, *width);
        let bar = once(Self::BORDER_L)
            .chain(repeat_n(Self::ACTIVE, filled))
            .chain(repeat_n(Self::IDLE, width - filled))
            .chain(once(Self::BORDER_R))
            .collect::<String>();

        vec![
            label,
            bar.with(Self::color(percent)),
            format!(" {percent:5.1}%").stylize(),
        ]
    }

    /// how many cells a percentage fills.
    fn cells(percent: f64, width: usize) -> usize {
        let filled = (percent / 100.0 * width as f64).round() as usize;
        filled.min(width)
    }

    fn color(percent: f64) -> Color {
        match percent {
            p if p >= 80.0 => Color::Red,
            p if p >= 50.0 => Color::Yellow,
            _ => Color::Green,
        }
    }
}
