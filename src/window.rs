//! the crossterm dashboard.

use {
    crate::{
        controller::Renderer,
        format::{format_bytes, format_metric},
        input::Key,
        meter::Meter,
        metric::{Metric, ProcessRow, Snapshot},
        registry::Board,
        source::board::UNKNOWN_MODEL,
    },
    crossterm::{
        QueueableCommand, cursor,
        style::{self, StyledContent, Stylize},
        terminal,
    },
    std::io::{self, Write},
};

/// draws snapshots as a full-screen dashboard.
pub struct Window<W: Write> {
    out: W,
    /// a fixed size, or `None` to ask the terminal each frame.
    size: Option<(u16, u16)>,
    table: ProcessTable,
}

/// how the process table is ordered, scrolled, and cut short.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessTable {
    sort: SortKey,
    /// the index of the first visible row.
    scroll: usize,
    /// the most rows shown at once.
    limit: usize,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortKey {
    #[default]
    Cpu,
    Memory,
    Pid,
    Name,
}

/// one frame being drawn, top to bottom.
struct Frame<'a, W: Write> {
    out: &'a mut W,
    row: u16,
    cols: u16,
    rows: u16,
}

// === impl Window ===

impl Window<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), None)
    }
}

impl<W: Write> Window<W> {
    const METER: usize = 30;

    pub fn new(out: W, size: Option<(u16, u16)>) -> Self {
        Self {
            out,
            size,
            table: ProcessTable::default(),
        }
    }

    /// shows at most `limit` processes, taken after sorting.
    pub fn top(mut self, limit: usize) -> Self {
        self.table.limit = limit;
        self
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    fn header(frame: &mut Frame<'_, W>, snapshot: &Snapshot) -> io::Result<()> {
        let model = snapshot.metric("soc.model").as_text().unwrap_or(UNKNOWN_MODEL);
        let text = |id| format_metric(snapshot.metric(id));
        let clock = chrono::Local::now().format("%H:%M:%S");

        frame.line(vec![
            "rktop ".to_owned().bold(),
            model.to_owned().cyan().bold(),
            format!("  npu driver {}", text("npu.driver")).stylize(),
            format!("  runtime {}", text("npu.runtime")).stylize(),
            format!("  {clock}").dark_grey(),
        ])?;
        frame.blank()
    }

    fn cpus(frame: &mut Frame<'_, W>, snapshot: &Snapshot, board: &Board) -> io::Result<()> {
        let percent = |id: &str| snapshot.metric(id).as_percentage();

        frame.title("CPU")?;
        frame.meter("all", percent("cpu.load.all"))?;

        let clusters = board.topology.clusters();
        if clusters.is_empty() {
            // no topology; list whatever cores reported.
            for (core, metric) in snapshot.group("cpu.load").filter(|(key, _)| *key != "all") {
                frame.meter(&format!("cpu{core}"), metric.as_percentage())?;
            }
        } else {
            for (n, cluster) in clusters.iter().enumerate() {
                frame.line(vec![format!(" cluster {n}").dark_grey()])?;
                for core in cluster {
                    frame.meter(&format!("cpu{core}"), percent(&format!("cpu.load.{core}")))?;
                }
            }
        }

        frame.blank()
    }

    fn accelerators(frame: &mut Frame<'_, W>, snapshot: &Snapshot) -> io::Result<()> {
        frame.title("NPU / GPU")?;

        let mut cores = snapshot.group("npu.load").peekable();
        if cores.peek().is_none() {
            frame.meter("npu", None)?;
        }
        for (core, metric) in cores {
            frame.meter(&format!("npu{core}"), metric.as_percentage())?;
        }
        frame.meter("gpu", snapshot.metric("gpu.load").as_percentage())?;

        frame.blank()
    }

    fn memory(frame: &mut Frame<'_, W>, snapshot: &Snapshot) -> io::Result<()> {
        frame.title("Memory")?;

        for (label, id) in [("ram", "mem.ram"), ("swap", "mem.swap")] {
            let used = snapshot.metric(&format!("{id}.used")).as_bytes();
            let total = snapshot.metric(&format!("{id}.total")).as_bytes();
            let percent = snapshot.metric(&format!("{id}.percent")).as_percentage();
            let detail = match (used, total) {
                (Some(used), Some(total)) => {
                    format!("  {} / {}", format_bytes(used), format_bytes(total))
                }
                _ => String::new(),
            };
            frame.meter_with(label, percent, detail)?;
        }

        let zram = |key| snapshot.metric(&format!("mem.zram.{key}")).as_bytes();
        let detail = match (zram("orig"), zram("compr")) {
            (Some(orig), Some(compr)) => {
                format!("  {} -> {}", format_bytes(orig), format_bytes(compr))
            }
            _ => String::new(),
        };
        let percent = snapshot.metric("mem.zram.percent").as_percentage();
        frame.meter_with("zram", percent, detail)?;

        frame.blank()
    }

    fn temperatures(frame: &mut Frame<'_, W>, snapshot: &Snapshot) -> io::Result<()> {
        frame.title("Temperature")?;

        let mut zones = snapshot.group("temp").peekable();
        if zones.peek().is_none() {
            frame.line(vec![" N/A".to_owned().dark_grey()])?;
        }
        for (zone, metric) in zones {
            let reading = match metric {
                Metric::Temperature(t) => {
                    let text = format!("{t:>4}°C");
                    match t {
                        t if *t >= 80 => text.red(),
                        t if *t >= 60 => text.yellow(),
                        _ => text.green(),
                    }
                }
                _ => "  N/A".to_owned().dark_grey(),
            };
            frame.line(vec![format!(" {zone:<20}").stylize(), reading])?;
        }

        frame.blank()
    }

    fn throughput(frame: &mut Frame<'_, W>, snapshot: &Snapshot) -> io::Result<()> {
        let rate = |id| format_metric(snapshot.metric(id));

        frame.title("I/O")?;
        frame.line(vec![
            format!(" disk  read {:>12}  write {:>12}", rate("disk.read"), rate("disk.write"))
                .stylize(),
        ])?;
        frame.line(vec![
            format!(" net   rx   {:>12}  tx    {:>12}", rate("net.rx"), rate("net.tx")).stylize(),
        ])?;

        frame.blank()
    }

    fn processes(
        frame: &mut Frame<'_, W>,
        snapshot: &Snapshot,
        table: &mut ProcessTable,
    ) -> io::Result<()> {
        frame.title(&format!("Processes (sort: {})", table.sort.name()))?;

        let Metric::Processes(rows) = snapshot.metric("proc.top") else {
            return frame.line(vec![" N/A".to_owned().dark_grey()]);
        };

        frame.line(vec![
            format!(" {:>7}  {:<24} {:>6}  {:>10}", "PID", "NAME", "CPU%", "MEM").reverse(),
        ])?;
        for row in table.visible(rows) {
            frame.line(vec![
                format!(
                    " {:>7}  {:<24} {:>6.1}  {:>10}",
                    row.pid,
                    truncate(&row.name, 24),
                    row.cpu,
                    format_bytes(row.memory)
                )
                .stylize(),
            ])?;
        }

        Ok(())
    }
}

impl<W: Write> Renderer for Window<W> {
    fn render(&mut self, snapshot: &Snapshot, board: &Board) -> io::Result<()> {
        let Self { out, size, table } = self;

        let (cols, rows) = match size {
            Some(size) => *size,
            None => terminal::size()?,
        };
        let mut frame = Frame {
            out,
            row: 0,
            cols,
            rows,
        };

        Self::header(&mut frame, snapshot)?;
        Self::cpus(&mut frame, snapshot, board)?;
        Self::accelerators(&mut frame, snapshot)?;
        Self::memory(&mut frame, snapshot)?;
        Self::temperatures(&mut frame, snapshot)?;
        Self::throughput(&mut frame, snapshot)?;
        Self::processes(&mut frame, snapshot, table)?;

        frame.finish()
    }

    fn key(&mut self, key: Key) {
        self.table.key(key);
    }
}

// === impl ProcessTable ===

impl Default for ProcessTable {
    fn default() -> Self {
        Self {
            sort: SortKey::default(),
            scroll: 0,
            limit: usize::MAX,
        }
    }
}

impl ProcessTable {
    /// scrolls with up and down; cycles the sort order with left and right.
    pub fn key(&mut self, key: Key) {
        match key {
            Key::Up => self.scroll = self.scroll.saturating_sub(1),
            Key::Down => self.scroll = self.scroll.saturating_add(1),
            Key::Left => self.sort = self.sort.prev(),
            Key::Right => self.sort = self.sort.next(),
            _ => {}
        }
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    /// the rows to show, in order. the scroll offset is clamped to the rows available.
    ///
    /// every row is sorted before any are dropped, so the table shows the top rows of its own
    /// order rather than of the order they arrived in.
    pub fn visible<'a>(&mut self, rows: &'a [ProcessRow]) -> Vec<&'a ProcessRow> {
        let mut sorted = rows.iter().collect::<Vec<_>>();
        match self.sort {
            SortKey::Cpu => sorted.sort_by(|a, b| b.cpu.total_cmp(&a.cpu)),
            SortKey::Memory => sorted.sort_by(|a, b| b.memory.cmp(&a.memory)),
            SortKey::Pid => sorted.sort_by_key(|row| row.pid),
            SortKey::Name => sorted.sort_by(|a, b| a.name.cmp(&b.name)),
        }

        self.scroll = self.scroll.min(sorted.len().saturating_sub(1));
        sorted
            .into_iter()
            .skip(self.scroll)
            .take(self.limit)
            .collect()
    }
}

// === impl SortKey ===

impl SortKey {
    const ALL: [Self; 4] = [Self::Cpu, Self::Memory, Self::Pid, Self::Name];

    pub fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Pid => "pid",
            Self::Name => "name",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|key| *key == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

// === impl Frame ===

impl<W: Write> Frame<'_, W> {
    /// draws one line of spans, clipped to the screen.
    fn line(&mut self, spans: Vec<StyledContent<String>>) -> io::Result<()> {
        let Self {
            out,
            row,
            cols,
            rows,
        } = self;

        if *row >= *rows {
            return Ok(());
        }

        out.queue(cursor::MoveTo(0, *row))?
            .queue(terminal::Clear(terminal::ClearType::CurrentLine))?;

        let mut room = *cols as usize;
        for span in spans {
            if room == 0 {
                break;
            }
            let width = span.content().chars().count();
            let span = if width > room {
                StyledContent::new(*span.style(), truncate(span.content(), room))
            } else {
                span
            };
            room -= width.min(room);
            out.queue(style::PrintStyledContent(span))?;
        }

        *row += 1;
        Ok(())
    }

    fn blank(&mut self) -> io::Result<()> {
        self.line(Vec::new())
    }

    fn title(&mut self, title: &str) -> io::Result<()> {
        self.line(vec![title.to_owned().bold().underlined()])
    }

    fn meter(&mut self, label: &str, percent: Option<f64>) -> io::Result<()> {
        self.meter_with(label, percent, String::new())
    }

    fn meter_with(&mut self, label: &str, percent: Option<f64>, detail: String) -> io::Result<()> {
        let mut spans = Meter {
            label,
            percent,
            width: Window::<W>::METER,
        }
        .spans();
        spans.insert(0, " ".to_owned().stylize());
        spans.push(detail.dark_grey());
        self.line(spans)
    }

    /// clears whatever the previous frame left below this one, and flushes.
    fn finish(self) -> io::Result<()> {
        let Self { out, row, rows, .. } = self;
        if row < rows {
            out.queue(cursor::MoveTo(0, row))?
                .queue(terminal::Clear(terminal::ClearType::FromCursorDown))?;
        }
        out.flush()
    }
}

/// the first `max` characters of `s`.
fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
