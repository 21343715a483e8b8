//! sources answered by the operating system, through `sysinfo`.

use {
    super::{Probe, Source, SourceError},
    crate::metric::{Metric, ProcessRow, Reading},
    std::{cell::RefCell, collections::BTreeSet, rc::Rc},
    sysinfo::{Disks, Networks, ProcessesToUpdate, System},
};

/// a `sysinfo` handle shared by the sources that refresh parts of it.
pub type SharedSystem = Rc<RefCell<System>>;

/// physical memory usage.
pub struct Ram {
    system: SharedSystem,
}

/// swap usage.
pub struct Swap {
    system: SharedSystem,
}

/// disk throughput, summed across block devices.
pub struct DiskIo {
    disks: Disks,
}

/// network throughput, summed across interfaces other than loopback.
pub struct NetworkIo {
    networks: Networks,
}

/// every process, busiest first.
///
/// NB: the list is not cut short here. the process table can be re-sorted, and must see every
/// row to find e.g. the largest by memory.
pub struct TopProcesses {
    system: SharedSystem,
}

pub fn shared_system() -> SharedSystem {
    Rc::new(RefCell::new(System::new()))
}

/// keyed `used`, `total`, and `percent` metrics.
fn usage(used: u64, total: u64) -> Reading {
    let percent = if total > 0 {
        used as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    Reading::Keyed(vec![
        ("used".to_owned(), Metric::Bytes(used)),
        ("total".to_owned(), Metric::Bytes(total)),
        ("percent".to_owned(), Metric::percentage(percent)),
    ])
}

/// orders processes by cpu usage, then memory, then pid.
pub fn rank_processes(mut rows: Vec<ProcessRow>) -> Vec<ProcessRow> {
    rows.sort_by(|a, b| {
        b.cpu
            .total_cmp(&a.cpu)
            .then_with(|| b.memory.cmp(&a.memory))
            .then_with(|| a.pid.cmp(&b.pid))
    });
    rows
}

// === impl Ram ===

impl Ram {
    pub fn new(system: SharedSystem) -> Self {
        Self { system }
    }
}

impl Source for Ram {
    fn id(&self) -> &str {
        "mem.ram"
    }

    fn sample(&mut self, _: &mut Probe<'_>) -> Result<Reading, SourceError> {
        let mut system = self.system.borrow_mut();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(SourceError::not_available("memory statistics"));
        }
        let used = total.saturating_sub(system.available_memory());

        Ok(usage(used, total))
    }
}

// === impl Swap ===

impl Swap {
    pub fn new(system: SharedSystem) -> Self {
        Self { system }
    }
}

impl Source for Swap {
    fn id(&self) -> &str {
        "mem.swap"
    }

    fn sample(&mut self, _: &mut Probe<'_>) -> Result<Reading, SourceError> {
        let mut system = self.system.borrow_mut();
        system.refresh_memory();

        Ok(usage(system.used_swap(), system.total_swap()))
    }
}

// === impl DiskIo ===

impl DiskIo {
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for DiskIo {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for DiskIo {
    fn id(&self) -> &str {
        "disk"
    }

    fn sample(&mut self, probe: &mut Probe<'_>) -> Result<Reading, SourceError> {
        let Self { disks } = self;
        disks.refresh(true);

        // the same device may be mounted more than once.
        let mut seen = BTreeSet::new();
        let (read, written) = disks
            .list()
            .iter()
            .filter(|disk| seen.insert(disk.name().to_owned()))
            .map(|disk| disk.usage())
            .fold((0u64, 0u64), |(read, written), usage| {
                (
                    read.saturating_add(usage.total_read_bytes),
                    written.saturating_add(usage.total_written_bytes),
                )
            });

        let Probe { now, rates } = probe;
        Ok(Reading::Keyed(vec![
            ("read".to_owned(), Metric::rate(rates.rate("disk.read", read, *now))),
            ("write".to_owned(), Metric::rate(rates.rate("disk.write", written, *now))),
        ]))
    }
}

// === impl NetworkIo ===

impl NetworkIo {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for NetworkIo {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for NetworkIo {
    fn id(&self) -> &str {
        "net"
    }

    fn sample(&mut self, probe: &mut Probe<'_>) -> Result<Reading, SourceError> {
        let Self { networks } = self;
        networks.refresh(true);

        let (rx, tx) = networks
            .list()
            .iter()
            .filter(|(name, _)| name.as_str() != "lo")
            .fold((0u64, 0u64), |(rx, tx), (_, data)| {
                (
                    rx.saturating_add(data.total_received()),
                    tx.saturating_add(data.total_transmitted()),
                )
            });

        let Probe { now, rates } = probe;
        Ok(Reading::Keyed(vec![
            ("rx".to_owned(), Metric::rate(rates.rate("net.rx", rx, *now))),
            ("tx".to_owned(), Metric::rate(rates.rate("net.tx", tx, *now))),
        ]))
    }
}

// === impl TopProcesses ===

impl TopProcesses {
    pub fn new(system: SharedSystem) -> Self {
        Self { system }
    }
}

impl Source for TopProcesses {
    fn id(&self) -> &str {
        "proc.top"
    }

    fn sample(&mut self, _: &mut Probe<'_>) -> Result<Reading, SourceError> {
        let mut system = self.system.borrow_mut();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let rows = system
            .processes()
            .values()
            .map(|process| ProcessRow {
                pid: process.pid().as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                cpu: process.cpu_usage(),
                memory: process.memory(),
            })
            .collect();

        Ok(Reading::Single(Metric::Processes(rank_processes(rows))))
    }
}
