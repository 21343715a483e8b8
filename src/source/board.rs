//! sources backed by rockchip sysfs and debugfs files.
//!
//! each source pairs a file with a parser for its contents. the parsers are plain functions so
//! that the file formats can be tested without a board at hand.

use {
    super::{Probe, Source, SourceError, read_bytes, read_text},
    crate::metric::{Metric, Reading},
    regex::Regex,
    std::{
        path::{Path, PathBuf},
        sync::LazyLock,
    },
    tracing::debug,
};

/// the soc model, e.g. `RK3588`.
pub struct SocModel {
    path: PathBuf,
}

/// the npu kernel driver's version.
///
/// the npu counters are meaningless without the driver, so this source is required.
pub struct NpuDriver {
    path: PathBuf,
}

/// per-core npu utilization.
pub struct NpuLoad {
    path: PathBuf,
}

/// mali gpu utilization.
pub struct GpuLoad {
    path: PathBuf,
}

/// compressed ram usage.
pub struct Zram {
    path: PathBuf,
}

/// every thermal zone's temperature, keyed by zone type.
pub struct Thermal {
    zones: Vec<ThermalZone>,
}

/// one thermal zone, discovered at startup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ThermalZone {
    /// the zone's type, e.g. `soc-thermal` or `gpu-thermal`.
    pub name: String,
    /// the file reporting the zone's temperature, in millidegrees.
    pub temp: PathBuf,
}

/// the contents of zram's `mm_stat`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ZramStats {
    /// uncompressed size of the data stored.
    pub orig: u64,
    /// compressed size of the data stored.
    pub compr: u64,
    /// memory consumed, including allocator overhead.
    pub used: u64,
    /// the most memory zram may consume. zero means unlimited.
    pub limit: u64,
}

/// the model string reported when the device tree cannot be read.
pub const UNKNOWN_MODEL: &str = "Unknown RK";

static MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)rk\d+").expect("model pattern is valid"));

static NPU_CORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Core(\d+):\s*(\d+)%").expect("npu pattern is valid"));

/// extracts the soc model from a device tree `model` or `compatible` blob.
///
/// the first `rk<digits>` token wins, uppercased. otherwise, the text itself is returned.
pub fn parse_soc_model(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_matches(char::from(0)).trim();

    match MODEL.find(text) {
        Some(model) => model.as_str().to_uppercase(),
        None => text.replace(char::from(0), " "),
    }
}

/// reads the soc model from `path`, falling back to [`UNKNOWN_MODEL`].
pub fn read_soc_model(path: &Path) -> String {
    match read_bytes(path) {
        Ok(raw) => parse_soc_model(&raw),
        Err(error) => {
            debug!(%error, "soc model is unreadable");
            UNKNOWN_MODEL.to_owned()
        }
    }
}

/// parses `CoreN: NN%` occurrences into `(core, percent)` pairs.
pub fn parse_npu_load(text: &str) -> Vec<(usize, f64)> {
    NPU_CORE
        .captures_iter(text)
        .filter_map(|caps| {
            let core = caps[1].parse().ok()?;
            let load = caps[2].parse().ok()?;
            Some((core, load))
        })
        .collect()
}

/// parses a `label: version` line, returning the trimmed text after the first colon.
pub fn parse_driver_version(text: &str) -> Option<String> {
    let (_, version) = text.lines().next()?.split_once(':')?;
    let version = version.trim();
    (!version.is_empty()).then(|| version.to_owned())
}

/// parses whitespace-separated `key: value` pairs, returning `busy / (busy + idle)` as a
/// percentage. missing values count as zero.
pub fn parse_gpu_utilization(text: &str) -> f64 {
    let (mut busy, mut idle) = (0u64, 0u64);

    let mut tokens = text.split_whitespace();
    while let Some(token) = tokens.next() {
        let Some((key, value)) = token.split_once(':') else {
            continue;
        };
        let value = match value {
            "" => tokens.next().unwrap_or_default(),
            value => value,
        };
        match key {
            "busy_time" => busy = value.parse().unwrap_or_default(),
            "idle_time" => idle = value.parse().unwrap_or_default(),
            _ => {}
        }
    }

    let total = busy.saturating_add(idle);
    if total == 0 {
        return 0.0;
    }

    busy as f64 / total as f64 * 100.0
}

// === impl SocModel ===

impl SocModel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Source for SocModel {
    fn id(&self) -> &str {
        "soc.model"
    }

    fn sample(&mut self, _: &mut Probe<'_>) -> Result<Reading, SourceError> {
        Ok(Reading::text(read_soc_model(&self.path)))
    }
}

// === impl NpuDriver ===

impl NpuDriver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Source for NpuDriver {
    fn id(&self) -> &str {
        "npu.driver"
    }

    fn required(&self) -> bool {
        true
    }

    fn sample(&mut self, _: &mut Probe<'_>) -> Result<Reading, SourceError> {
        let text = read_text(&self.path)?;
        parse_driver_version(&text)
            .map(Reading::text)
            .ok_or_else(|| SourceError::read(self.path.display().to_string(), "no version"))
    }
}

// === impl NpuLoad ===

impl NpuLoad {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Source for NpuLoad {
    fn id(&self) -> &str {
        "npu.load"
    }

    fn sample(&mut self, _: &mut Probe<'_>) -> Result<Reading, SourceError> {
        let text = read_text(&self.path)?;
        let cores = parse_npu_load(&text);
        if cores.is_empty() {
            return Err(SourceError::read(
                self.path.display().to_string(),
                "no core loads",
            ));
        }

        Ok(Reading::Keyed(
            cores
                .into_iter()
                .map(|(core, load)| (core.to_string(), Metric::percentage(load)))
                .collect(),
        ))
    }
}

// === impl GpuLoad ===

impl GpuLoad {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Source for GpuLoad {
    fn id(&self) -> &str {
        "gpu.load"
    }

    /// NB: an unreadable utilization file reports an idle gpu, rather than an unavailable one.
    fn sample(&mut self, _: &mut Probe<'_>) -> Result<Reading, SourceError> {
        let load = match read_text(&self.path) {
            Ok(text) => parse_gpu_utilization(&text),
            Err(error) => {
                debug!(%error, "gpu utilization is unreadable");
                0.0
            }
        };

        Ok(Reading::Single(Metric::percentage(load)))
    }
}

// === impl ZramStats ===

impl ZramStats {
    /// parses the first four integers of `mm_stat`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut fields = text.split_whitespace().map(str::parse::<u64>);
        let mut next = || fields.next()?.ok();

        Some(Self {
            orig: next()?,
            compr: next()?,
            used: next()?,
            limit: next()?,
        })
    }

    /// used memory as a share of the limit, or zero when there is no limit.
    pub fn percentage(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }

        self.used as f64 / self.limit as f64 * 100.0
    }
}

// === impl Zram ===

impl Zram {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Source for Zram {
    fn id(&self) -> &str {
        "mem.zram"
    }

    fn sample(&mut self, _: &mut Probe<'_>) -> Result<Reading, SourceError> {
        let text = read_text(&self.path)?;
        let stats @ ZramStats {
            orig,
            compr,
            used,
            limit,
        } = ZramStats::parse(&text).ok_or_else(|| {
            SourceError::read(self.path.display().to_string(), "malformed mm_stat")
        })?;

        Ok(Reading::Keyed(vec![
            ("orig".to_owned(), Metric::Bytes(orig)),
            ("compr".to_owned(), Metric::Bytes(compr)),
            ("used".to_owned(), Metric::Bytes(used)),
            ("limit".to_owned(), Metric::Bytes(limit)),
            ("percent".to_owned(), Metric::percentage(stats.percentage())),
        ]))
    }
}

// === impl Thermal ===

impl Thermal {
    pub const THERMAL: &str = "/sys/class/thermal";

    pub fn new(zones: Vec<ThermalZone>) -> Self {
        Self { zones }
    }

    /// finds every `thermal_zone*` directory beneath `dir`, ordered by zone number.
    pub fn discover(dir: &Path) -> Vec<ThermalZone> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            debug!(dir = %dir.display(), "no thermal zones");
            return Vec::new();
        };

        let mut zones = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let file_name = entry.file_name();
                let number = file_name
                    .to_str()?
                    .strip_prefix("thermal_zone")?
                    .parse::<u32>()
                    .ok()?;
                let path = entry.path();
                let name = std::fs::read_to_string(path.join("type"))
                    .map(|name| name.trim().to_owned())
                    .unwrap_or_else(|_| format!("zone{number}"));
                Some((
                    number,
                    ThermalZone {
                        name,
                        temp: path.join("temp"),
                    },
                ))
            })
            .collect::<Vec<_>>();
        zones.sort_by_key(|(number, _)| *number);

        zones.into_iter().map(|(_, zone)| zone).collect()
    }

    fn read_zone(zone: &ThermalZone) -> Metric {
        let millidegrees = read_text(&zone.temp).and_then(|text| {
            text.trim()
                .parse::<i64>()
                .map_err(|error| SourceError::read(zone.temp.display().to_string(), error))
        });

        match millidegrees {
            Ok(m) => Metric::Temperature((m / 1000).clamp(i32::MIN.into(), i32::MAX.into()) as i32),
            Err(error) => {
                debug!(zone = %zone.name, %error, "thermal zone is unreadable");
                Metric::Unavailable
            }
        }
    }
}

impl Source for Thermal {
    fn id(&self) -> &str {
        "temp"
    }

    fn sample(&mut self, _: &mut Probe<'_>) -> Result<Reading, SourceError> {
        if self.zones.is_empty() {
            return Err(SourceError::not_available("thermal zones"));
        }

        Ok(Reading::Keyed(
            self.zones
                .iter()
                .map(|zone| (zone.name.clone(), Self::read_zone(zone)))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::rate::RateTracker,
        std::{fs, time::Instant},
    };

    fn sample(source: &mut impl Source) -> Result<Reading, SourceError> {
        let mut rates = RateTracker::new();
        source.sample(&mut Probe {
            now: Instant::now(),
            rates: &mut rates,
        })
    }

    mod model {
        use super::*;

        #[test]
        fn compatible_string() {
            assert_eq!(parse_soc_model(b"rockchip,rk3588\x00\x00"), "RK3588");
        }

        #[test]
        fn first_match_wins() {
            assert_eq!(
                parse_soc_model(b"radxa,rock-5b\x00rockchip,rk3588s\x00rockchip,rk3588\x00"),
                "RK3588"
            );
        }

        #[test]
        fn no_match_falls_back_to_text() {
            assert_eq!(parse_soc_model(b"Radxa ROCK 5B\x00"), "Radxa ROCK 5B");
        }

        #[test]
        fn unreadable() {
            assert_eq!(read_soc_model(Path::new("/no/such/model")), UNKNOWN_MODEL);
        }

        #[test]
        fn source_never_fails() {
            let mut source = SocModel::new("/no/such/model");
            assert_eq!(sample(&mut source), Ok(Reading::text(UNKNOWN_MODEL)));
        }
    }

    mod npu {
        use super::*;

        #[test]
        fn three_cores() {
            let text = "NPU load:  Core0: 12%, Core1:  0%, Core2: 100%,\n";
            assert_eq!(parse_npu_load(text), [(0_usize, 12.0), (1, 0.0), (2, 100.0)]);
        }

        #[test]
        fn single_core() {
            assert_eq!(parse_npu_load("NPU load: Core0:  7%,"), [(0_usize, 7.0)]);
        }

        #[test]
        fn driver_version() {
            assert_eq!(
                parse_driver_version("RKNPU driver: v0.9.6\n").as_deref(),
                Some("v0.9.6")
            );
            assert_eq!(
                parse_driver_version("version: 1.2: extra").as_deref(),
                Some("1.2: extra")
            );
            assert_eq!(parse_driver_version("garbage"), None);
            assert_eq!(parse_driver_version("label:   "), None);
        }

        #[test]
        fn load_source() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("load");
            fs::write(&path, "NPU load:  Core0: 30%, Core1: 10%,\n").unwrap();

            let reading = sample(&mut NpuLoad::new(&path)).unwrap();
            assert_eq!(
                reading,
                Reading::Keyed(vec![
                    ("0".to_owned(), Metric::Percentage(30.0)),
                    ("1".to_owned(), Metric::Percentage(10.0)),
                ])
            );
        }

        #[test]
        fn missing_driver_is_not_available() {
            let mut source = NpuDriver::new("/no/such/version");
            assert!(source.required());
            assert!(matches!(
                sample(&mut source),
                Err(SourceError::NotAvailable { .. })
            ));
        }
    }

    mod gpu {
        use super::*;

        #[test]
        fn utilization() {
            let text = "busy_time: 250 idle_time: 750";
            assert_eq!(parse_gpu_utilization(text), 25.0);
        }

        #[test]
        fn both_zero() {
            assert_eq!(parse_gpu_utilization("busy_time: 0 idle_time: 0"), 0.0);
        }

        #[test]
        fn compact_pairs() {
            assert_eq!(parse_gpu_utilization("busy_time:3 idle_time:1"), 75.0);
        }

        #[test]
        fn garbage() {
            assert_eq!(parse_gpu_utilization("who knows"), 0.0);
        }

        #[test]
        fn unreadable_is_idle() {
            let mut source = GpuLoad::new("/no/such/dvfs_utilization");
            assert_eq!(
                sample(&mut source),
                Ok(Reading::Single(Metric::Percentage(0.0)))
            );
        }
    }

    mod zram {
        use super::*;

        #[test]
        fn parse() {
            let stats = ZramStats::parse("4096 1024 2048 8192 0 0 0 0").unwrap();
            assert_eq!(stats.used, 2048);
            assert_eq!(stats.percentage(), 25.0);
        }

        #[test]
        fn unlimited() {
            let stats = ZramStats::parse("4096 1024 2048 0").unwrap();
            assert_eq!(stats.percentage(), 0.0);
        }

        #[test]
        fn too_short() {
            assert_eq!(ZramStats::parse("4096 1024 2048"), None);
            assert_eq!(ZramStats::parse("a b c d"), None);
        }

        #[test]
        fn missing_is_not_available() {
            let mut source = Zram::new("/no/such/mm_stat");
            assert!(matches!(
                sample(&mut source),
                Err(SourceError::NotAvailable { .. })
            ));
        }
    }

    mod thermal {
        use super::*;

        fn zone(root: &Path, n: u32, name: &str, temp: &str) {
            let dir = root.join(format!("thermal_zone{n}"));
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("type"), format!("{name}\n")).unwrap();
            fs::write(dir.join("temp"), temp).unwrap();
        }

        #[test]
        fn discovers_and_reads_zones() {
            let root = tempfile::tempdir().unwrap();
            zone(root.path(), 10, "npu-thermal", "41000\n");
            zone(root.path(), 0, "soc-thermal", "45384\n");
            zone(root.path(), 1, "gpu-thermal", "garbage\n");
            fs::create_dir(root.path().join("cooling_device0")).unwrap();

            let zones = Thermal::discover(root.path());
            let names = zones.iter().map(|z| z.name.as_str()).collect::<Vec<_>>();
            assert_eq!(names, ["soc-thermal", "gpu-thermal", "npu-thermal"]);

            let reading = sample(&mut Thermal::new(zones)).unwrap();
            assert_eq!(
                reading,
                Reading::Keyed(vec![
                    ("soc-thermal".to_owned(), Metric::Temperature(45)),
                    ("gpu-thermal".to_owned(), Metric::Unavailable),
                    ("npu-thermal".to_owned(), Metric::Temperature(41)),
                ])
            );
        }

        #[test]
        fn no_zones() {
            assert!(Thermal::discover(Path::new("/no/such/thermal")).is_empty());
            assert!(sample(&mut Thermal::new(Vec::new())).is_err());
        }
    }
}
