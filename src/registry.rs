//! the fixed set of sources sampled every tick.

use {
    crate::{
        config::Config,
        metric::Reading,
        sentinel::Sentinel,
        source::{
            Cached, Probe, ProcStatFile, Source, SourceError, SystemClock,
            board::{GpuLoad, NpuDriver, NpuLoad, SocModel, Thermal, Zram},
            cpu::CpuLoad,
            host::{self, DiskIo, NetworkIo, Ram, Swap, TopProcesses},
            runtime::RuntimeVersion,
        },
        topology::ClusterTopology,
    },
    std::time::Duration,
    tracing::{debug, warn},
};

/// an ordered, fixed list of sources.
///
/// sources are registered at construction; iteration always visits them in that order.
#[derive(Default)]
pub struct Registry {
    sources: Vec<Box<dyn Source>>,
}

/// static facts about the board, detected once at startup.
#[derive(Clone, Debug, Default)]
pub struct Board {
    pub topology: ClusterTopology,
}

// === impl Registry ===

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// registers a source, returning the registry.
    pub fn with(mut self, source: impl Source + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// the full set of sources for a rockchip board, laid out per `config`.
    pub fn board(config: &Config) -> (Self, Board) {
        let paths = &config.paths;
        let timeout = Duration::from_millis(config.command_timeout_ms);
        let system = host::shared_system();

        let topology = ClusterTopology::detect(&paths.cpuinfo).unwrap_or_else(|error| {
            warn!(%error, "could not detect cpu clusters");
            ClusterTopology::default()
        });
        debug!(clusters = ?topology.clusters(), "detected cpu topology");

        let zones = Thermal::discover(&paths.thermal);
        debug!(zones = zones.len(), "discovered thermal zones");

        let registry = Self::new()
            .with(Cached::new(SocModel::new(&paths.model)))
            .with(Cached::new(NpuDriver::new(&paths.npu_version)))
            .with(Cached::new(RuntimeVersion::new(
                config.strings_program.clone(),
                &paths.npu_runtime,
                timeout,
            )))
            .with(CpuLoad::new(Sentinel::new(
                SystemClock,
                ProcStatFile::new(&paths.stat),
            )))
            .with(NpuLoad::new(&paths.npu_load))
            .with(GpuLoad::new(&paths.gpu_load))
            .with(Ram::new(system.clone()))
            .with(Swap::new(system.clone()))
            .with(Zram::new(&paths.zram))
            .with(Thermal::new(zones))
            .with(DiskIo::new())
            .with(NetworkIo::new())
            .with(TopProcesses::new(system));

        (registry, Board { topology })
    }

    /// samples the source registered as `id`, or returns `None` if there is no such source.
    pub fn sample(
        &mut self,
        id: &str,
        probe: &mut Probe<'_>,
    ) -> Option<Result<Reading, SourceError>> {
        self.iter_mut()
            .find(|source| source.id() == id)
            .map(|source| source.sample(probe))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn Source + 'static)> {
        self.sources.iter_mut().map(|source| source.as_mut())
    }

    /// the ids of every registered source, in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|source| source.id())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
