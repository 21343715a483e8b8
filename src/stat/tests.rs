use super::*;

mod entry_parse_tests {
    use super::*;

    fn ticks(values: [u64; 10]) -> CpuTime {
        CpuTime::from_fields(&values.map(UserHz::from)).unwrap()
    }

    #[test]
    fn aggregate_line() {
        let entry = "cpu 10132153 290696 3084719 46828483 16683 0 25195 0 175628 0"
            .parse::<Entry>()
            .unwrap();
        assert_eq!(
            entry,
            Entry::AllCpu(ticks([
                10132153, 290696, 3084719, 46828483, 16683, 0, 25195, 0, 175628, 0
            ]))
        );
    }

    #[test]
    fn core_line() {
        let entry = "cpu0 1393280 32966 572056 13343292 6130 0 17875 0 23933 0"
            .parse::<Entry>()
            .unwrap();
        assert!(matches!(entry, Entry::Cpu(id, _) if id == CpuId::new(0)));
    }

    /// the kernel pads the aggregate line with an extra space.
    #[test]
    fn double_space() {
        let entry = "cpu  1 2 3 4 5 6 7 8 9 10".parse::<Entry>().unwrap();
        assert_eq!(entry, Entry::AllCpu(ticks([1, 2, 3, 4, 5, 6, 7, 8, 9, 10])));
    }

    #[test]
    fn old_kernels_report_fewer_columns() {
        let entry = "cpu3 1 2 3 4 5 6 7".parse::<Entry>().unwrap();
        assert_eq!(
            entry,
            Entry::Cpu(CpuId::new(3), ticks([1, 2, 3, 4, 5, 6, 7, 0, 0, 0]))
        );
    }

    #[test]
    fn too_few_columns() {
        let err = "cpu 1 2 3".parse::<Entry>().unwrap_err();
        assert_eq!(err, EntryParseError::CpuTime(3));
    }

    #[test]
    fn too_many_columns() {
        let err = "cpu 0 0 0 0 0 0 0 0 0 0 0".parse::<Entry>().unwrap_err();
        assert_eq!(err, EntryParseError::CpuTime(11));
    }

    #[test]
    fn bad_cpu_id() {
        let err = "cpuA 0 0 0 0 0 0 0 0 0 0".parse::<Entry>().unwrap_err();
        assert_eq!(
            err,
            EntryParseError::CpuIdParse {
                kind: "cpuA".to_owned()
            }
        );
    }

    #[test]
    fn bad_time_value() {
        let err = "cpu0 1 2 x 4".parse::<Entry>().unwrap_err();
        assert!(matches!(err, EntryParseError::UserHzParse(_)));
    }

    #[test]
    fn empty() {
        assert_eq!("   ".parse::<Entry>().unwrap_err(), EntryParseError::Empty);
    }

    /// counters that overflow 32 bits on long-running boards.
    #[test]
    fn big() {
        let entry = "cpu  5000000000 5000000000 5000000000 5000000000 0 0 0 0 0 0"
            .parse::<Entry>()
            .unwrap();
        assert!(matches!(entry, Entry::AllCpu(_)));
    }

    #[test]
    fn other_lines() {
        for line in [
            "page 5741 1808",
            "intr 1462898 0 0 12",
            "ctxt 115315",
            "btime 769041601",
            "processes 86031",
            "procs_running 6",
            "softirq 229245889 94 60001584 13619 5175704 2471304 28 51212741 59130143 0 51240672",
        ] {
            assert_eq!(line.parse::<Entry>(), Ok(Entry::Other), "{line}");
        }
    }
}

mod cpu_time_tests {
    use super::*;

    #[test]
    fn busy_excludes_idle_and_guest() {
        let values = [1, 2, 3, 100, 4, 5, 6, 7, 50, 50].map(UserHz::from);
        let time = CpuTime::from_fields(&values).unwrap();
        assert_eq!(time.busy(), UserHz::from(28));
    }

    #[test]
    fn measurement_of_an_idle_interval() {
        let time = CpuTime::default();
        assert_eq!(Measurement::new(&time, &time).percentage(), 0.0);
    }

    #[test]
    fn counters_stepping_backwards_do_not_go_negative() {
        let a = CpuTime::from_fields(&[10, 0, 0, 10].map(UserHz::from)).unwrap();
        let b = CpuTime::from_fields(&[5, 0, 0, 20].map(UserHz::from)).unwrap();
        assert_eq!(Measurement::new(&a, &b).percentage(), 0.0);
    }
}

mod snapshot_read_tests {
    use {
        super::*,
        crate::source::{MockClock, MockStatFile},
    };

    const STAT: &str = "\
cpu  10 0 10 80 0 0 0 0 0 0
cpu0 5 0 5 40 0 0 0 0 0 0
cpu1 5 0 5 40 0 0 0 0 0 0
intr 1462898
ctxt 2345
btime 769041601

processes 86031
";

    #[test]
    fn reads_every_cpu() {
        let clock = MockClock::new([Instant::now()]);
        let snapshot = Snapshot::read(&MockStatFile::new([STAT]), &clock).unwrap();
        assert_eq!(snapshot.cpus.len(), 2);
        assert!(snapshot.cpus.contains_key(&CpuId::new(1)));
        assert_eq!(snapshot.system.idle, UserHz::from(80));
    }

    #[test]
    fn missing_aggregate() {
        let clock = MockClock::new([Instant::now()]);
        let stats = MockStatFile::new(["cpu0 5 0 5 40 0 0 0 0 0 0\n"]);
        let err = Snapshot::read(&stats, &clock).unwrap_err();
        assert!(matches!(err, StatReadError::MissingAggregate));
    }

    #[test]
    fn malformed_lines_fail_the_read() {
        let clock = MockClock::new([Instant::now()]);
        let stats = MockStatFile::new(["cpu 1 2 3 4\ncpu0 oops\n"]);
        let err = Snapshot::read(&stats, &clock).unwrap_err();
        assert!(matches!(err, StatReadError::Entry(EntryParseError::UserHzParse(_))));
    }
}
