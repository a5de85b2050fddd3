//! Raw OS counter snapshots.
//!
//! CPU and memory come from `sysinfo`. Disk and network cumulative
//! counters are read straight from procfs; a missing or unreadable file
//! degrades to zeroed counters rather than failing the sampling tick.

use std::fs;
use sysinfo::System;
use tracing::debug;

const PROC_DISKSTATS_PATH: &str = "/proc/diskstats"; // Per-device I/O counters since boot
const PROC_NET_DEV_PATH: &str = "/proc/net/dev"; // Per-interface traffic counters since boot

const SECTOR_SIZE_BYTES: u64 = 512; // /proc/diskstats sector counts are always 512-byte units

/// One reading of every raw value the metric table consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CounterSnapshot {
    pub cpu_usage: f64,
    pub cpu_count: f64,
    pub mem_used: f64,
    pub mem_available: f64,
    pub mem_used_percent: f64,
    pub disk_read_bytes: f64,
    pub disk_write_bytes: f64,
    pub disk_read_ops: f64,
    pub disk_write_ops: f64,
    pub net_bytes_in: f64,
    pub net_bytes_out: f64,
    pub net_packets_in: f64,
    pub net_packets_out: f64,
}

impl CounterSnapshot {
    /// The snapshot as (metric name, raw value) pairs, in catalog order.
    #[must_use]
    pub fn pairs(&self) -> [(&'static str, f64); 13] {
        [
            ("cpu_usage", self.cpu_usage),
            ("cpu_count", self.cpu_count),
            ("mem_used", self.mem_used),
            ("mem_available", self.mem_available),
            ("mem_used_percent", self.mem_used_percent),
            ("disk_read_bytes", self.disk_read_bytes),
            ("disk_write_bytes", self.disk_write_bytes),
            ("disk_read_ops", self.disk_read_ops),
            ("disk_write_ops", self.disk_write_ops),
            ("net_bytes_in", self.net_bytes_in),
            ("net_bytes_out", self.net_bytes_out),
            ("net_packets_in", self.net_packets_in),
            ("net_packets_out", self.net_packets_out),
        ]
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct DiskCounters {
    read_bytes: u64,
    write_bytes: u64,
    read_ops: u64,
    write_ops: u64,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct NetCounters {
    bytes_in: u64,
    bytes_out: u64,
    packets_in: u64,
    packets_out: u64,
}

/// Reads OS counters. Holds a persistent [`System`] so successive CPU
/// refreshes measure usage since the previous snapshot.
pub struct HostCounters {
    sys: System,
}

impl Default for HostCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl HostCounters {
    #[must_use]
    pub fn new() -> Self {
        HostCounters { sys: System::new() }
    }

    pub fn snapshot(&mut self) -> CounterSnapshot {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();

        let total_memory = self.sys.total_memory();
        let used_memory = self.sys.used_memory();
        let mem_used_percent = if total_memory > 0 {
            used_memory as f64 / total_memory as f64 * 100.0
        } else {
            0.0
        };

        let disk = read_disk_counters();
        let net = read_net_counters();

        CounterSnapshot {
            cpu_usage: f64::from(self.sys.global_cpu_info().cpu_usage()),
            cpu_count: self.sys.cpus().len() as f64,
            mem_used: used_memory as f64,
            mem_available: self.sys.available_memory() as f64,
            mem_used_percent,
            disk_read_bytes: disk.read_bytes as f64,
            disk_write_bytes: disk.write_bytes as f64,
            disk_read_ops: disk.read_ops as f64,
            disk_write_ops: disk.write_ops as f64,
            net_bytes_in: net.bytes_in as f64,
            net_bytes_out: net.bytes_out as f64,
            net_packets_in: net.packets_in as f64,
            net_packets_out: net.packets_out as f64,
        }
    }
}

fn read_disk_counters() -> DiskCounters {
    match fs::read_to_string(PROC_DISKSTATS_PATH) {
        Ok(contents) => parse_diskstats(&contents),
        Err(e) => {
            debug!("Could not read disk counters from {PROC_DISKSTATS_PATH}: {e}");
            DiskCounters::default()
        }
    }
}

fn read_net_counters() -> NetCounters {
    match fs::read_to_string(PROC_NET_DEV_PATH) {
        Ok(contents) => parse_net_dev(&contents),
        Err(e) => {
            debug!("Could not read network counters from {PROC_NET_DEV_PATH}: {e}");
            NetCounters::default()
        }
    }
}

/// Whether a diskstats row names a whole physical device.
///
/// Partitions are skipped so a device and its partitions are not counted
/// twice, as are virtual devices (loop, ram, dm-, zram) and optical drives.
fn is_physical_device(name: &str) -> bool {
    if name.starts_with("loop")
        || name.starts_with("ram")
        || name.starts_with("dm-")
        || name.starts_with("zram")
        || name.starts_with("sr")
    {
        return false;
    }
    // nvme0n1p1 / mmcblk0p1 are partitions; nvme0n1 / mmcblk0 are devices
    if let Some(rest) = name
        .strip_prefix("nvme")
        .or_else(|| name.strip_prefix("mmcblk"))
    {
        return !rest.contains('p');
    }
    // sda1 / vda1 / xvda1 partitions end in a digit
    !name.ends_with(|c: char| c.is_ascii_digit())
}

/// Sums I/O counters across physical devices.
///
/// Row layout per diskstats(5): `major minor name reads-completed
/// reads-merged sectors-read ms-reading writes-completed writes-merged
/// sectors-written ...`; sector counts are 512-byte units regardless of the
/// device's native sector size.
fn parse_diskstats(contents: &str) -> DiskCounters {
    let mut counters = DiskCounters::default();

    for line in contents.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }
        let name = fields[2];
        if !is_physical_device(name) {
            continue;
        }

        let read_ops = fields[3].parse::<u64>().unwrap_or(0);
        let sectors_read = fields[5].parse::<u64>().unwrap_or(0);
        let write_ops = fields[7].parse::<u64>().unwrap_or(0);
        let sectors_written = fields[9].parse::<u64>().unwrap_or(0);

        counters.read_ops += read_ops;
        counters.write_ops += write_ops;
        counters.read_bytes += sectors_read * SECTOR_SIZE_BYTES;
        counters.write_bytes += sectors_written * SECTOR_SIZE_BYTES;
    }

    counters
}

/// Sums traffic counters across interfaces, excluding loopback.
///
/// `/proc/net/dev` carries two header lines, then per-interface rows of
/// `iface: rx-bytes rx-packets ... tx-bytes tx-packets ...`.
fn parse_net_dev(contents: &str) -> NetCounters {
    let mut counters = NetCounters::default();

    for line in contents.lines().skip(2) {
        let Some((iface, rest)) = line.split_once(':') else {
            continue;
        };
        if iface.trim() == "lo" {
            continue;
        }
        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }

        counters.bytes_in += fields[0].parse::<u64>().unwrap_or(0);
        counters.packets_in += fields[1].parse::<u64>().unwrap_or(0);
        counters.bytes_out += fields[8].parse::<u64>().unwrap_or(0);
        counters.packets_out += fields[9].parse::<u64>().unwrap_or(0);
    }

    counters
}
