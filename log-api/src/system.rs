use serde::{Deserialize, Serialize};

/// Best-effort memory footprint of the current process, in bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub rss: u64,
    #[serde(rename = "virtual")]
    pub virtual_size: u64,
}

/// Reads the footprint from procfs. Reports zeroes where procfs is unavailable,
/// the figure is informational only.
pub fn memory_usage() -> MemoryUsage {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| parse_status(&status))
        .unwrap_or_default()
}

// `VmRSS` and `VmSize` are reported in kB whatever the kernel page size.
fn parse_status(status: &str) -> Option<MemoryUsage> {
    let mut rss = None;
    let mut virtual_size = None;

    for line in status.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let slot = match key {
            "VmRSS" => &mut rss,
            "VmSize" => &mut virtual_size,
            _ => continue,
        };
        *slot = parse_kb(value);
    }

    Some(MemoryUsage {
        rss: rss?,
        virtual_size: virtual_size?,
    })
}

fn parse_kb(value: &str) -> Option<u64> {
    let mut parts = value.split_whitespace();
    let amount: u64 = parts.next()?.parse().ok()?;
    match parts.next() {
        Some("kB") | None => Some(amount * 1024),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "Name:\tlog-api\n\
        Umask:\t0022\n\
        State:\tS (sleeping)\n\
        VmPeak:\t  20480 kB\n\
        VmSize:\t  10240 kB\n\
        VmHWM:\t   4096 kB\n\
        VmRSS:\t   2048 kB\n\
        Threads:\t4\n";

    #[test]
    fn parses_status_in_kilobytes() {
        let usage = parse_status(STATUS).unwrap();
        assert_eq!(usage.virtual_size, 10240 * 1024);
        assert_eq!(usage.rss, 2048 * 1024);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_status(""), None);
        assert_eq!(parse_status("VmRSS:\t12 kB\n"), None);
        assert_eq!(parse_status("VmRSS:\tlots kB\nVmSize:\t1 kB\n"), None);
        assert_eq!(parse_status("VmRSS:\t1 MB\nVmSize:\t1 kB\n"), None);
    }

    #[test]
    fn reads_own_process() {
        if std::path::Path::new("/proc/self/status").exists() {
            let usage = memory_usage();
            assert!(usage.rss > 0);
            assert!(usage.virtual_size >= usage.rss);
        }
    }

    #[test]
    fn serializes_virtual_key() {
        let doc = serde_json::to_value(MemoryUsage {
            rss: 1,
            virtual_size: 2,
        })
        .unwrap();
        assert_eq!(doc, serde_json::json!({"rss": 1, "virtual": 2}));
    }
}
