//! Size and date rotation through the writer

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use chrono::{Duration, Local, TimeZone};
    use proven_filelog::{LogWriter, LogWriterConfig, ManualClock, NamingMode};
    use tempfile::TempDir;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2024, 2, 28, 8, 30, 0).unwrap(),
        ))
    }

    fn sorted_names(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .expect("Failed to read dir")
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_oversized_write_moves_to_new_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = LogWriterConfig::new(dir.path())
            .with_async_mode(false)
            .with_sweep_on_start(false)
            .with_max_file_size(100);
        let writer = LogWriter::builder(config)
            .clock(clock())
            .build()
            .expect("Failed to create writer");

        let first = dir.path().join("20240228.txt");
        writer.append(&"x".repeat(150)).unwrap();

        let second = writer.current_path().expect("no active file");
        assert_ne!(second, first);
        assert!(second.is_file());
        assert_eq!(fs::metadata(&first).unwrap().len(), 150);
        assert_eq!(sorted_names(&dir), vec!["20240228.txt", "20240228_083000.txt"]);

        writer.append_line("next").unwrap();
        assert_eq!(fs::read_to_string(&second).unwrap(), "next\n");
        assert_eq!(sorted_names(&dir), vec!["20240228.txt", "20240228_083000.txt"]);
    }

    #[test]
    fn test_oversized_write_in_async_mode() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = LogWriterConfig::new(dir.path())
            .with_sweep_on_start(false)
            .with_naming(NamingMode::Timestamp)
            .with_prefix("svc")
            .with_max_file_size(100);
        let writer = LogWriter::builder(config)
            .clock(clock())
            .build()
            .expect("Failed to create writer");

        writer.append(&"y".repeat(150)).unwrap();
        writer.append_line("after").unwrap();
        writer.shutdown().unwrap();

        assert_eq!(
            sorted_names(&dir),
            vec!["svc-20240228_083000.txt", "svc-20240228_083000_1.txt"]
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("svc-20240228_083000_1.txt")).unwrap(),
            "after\n"
        );
    }

    #[test]
    fn test_new_day_opens_new_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let clock = clock();
        let config = LogWriterConfig::new(dir.path())
            .with_async_mode(false)
            .with_sweep_on_start(false);
        let writer = LogWriter::builder(config)
            .clock(clock.clone())
            .build()
            .expect("Failed to create writer");

        writer.append_line("day one").unwrap();
        clock.advance(Duration::days(1));
        assert!(writer.rotate_if_needed().unwrap());
        writer.append_line("day two").unwrap();

        assert_eq!(sorted_names(&dir), vec!["20240228.txt", "20240229.txt"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("20240229.txt")).unwrap(),
            "day two\n"
        );
    }

    #[test]
    fn test_size_limit_zero_never_rotates() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = LogWriterConfig::new(dir.path())
            .with_async_mode(false)
            .with_sweep_on_start(false)
            .with_max_file_size(0);
        let writer = LogWriter::builder(config)
            .clock(clock())
            .build()
            .expect("Failed to create writer");

        for _ in 0..10 {
            writer.append(&"z".repeat(1000)).unwrap();
        }

        assert_eq!(sorted_names(&dir), vec!["20240228.txt"]);
    }
}
