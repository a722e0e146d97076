//! Integration tests for the async-locator CLI

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// Command pointed at a config file that does not exist yet
    fn locator(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("async-locator");
        cmd.arg("--config").arg(temp.path().join("config.toml"));
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        locator(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("off-thread structure search"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        locator(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("async-locator"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        locator(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        locator(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[locate]"))
            .stdout(predicate::str::contains("overlap_policy = \"reject\""));
    }

    #[test]
    fn config_init_then_set() {
        let temp = TempDir::new().unwrap();
        locator(&temp).args(["config", "init"]).assert().success();
        locator(&temp)
            .args(["config", "set", "locate.search_radius", "12"])
            .assert()
            .success();

        locator(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("search_radius = 12"));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[locate]\ntimeout_secs = \"soon\"\n").unwrap();

        locator(&temp)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("config init --force"));
    }

    #[test]
    fn locate_finds_stronghold() {
        let temp = TempDir::new().unwrap();
        locator(&temp)
            .args(["locate", "--x", "0", "--z", "0", "--delay-ms", "0", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"outcome\": \"succeeded\""))
            .stdout(predicate::str::contains("\"target\": \"stronghold\""));
    }

    #[test]
    fn locate_with_short_timeout_drops_eye() {
        let temp = TempDir::new().unwrap();
        locator(&temp)
            .args([
                "locate",
                "--x",
                "0",
                "--z",
                "0",
                "--structure",
                "ancient_city",
                "--delay-ms",
                "50",
                "--timeout",
                "1",
                "--json",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"outcome\": \"timed_out\""))
            .stdout(predicate::str::contains("\"dropped_item\": true"));
    }

    #[test]
    fn locate_nothing_in_range() {
        let temp = TempDir::new().unwrap();
        locator(&temp)
            .args(["locate", "--x", "0", "--z", "0", "--radius", "3", "--delay-ms", "0"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing found"));
    }
}
