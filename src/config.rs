//! Run configuration and seed loading.

use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

use rand::Rng;

use crate::error::ConfigError;
use crate::types::MAX_TEAMS;

pub const DEFAULT_SEED_FILE: &str = "seed.txt";
pub const DEFAULT_TEAMS: usize = 4;
pub const DEFAULT_ROBOTS_PER_TEAM: usize = 10;
// Reference bounds on the package count; equal bounds pin it at 80.
pub const DEFAULT_PACKAGES_LOWER: usize = 80;
pub const DEFAULT_PACKAGES_UPPER: usize = 80;
// Transit and work holds, in microseconds.
pub const DEFAULT_HOLD_MIN_US: u64 = 1_000;
pub const DEFAULT_HOLD_MAX_US: u64 = 10_000;

/// Bounded random hold, in microseconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoldRange {
    pub min_us: u64,
    pub max_us: u64,
}

impl HoldRange {
    pub const fn new(min_us: u64, max_us: u64) -> Self {
        Self { min_us, max_us }
    }

    /// No hold at all; used by tests to keep runs fast.
    pub const fn instant() -> Self {
        Self::new(0, 0)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_us == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(rng.gen_range(self.min_us..=self.max_us))
    }
}

impl Default for HoldRange {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_MIN_US, DEFAULT_HOLD_MAX_US)
    }
}

#[derive(Clone, Debug)]
pub struct SimConfig {
    pub seed: u64,
    pub teams: usize,
    pub robots_per_team: usize,
    pub packages: RangeInclusive<usize>,
    pub transit: HoldRange,
    pub work: HoldRange,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            teams: DEFAULT_TEAMS,
            robots_per_team: DEFAULT_ROBOTS_PER_TEAM,
            packages: DEFAULT_PACKAGES_LOWER..=DEFAULT_PACKAGES_UPPER,
            transit: HoldRange::default(),
            work: HoldRange::default(),
        }
    }
}

impl SimConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Total robot threads: one per ring member.
    pub fn robots_total(&self) -> usize {
        self.teams * self.robots_per_team
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.teams == 0 || self.teams > MAX_TEAMS {
            return Err(ConfigError::Invalid(format!(
                "teams must be within 1..={MAX_TEAMS}, got {}",
                self.teams
            )));
        }
        if self.robots_per_team == 0 {
            return Err(ConfigError::Invalid(
                "robots_per_team must be > 0".to_string(),
            ));
        }
        if self.packages.start() > self.packages.end() {
            return Err(ConfigError::Invalid(format!(
                "package bounds inverted: {}..={}",
                self.packages.start(),
                self.packages.end()
            )));
        }
        for (label, hold) in [("transit", &self.transit), ("work", &self.work)] {
            if hold.min_us > hold.max_us {
                return Err(ConfigError::Invalid(format!(
                    "{label} hold inverted: {}..={}us",
                    hold.min_us, hold.max_us
                )));
            }
        }
        Ok(())
    }
}

/// Read the run seed from the first line of `path`.
pub fn load_seed(path: impl AsRef<Path>) -> Result<u64, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::SeedUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let line = contents.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return Err(ConfigError::SeedEmpty {
            path: path.to_path_buf(),
        });
    }
    parse_seed(line).ok_or_else(|| ConfigError::SeedInvalid {
        path: path.to_path_buf(),
        value: line.to_string(),
    })
}

/// Accepts unsigned and signed integers; negatives keep their bit pattern.
pub fn parse_seed(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>()
        .ok()
        .or_else(|| raw.parse::<i64>().ok().map(|v| v as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_seed_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "warehouse_sim-{}-{name}.txt",
            std::process::id()
        ));
        let mut file = fs::File::create(&path).expect("create seed file");
        file.write_all(contents.as_bytes()).expect("write seed file");
        path
    }

    #[test]
    fn loads_first_line_trimmed() {
        let path = temp_seed_file("ok", "  1234 \nignored\n");
        assert_eq!(load_seed(&path).expect("seed"), 1234);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_unreadable() {
        let path = std::env::temp_dir().join("warehouse_sim-does-not-exist.txt");
        let err = load_seed(&path).unwrap_err();
        assert!(matches!(err, ConfigError::SeedUnreadable { .. }));
    }

    #[test]
    fn empty_file_is_rejected() {
        let path = temp_seed_file("empty", "\n");
        let err = load_seed(&path).unwrap_err();
        assert!(matches!(err, ConfigError::SeedEmpty { .. }));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn garbage_is_rejected() {
        let path = temp_seed_file("garbage", "banana\n");
        let err = load_seed(&path).unwrap_err();
        assert!(err.to_string().contains("banana"));
        let _ = fs::remove_file(path);
    }

    #[rstest]
    #[case::plain("7", Some(7))]
    #[case::padded(" 99\t", Some(99))]
    #[case::negative("-1", Some(u64::MAX))]
    #[case::float("1.5", None)]
    #[case::blank("", None)]
    fn parses_seed_values(#[case] raw: &str, #[case] expected: Option<u64>) {
        assert_eq!(parse_seed(raw), expected);
    }

    #[rstest]
    #[case::no_teams(SimConfig { teams: 0, ..SimConfig::default() })]
    #[case::too_many_teams(SimConfig { teams: MAX_TEAMS + 1, ..SimConfig::default() })]
    #[case::no_robots(SimConfig { robots_per_team: 0, ..SimConfig::default() })]
    #[case::inverted_packages(SimConfig { packages: 10..=5, ..SimConfig::default() })]
    #[case::inverted_hold(SimConfig { work: HoldRange::new(5, 1), ..SimConfig::default() })]
    fn validate_rejects_nonsense(#[case] config: SimConfig) {
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn default_config_is_reference_shape() {
        let config = SimConfig::default();
        config.validate().expect("default config valid");
        assert_eq!(config.robots_total(), 40);
        assert_eq!(config.packages, 80..=80);
    }

    #[test]
    fn hold_samples_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let hold = HoldRange::new(10, 20);
        for _ in 0..100 {
            let d = hold.sample(&mut rng);
            assert!(d >= Duration::from_micros(10) && d <= Duration::from_micros(20));
        }
        assert_eq!(HoldRange::instant().sample(&mut rng), Duration::ZERO);
    }
}
