use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

static VERSION_RE: OnceLock<Regex> = OnceLock::new();

/// MariaDB servers prepend this to satisfy old replication clients.
const MARIADB_REPLICATION_PREFIX: &str = "5.5.5-";

/// Numeric server version, compared component-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extract the leading `major[.minor[.patch]]` from a free-form server
    /// version string such as `8.0.35-0ubuntu0.22.04.1`,
    /// `5.5.5-10.6.12-MariaDB-log` or `14.5 (Debian 14.5-1.pgdg110+1)`.
    pub fn parse(raw: &str) -> Option<Self> {
        let re = VERSION_RE
            .get_or_init(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("valid regex"));

        let mut text = raw.trim();
        if text.contains("MariaDB") {
            text = text.strip_prefix(MARIADB_REPLICATION_PREFIX).unwrap_or(text);
        }

        let caps = re.captures(text)?;
        let component = |i: usize| -> Option<u32> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };
        Some(Self::new(component(1)?, component(2)?, component(3)?))
    }

    pub fn at_least(&self, floor: ServerVersion) -> bool {
        *self >= floor
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
