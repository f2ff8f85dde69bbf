/// Remote services with a check-in adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ServiceKind {
    Nodeseek,
    Deepflood,
    Acck,
    Svyun,
    #[value(name = "skland-endfield")]
    SklandEndfield,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::Nodeseek,
        ServiceKind::Deepflood,
        ServiceKind::Acck,
        ServiceKind::Svyun,
        ServiceKind::SklandEndfield,
    ];

    /// Human-readable name used in logs and report titles.
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Nodeseek => "NodeSeek",
            ServiceKind::Deepflood => "DeepFlood",
            ServiceKind::Acck => "ACCK",
            ServiceKind::Svyun => "SVYUN",
            ServiceKind::SklandEndfield => "Skland Endfield",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Attendance mode for the NodeSeek/DeepFlood family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignType {
    #[default]
    Fixed,
    Random,
}

impl SignType {
    /// Lenient parse: anything but "random" is fixed.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("random") {
            SignType::Random
        } else {
            SignType::Fixed
        }
    }
}
