use target_lexicon::{OperatingSystem, Triple};

/// Target is a small utility around `target_lexicon::Triple` answering the
/// two ABI questions layout computation needs: the width of C `long` and
/// the pointer width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target(Triple);

impl Target {
    /// Parse from a string like "x86_64-unknown-linux-gnu".
    pub fn parse(s: &str) -> Result<Self, String> {
        s.parse::<Triple>()
            .map(Target)
            .map_err(|e| format!("Failed to parse target triple '{s}': {e}"))
    }

    /// Create from an existing target_lexicon Triple.
    pub fn from_triple(triple: Triple) -> Self {
        Self(triple)
    }

    /// The triple of the machine running the generator.
    pub fn host() -> Self {
        Self(target_lexicon::HOST)
    }

    /// Get the architecture as a canonical string used by Rust cfg target_arch.
    pub fn arch(&self) -> String {
        self.0.architecture.to_string()
    }

    /// Get the operating system as string used by Rust cfg target_os.
    /// Maps Darwin to "macos" to match Rust cfg semantics.
    pub fn os(&self) -> String {
        match self.0.operating_system {
            OperatingSystem::Darwin(_) => "macos".to_string(),
            ref os => os.to_string(),
        }
    }

    /// Pointer width in bits. Unknown architectures default to 64.
    pub fn pointer_width(&self) -> u32 {
        self.0
            .pointer_width()
            .map(|w| w.bits() as u32)
            .unwrap_or(64)
    }

    /// True when C `long` is 4 bytes on this target: every Windows target
    /// (LLP64) and every 32-bit target.
    pub fn long_as_int(&self) -> bool {
        matches!(self.0.operating_system, OperatingSystem::Windows) || self.pointer_width() == 32
    }

    /// Access the inner Triple.
    pub fn as_triple(&self) -> &Triple {
        &self.0
    }

    /// Decompose into the inner Triple.
    pub fn into_triple(self) -> Triple {
        self.0
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::parse(s)
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
