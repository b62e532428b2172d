//! Runtime configuration.

use typelink_abi::Addr;

/// Environment variable selecting the fatal action (`panic` or `abort`).
pub const ENV_FATAL: &str = "TYPELINK_FATAL";

/// Environment variable that, when `1`, marks code as living outside the
/// data address space.
pub const ENV_SEPARATE_CODE: &str = "TYPELINK_SEPARATE_CODE";

/// Default start of the arena for runtime-created descriptors.
pub const DEFAULT_ARENA_BASE: Addr = Addr::new(0x7f00_0000_0000);

/// What happens after an unrecoverable metadata error has been logged.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum FatalAction {
    /// Unwind with the diagnostic as the panic message.
    #[default]
    Panic,
    /// Abort the process.
    Abort,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// First address handed out to runtime-created descriptors. Every
    /// module must end below it.
    pub arena_base: Addr,
    /// Whether code addresses share the data address space. When false,
    /// resolved code addresses are not checked against the module's text
    /// range (wasm keeps functions out of linear memory).
    pub code_shares_data_space: bool,
    pub on_fatal: FatalAction,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            arena_base: DEFAULT_ARENA_BASE,
            code_shares_data_space: true,
            on_fatal: FatalAction::Panic,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn with_arena_base(mut self, base: Addr) -> Self {
        self.arena_base = base;
        self
    }

    #[must_use]
    pub fn with_code_shares_data_space(mut self, shared: bool) -> Self {
        self.code_shares_data_space = shared;
        self
    }

    #[must_use]
    pub fn with_on_fatal(mut self, action: FatalAction) -> Self {
        self.on_fatal = action;
        self
    }

    /// Defaults overridden by `TYPELINK_FATAL` and `TYPELINK_SEPARATE_CODE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`RuntimeConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_FATAL) {
            match value.trim().to_ascii_lowercase().as_str() {
                "abort" => config.on_fatal = FatalAction::Abort,
                "panic" => config.on_fatal = FatalAction::Panic,
                other => tracing::warn!(
                    var = ENV_FATAL,
                    value = other,
                    "unrecognized fatal action, keeping default"
                ),
            }
        }

        if let Some(value) = lookup(ENV_SEPARATE_CODE) {
            config.code_shares_data_space = value.trim() != "1";
        }

        config
    }
}
