//! Host platform identification

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    /// Any host that is neither Windows nor macOS
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    pub fn is_windows(self) -> bool {
        self == Platform::Windows
    }

    pub fn is_macos(self) -> bool {
        self == Platform::MacOs
    }

    pub fn is_linux(self) -> bool {
        self == Platform::Linux
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
        };
        f.write_str(name)
    }
}
