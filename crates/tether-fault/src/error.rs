use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    UnsupportedPlatform {
        target_os: &'static str,
    },
    Sigaction {
        signal: &'static str,
        errno: i32,
    },
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedPlatform { target_os } => {
                write!(
                    f,
                    "fault reporting is not supported on {target_os}; only Unix targets install signal handlers"
                )
            }
            Self::Sigaction { signal, errno } => {
                let os = std::io::Error::from_raw_os_error(*errno);
                write!(f, "failed to install handler for {signal}: {os}")
            }
        }
    }
}

impl Error for InstallError {}
