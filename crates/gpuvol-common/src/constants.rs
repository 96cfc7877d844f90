//! System-wide constants and default paths.

/// Default directory under which volumes are assembled.
pub const DEFAULT_PREFIX: &str = "/var/lib/gpuvol/volumes";

/// Kernel interface reporting the loaded NVIDIA driver.
pub const DRIVER_VERSION_FILE: &str = "/proc/driver/nvidia/version";

/// Fallback location of `ldconfig` when it is not on `PATH`.
pub const LDCONFIG_FALLBACK: &str = "/sbin/ldconfig";

/// Catalog component label for executables.
pub const COMPONENT_BINARIES: &str = "binaries";

/// Catalog component label for shared libraries.
pub const COMPONENT_LIBRARIES: &str = "libraries";

/// Volume subdirectory holding executables.
pub const BIN_DIR: &str = "bin";

/// Volume subdirectory holding 32-bit libraries.
pub const LIB32_DIR: &str = "lib";

/// Volume subdirectory holding 64-bit libraries.
pub const LIB64_DIR: &str = "lib64";

/// Permission bits for directories created inside a volume.
pub const DIR_MODE: u32 = 0o755;

/// Application name used in CLI output.
pub const APP_NAME: &str = "gpuvol";
